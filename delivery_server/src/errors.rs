use delivery_engine::{OrderFlowError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<RepositoryError> for ServerError {
    fn from(e: RepositoryError) -> Self {
        Self::BackendError(e.to_string())
    }
}
