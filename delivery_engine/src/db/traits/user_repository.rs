use crate::{
    db::traits::RepositoryError,
    db_types::{Address, NewAddress, NewUser, User},
};

#[allow(async_fn_in_trait)]
pub trait UserRepository {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, RepositoryError>;

    /// Fetches the addresses on file for the user, primary address first.
    async fn fetch_addresses(&self, user_id: i64) -> Result<Vec<Address>, RepositoryError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Adds an address for the user. A user holds at most five addresses; the backend rejects a sixth.
    async fn insert_address(&self, user_id: i64, address: NewAddress) -> Result<Address, RepositoryError>;
}
