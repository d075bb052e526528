use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cucumber::World;
use delivery_engine::{
    events::EventProducers,
    AccrualJobsApi,
    OrderFlowApi,
    OrderFlowError,
    PaymentLedgerApi,
    SqliteDatabase,
};
use log::*;

use crate::support::prepare_env::{prepare_test_env, random_db_path};

#[derive(Default, Debug, World)]
pub struct DeliveryWorld {
    pub system: Option<DeliverySystem>,
}

#[derive(Debug)]
pub struct DeliverySystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub payments: PaymentLedgerApi<SqliteDatabase>,
    pub jobs: AccrualJobsApi<SqliteDatabase>,
    pub users: HashMap<String, i64>,
    pub stock_ids: HashMap<String, i64>,
    pub last_order: Option<i64>,
    pub last_error: Option<OrderFlowError>,
    pub last_job_count: Option<u64>,
    /// The clock used for backdating orders and running jobs
    pub now: DateTime<Utc>,
}

impl DeliveryWorld {
    pub fn system(&mut self) -> &mut DeliverySystem {
        self.system.as_mut().expect("System not initialised. Start the scenario with 'Given a fresh install'")
    }
}

impl DeliverySystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        debug!("Created database: {url}");
        Self {
            db_path: url,
            orders: OrderFlowApi::new(db.clone(), EventProducers::default()),
            payments: PaymentLedgerApi::new(db.clone(), EventProducers::default()),
            jobs: AccrualJobsApi::new(db.clone(), EventProducers::default()),
            db,
            users: HashMap::new(),
            stock_ids: HashMap::new(),
            last_order: None,
            last_error: None,
            last_job_count: None,
            now: Utc::now(),
        }
    }

    pub fn user(&self, name: &str) -> i64 {
        *self.users.get(name).unwrap_or_else(|| panic!("Unknown customer {name}"))
    }

    pub fn last_order(&self) -> i64 {
        self.last_order.expect("No order has been placed yet")
    }
}
