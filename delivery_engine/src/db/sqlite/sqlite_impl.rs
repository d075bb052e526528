//! `SqliteDatabase` is a concrete implementation of a delivery engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::db::traits
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{addons, db_url, new_pool, orders, stock, transactions, users};
use crate::{
    db::traits::{
        AccrualCandidate,
        AddonRepository,
        DeliveryDatabase,
        FullOrder,
        OrderRepository,
        RepositoryError,
        StockError,
        StockRepository,
        TransactionRepository,
        UserRepository,
    },
    db_types::{
        Addon,
        Address,
        BalanceUpdate,
        Cents,
        NewAddress,
        NewOrder,
        NewUser,
        Order,
        OrderStatusType,
        StockItem,
        Transaction,
        User,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in the `DLV_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date using the migrations embedded in the binary.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl StockRepository for SqliteDatabase {
    async fn fetch_stock(&self) -> Result<Vec<StockItem>, StockError> {
        let mut conn = self.pool.acquire().await?;
        stock::fetch_all(&mut conn).await
    }

    async fn fetch_stock_by_ids(&self, ids: &[i64]) -> Result<Vec<StockItem>, StockError> {
        let mut conn = self.pool.acquire().await?;
        stock::fetch_by_ids(ids, &mut conn).await
    }

    async fn reserve(&self, product: &str, quantity: i64) -> Result<StockItem, StockError> {
        let mut conn = self.pool.acquire().await?;
        stock::reserve(product, quantity, &mut conn).await
    }

    async fn release(&self, product: &str, quantity: i64) -> Result<StockItem, StockError> {
        let mut conn = self.pool.acquire().await?;
        stock::release(product, quantity, &mut conn).await
    }

    async fn set_unit_price(&self, product: &str, unit_price: Cents) -> Result<StockItem, StockError> {
        let mut conn = self.pool.acquire().await?;
        stock::upsert_price(product, unit_price, &mut conn).await
    }
}

impl AddonRepository for SqliteDatabase {
    async fn fetch_addons_by_ids(&self, ids: &[i64]) -> Result<Vec<Addon>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        addons::fetch_by_ids(ids, &mut conn).await
    }

    async fn fetch_addon_by_name(&self, name: &str) -> Result<Option<Addon>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        addons::fetch_by_name(name, &mut conn).await
    }
}

impl UserRepository for SqliteDatabase {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(user_id, &mut conn).await
    }

    async fn fetch_addresses(&self, user_id: i64) -> Result<Vec<Address>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_addresses(user_id, &mut conn).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_user(user, &mut conn).await
    }

    async fn insert_address(&self, user_id: i64, address: NewAddress) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let address = users::insert_address(user_id, address, &mut tx).await?;
        tx.commit().await?;
        Ok(address)
    }
}

impl OrderRepository for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<FullOrder, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order #{} saved with {} items, {} addons and {} ledger entries",
            order.order.id,
            order.items.len(),
            order.addons.len(),
            order.transactions.len()
        );
        Ok(order)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn fetch_full_order(&self, order_id: i64) -> Result<Option<FullOrder>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_full_order(order_id, &mut conn).await
    }

    async fn update_balance(&self, update: BalanceUpdate) -> Result<(Order, Transaction), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let (order, transaction) = orders::update_balance(update, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Order #{} balance is now {} ({})", order.id, order.total, order.payment_state);
        Ok((order, transaction))
    }

    async fn update_order_status(
        &self,
        order_id: i64,
        expected_version: i64,
        status: OrderStatusType,
    ) -> Result<Order, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(order_id, expected_version, status, &mut conn).await
    }

    async fn fetch_orders_by_date_range(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_by_date_range(since, until, &mut conn).await
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_for_user(user_id, &mut conn).await
    }

    async fn fetch_overdue_candidates(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_overdue_candidates(created_before, &mut conn).await
    }

    async fn mark_overdue_orders(&self, created_before: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::mark_overdue(created_before, &mut conn).await
    }

    async fn fetch_accrual_candidates(
        &self,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<AccrualCandidate>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_accrual_candidates(after_id, limit, &mut conn).await
    }
}

impl TransactionRepository for SqliteDatabase {
    async fn fetch_transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_for_order(order_id, &mut conn).await
    }
}

impl DeliveryDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), RepositoryError> {
        self.pool.close().await;
        Ok(())
    }
}
