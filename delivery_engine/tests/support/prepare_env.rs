use chrono::{DateTime, Duration, Utc};
use delivery_engine::{
    db_types::{Address, Cents, NewAddress, NewUser, Role, StockItem, User},
    DeliveryDatabase,
    SqliteDatabase,
    StockRepository,
    UserRepository,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    db
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/dlv_test_store_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        trace!("Could not drop database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {url}");
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Failed to drop database {url}: {e}");
    }
}

pub fn address(street: &str, primary: bool) -> NewAddress {
    NewAddress {
        street: street.to_string(),
        number: "100".to_string(),
        district: "Centro".to_string(),
        city: "Recife".to_string(),
        reference: None,
        is_primary: primary,
    }
}

/// Creates a customer with a single primary address.
pub async fn customer(db: &SqliteDatabase, name: &str) -> (User, Address) {
    let user = db.insert_user(NewUser::new(name)).await.expect("Error creating user");
    let address = db.insert_address(user.id, address("Rua do Sol", true)).await.expect("Error creating address");
    (user, address)
}

pub async fn customer_without_address(db: &SqliteDatabase, name: &str) -> User {
    db.insert_user(NewUser::new(name)).await.expect("Error creating user")
}

pub async fn admin(db: &SqliteDatabase, name: &str) -> User {
    db.insert_user(NewUser::new(name).with_role(Role::Admin)).await.expect("Error creating admin")
}

/// Sets the price (in whole currency units) and available quantity of a product.
pub async fn set_stock(db: &SqliteDatabase, product: &str, quantity: i64, unit_price: i64) -> StockItem {
    db.set_unit_price(product, Cents::from_units(unit_price)).await.expect("Error setting price");
    sqlx::query_as("UPDATE stock SET quantity = $1 WHERE name = $2 RETURNING *")
        .bind(quantity)
        .bind(product)
        .fetch_one(db.pool())
        .await
        .expect("Error setting stock level")
}

pub async fn stock_level(db: &SqliteDatabase, product: &str) -> i64 {
    let items = db.fetch_stock().await.expect("Error fetching stock");
    items.into_iter().find(|s| s.name == product).map(|s| s.quantity).expect("Product not in stock table")
}

/// Moves the creation date of an order so that it is `days` old at `now`.
pub async fn backdate_order(db: &SqliteDatabase, order_id: i64, days: i64, now: DateTime<Utc>) {
    let created_at = now - Duration::days(days);
    sqlx::query("UPDATE orders SET created_at = $1 WHERE id = $2")
        .bind(created_at)
        .bind(order_id)
        .execute(db.pool())
        .await
        .expect("Error backdating order");
}
