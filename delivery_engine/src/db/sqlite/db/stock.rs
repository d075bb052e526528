use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::traits::StockError,
    db_types::{Cents, StockItem},
};

pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<Vec<StockItem>, StockError> {
    let items = sqlx::query_as("SELECT * FROM stock ORDER BY name").fetch_all(conn).await?;
    Ok(items)
}

pub async fn fetch_by_ids(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<StockItem>, StockError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM stock WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    builder.push(") ORDER BY name");
    trace!("🗃️ Executing query: {}", builder.sql());
    let items = builder.build_query_as::<StockItem>().fetch_all(conn).await?;
    Ok(items)
}

pub async fn fetch_by_name(name: &str, conn: &mut SqliteConnection) -> Result<Option<StockItem>, StockError> {
    let item = sqlx::query_as("SELECT * FROM stock WHERE name = $1").bind(name).fetch_optional(conn).await?;
    Ok(item)
}

/// Decrements the stock level in a single conditional statement. The `quantity >= $1` guard, evaluated by the database
/// in the same statement as the write, is what prevents two concurrent reservations from overselling.
pub async fn reserve(product: &str, quantity: i64, conn: &mut SqliteConnection) -> Result<StockItem, StockError> {
    if quantity <= 0 {
        return Err(StockError::InvalidQuantity(quantity));
    }
    let updated: Option<StockItem> = sqlx::query_as(
        r#"
            UPDATE stock SET quantity = quantity - $1, updated_at = CURRENT_TIMESTAMP
            WHERE name = $2 AND quantity >= $1
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(product)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(item) => {
            debug!("🗃️ Reserved {quantity} x {product}. {} left", item.quantity);
            Ok(item)
        },
        None => match fetch_by_name(product, conn).await? {
            Some(_) => Err(StockError::InsufficientStock { product: product.to_string(), requested: quantity }),
            None => Err(StockError::ProductNotFound(product.to_string())),
        },
    }
}

pub async fn release(product: &str, quantity: i64, conn: &mut SqliteConnection) -> Result<StockItem, StockError> {
    if quantity <= 0 {
        return Err(StockError::InvalidQuantity(quantity));
    }
    let updated: Option<StockItem> = sqlx::query_as(
        "UPDATE stock SET quantity = quantity + $1, updated_at = CURRENT_TIMESTAMP WHERE name = $2 RETURNING *",
    )
    .bind(quantity)
    .bind(product)
    .fetch_optional(conn)
    .await?;
    let item = updated.ok_or_else(|| StockError::ProductNotFound(product.to_string()))?;
    debug!("🗃️ Released {quantity} x {product}. {} available", item.quantity);
    Ok(item)
}

pub async fn upsert_price(
    product: &str,
    unit_price: Cents,
    conn: &mut SqliteConnection,
) -> Result<StockItem, StockError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO stock (name, unit_price, quantity) VALUES ($1, $2, 0)
            ON CONFLICT (name) DO UPDATE SET unit_price = excluded.unit_price, updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(product)
    .bind(unit_price)
    .fetch_one(conn)
    .await?;
    Ok(item)
}
