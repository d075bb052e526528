use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::{
        sqlite::db::transactions,
        traits::{AccrualCandidate, FullOrder, RepositoryError},
    },
    db_types::{
        BalanceUpdate,
        NewOrder,
        NewOrderAddon,
        NewOrderItem,
        Order,
        OrderAddon,
        OrderItem,
        OrderStatusType,
        Transaction,
    },
};

/// Inserts a new order, its items and addons, and the carried-debt ledger entry if there is one. This is not atomic.
/// Embed this call inside a transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<FullOrder, RepositoryError> {
    let NewOrder {
        user_id,
        address,
        status,
        payment_state,
        total,
        interest_allowed,
        items,
        addons,
        carried_debt,
        created_at,
    } = order;
    let new_order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (user_id, address, status, payment_state, total, interest_allowed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(address)
    .bind(status.to_string())
    .bind(payment_state.to_string())
    .bind(total)
    .bind(interest_allowed)
    .bind(created_at)
    .fetch_one(&mut *conn)
    .await?;
    debug!("🗃️ Order #{} inserted for user #{user_id} with total {total}", new_order.id);
    let mut saved_items = Vec::with_capacity(items.len());
    for item in items {
        saved_items.push(insert_item(new_order.id, item, conn).await?);
    }
    let mut saved_addons = Vec::with_capacity(addons.len());
    for addon in addons {
        saved_addons.push(insert_addon(new_order.id, addon, conn).await?);
    }
    let mut ledger = Vec::new();
    if let Some(debt) = carried_debt {
        ledger.push(transactions::insert_transaction(new_order.id, debt, conn).await?);
    }
    Ok(FullOrder { order: new_order, items: saved_items, addons: saved_addons, transactions: ledger })
}

async fn insert_item(order_id: i64, item: NewOrderItem, conn: &mut SqliteConnection) -> Result<OrderItem, RepositoryError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, stock_id, product, quantity, unit_value, total_value)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.stock_id)
    .bind(item.product)
    .bind(item.quantity)
    .bind(item.unit_value)
    .bind(item.total_value)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

async fn insert_addon(
    order_id: i64,
    addon: NewOrderAddon,
    conn: &mut SqliteConnection,
) -> Result<OrderAddon, RepositoryError> {
    let addon = sqlx::query_as(
        r#"
            INSERT INTO order_addons (order_id, addon_id, name, quantity, unit_value, total_value)
            VALUES ($1, $2, $3, 1, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(addon.addon_id)
    .bind(addon.name)
    .bind(addon.unit_value)
    .bind(addon.total_value)
    .fetch_one(conn)
    .await?;
    Ok(addon)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_full_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<FullOrder>, RepositoryError> {
    let order = match fetch_order(order_id, conn).await? {
        Some(o) => o,
        None => return Ok(None),
    };
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
    let addons = sqlx::query_as("SELECT * FROM order_addons WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
    let transactions = transactions::fetch_for_order(order_id, conn).await?;
    Ok(Some(FullOrder { order, items, addons, transactions }))
}

/// Writes the new balance and payment state, guarded by the version check, then appends the ledger entry. Not atomic
/// on its own; call it inside a transaction.
pub(crate) async fn update_balance(
    update: BalanceUpdate,
    conn: &mut SqliteConnection,
) -> Result<(Order, Transaction), RepositoryError> {
    let BalanceUpdate { order_id, expected_version, transaction, new_payment_state } = update;
    if transaction.new_value.is_negative() {
        return Err(RepositoryError::NegativeBalance(order_id));
    }
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                total = $1,
                payment_state = $2,
                version = version + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND version = $4
            RETURNING *;
        "#,
    )
    .bind(transaction.new_value)
    .bind(new_payment_state.to_string())
    .bind(order_id)
    .bind(expected_version)
    .fetch_optional(&mut *conn)
    .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(missing_or_stale(order_id, conn).await?),
    };
    let tx = transactions::insert_transaction(order_id, transaction, conn).await?;
    Ok((order, tx))
}

pub(crate) async fn update_order_status(
    order_id: i64,
    expected_version: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, RepositoryError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND version = $3
            RETURNING *;
        "#,
    )
    .bind(status.to_string())
    .bind(order_id)
    .bind(expected_version)
    .fetch_optional(&mut *conn)
    .await?;
    match order {
        Some(o) => Ok(o),
        None => Err(missing_or_stale(order_id, conn).await?),
    }
}

async fn missing_or_stale(order_id: i64, conn: &mut SqliteConnection) -> Result<RepositoryError, RepositoryError> {
    let err = match fetch_order(order_id, conn).await? {
        Some(_) => RepositoryError::StaleOrder(order_id),
        None => RepositoryError::OrderNotFound(order_id),
    };
    Ok(err)
}

pub async fn fetch_by_date_range(
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, RepositoryError> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE unixepoch(created_at) >= unixepoch($1) AND unixepoch(created_at) <= unixepoch($2)
            ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(since)
    .bind(until)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn fetch_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, RepositoryError> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_overdue_candidates(
    created_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, RepositoryError> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE payment_state = 'Pending' AND unixepoch(created_at) < unixepoch($1) ORDER BY id",
    )
    .bind(created_before)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub(crate) async fn mark_overdue(
    created_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET payment_state = 'Overdue', version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE payment_state = 'Pending' AND unixepoch(created_at) < unixepoch($1)
        "#,
    )
    .bind(created_before)
    .execute(conn)
    .await?;
    trace!("🗃️ {} orders marked as overdue", result.rows_affected());
    Ok(result.rows_affected())
}

pub async fn fetch_accrual_candidates(
    after_id: i64,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<AccrualCandidate>, RepositoryError> {
    let orders: Vec<Order> = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE id > $1
              AND interest_allowed
              AND payment_state != 'Paid'
              AND status != 'Cancelled'
              AND total > 0
              AND EXISTS (SELECT 1 FROM order_items WHERE order_items.order_id = orders.id AND product = 'gas')
            ORDER BY id ASC
            LIMIT $2
        "#,
    )
    .bind(after_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        let accrued_interest = transactions::accrued_interest(order.id, conn).await?;
        result.push(AccrualCandidate { order, accrued_interest });
    }
    Ok(result)
}
