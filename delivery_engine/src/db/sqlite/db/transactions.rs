use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::traits::RepositoryError,
    db_types::{Cents, NewTransaction, Transaction},
};

/// Appends an entry to the ledger. This does not touch the order's balance, so it should only ever be called inside
/// a database transaction that also updates the order.
pub(crate) async fn insert_transaction(
    order_id: i64,
    tx: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, RepositoryError> {
    let transaction: Transaction = sqlx::query_as(
        r#"
            INSERT INTO transactions (order_id, tx_type, amount, old_value, new_value, payment_method, notes, accrued)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(tx.tx_type.to_string())
    .bind(tx.amount)
    .bind(tx.old_value)
    .bind(tx.new_value)
    .bind(tx.payment_method.map(|m| m.to_string()))
    .bind(tx.notes)
    .bind(tx.accrued)
    .fetch_one(conn)
    .await?;
    trace!(
        "🗃️ Ledger entry #{} for order #{order_id}: {} {} ({} -> {})",
        transaction.id,
        transaction.tx_type,
        transaction.amount,
        transaction.old_value,
        transaction.new_value
    );
    Ok(transaction)
}

pub async fn fetch_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Transaction>, RepositoryError> {
    let transactions = sqlx::query_as("SELECT * FROM transactions WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(transactions)
}

/// The total interest the accrual job has added to the order so far.
pub async fn accrued_interest(order_id: i64, conn: &mut SqliteConnection) -> Result<Cents, RepositoryError> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE order_id = $1 AND tx_type = 'Interest' AND accrued",
    )
    .bind(order_id)
    .fetch_one(conn)
    .await?;
    Ok(Cents::from(total))
}
