use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::traits::RepositoryError,
    db_types::{Address, NewAddress, NewUser, User},
};

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, RepositoryError> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn fetch_addresses(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Address>, RepositoryError> {
    let addresses = sqlx::query_as("SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_primary DESC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(addresses)
}

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, RepositoryError> {
    let user: User = sqlx::query_as("INSERT INTO users (name, phone, role) VALUES ($1, $2, $3) RETURNING *")
        .bind(user.name)
        .bind(user.phone)
        .bind(user.role.to_string())
        .fetch_one(conn)
        .await?;
    debug!("🗃️ User #{} ({}) created", user.id, user.name);
    Ok(user)
}

pub async fn insert_address(
    user_id: i64,
    address: NewAddress,
    conn: &mut SqliteConnection,
) -> Result<Address, RepositoryError> {
    if fetch_user(user_id, conn).await?.is_none() {
        return Err(RepositoryError::UserNotFound(user_id));
    }
    let address = sqlx::query_as(
        r#"
            INSERT INTO addresses (user_id, street, number, district, city, reference, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(address.street)
    .bind(address.number)
    .bind(address.district)
    .bind(address.city)
    .bind(address.reference)
    .bind(address.is_primary)
    .fetch_one(conn)
    .await?;
    Ok(address)
}
