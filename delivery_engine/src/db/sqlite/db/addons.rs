use sqlx::{QueryBuilder, SqliteConnection};

use crate::{db::traits::RepositoryError, db_types::Addon};

pub async fn fetch_by_ids(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Addon>, RepositoryError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT id, name, price FROM addons WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    builder.push(") ORDER BY id");
    let addons = builder.build_query_as::<Addon>().fetch_all(conn).await?;
    Ok(addons)
}

pub async fn fetch_by_name(name: &str, conn: &mut SqliteConnection) -> Result<Option<Addon>, RepositoryError> {
    let addon =
        sqlx::query_as("SELECT id, name, price FROM addons WHERE name = $1").bind(name).fetch_optional(conn).await?;
    Ok(addon)
}
