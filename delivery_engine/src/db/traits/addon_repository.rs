use crate::{db::traits::RepositoryError, db_types::Addon};

#[allow(async_fn_in_trait)]
pub trait AddonRepository {
    /// Fetches the addons with the given ids. Ids that do not exist are absent from the result.
    async fn fetch_addons_by_ids(&self, ids: &[i64]) -> Result<Vec<Addon>, RepositoryError>;

    async fn fetch_addon_by_name(&self, name: &str) -> Result<Option<Addon>, RepositoryError>;
}
