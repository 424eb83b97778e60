use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{LocationsRepo, RepoError};
use crate::domain::entities::LocationRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[async_trait]
impl LocationsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LocationRecord>, RepoError> {
        sqlx::query_as::<_, LocationRecord>(
            "SELECT id, name, is_published, created_at FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_published(&self) -> Result<Vec<LocationRecord>, RepoError> {
        sqlx::query_as::<_, LocationRecord>(
            "SELECT id, name, is_published, created_at FROM locations \
             WHERE is_published ORDER BY name, id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
