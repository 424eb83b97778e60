//! Postgres-backed repository implementations.

mod categories;
mod comments;
mod locations;
mod posts;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, QueryBuilder, query,
    postgres::{PgPool, PgPoolOptions},
};
use time::OffsetDateTime;

use crate::application::repos::{HealthRepo, PostListScope, RepoError};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Append the WHERE conditions for a listing scope. The public variants
    /// share the third-person visibility predicate: published post, absent
    /// or published category, publication time not in the future.
    fn apply_scope_conditions(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: PostListScope,
        now: OffsetDateTime,
    ) {
        match scope {
            PostListScope::Public => {
                Self::push_public_predicate(qb, now);
            }
            PostListScope::PublicInCategory { category_id } => {
                Self::push_public_predicate(qb, now);
                qb.push(" AND p.category_id = ");
                qb.push_bind(category_id);
            }
            PostListScope::PublicByAuthor { author_id } => {
                Self::push_public_predicate(qb, now);
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
            }
            PostListScope::AllByAuthor { author_id } => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
            }
        }
    }

    fn push_public_predicate(qb: &mut QueryBuilder<'_, Postgres>, now: OffsetDateTime) {
        qb.push(" AND p.is_published AND (p.category_id IS NULL OR c.is_published) AND p.pub_date <= ");
        qb.push_bind(now);
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}
