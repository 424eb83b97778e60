use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageMeta};
use crate::application::repos::{
    CreatePostParams, PostDetail, PostListItem, PostListScope, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

const POST_LIST_COLUMNS: &str = "SELECT p.id, p.title, p.body, p.pub_date, p.is_published, \
     u.username AS author_username, \
     c.title AS category_title, c.slug AS category_slug, \
     l.name AS location_name, p.image_url, \
     (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count ";

const POST_LIST_JOINS: &str = "FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN categories c ON c.id = p.category_id \
     LEFT JOIN locations l ON l.id = p.location_id \
     WHERE 1=1 ";

#[derive(sqlx::FromRow)]
struct PostListRow {
    id: Uuid,
    title: String,
    body: String,
    pub_date: OffsetDateTime,
    is_published: bool,
    author_username: String,
    category_title: Option<String>,
    category_slug: Option<String>,
    location_name: Option<String>,
    image_url: Option<String>,
    comment_count: i64,
}

impl From<PostListRow> for PostListItem {
    fn from(row: PostListRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            body: row.body,
            pub_date: row.pub_date,
            is_published: row.is_published,
            author_username: row.author_username,
            category_title: row.category_title,
            category_slug: row.category_slug,
            location_name: row.location_name,
            image_url: row.image_url,
            comment_count: row.comment_count,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostDetailRow {
    id: Uuid,
    title: String,
    body: String,
    pub_date: OffsetDateTime,
    is_published: bool,
    author_id: Uuid,
    location_id: Option<Uuid>,
    category_id: Option<Uuid>,
    image_url: Option<String>,
    created_at: OffsetDateTime,
    author_username: String,
    category_title: Option<String>,
    category_slug: Option<String>,
    category_is_published: Option<bool>,
    location_name: Option<String>,
}

impl From<PostDetailRow> for PostDetail {
    fn from(row: PostDetailRow) -> Self {
        Self {
            record: PostRecord {
                id: row.id,
                title: row.title,
                body: row.body,
                pub_date: row.pub_date,
                is_published: row.is_published,
                author_id: row.author_id,
                location_id: row.location_id,
                category_id: row.category_id,
                image_url: row.image_url,
                created_at: row.created_at,
            },
            author_username: row.author_username,
            category_title: row.category_title,
            category_slug: row.category_slug,
            category_is_published: row.category_is_published,
            location_name: row.location_name,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
        page_size: u32,
        requested_page: u32,
    ) -> Result<Page<PostListItem>, RepoError> {
        // Count and slice run on one connection inside one transaction so
        // the page boundaries come from a single ordered snapshot.
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let mut count_qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM posts p \
             LEFT JOIN categories c ON c.id = p.category_id \
             WHERE 1=1 ",
        );
        Self::apply_scope_conditions(&mut count_qb, scope, now);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let meta = PageMeta::clamp(requested_page, Self::convert_count(total)?, page_size);

        let mut list_qb = QueryBuilder::new(POST_LIST_COLUMNS);
        list_qb.push(POST_LIST_JOINS);
        Self::apply_scope_conditions(&mut list_qb, scope, now);
        list_qb.push(" ORDER BY p.pub_date DESC, p.id DESC ");
        list_qb.push(" LIMIT ");
        list_qb.push_bind(i64::from(meta.size));
        list_qb.push(" OFFSET ");
        list_qb.push_bind(meta.offset() as i64);

        let rows: Vec<PostListRow> = list_qb
            .build_query_as()
            .fetch_all(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Page::new(
            rows.into_iter().map(PostListItem::from).collect(),
            meta,
        ))
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<PostDetail>, RepoError> {
        let row = sqlx::query_as::<_, PostDetailRow>(
            "SELECT p.id, p.title, p.body, p.pub_date, p.is_published, \
                    p.author_id, p.location_id, p.category_id, p.image_url, p.created_at, \
                    u.username AS author_username, \
                    c.title AS category_title, c.slug AS category_slug, \
                    c.is_published AS category_is_published, \
                    l.name AS location_name \
             FROM posts p \
             INNER JOIN users u ON u.id = p.author_id \
             LEFT JOIN categories c ON c.id = p.category_id \
             LEFT JOIN locations l ON l.id = p.location_id \
             WHERE p.id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostDetail::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        sqlx::query_as::<_, PostRecord>(
            "SELECT id, title, body, pub_date, is_published, author_id, \
                    location_id, category_id, image_url, created_at \
             FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        sqlx::query_as::<_, PostRecord>(
            "INSERT INTO posts \
                 (id, title, body, pub_date, is_published, author_id, \
                  location_id, category_id, image_url, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING id, title, body, pub_date, is_published, author_id, \
                       location_id, category_id, image_url, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.title)
        .bind(params.body)
        .bind(params.pub_date)
        .bind(params.is_published)
        .bind(params.author_id)
        .bind(params.location_id)
        .bind(params.category_id)
        .bind(params.image_url)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        sqlx::query_as::<_, PostRecord>(
            "UPDATE posts SET title = $2, body = $3, pub_date = $4, is_published = $5, \
                    location_id = $6, category_id = $7, image_url = $8 \
             WHERE id = $1 \
             RETURNING id, title, body, pub_date, is_published, author_id, \
                       location_id, category_id, image_url, created_at",
        )
        .bind(params.id)
        .bind(params.title)
        .bind(params.body)
        .bind(params.pub_date)
        .bind(params.is_published)
        .bind(params.location_id)
        .bind(params.category_id)
        .bind(params.image_url)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        // Comments go with the post via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
