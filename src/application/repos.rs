//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::Page;
use crate::domain::entities::{
    CategoryRecord, CommentRecord, LocationRecord, PostRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing may return. Every public variant applies the
/// third-person visibility predicate at the query level so unpublished
/// content never leaks into aggregate views.
#[derive(Debug, Clone, Copy)]
pub enum PostListScope {
    /// Front page: everything publicly visible.
    Public,
    /// A category page (the category itself is checked by the caller).
    PublicInCategory { category_id: Uuid },
    /// Another user's profile: only their publicly visible posts.
    PublicByAuthor { author_id: Uuid },
    /// The owner's own profile: everything they wrote.
    AllByAuthor { author_id: Uuid },
}

/// Listing projection: a post row joined with the names its card displays.
#[derive(Debug, Clone)]
pub struct PostListItem {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
    pub author_username: String,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    pub location_name: Option<String>,
    pub image_url: Option<String>,
    pub comment_count: i64,
}

/// Detail projection: the full record plus the joined fields the
/// visibility check and the detail view need.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub record: PostRecord,
    pub author_username: String,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    pub category_is_published: Option<bool>,
    pub location_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub body: String,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
    pub author_id: Uuid,
    pub location_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
    pub location_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileParams {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Count and slice inside one transaction so page boundaries are
    /// computed from a single ordered snapshot. Ordering is
    /// `pub_date DESC, id DESC`; an out-of-range `requested_page` clamps
    /// to the last page.
    async fn list_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
        page_size: u32,
        requested_page: u32,
    ) -> Result<Page<PostListItem>, RepoError>;

    async fn find_detail(&self, id: Uuid) -> Result<Option<PostDetail>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Deleting a post drops its comments with it.
    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn find_published_by_slug(&self, slug: &str)
    -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    /// Published categories for the post form selector, ordered by title.
    async fn list_published(&self) -> Result<Vec<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait LocationsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LocationRecord>, RepoError>;

    /// Published locations for the post form selector, ordered by name.
    async fn list_published(&self) -> Result<Vec<LocationRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments for one post, ordered `created_at ASC, id ASC`.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn update_comment(&self, id: Uuid, body: String) -> Result<CommentRecord, RepoError>;

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError>;

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), RepoError>;
}

/// Liveness probe against the backing store.
#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
