//! Post detail and author-owned post mutations.

use std::sync::Arc;

use thiserror::Error;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use url::Url;
use uuid::Uuid;

use crate::application::repos::{
    CategoriesRepo, CommentView, CommentsRepo, CreatePostParams, LocationsRepo, PostDetail,
    PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::access::{self, PostAccess};
use crate::domain::entities::{CategoryRecord, LocationRecord, PostRecord};

const TITLE_MAX_CHARS: usize = 256;

/// Accepted `pub_date` shapes: the datetime-local input value, with or
/// without seconds.
const PUB_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const PUB_DATE_FORMAT_SECONDS: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post form rejected")]
    Form(Vec<FieldError>),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Raw form values as submitted, echoed back into the template when
/// validation fails.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub title: String,
    pub body: String,
    pub pub_date: String,
    pub category_id: String,
    pub location_id: String,
    pub image_url: String,
    pub is_published: bool,
}

impl PostInput {
    /// Blank creation form: publication time prefilled with "now", the
    /// published checkbox ticked.
    pub fn prefilled() -> Self {
        Self {
            pub_date: OffsetDateTime::now_utc()
                .format(PUB_DATE_FORMAT)
                .unwrap_or_default(),
            is_published: true,
            ..Self::default()
        }
    }

    /// Prefill the edit form from a stored record.
    pub fn from_record(record: &PostRecord) -> Self {
        let pub_date = record
            .pub_date
            .format(PUB_DATE_FORMAT)
            .unwrap_or_default();
        Self {
            title: record.title.clone(),
            body: record.body.clone(),
            pub_date,
            category_id: record
                .category_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            location_id: record
                .location_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            image_url: record.image_url.clone().unwrap_or_default(),
            is_published: record.is_published,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedPost {
    pub title: String,
    pub body: String,
    pub pub_date: OffsetDateTime,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_published: bool,
}

/// Selector options for the post form.
#[derive(Debug, Clone)]
pub struct FormChoices {
    pub categories: Vec<CategoryRecord>,
    pub locations: Vec<LocationRecord>,
}

/// Outcome of an ownership-guarded mutation. `Forbidden` maps to a silent
/// redirect at the HTTP layer, never an error page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Done,
    Forbidden,
    NotFound,
}

/// What the edit form may show for a given viewer.
#[derive(Debug, Clone)]
pub enum EditTarget {
    Editable(PostRecord),
    Forbidden,
    NotFound,
}

/// Detail page payload after the visibility check passed.
#[derive(Debug, Clone)]
pub struct PostDetailPage {
    pub post: PostDetail,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    locations: Arc<dyn LocationsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        locations: Arc<dyn LocationsRepo>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            comments,
            categories,
            locations,
        }
    }

    pub async fn form_choices(&self) -> Result<FormChoices, PostError> {
        let categories = self.categories.list_published().await?;
        let locations = self.locations.list_published().await?;
        Ok(FormChoices {
            categories,
            locations,
        })
    }

    /// Detail page for `id` as seen by `viewer`; `None` when the post is
    /// absent or invisible to them; callers render not-found either way.
    pub async fn detail(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<PostDetailPage>, PostError> {
        let Some(post) = self.posts.find_detail(id).await? else {
            return Ok(None);
        };

        let facts = PostAccess {
            author_id: post.record.author_id,
            is_published: post.record.is_published,
            category_is_published: post.category_is_published,
            pub_date: post.record.pub_date,
        };
        if !access::is_post_visible(&facts, viewer, OffsetDateTime::now_utc()) {
            return Ok(None);
        }

        let comments = self.comments.list_for_post(id).await?;
        let can_edit = access::can_mutate_post(post.record.author_id, viewer);

        Ok(Some(PostDetailPage {
            post,
            comments,
            can_edit,
        }))
    }

    /// Check the submitted values and resolve the referenced category and
    /// location. All field problems are collected into one rejection.
    pub async fn validate(&self, input: &PostInput) -> Result<ValidatedPost, PostError> {
        let mut errors = Vec::new();

        let title = input.title.trim().to_string();
        if title.is_empty() {
            errors.push(FieldError::new("title", "Title is required"));
        } else if title.chars().count() > TITLE_MAX_CHARS {
            errors.push(FieldError::new(
                "title",
                format!("Title must be at most {TITLE_MAX_CHARS} characters"),
            ));
        }

        let body = input.body.trim().to_string();
        if body.is_empty() {
            errors.push(FieldError::new("body", "Body text is required"));
        }

        let pub_date = match parse_pub_date(&input.pub_date) {
            Some(when) => when,
            None => {
                errors.push(FieldError::new(
                    "pub_date",
                    "Publication time must look like 2026-08-06T12:30",
                ));
                OffsetDateTime::now_utc()
            }
        };

        let category_id = match parse_optional_id(&input.category_id) {
            Ok(Some(id)) => match self.categories.find_by_id(id).await? {
                Some(category) => Some(category.id),
                None => {
                    errors.push(FieldError::new("category", "Unknown category"));
                    None
                }
            },
            Ok(None) => None,
            Err(()) => {
                errors.push(FieldError::new("category", "Unknown category"));
                None
            }
        };

        let location_id = match parse_optional_id(&input.location_id) {
            Ok(Some(id)) => match self.locations.find_by_id(id).await? {
                Some(location) => Some(location.id),
                None => {
                    errors.push(FieldError::new("location", "Unknown location"));
                    None
                }
            },
            Ok(None) => None,
            Err(()) => {
                errors.push(FieldError::new("location", "Unknown location"));
                None
            }
        };

        let image_url = match input.image_url.trim() {
            "" => None,
            raw => match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url.to_string()),
                _ => {
                    errors.push(FieldError::new(
                        "image_url",
                        "Image link must be an http(s) URL",
                    ));
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(PostError::Form(errors));
        }

        Ok(ValidatedPost {
            title,
            body,
            pub_date,
            category_id,
            location_id,
            image_url,
            is_published: input.is_published,
        })
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        post: ValidatedPost,
    ) -> Result<PostRecord, PostError> {
        Ok(self
            .posts_write
            .create_post(CreatePostParams {
                title: post.title,
                body: post.body,
                pub_date: post.pub_date,
                is_published: post.is_published,
                author_id,
                location_id: post.location_id,
                category_id: post.category_id,
                image_url: post.image_url,
            })
            .await?)
    }

    /// Anonymous viewers and non-owners are both `Forbidden`; the HTTP
    /// layer answers either with a redirect to the detail view.
    pub async fn load_for_edit(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<EditTarget, PostError> {
        let Some(record) = self.posts.find_by_id(id).await? else {
            return Ok(EditTarget::NotFound);
        };
        if !access::can_mutate_post(record.author_id, viewer) {
            return Ok(EditTarget::Forbidden);
        }
        Ok(EditTarget::Editable(record))
    }

    pub async fn update(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
        post: ValidatedPost,
    ) -> Result<MutationOutcome, PostError> {
        let Some(record) = self.posts.find_by_id(id).await? else {
            return Ok(MutationOutcome::NotFound);
        };
        if !access::can_mutate_post(record.author_id, viewer) {
            return Ok(MutationOutcome::Forbidden);
        }

        self.posts_write
            .update_post(UpdatePostParams {
                id,
                title: post.title,
                body: post.body,
                pub_date: post.pub_date,
                is_published: post.is_published,
                location_id: post.location_id,
                category_id: post.category_id,
                image_url: post.image_url,
            })
            .await?;

        Ok(MutationOutcome::Done)
    }

    pub async fn delete(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<MutationOutcome, PostError> {
        let Some(record) = self.posts.find_by_id(id).await? else {
            return Ok(MutationOutcome::NotFound);
        };
        if !access::can_mutate_post(record.author_id, viewer) {
            return Ok(MutationOutcome::Forbidden);
        }

        self.posts_write.delete_post(id).await?;
        Ok(MutationOutcome::Done)
    }
}

fn parse_pub_date(raw: &str) -> Option<OffsetDateTime> {
    let trimmed = raw.trim();
    let parsed = PrimitiveDateTime::parse(trimmed, PUB_DATE_FORMAT_SECONDS)
        .or_else(|_| PrimitiveDateTime::parse(trimmed, PUB_DATE_FORMAT))
        .ok()?;
    Some(parsed.assume_utc())
}

fn parse_optional_id(raw: &str) -> Result<Option<Uuid>, ()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(trimmed).map(Some).map_err(|_| ())
}
