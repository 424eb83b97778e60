//! Visibility and ownership rules for posts and comments.
//!
//! The viewer is always passed in explicitly; nothing in this module reads
//! ambient request state. The SQL listing scopes in `infra::db` and the
//! in-memory repositories used by the integration suite both defer to
//! [`is_publicly_listed`] so the predicate cannot drift between paths.

use time::OffsetDateTime;
use uuid::Uuid;

/// The facts post visibility depends on, detached from any row shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostAccess {
    pub author_id: Uuid,
    pub is_published: bool,
    /// `None` when the post has no category. Absence of a category imposes
    /// no restriction.
    pub category_is_published: Option<bool>,
    pub pub_date: OffsetDateTime,
}

/// Third-person visibility: the predicate listing queries filter on.
///
/// A post appears in public listings iff it is published, its category (if
/// any) is published, and its publication time is not in the future.
pub fn is_publicly_listed(post: &PostAccess, now: OffsetDateTime) -> bool {
    post.is_published && post.category_is_published.unwrap_or(true) && post.pub_date <= now
}

/// Whether `viewer` may see `post` at all. Authors always see their own
/// content, drafts and scheduled posts included.
pub fn is_post_visible(post: &PostAccess, viewer: Option<Uuid>, now: OffsetDateTime) -> bool {
    if viewer == Some(post.author_id) {
        return true;
    }
    is_publicly_listed(post, now)
}

/// Whether `viewer` may edit or delete a post. Denied attempts redirect to
/// the post detail view.
pub fn can_mutate_post(author_id: Uuid, viewer: Option<Uuid>) -> bool {
    viewer == Some(author_id)
}

/// Whether `viewer` may edit or delete a comment. Denied attempts receive
/// not-found, never a redirect.
pub fn can_mutate_comment(author_id: Uuid, viewer: Option<Uuid>) -> bool {
    matches!(viewer, Some(id) if id == author_id)
}
