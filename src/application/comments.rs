//! Comment creation and the owner-only edit/delete state machine.
//!
//! Unlike posts, a denied comment mutation is answered with not-found;
//! the existence of someone else's comment route is never confirmed.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, PostsRepo, RepoError,
};
use crate::domain::access;
use crate::domain::entities::CommentRecord;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Result of appending a comment to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Done,
    /// Blank body: nothing is created, the caller redirects back.
    Rejected,
    PostNotFound,
}

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self { posts, comments }
    }

    pub async fn add(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<AddOutcome, CommentError> {
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Ok(AddOutcome::PostNotFound);
        }

        let body = body.trim();
        if body.is_empty() {
            return Ok(AddOutcome::Rejected);
        }

        self.comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                body: body.to_string(),
            })
            .await?;

        Ok(AddOutcome::Done)
    }

    /// Load a comment for its owner. `None` when the comment is absent,
    /// belongs to a different post, or the viewer is anonymous or does
    /// not own it. The cases are indistinguishable to the caller on
    /// purpose.
    pub async fn load_for_owner(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<CommentRecord>, CommentError> {
        let Some(comment) = self.comments.find_by_id(comment_id).await? else {
            return Ok(None);
        };
        if comment.post_id != post_id {
            return Ok(None);
        }
        if !access::can_mutate_comment(comment.author_id, viewer) {
            return Ok(None);
        }
        Ok(Some(comment))
    }

    /// Apply an edit; `Ok(false)` means not-found for this viewer.
    pub async fn update(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        viewer: Option<Uuid>,
        body: &str,
    ) -> Result<bool, CommentError> {
        let Some(comment) = self.load_for_owner(post_id, comment_id, viewer).await? else {
            return Ok(false);
        };

        let body = body.trim();
        if body.is_empty() {
            // An emptied comment keeps its previous text; the caller
            // redirects back to the detail view as if nothing happened.
            return Ok(true);
        }

        self.comments
            .update_comment(comment.id, body.to_string())
            .await?;
        Ok(true)
    }

    /// Apply a confirmed deletion; `Ok(false)` means not-found for this
    /// viewer.
    pub async fn delete(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<bool, CommentError> {
        let Some(comment) = self.load_for_owner(post_id, comment_id, viewer).await? else {
            return Ok(false);
        };

        self.comments.delete_comment(comment.id).await?;
        Ok(true)
    }
}
