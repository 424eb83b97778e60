//! Listing services: front page, category pages and profile pages.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{POSTS_PAGE_SIZE, Page, parse_page_param};
use crate::application::repos::{
    CategoriesRepo, PostListItem, PostListScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CategoryRecord, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown category")]
    UnknownCategory,
    #[error("unknown user")]
    UnknownUser,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Profile page payload: whose profile, what the viewer may see of it.
#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub profile: UserRecord,
    pub is_self: bool,
    pub posts: Page<PostListItem>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        users: Arc<dyn UsersRepo>,
    ) -> Self {
        Self {
            posts,
            categories,
            users,
        }
    }

    /// Newest visible posts first, ten per page.
    pub async fn index_page(&self, raw_page: Option<&str>) -> Result<Page<PostListItem>, FeedError> {
        let page = parse_page_param(raw_page);
        let now = OffsetDateTime::now_utc();

        Ok(self
            .posts
            .list_posts(PostListScope::Public, now, POSTS_PAGE_SIZE, page)
            .await?)
    }

    /// Visible posts of one published category. Unknown or unpublished
    /// slugs are reported as unknown, not revealed.
    pub async fn category_page(
        &self,
        slug: &str,
        raw_page: Option<&str>,
    ) -> Result<(CategoryRecord, Page<PostListItem>), FeedError> {
        let category = self
            .categories
            .find_published_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownCategory)?;

        let page = parse_page_param(raw_page);
        let now = OffsetDateTime::now_utc();
        let posts = self
            .posts
            .list_posts(
                PostListScope::PublicInCategory {
                    category_id: category.id,
                },
                now,
                POSTS_PAGE_SIZE,
                page,
            )
            .await?;

        Ok((category, posts))
    }

    /// A user's posts. The owner sees everything they wrote, drafts and
    /// scheduled posts included; anyone else sees only the visible subset.
    pub async fn profile_page(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        raw_page: Option<&str>,
    ) -> Result<ProfilePage, FeedError> {
        let profile = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::UnknownUser)?;

        let is_self = viewer == Some(profile.id);
        let scope = if is_self {
            PostListScope::AllByAuthor {
                author_id: profile.id,
            }
        } else {
            PostListScope::PublicByAuthor {
                author_id: profile.id,
            }
        };

        let page = parse_page_param(raw_page);
        let now = OffsetDateTime::now_utc();
        let posts = self
            .posts
            .list_posts(scope, now, POSTS_PAGE_SIZE, page)
            .await?;

        Ok(ProfilePage {
            profile,
            is_self,
            posts,
        })
    }
}
