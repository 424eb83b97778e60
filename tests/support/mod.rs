//! Shared harness: in-memory repositories behind the real router.
//!
//! The memory listing path goes through the same `domain::access`
//! predicate and `PageMeta::clamp` helper as the SQL path, so the access
//! rules exercised here are the rules the product ships.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use piazza::application::accounts::{AccountService, hash_password};
use piazza::application::comments::CommentService;
use piazza::application::feed::FeedService;
use piazza::application::pagination::{Page, PageMeta};
use piazza::application::posts::PostService;
use piazza::application::repos::{
    CategoriesRepo, CommentView, CommentsRepo, CreateCommentParams, CreatePostParams, HealthRepo,
    LocationsRepo, PostDetail, PostListItem, PostListScope, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams, UpdateProfileParams, UsersRepo,
};
use piazza::domain::access::{PostAccess, is_publicly_listed};
use piazza::domain::entities::{
    CategoryRecord, CommentRecord, LocationRecord, PostRecord, UserRecord,
};
use piazza::infra::http::{HttpState, SessionKey, build_router};

pub const TEST_PASSWORD: &str = "correct horse battery";

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<UserRecord>>,
    categories: Mutex<Vec<CategoryRecord>>,
    locations: Mutex<Vec<LocationRecord>>,
    posts: Mutex<Vec<PostRecord>>,
    comments: Mutex<Vec<CommentRecord>>,
}

pub struct PostSpec {
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub is_published: bool,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub pub_date: OffsetDateTime,
}

impl PostSpec {
    /// A post that is publicly visible right now.
    pub fn published(author_id: Uuid, title: &str) -> Self {
        Self {
            author_id,
            title: title.to_string(),
            body: format!("body of {title}"),
            is_published: true,
            category_id: None,
            location_id: None,
            pub_date: OffsetDateTime::now_utc() - Duration::hours(1),
        }
    }
}

impl MemoryStore {
    pub async fn add_user(&self, username: &str) -> UserRecord {
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: hash_password(TEST_PASSWORD).expect("hash"),
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.lock().await.push(user.clone());
        user
    }

    pub async fn add_category(&self, slug: &str, is_published: bool) -> CategoryRecord {
        let category = CategoryRecord {
            id: Uuid::new_v4(),
            title: format!("Category {slug}"),
            description: format!("About {slug}"),
            slug: slug.to_string(),
            is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        self.categories.lock().await.push(category.clone());
        category
    }

    pub async fn add_location(&self, name: &str) -> LocationRecord {
        let location = LocationRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_published: true,
            created_at: OffsetDateTime::now_utc(),
        };
        self.locations.lock().await.push(location.clone());
        location
    }

    pub async fn add_post(&self, spec: PostSpec) -> PostRecord {
        let post = PostRecord {
            id: Uuid::new_v4(),
            title: spec.title,
            body: spec.body,
            pub_date: spec.pub_date,
            is_published: spec.is_published,
            author_id: spec.author_id,
            location_id: spec.location_id,
            category_id: spec.category_id,
            image_url: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.posts.lock().await.push(post.clone());
        post
    }

    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        body: &str,
        created_at: OffsetDateTime,
    ) -> CommentRecord {
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            body: body.to_string(),
            created_at,
        };
        self.comments.lock().await.push(comment.clone());
        comment
    }

    pub async fn users_snapshot(&self) -> Vec<UserRecord> {
        self.users.lock().await.clone()
    }

    pub async fn post_by_id(&self, id: Uuid) -> Option<PostRecord> {
        self.posts.lock().await.iter().find(|p| p.id == id).cloned()
    }

    pub async fn comment_by_id(&self, id: Uuid) -> Option<CommentRecord> {
        self.comments
            .lock()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub async fn post_count(&self) -> usize {
        self.posts.lock().await.len()
    }

    pub async fn comment_count(&self, post_id: Uuid) -> usize {
        self.comments
            .lock()
            .await
            .iter()
            .filter(|c| c.post_id == post_id)
            .count()
    }

    async fn access_facts(&self, post: &PostRecord) -> PostAccess {
        let category_is_published = match post.category_id {
            Some(category_id) => self
                .categories
                .lock()
                .await
                .iter()
                .find(|c| c.id == category_id)
                .map(|c| c.is_published),
            None => None,
        };
        PostAccess {
            author_id: post.author_id,
            is_published: post.is_published,
            category_is_published,
            pub_date: post.pub_date,
        }
    }

    async fn in_scope(&self, post: &PostRecord, scope: PostListScope, now: OffsetDateTime) -> bool {
        let facts = self.access_facts(post).await;
        match scope {
            PostListScope::Public => is_publicly_listed(&facts, now),
            PostListScope::PublicInCategory { category_id } => {
                post.category_id == Some(category_id) && is_publicly_listed(&facts, now)
            }
            PostListScope::PublicByAuthor { author_id } => {
                post.author_id == author_id && is_publicly_listed(&facts, now)
            }
            PostListScope::AllByAuthor { author_id } => post.author_id == author_id,
        }
    }

    async fn list_item(&self, post: &PostRecord) -> PostListItem {
        let author_username = self
            .users
            .lock()
            .await
            .iter()
            .find(|u| u.id == post.author_id)
            .map(|u| u.username.clone())
            .unwrap_or_default();
        let category = match post.category_id {
            Some(id) => self
                .categories
                .lock()
                .await
                .iter()
                .find(|c| c.id == id)
                .cloned(),
            None => None,
        };
        let location_name = match post.location_id {
            Some(id) => self
                .locations
                .lock()
                .await
                .iter()
                .find(|l| l.id == id)
                .map(|l| l.name.clone()),
            None => None,
        };
        let comment_count = self.comment_count(post.id).await as i64;

        PostListItem {
            id: post.id,
            title: post.title.clone(),
            body: post.body.clone(),
            pub_date: post.pub_date,
            is_published: post.is_published,
            author_username,
            category_title: category.as_ref().map(|c| c.title.clone()),
            category_slug: category.as_ref().map(|c| c.slug.clone()),
            location_name,
            image_url: post.image_url.clone(),
            comment_count,
        }
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
        page_size: u32,
        requested_page: u32,
    ) -> Result<Page<PostListItem>, RepoError> {
        let snapshot: Vec<PostRecord> = self.posts.lock().await.clone();
        let mut matched = Vec::new();
        for post in &snapshot {
            if self.in_scope(post, scope, now).await {
                matched.push(post.clone());
            }
        }
        matched.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));

        let meta = PageMeta::clamp(requested_page, matched.len() as u64, page_size);
        let start = meta.offset() as usize;
        let slice = matched
            .iter()
            .skip(start)
            .take(meta.size as usize);

        let mut items = Vec::new();
        for post in slice {
            items.push(self.list_item(post).await);
        }

        Ok(Page::new(items, meta))
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<PostDetail>, RepoError> {
        let Some(post) = self.post_by_id(id).await else {
            return Ok(None);
        };
        let item = self.list_item(&post).await;
        let facts = self.access_facts(&post).await;

        Ok(Some(PostDetail {
            author_username: item.author_username,
            category_title: item.category_title,
            category_slug: item.category_slug,
            category_is_published: facts.category_is_published,
            location_name: item.location_name,
            record: post,
        }))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.post_by_id(id).await)
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let post = PostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            body: params.body,
            pub_date: params.pub_date,
            is_published: params.is_published,
            author_id: params.author_id,
            location_id: params.location_id,
            category_id: params.category_id,
            image_url: params.image_url,
            created_at: OffsetDateTime::now_utc(),
        };
        self.posts.lock().await.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.lock().await;
        let post = posts
            .iter_mut()
            .find(|p| p.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.body = params.body;
        post.pub_date = params.pub_date;
        post.is_published = params.is_published;
        post.location_id = params.location_id;
        post.category_id = params.category_id;
        post.image_url = params.image_url;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut posts = self.posts.lock().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        if posts.len() == before {
            return Err(RepoError::NotFound);
        }
        // Mirror of the schema's ON DELETE CASCADE.
        self.comments.lock().await.retain(|c| c.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CategoriesRepo for MemoryStore {
    async fn find_published_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .categories
            .lock()
            .await
            .iter()
            .find(|c| c.slug == slug && c.is_published)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .categories
            .lock()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list_published(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut published: Vec<_> = self
            .categories
            .lock()
            .await
            .iter()
            .filter(|c| c.is_published)
            .cloned()
            .collect();
        published.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(published)
    }
}

#[async_trait]
impl LocationsRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LocationRecord>, RepoError> {
        Ok(self
            .locations
            .lock()
            .await
            .iter()
            .find(|l| l.id == id)
            .cloned())
    }

    async fn list_published(&self) -> Result<Vec<LocationRecord>, RepoError> {
        let mut published: Vec<_> = self
            .locations
            .lock()
            .await
            .iter()
            .filter(|l| l.is_published)
            .cloned()
            .collect();
        published.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(published)
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, RepoError> {
        let mut matched: Vec<CommentRecord> = self
            .comments
            .lock()
            .await
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let users = self.users.lock().await;
        Ok(matched
            .into_iter()
            .map(|comment| {
                let author_username = users
                    .iter()
                    .find(|u| u.id == comment.author_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default();
                CommentView {
                    id: comment.id,
                    post_id: comment.post_id,
                    author_id: comment.author_id,
                    author_username,
                    body: comment.body,
                    created_at: comment.created_at,
                }
            })
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self.comment_by_id(id).await)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            body: params.body,
            created_at: OffsetDateTime::now_utc(),
        };
        self.comments.lock().await.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: Uuid, body: String) -> Result<CommentRecord, RepoError> {
        let mut comments = self.comments.lock().await;
        let comment = comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepoError::NotFound)?;
        comment.body = body;
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError> {
        let mut comments = self.comments.lock().await;
        let before = comments.len();
        comments.retain(|c| c.id != id);
        if comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.lock().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let mut users = self.users.lock().await;
        if users
            .iter()
            .any(|u| u.username == params.username && u.id != params.id)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = users
            .iter_mut()
            .find(|u| u.id == params.id)
            .ok_or(RepoError::NotFound)?;
        user.username = params.username;
        user.email = params.email;
        user.first_name = params.first_name;
        user.last_name = params.last_name;
        Ok(user.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), RepoError> {
        let mut users = self.users.lock().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepoError::NotFound)?;
        user.password_hash = password_hash;
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub fn build_test_router(store: Arc<MemoryStore>) -> Router {
    let posts_repo: Arc<dyn PostsRepo> = store.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = store.clone();
    let comments_repo: Arc<dyn CommentsRepo> = store.clone();
    let categories_repo: Arc<dyn CategoriesRepo> = store.clone();
    let locations_repo: Arc<dyn LocationsRepo> = store.clone();
    let users_repo: Arc<dyn UsersRepo> = store.clone();
    let health_repo: Arc<dyn HealthRepo> = store.clone();

    let state = HttpState {
        feed: Arc::new(FeedService::new(
            posts_repo.clone(),
            categories_repo.clone(),
            users_repo.clone(),
        )),
        posts: Arc::new(PostService::new(
            posts_repo.clone(),
            posts_write_repo,
            comments_repo.clone(),
            categories_repo,
            locations_repo,
        )),
        comments: Arc::new(CommentService::new(posts_repo, comments_repo)),
        accounts: Arc::new(AccountService::new(users_repo.clone())),
        users: users_repo,
        health: health_repo,
        sessions: SessionKey::new("integration test secret"),
    };

    build_router(state)
}

pub async fn get(router: &Router, path: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().method("GET").uri(path);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("response")
}

pub async fn post_form(
    router: &Router,
    path: &str,
    body: &str,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri(path)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).expect("request"))
        .await
        .expect("response")
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

pub fn location_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Log in through the real endpoint and hand back the session cookie pair.
pub async fn login(router: &Router, username: &str) -> String {
    let body = format!("username={username}&password={}", TEST_PASSWORD.replace(' ', "+"));
    let response = post_form(router, "/auth/login", &body, None).await;
    assert!(
        response.status().is_redirection(),
        "login should redirect, got {}",
        response.status()
    );

    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("login sets a session cookie");
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "unexpected status for response"
    );
}
