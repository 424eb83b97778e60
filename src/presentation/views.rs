use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::PageMeta;
use crate::application::posts::{FieldError, FormChoices, PostInput};
use crate::application::repos::{CommentView, PostDetail, PostListItem};
use crate::domain::access;
use crate::domain::entities::UserRecord;

const SNIPPET_MAX_CHARS: usize = 200;

pub const HUMAN_DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year] [hour]:[minute]");

pub fn format_datetime(when: OffsetDateTime) -> String {
    when.format(HUMAN_DATETIME_FORMAT).unwrap_or_default()
}

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        HttpError::from_error(
            err.source,
            StatusCode::INTERNAL_SERVER_ERROR,
            err.public_message,
            &err.error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError {
            source: "presentation::views::render_template",
            public_message: "Template rendering failed",
            error: err,
        }
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Rendered 404 page carrying its report for the logging middleware.
pub fn render_not_found_response(viewer: Option<ViewerView>) -> Response {
    let view = LayoutContext {
        viewer,
        content: ErrorPageView::not_found(),
    };
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// The authenticated user as the layout chrome shows them.
#[derive(Debug, Clone)]
pub struct ViewerView {
    pub username: String,
}

impl ViewerView {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            username: record.username.clone(),
        }
    }
}

pub fn viewer_view(viewer: Option<&UserRecord>) -> Option<ViewerView> {
    viewer.map(ViewerView::from_record)
}

/// Shared layout wrapper: chrome state plus the page content.
#[derive(Debug, Clone)]
pub struct LayoutContext<T> {
    pub viewer: Option<ViewerView>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(viewer: Option<ViewerView>, content: T) -> Self {
        Self { viewer, content }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryBadge {
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct PostCardView {
    pub path: String,
    pub title: String,
    pub snippet: String,
    pub published: String,
    pub author_username: String,
    pub author_path: String,
    pub category: Option<CategoryBadge>,
    pub location_name: Option<String>,
    pub image_url: Option<String>,
    pub comment_count: i64,
    /// Draft marker, shown only on the owner's own profile listing.
    pub is_draft: bool,
}

impl PostCardView {
    pub fn from_item(item: &PostListItem) -> Self {
        Self {
            path: post_path(item.id),
            title: item.title.clone(),
            snippet: snippet(&item.body),
            published: format_datetime(item.pub_date),
            author_username: item.author_username.clone(),
            author_path: profile_path(&item.author_username),
            category: match (&item.category_title, &item.category_slug) {
                (Some(title), Some(slug)) => Some(CategoryBadge {
                    title: title.clone(),
                    path: format!("/category/{slug}"),
                }),
                _ => None,
            },
            location_name: item.location_name.clone(),
            image_url: item.image_url.clone(),
            comment_count: item.comment_count,
            is_draft: !item.is_published,
        }
    }
}

/// Previous/next links for a clamped page.
#[derive(Debug, Clone)]
pub struct PagerView {
    pub current: u32,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_path: String,
    pub next_path: String,
}

impl PagerView {
    pub fn new(meta: &PageMeta, base_path: &str) -> Self {
        Self {
            current: meta.number,
            total_pages: meta.total_pages,
            has_previous: meta.has_previous(),
            has_next: meta.has_next(),
            previous_path: format!("{base_path}?page={}", meta.previous()),
            next_path: format!("{base_path}?page={}", meta.next()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexContext {
    pub posts: Vec<PostCardView>,
    pub pager: PagerView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

#[derive(Debug, Clone)]
pub struct CategoryContext {
    pub title: String,
    pub description: String,
    pub posts: Vec<PostCardView>,
    pub pager: PagerView,
}

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryTemplate {
    pub view: LayoutContext<CategoryContext>,
}

#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub username: String,
    pub display_name: String,
    pub is_self: bool,
    pub posts: Vec<PostCardView>,
    pub pager: PagerView,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

#[derive(Debug, Clone)]
pub struct CommentItemView {
    pub author_username: String,
    pub author_path: String,
    pub created: String,
    pub body: String,
    pub can_manage: bool,
    pub edit_path: String,
    pub delete_path: String,
}

#[derive(Debug, Clone)]
pub struct PostDetailContext {
    pub title: String,
    pub body: String,
    pub published: String,
    pub author_username: String,
    pub author_path: String,
    pub category: Option<CategoryBadge>,
    pub location_name: Option<String>,
    pub image_url: Option<String>,
    pub can_edit: bool,
    pub edit_path: String,
    pub delete_path: String,
    pub comment_path: String,
    pub viewer_may_comment: bool,
    pub comments: Vec<CommentItemView>,
}

impl PostDetailContext {
    pub fn build(post: &PostDetail, comments: &[CommentView], viewer: Option<Uuid>) -> Self {
        let id = post.record.id;
        let comment_items = comments
            .iter()
            .map(|comment| CommentItemView {
                author_username: comment.author_username.clone(),
                author_path: profile_path(&comment.author_username),
                created: format_datetime(comment.created_at),
                body: comment.body.clone(),
                can_manage: access::can_mutate_comment(comment.author_id, viewer),
                edit_path: format!("/posts/{id}/edit_comment/{}", comment.id),
                delete_path: format!("/posts/{id}/delete_comment/{}", comment.id),
            })
            .collect();

        Self {
            title: post.record.title.clone(),
            body: post.record.body.clone(),
            published: format_datetime(post.record.pub_date),
            author_username: post.author_username.clone(),
            author_path: profile_path(&post.author_username),
            category: match (&post.category_title, &post.category_slug) {
                (Some(title), Some(slug)) => Some(CategoryBadge {
                    title: title.clone(),
                    path: format!("/category/{slug}"),
                }),
                _ => None,
            },
            location_name: post.location_name.clone(),
            image_url: post.record.image_url.clone(),
            can_edit: access::can_mutate_post(post.record.author_id, viewer),
            edit_path: format!("/posts/{id}/edit"),
            delete_path: format!("/posts/{id}/delete"),
            comment_path: format!("/posts/{id}/comment"),
            viewer_may_comment: viewer.is_some(),
            comments: comment_items,
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Debug, Clone)]
pub struct ChoiceView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct PostFormContext {
    pub heading: &'static str,
    pub action: String,
    pub submit_label: &'static str,
    pub form: PostInput,
    pub errors: Vec<FieldError>,
    pub categories: Vec<ChoiceView>,
    pub locations: Vec<ChoiceView>,
}

impl PostFormContext {
    pub fn create(form: PostInput, errors: Vec<FieldError>, choices: &FormChoices) -> Self {
        Self {
            heading: "New post",
            action: "/posts/create".to_string(),
            submit_label: "Publish",
            categories: category_choices(choices, &form.category_id),
            locations: location_choices(choices, &form.location_id),
            form,
            errors,
        }
    }

    pub fn edit(
        id: Uuid,
        form: PostInput,
        errors: Vec<FieldError>,
        choices: &FormChoices,
    ) -> Self {
        Self {
            heading: "Edit post",
            action: format!("/posts/{id}/edit"),
            submit_label: "Save changes",
            categories: category_choices(choices, &form.category_id),
            locations: location_choices(choices, &form.location_id),
            form,
            errors,
        }
    }
}

fn category_choices(choices: &FormChoices, selected: &str) -> Vec<ChoiceView> {
    choices
        .categories
        .iter()
        .map(|category| ChoiceView {
            value: category.id.to_string(),
            label: category.title.clone(),
            selected: category.id.to_string() == selected,
        })
        .collect()
}

fn location_choices(choices: &FormChoices, selected: &str) -> Vec<ChoiceView> {
    choices
        .locations
        .iter()
        .map(|location| ChoiceView {
            value: location.id.to_string(),
            label: location.name.clone(),
            selected: location.id.to_string() == selected,
        })
        .collect()
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

#[derive(Debug, Clone)]
pub struct CommentFormContext {
    pub action: String,
    pub body: String,
    pub cancel_path: String,
}

#[derive(Template)]
#[template(path = "comment_form.html")]
pub struct CommentFormTemplate {
    pub view: LayoutContext<CommentFormContext>,
}

#[derive(Debug, Clone)]
pub struct CommentDeleteContext {
    pub action: String,
    pub body: String,
    pub cancel_path: String,
}

#[derive(Template)]
#[template(path = "comment_confirm_delete.html")]
pub struct CommentDeleteTemplate {
    pub view: LayoutContext<CommentDeleteContext>,
}

#[derive(Debug, Clone, Default)]
pub struct LoginContext {
    pub username: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

#[derive(Debug, Clone)]
pub struct ProfileFormContext {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub errors: Vec<FieldError>,
}

#[derive(Template)]
#[template(path = "profile_form.html")]
pub struct ProfileFormTemplate {
    pub view: LayoutContext<ProfileFormContext>,
}

#[derive(Debug, Clone, Default)]
pub struct PasswordFormContext {
    pub errors: Vec<FieldError>,
}

#[derive(Template)]
#[template(path = "password_form.html")]
pub struct PasswordFormTemplate {
    pub view: LayoutContext<PasswordFormContext>,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "rules.html")]
pub struct RulesTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Debug, Clone)]
pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist or is not available to you."
                .to_string(),
        }
    }

    pub fn forbidden() -> Self {
        Self {
            title: "Forbidden".to_string(),
            message: "You do not have permission to do that.".to_string(),
        }
    }

    pub fn server_error() -> Self {
        Self {
            title: "Something went wrong".to_string(),
            message: "An unexpected error occurred. Please try again later.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn post_path(id: Uuid) -> String {
    format!("/posts/{id}")
}

pub fn profile_path(username: &str) -> String {
    format!("/profile/{username}")
}

fn snippet(body: &str) -> String {
    let mut out = String::new();
    for (taken, ch) in body.chars().enumerate() {
        if taken >= SNIPPET_MAX_CHARS {
            out.push('…');
            break;
        }
        out.push(ch);
    }
    out
}
