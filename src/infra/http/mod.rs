mod accounts;
pub mod middleware;
mod posts;
mod public;
pub mod session;

pub use session::SessionKey;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::application::accounts::AccountService;
use crate::application::comments::CommentService;
use crate::application::error::ErrorReport;
use crate::application::feed::FeedService;
use crate::application::posts::PostService;
use crate::application::repos::{HealthRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::presentation::views::{
    ErrorPageView, ErrorTemplate, LayoutContext, ViewerView, render_template_response,
};

pub(crate) const LOGIN_PATH: &str = "/auth/login";

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub accounts: Arc<AccountService>,
    pub users: Arc<dyn UsersRepo>,
    pub health: Arc<dyn HealthRepo>,
    pub sessions: SessionKey,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .merge(public::routes())
        .merge(posts::routes())
        .merge(accounts::routes())
        .fallback(public::not_found_fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Resolve the viewer or answer with a redirect to the login page.
pub(crate) async fn require_viewer(
    state: &HttpState,
    jar: &CookieJar,
    source: &'static str,
) -> Result<UserRecord, Response> {
    match session::resolve_viewer(state, jar).await {
        Ok(Some(viewer)) => Ok(viewer),
        Ok(None) => Err(Redirect::to(LOGIN_PATH).into_response()),
        Err(err) => Err(internal_error_response(source, None, &err)),
    }
}

/// Rendered 500 page with its report attached for the logging middleware.
pub(crate) fn internal_error_response(
    source: &'static str,
    viewer: Option<ViewerView>,
    error: &dyn std::error::Error,
) -> Response {
    let view = LayoutContext::new(viewer, ErrorPageView::server_error());
    let mut response =
        render_template_response(ErrorTemplate { view }, StatusCode::INTERNAL_SERVER_ERROR);
    ErrorReport::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, error).attach(&mut response);
    response
}
