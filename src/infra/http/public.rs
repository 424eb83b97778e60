//! Read-only surface: listings, post detail, static pages, health.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::feed::FeedError;
use crate::presentation::views::{
    AboutTemplate, CategoryContext, CategoryTemplate, ErrorPageView, ErrorTemplate, IndexContext,
    IndexTemplate, LayoutContext, PagerView, PostCardView, PostDetailContext, PostTemplate,
    ProfileContext, ProfileTemplate, RulesTemplate, render_not_found_response,
    render_template_response, viewer_view,
};

use super::{HttpState, db_health_response, internal_error_response, session};

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/", get(index))
        .route("/posts/{id}", get(post_detail))
        .route("/category/{slug}", get(category_posts))
        .route("/profile/{username}", get(profile))
        .route("/pages/about", get(about))
        .route("/pages/rules", get(rules))
        .route("/403", get(forbidden_page))
        .route("/404", get(not_found_page))
        .route("/500", get(server_error_page))
        .route("/_health/db", get(health))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    pub(super) page: Option<String>,
}

async fn index(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
    jar: CookieJar,
) -> Response {
    const SOURCE: &str = "infra::http::public::index";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let viewer_view = viewer_view(viewer.as_ref());

    match state.feed.index_page(query.page.as_deref()).await {
        Ok(page) => {
            let content = IndexContext {
                posts: page.items.iter().map(PostCardView::from_item).collect(),
                pager: PagerView::new(&page.meta, "/"),
            };
            render_template_response(
                IndexTemplate {
                    view: LayoutContext::new(viewer_view, content),
                },
                StatusCode::OK,
            )
        }
        Err(FeedError::UnknownCategory | FeedError::UnknownUser) => {
            render_not_found_response(viewer_view)
        }
        Err(FeedError::Repo(err)) => internal_error_response(SOURCE, viewer_view, &err),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Response {
    const SOURCE: &str = "infra::http::public::post_detail";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let viewer_view = viewer_view(viewer.as_ref());
    let viewer_id = viewer.as_ref().map(|user| user.id);

    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer_view);
    };

    match state.posts.detail(id, viewer_id).await {
        Ok(Some(page)) => {
            let content = PostDetailContext::build(&page.post, &page.comments, viewer_id);
            render_template_response(
                PostTemplate {
                    view: LayoutContext::new(viewer_view, content),
                },
                StatusCode::OK,
            )
        }
        Ok(None) => render_not_found_response(viewer_view),
        Err(err) => internal_error_response(SOURCE, viewer_view, &err),
    }
}

async fn category_posts(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    jar: CookieJar,
) -> Response {
    const SOURCE: &str = "infra::http::public::category_posts";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let viewer_view = viewer_view(viewer.as_ref());

    match state.feed.category_page(&slug, query.page.as_deref()).await {
        Ok((category, page)) => {
            let content = CategoryContext {
                title: category.title,
                description: category.description,
                posts: page.items.iter().map(PostCardView::from_item).collect(),
                pager: PagerView::new(&page.meta, &format!("/category/{slug}")),
            };
            render_template_response(
                CategoryTemplate {
                    view: LayoutContext::new(viewer_view, content),
                },
                StatusCode::OK,
            )
        }
        Err(FeedError::UnknownCategory | FeedError::UnknownUser) => {
            render_not_found_response(viewer_view)
        }
        Err(FeedError::Repo(err)) => internal_error_response(SOURCE, viewer_view, &err),
    }
}

async fn profile(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    jar: CookieJar,
) -> Response {
    const SOURCE: &str = "infra::http::public::profile";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let viewer_view = viewer_view(viewer.as_ref());
    let viewer_id = viewer.as_ref().map(|user| user.id);

    match state
        .feed
        .profile_page(&username, viewer_id, query.page.as_deref())
        .await
    {
        Ok(profile) => {
            let content = ProfileContext {
                username: profile.profile.username.clone(),
                display_name: profile.profile.display_name(),
                is_self: profile.is_self,
                posts: profile
                    .posts
                    .items
                    .iter()
                    .map(PostCardView::from_item)
                    .collect(),
                pager: PagerView::new(&profile.posts.meta, &format!("/profile/{username}")),
            };
            render_template_response(
                ProfileTemplate {
                    view: LayoutContext::new(viewer_view, content),
                },
                StatusCode::OK,
            )
        }
        Err(FeedError::UnknownCategory | FeedError::UnknownUser) => {
            render_not_found_response(viewer_view)
        }
        Err(FeedError::Repo(err)) => internal_error_response(SOURCE, viewer_view, &err),
    }
}

async fn about(State(state): State<HttpState>, jar: CookieJar) -> Response {
    const SOURCE: &str = "infra::http::public::about";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };

    render_template_response(
        AboutTemplate {
            view: LayoutContext::new(
                viewer_view(viewer.as_ref()),
                (),
            ),
        },
        StatusCode::OK,
    )
}

async fn rules(State(state): State<HttpState>, jar: CookieJar) -> Response {
    const SOURCE: &str = "infra::http::public::rules";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };

    render_template_response(
        RulesTemplate {
            view: LayoutContext::new(
                viewer_view(viewer.as_ref()),
                (),
            ),
        },
        StatusCode::OK,
    )
}

async fn forbidden_page(State(state): State<HttpState>, jar: CookieJar) -> Response {
    error_preview(&state, jar, ErrorPageView::forbidden(), StatusCode::FORBIDDEN).await
}

async fn not_found_page(State(state): State<HttpState>, jar: CookieJar) -> Response {
    error_preview(
        &state,
        jar,
        ErrorPageView::not_found(),
        StatusCode::NOT_FOUND,
    )
    .await
}

async fn server_error_page(State(state): State<HttpState>, jar: CookieJar) -> Response {
    error_preview(
        &state,
        jar,
        ErrorPageView::server_error(),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .await
}

async fn error_preview(
    state: &HttpState,
    jar: CookieJar,
    content: ErrorPageView,
    status: StatusCode,
) -> Response {
    let viewer = session::resolve_viewer(state, &jar).await.unwrap_or(None);
    let view = LayoutContext::new(
        viewer_view(viewer.as_ref()),
        content,
    );
    render_template_response(ErrorTemplate { view }, status)
}

async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

/// Unknown routes render the same not-found page the handlers use.
pub(super) async fn not_found_fallback(State(state): State<HttpState>, jar: CookieJar) -> Response {
    let viewer = session::resolve_viewer(&state, &jar).await.unwrap_or(None);
    render_not_found_response(viewer_view(viewer.as_ref()))
}
