//! Authenticated mutations: posts and comments.
//!
//! Creation routes require a session and redirect anonymous requests to
//! the login page. Mutations of existing entities go straight through the
//! ownership guard: a denied post mutation (anonymous viewers included)
//! redirects to the detail view, a denied comment mutation renders
//! not-found.

use axum::{
    Router,
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::comments::AddOutcome;
use crate::application::posts::{
    EditTarget, FieldError, MutationOutcome, PostError, PostInput,
};
use crate::domain::entities::UserRecord;
use crate::presentation::views::{
    CommentDeleteContext, CommentDeleteTemplate, CommentFormContext, CommentFormTemplate,
    LayoutContext, PostFormContext, PostFormTemplate, ViewerView, post_path, profile_path,
    render_not_found_response, render_template_response, viewer_view,
};

use super::{HttpState, internal_error_response, require_viewer, session};

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/posts/create", get(create_post_form).post(create_post))
        .route("/posts/{id}/edit", get(edit_post_form).post(edit_post))
        .route("/posts/{id}/delete", post(delete_post))
        .route("/posts/{id}/comment", post(add_comment))
        .route(
            "/posts/{id}/edit_comment/{comment_id}",
            get(edit_comment_form).post(edit_comment),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}",
            get(delete_comment_confirm).post(delete_comment),
        )
}

#[derive(Debug, Deserialize)]
struct PostFormPayload {
    title: String,
    body: String,
    pub_date: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    is_published: Option<String>,
}

impl PostFormPayload {
    fn into_input(self) -> PostInput {
        PostInput {
            title: self.title,
            body: self.body,
            pub_date: self.pub_date,
            category_id: self.category,
            location_id: self.location,
            image_url: self.image_url,
            is_published: matches!(self.is_published.as_deref(), Some("on") | Some("true")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentFormPayload {
    #[serde(default)]
    body: String,
}

fn parse_post_id(raw: &str, viewer: Option<&UserRecord>) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| render_not_found_response(viewer_view(viewer)))
}

fn parse_comment_path(
    id: &str,
    comment_id: &str,
    viewer: Option<&UserRecord>,
) -> Result<(Uuid, Uuid), Response> {
    match (Uuid::parse_str(id), Uuid::parse_str(comment_id)) {
        (Ok(post_id), Ok(comment_id)) => Ok((post_id, comment_id)),
        _ => Err(render_not_found_response(viewer_view(viewer))),
    }
}

async fn create_post_form(State(state): State<HttpState>, jar: CookieJar) -> Response {
    const SOURCE: &str = "infra::http::posts::create_post_form";

    let viewer = match require_viewer(&state, &jar, SOURCE).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let choices = match state.posts.form_choices().await {
        Ok(choices) => choices,
        Err(err) => return internal_error_response(SOURCE, viewer_view(Some(&viewer)), &err),
    };

    let content = PostFormContext::create(PostInput::prefilled(), Vec::new(), &choices);
    render_template_response(
        PostFormTemplate {
            view: LayoutContext::new(viewer_view(Some(&viewer)), content),
        },
        StatusCode::OK,
    )
}

async fn create_post(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(payload): Form<PostFormPayload>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::create_post";

    let viewer = match require_viewer(&state, &jar, SOURCE).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let input = payload.into_input();
    let valid = match state.posts.validate(&input).await {
        Ok(valid) => valid,
        Err(PostError::Form(errors)) => {
            return render_post_form(&state, &viewer, None, input, errors).await;
        }
        Err(PostError::Repo(err)) => {
            return internal_error_response(SOURCE, viewer_view(Some(&viewer)), &err);
        }
    };

    match state.posts.create(viewer.id, valid).await {
        Ok(_) => Redirect::to(&profile_path(&viewer.username)).into_response(),
        Err(err) => internal_error_response(SOURCE, viewer_view(Some(&viewer)), &err),
    }
}

async fn edit_post_form(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Response {
    const SOURCE: &str = "infra::http::posts::edit_post_form";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let id = match parse_post_id(&id, viewer.as_ref()) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let viewer_id = viewer.as_ref().map(|user| user.id);

    match state.posts.load_for_edit(id, viewer_id).await {
        Ok(EditTarget::Editable(record)) => {
            let viewer = viewer.as_ref().map(ViewerView::from_record);
            render_post_form_with(
                &state,
                viewer,
                Some(id),
                PostInput::from_record(&record),
                Vec::new(),
            )
            .await
        }
        Ok(EditTarget::Forbidden) => Redirect::to(&post_path(id)).into_response(),
        Ok(EditTarget::NotFound) => render_not_found_response(viewer_view(viewer.as_ref())),
        Err(err) => internal_error_response(SOURCE, viewer_view(viewer.as_ref()), &err),
    }
}

async fn edit_post(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
    Form(payload): Form<PostFormPayload>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::edit_post";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let id = match parse_post_id(&id, viewer.as_ref()) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let viewer_id = viewer.as_ref().map(|user| user.id);

    // Ownership is settled before the form is even validated, exactly as
    // the read path settles visibility before rendering.
    match state.posts.load_for_edit(id, viewer_id).await {
        Ok(EditTarget::Editable(_)) => {}
        Ok(EditTarget::Forbidden) => return Redirect::to(&post_path(id)).into_response(),
        Ok(EditTarget::NotFound) => {
            return render_not_found_response(viewer_view(viewer.as_ref()));
        }
        Err(err) => return internal_error_response(SOURCE, viewer_view(viewer.as_ref()), &err),
    }

    let input = payload.into_input();
    let valid = match state.posts.validate(&input).await {
        Ok(valid) => valid,
        Err(PostError::Form(errors)) => {
            let viewer = viewer.as_ref().map(ViewerView::from_record);
            return render_post_form_with(&state, viewer, Some(id), input, errors).await;
        }
        Err(PostError::Repo(err)) => {
            return internal_error_response(SOURCE, viewer_view(viewer.as_ref()), &err);
        }
    };

    match state.posts.update(id, viewer_id, valid).await {
        Ok(MutationOutcome::Done | MutationOutcome::Forbidden) => {
            Redirect::to(&post_path(id)).into_response()
        }
        Ok(MutationOutcome::NotFound) => render_not_found_response(viewer_view(viewer.as_ref())),
        Err(err) => internal_error_response(SOURCE, viewer_view(viewer.as_ref()), &err),
    }
}

async fn delete_post(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Response {
    const SOURCE: &str = "infra::http::posts::delete_post";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let id = match parse_post_id(&id, viewer.as_ref()) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let viewer_id = viewer.as_ref().map(|user| user.id);

    match state.posts.delete(id, viewer_id).await {
        Ok(MutationOutcome::Done) => match viewer {
            Some(viewer) => Redirect::to(&profile_path(&viewer.username)).into_response(),
            None => Redirect::to("/").into_response(),
        },
        Ok(MutationOutcome::Forbidden) => Redirect::to(&post_path(id)).into_response(),
        Ok(MutationOutcome::NotFound) => render_not_found_response(viewer_view(viewer.as_ref())),
        Err(err) => internal_error_response(SOURCE, viewer_view(viewer.as_ref()), &err),
    }
}

async fn add_comment(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
    Form(payload): Form<CommentFormPayload>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::add_comment";

    let viewer = match require_viewer(&state, &jar, SOURCE).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    let id = match parse_post_id(&id, Some(&viewer)) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.comments.add(id, viewer.id, &payload.body).await {
        // A blank body creates nothing; either way the reader lands back
        // on the detail view.
        Ok(AddOutcome::Done | AddOutcome::Rejected) => {
            Redirect::to(&post_path(id)).into_response()
        }
        Ok(AddOutcome::PostNotFound) => render_not_found_response(viewer_view(Some(&viewer))),
        Err(err) => internal_error_response(SOURCE, viewer_view(Some(&viewer)), &err),
    }
}

async fn edit_comment_form(
    State(state): State<HttpState>,
    Path((id, comment_id)): Path<(String, String)>,
    jar: CookieJar,
) -> Response {
    const SOURCE: &str = "infra::http::posts::edit_comment_form";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let (post_id, comment_id) = match parse_comment_path(&id, &comment_id, viewer.as_ref()) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    let viewer_id = viewer.as_ref().map(|user| user.id);

    match state
        .comments
        .load_for_owner(post_id, comment_id, viewer_id)
        .await
    {
        Ok(Some(comment)) => {
            let content = CommentFormContext {
                action: format!("/posts/{post_id}/edit_comment/{comment_id}"),
                body: comment.body,
                cancel_path: post_path(post_id),
            };
            render_template_response(
                CommentFormTemplate {
                    view: LayoutContext::new(viewer_view(viewer.as_ref()), content),
                },
                StatusCode::OK,
            )
        }
        Ok(None) => render_not_found_response(viewer_view(viewer.as_ref())),
        Err(err) => internal_error_response(SOURCE, viewer_view(viewer.as_ref()), &err),
    }
}

async fn edit_comment(
    State(state): State<HttpState>,
    Path((id, comment_id)): Path<(String, String)>,
    jar: CookieJar,
    Form(payload): Form<CommentFormPayload>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::edit_comment";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let (post_id, comment_id) = match parse_comment_path(&id, &comment_id, viewer.as_ref()) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    let viewer_id = viewer.as_ref().map(|user| user.id);

    match state
        .comments
        .update(post_id, comment_id, viewer_id, &payload.body)
        .await
    {
        Ok(true) => Redirect::to(&post_path(post_id)).into_response(),
        Ok(false) => render_not_found_response(viewer_view(viewer.as_ref())),
        Err(err) => internal_error_response(SOURCE, viewer_view(viewer.as_ref()), &err),
    }
}

async fn delete_comment_confirm(
    State(state): State<HttpState>,
    Path((id, comment_id)): Path<(String, String)>,
    jar: CookieJar,
) -> Response {
    const SOURCE: &str = "infra::http::posts::delete_comment_confirm";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let (post_id, comment_id) = match parse_comment_path(&id, &comment_id, viewer.as_ref()) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    let viewer_id = viewer.as_ref().map(|user| user.id);

    match state
        .comments
        .load_for_owner(post_id, comment_id, viewer_id)
        .await
    {
        Ok(Some(comment)) => {
            let content = CommentDeleteContext {
                action: format!("/posts/{post_id}/delete_comment/{comment_id}"),
                body: comment.body,
                cancel_path: post_path(post_id),
            };
            render_template_response(
                CommentDeleteTemplate {
                    view: LayoutContext::new(viewer_view(viewer.as_ref()), content),
                },
                StatusCode::OK,
            )
        }
        Ok(None) => render_not_found_response(viewer_view(viewer.as_ref())),
        Err(err) => internal_error_response(SOURCE, viewer_view(viewer.as_ref()), &err),
    }
}

async fn delete_comment(
    State(state): State<HttpState>,
    Path((id, comment_id)): Path<(String, String)>,
    jar: CookieJar,
) -> Response {
    const SOURCE: &str = "infra::http::posts::delete_comment";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };
    let (post_id, comment_id) = match parse_comment_path(&id, &comment_id, viewer.as_ref()) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    let viewer_id = viewer.as_ref().map(|user| user.id);

    match state
        .comments
        .delete(post_id, comment_id, viewer_id)
        .await
    {
        Ok(true) => Redirect::to(&post_path(post_id)).into_response(),
        Ok(false) => render_not_found_response(viewer_view(viewer.as_ref())),
        Err(err) => internal_error_response(SOURCE, viewer_view(viewer.as_ref()), &err),
    }
}

async fn render_post_form(
    state: &HttpState,
    viewer: &UserRecord,
    post_id: Option<Uuid>,
    input: PostInput,
    errors: Vec<FieldError>,
) -> Response {
    render_post_form_with(state, viewer_view(Some(viewer)), post_id, input, errors).await
}

async fn render_post_form_with(
    state: &HttpState,
    viewer: Option<ViewerView>,
    post_id: Option<Uuid>,
    input: PostInput,
    errors: Vec<FieldError>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::render_post_form";

    let choices = match state.posts.form_choices().await {
        Ok(choices) => choices,
        Err(err) => return internal_error_response(SOURCE, viewer, &err),
    };

    let content = match post_id {
        Some(id) => PostFormContext::edit(id, input, errors, &choices),
        None => PostFormContext::create(input, errors, &choices),
    };

    render_template_response(
        PostFormTemplate {
            view: LayoutContext::new(viewer, content),
        },
        StatusCode::OK,
    )
}
