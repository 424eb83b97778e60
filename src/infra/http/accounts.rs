//! Session establishment and self-service account management.

use axum::{
    Router,
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::application::accounts::{AccountError, PasswordInput, ProfileInput};
use crate::application::posts::FieldError;
use crate::application::repos::RepoError;
use crate::domain::entities::UserRecord;
use crate::presentation::views::{
    LayoutContext, LoginContext, LoginTemplate, PasswordFormContext, PasswordFormTemplate,
    ProfileFormContext, ProfileFormTemplate, profile_path, render_template_response, viewer_view,
};

use super::{HttpState, internal_error_response, require_viewer, session};

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/auth/login", get(login_form).post(login))
        .route("/auth/logout", post(logout))
        .route("/profile/edit", get(edit_profile_form).post(edit_profile))
        .route(
            "/profile/change_password",
            get(change_password_form).post(change_password),
        )
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct ProfilePayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct PasswordPayload {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    confirm_password: String,
}

async fn login_form(State(state): State<HttpState>, jar: CookieJar) -> Response {
    const SOURCE: &str = "infra::http::accounts::login_form";

    let viewer = match session::resolve_viewer(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return internal_error_response(SOURCE, None, &err),
    };

    // Already signed in: straight back to their profile.
    if let Some(viewer) = viewer {
        return Redirect::to(&profile_path(&viewer.username)).into_response();
    }

    render_template_response(
        LoginTemplate {
            view: LayoutContext::new(None, LoginContext::default()),
        },
        StatusCode::OK,
    )
}

async fn login(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(payload): Form<LoginPayload>,
) -> Response {
    const SOURCE: &str = "infra::http::accounts::login";

    match state
        .accounts
        .login(&payload.username, &payload.password)
        .await
    {
        Ok(Some(user)) => {
            let token = match session::issue_token(
                &state.sessions,
                user.id,
                OffsetDateTime::now_utc(),
            ) {
                Ok(token) => token,
                Err(err) => return internal_error_response(SOURCE, None, &err),
            };
            let jar = jar.add(session::session_cookie(token));
            (jar, Redirect::to(&profile_path(&user.username))).into_response()
        }
        Ok(None) => {
            let content = LoginContext {
                username: payload.username,
                error: Some("Unknown username or wrong password".to_string()),
            };
            render_template_response(
                LoginTemplate {
                    view: LayoutContext::new(None, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => internal_error_response(SOURCE, None, &err),
    }
}

async fn logout(jar: CookieJar) -> Response {
    let jar = jar.remove(session::removal_cookie());
    (jar, Redirect::to("/")).into_response()
}

async fn edit_profile_form(State(state): State<HttpState>, jar: CookieJar) -> Response {
    const SOURCE: &str = "infra::http::accounts::edit_profile_form";

    let viewer = match require_viewer(&state, &jar, SOURCE).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let input = ProfileInput::from_record(&viewer);
    render_profile_form(&viewer, input, Vec::new())
}

async fn edit_profile(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(payload): Form<ProfilePayload>,
) -> Response {
    const SOURCE: &str = "infra::http::accounts::edit_profile";

    let viewer = match require_viewer(&state, &jar, SOURCE).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let input = ProfileInput {
        username: payload.username,
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
    };

    match state.accounts.update_profile(viewer.id, &input).await {
        Ok(updated) => Redirect::to(&profile_path(&updated.username)).into_response(),
        Err(AccountError::Form(errors)) => render_profile_form(&viewer, input, errors),
        // A concurrent username grab slips past the service-level check;
        // surface it like any other field problem.
        Err(AccountError::Repo(RepoError::Duplicate { .. })) => {
            let errors = vec![FieldError {
                field: "username",
                message: "Username is already taken".to_string(),
            }];
            render_profile_form(&viewer, input, errors)
        }
        Err(err) => internal_error_response(SOURCE, viewer_view(Some(&viewer)), &err),
    }
}

async fn change_password_form(State(state): State<HttpState>, jar: CookieJar) -> Response {
    const SOURCE: &str = "infra::http::accounts::change_password_form";

    let viewer = match require_viewer(&state, &jar, SOURCE).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    render_template_response(
        PasswordFormTemplate {
            view: LayoutContext::new(
                viewer_view(Some(&viewer)),
                PasswordFormContext::default(),
            ),
        },
        StatusCode::OK,
    )
}

async fn change_password(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(payload): Form<PasswordPayload>,
) -> Response {
    const SOURCE: &str = "infra::http::accounts::change_password";

    let viewer = match require_viewer(&state, &jar, SOURCE).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let input = PasswordInput {
        current_password: payload.current_password,
        new_password: payload.new_password,
        confirm_password: payload.confirm_password,
    };

    match state.accounts.change_password(&viewer, &input).await {
        Ok(()) => Redirect::to(&profile_path(&viewer.username)).into_response(),
        Err(AccountError::Form(errors)) => render_template_response(
            PasswordFormTemplate {
                view: LayoutContext::new(
                    viewer_view(Some(&viewer)),
                    PasswordFormContext { errors },
                ),
            },
            StatusCode::OK,
        ),
        Err(err) => internal_error_response(SOURCE, viewer_view(Some(&viewer)), &err),
    }
}

fn render_profile_form(
    viewer: &UserRecord,
    input: ProfileInput,
    errors: Vec<FieldError>,
) -> Response {
    let content = ProfileFormContext {
        username: input.username,
        email: input.email,
        first_name: input.first_name,
        last_name: input.last_name,
        errors,
    };
    render_template_response(
        ProfileFormTemplate {
            view: LayoutContext::new(viewer_view(Some(viewer)), content),
        },
        StatusCode::OK,
    )
}
