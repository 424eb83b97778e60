//! Login, logout, profile editing and password changes.

mod support;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;

use support::{
    MemoryStore, TEST_PASSWORD, body_string, build_test_router, get, location_header, login,
    post_form,
};

#[tokio::test]
async fn login_issues_a_session_and_lands_on_the_profile() {
    let store = Arc::new(MemoryStore::default());
    store.add_user("alice").await;
    let router = build_test_router(store);

    let cookie = login(&router, "alice").await;
    assert!(cookie.starts_with("piazza_session="));

    // The session cookie actually authenticates follow-up requests.
    let response = get(&router, "/posts/create", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_credentials_rerender_the_login_form() {
    let store = Arc::new(MemoryStore::default());
    store.add_user("alice").await;
    let router = build_test_router(store);

    let response = post_form(
        &router,
        "/auth/login",
        "username=alice&password=wrong",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let body = body_string(response).await;
    assert!(body.contains("Unknown username or wrong password"));

    let response = post_form(
        &router,
        "/auth/login",
        "username=nobody&password=whatever",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn logout_discards_the_session_cookie() {
    let store = Arc::new(MemoryStore::default());
    store.add_user("alice").await;
    let router = build_test_router(store);
    let cookie = login(&router, "alice").await;

    let response = post_form(&router, "/auth/logout", "", Some(&cookie)).await;
    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response), "/");

    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("logout rewrites the session cookie");
    assert!(set_cookie.starts_with("piazza_session="));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn profile_edit_applies_the_enumerated_fields() {
    let store = Arc::new(MemoryStore::default());
    store.add_user("alice").await;
    let router = build_test_router(store.clone());
    let cookie = login(&router, "alice").await;

    let response = post_form(
        &router,
        "/profile/edit",
        "username=alicia&email=alicia%40example.com&first_name=Alicia&last_name=Moretti",
        Some(&cookie),
    )
    .await;
    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response), "/profile/alicia");

    let updated = store
        .users_snapshot()
        .await
        .into_iter()
        .find(|u| u.username == "alicia")
        .expect("renamed user");
    assert_eq!(updated.email, "alicia@example.com");
    assert_eq!(updated.first_name, "Alicia");
    assert_eq!(updated.last_name, "Moretti");
}

#[tokio::test]
async fn profile_edit_rejects_a_taken_username() {
    let store = Arc::new(MemoryStore::default());
    store.add_user("alice").await;
    store.add_user("bob").await;
    let router = build_test_router(store);
    let cookie = login(&router, "alice").await;

    let response = post_form(
        &router,
        "/profile/edit",
        "username=bob&email=alice%40example.com",
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Username is already taken"));
}

#[tokio::test]
async fn password_change_verifies_the_current_password() {
    let store = Arc::new(MemoryStore::default());
    store.add_user("alice").await;
    let router = build_test_router(store);
    let cookie = login(&router, "alice").await;

    let response = post_form(
        &router,
        "/profile/change_password",
        "current_password=wrong&new_password=brand+new+pass&confirm_password=brand+new+pass",
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Current password is incorrect"));

    let form = format!(
        "current_password={}&new_password=brand+new+pass&confirm_password=brand+new+pass",
        TEST_PASSWORD.replace(' ', "+")
    );
    let response = post_form(&router, "/profile/change_password", &form, Some(&cookie)).await;
    assert!(response.status().is_redirection());
    assert_eq!(location_header(&response), "/profile/alice");

    // The new password is live immediately.
    let response = post_form(
        &router,
        "/auth/login",
        "username=alice&password=brand+new+pass",
        None,
    )
    .await;
    assert!(response.status().is_redirection());
}

#[tokio::test]
async fn account_pages_require_a_session() {
    let store = Arc::new(MemoryStore::default());
    let router = build_test_router(store);

    for path in ["/profile/edit", "/profile/change_password"] {
        let response = get(&router, path, None).await;
        assert!(response.status().is_redirection(), "GET {path}");
        assert_eq!(location_header(&response), "/auth/login", "GET {path}");
    }
}

#[tokio::test]
async fn health_and_error_pages_answer_with_their_status() {
    let store = Arc::new(MemoryStore::default());
    let router = build_test_router(store);

    let response = get(&router, "/_health/db", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(&router, "/403", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(&router, "/404", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&router, "/500", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
