use super::*;
use crate::config::AppConfig;
use crate::model::Role;
use crate::state::test_helpers::*;
use crate::store::MemoryDocumentStore;
use axum::extract::FromRequestParts;
use axum::http::Request;
use axum::http::header::COOKIE;
use std::sync::Arc;

fn parts_with(header: Option<(axum::http::HeaderName, &str)>) -> axum::http::request::Parts {
    let mut builder = Request::builder().uri("/api/session/me");
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }
    builder.body(()).unwrap().into_parts().0
}

fn dev_state(store: Arc<MemoryDocumentStore>) -> AppState {
    let config = AppConfig { dev_session_issue: true, ..AppConfig::default() };
    AppState::new(store, config)
}

// =============================================================================
// request_token
// =============================================================================

#[test]
fn bearer_header_wins_over_cookie() {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, "Bearer abc123".parse().unwrap());
    headers.insert(COOKIE, "session_token=fromcookie".parse().unwrap());
    assert_eq!(request_token(&headers).as_deref(), Some("abc123"));
}

#[test]
fn cookie_is_used_without_bearer() {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, "theme=dark; session_token=fromcookie".parse().unwrap());
    assert_eq!(request_token(&headers).as_deref(), Some("fromcookie"));
}

#[test]
fn missing_or_blank_token_is_none() {
    assert_eq!(request_token(&HeaderMap::new()), None);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, "Bearer   ".parse().unwrap());
    headers.insert(COOKIE, "session_token=".parse().unwrap());
    assert_eq!(request_token(&headers), None);
}

// =============================================================================
// extractor
// =============================================================================

#[tokio::test]
async fn extractor_rejects_missing_and_unknown_tokens() {
    let state = test_app_state();
    let mut parts = parts_with(None);
    assert_eq!(AuthUser::from_request_parts(&mut parts, &state).await.err(), Some(StatusCode::UNAUTHORIZED));

    let mut parts = parts_with(Some((AUTHORIZATION, "Bearer nope")));
    assert_eq!(AuthUser::from_request_parts(&mut parts, &state).await.err(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn extractor_resolves_a_live_session() {
    let store = Arc::new(MemoryDocumentStore::new());
    let seller = seed_user(store.as_ref(), shop_user("v1", Role::User, "s1", "Banunu")).await;
    let token = session::create_session(store.as_ref(), "v1", std::time::Duration::from_secs(60))
        .await
        .unwrap();
    let state = test_app_state_with_store(store);

    let cookie = format!("session_token={token}");
    let mut parts = parts_with(Some((COOKIE, cookie.as_str())));
    let auth = AuthUser::from_request_parts(&mut parts, &state).await.ok().unwrap();
    assert_eq!(auth.user, seller);
    assert_eq!(auth.token, token);

    let Json(ctx) = me(auth).await;
    assert_eq!(ctx.shop_id(), "s1");
}

#[tokio::test]
async fn extractor_maps_store_failure_to_500() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.deny(crate::store::collections::SESSIONS).await;
    let state = test_app_state_with_store(store);
    let mut parts = parts_with(Some((AUTHORIZATION, "Bearer abc")));
    assert_eq!(
        AuthUser::from_request_parts(&mut parts, &state).await.err(),
        Some(StatusCode::INTERNAL_SERVER_ERROR)
    );
}

// =============================================================================
// handlers
// =============================================================================

#[tokio::test]
async fn dev_session_is_hidden_unless_enabled() {
    let state = test_app_state();
    let body = DevSessionBody { user_id: "v1".into() };
    assert_eq!(dev_session(State(state), Json(body)).await.err(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn dev_session_issues_token_and_cookie() {
    let store = Arc::new(MemoryDocumentStore::new());
    seed_user(store.as_ref(), shop_user("v1", Role::User, "s1", "Banunu")).await;
    let state = dev_state(Arc::clone(&store));

    let (jar, Json(body)) = dev_session(State(state), Json(DevSessionBody { user_id: "v1".into() }))
        .await
        .unwrap();
    let token = body["token"].as_str().unwrap();
    assert_eq!(token.len(), 64);
    assert_eq!(jar.get(COOKIE_NAME).map(Cookie::value), Some(token));
    assert!(session::resolve_session(store.as_ref(), token).await.unwrap().is_some());
}

#[tokio::test]
async fn dev_session_for_unknown_user_is_not_found() {
    let state = dev_state(Arc::new(MemoryDocumentStore::new()));
    let result = dev_session(State(state), Json(DevSessionBody { user_id: "ghost".into() })).await;
    assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn logout_removes_the_session() {
    let store = Arc::new(MemoryDocumentStore::new());
    seed_user(store.as_ref(), global_admin()).await;
    let token = session::create_session(store.as_ref(), "admin-global", std::time::Duration::from_secs(60))
        .await
        .unwrap();
    let state = test_app_state_with_store(Arc::clone(&store));

    let auth = AuthUser { user: global_admin(), token: token.clone() };
    let response = logout(State(state), auth).await.into_response();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(session::resolve_session(store.as_ref(), &token).await.unwrap().is_none());
}
