use super::*;
use crate::config::AppConfig;
use crate::model::{Recipient, Role, User};
use crate::store::MemoryDocumentStore;
use crate::state::test_helpers::*;
use std::time::Duration;
use tokio::time::timeout;

fn as_auth(user: User) -> AuthUser {
    AuthUser { user, token: "t".into() }
}

fn seller() -> AuthUser {
    as_auth(shop_user("v1", Role::User, "s1", "Banunu"))
}

fn to_seller(content: &str) -> SendMessage {
    SendMessage {
        to: Some(Recipient::User { id: "v1".into() }),
        content: content.into(),
        ..SendMessage::default()
    }
}

fn fast_poll_state() -> AppState {
    let config = AppConfig { unread_poll: Duration::from_millis(20), ..AppConfig::default() };
    AppState::new(Arc::new(MemoryDocumentStore::new()), config)
}

#[test]
fn message_errors_map_to_statuses() {
    assert_eq!(message_error_to_status(MessageError::Missing("content")), StatusCode::BAD_REQUEST);
    assert_eq!(message_error_to_status(MessageError::NotFound("m".into())), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn send_read_and_count() {
    let state = test_app_state();
    let (status, Json(sent)) = send(State(state.clone()), as_auth(global_admin()), Json(to_seller("bonjour")))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let Json(unread_before) = unread(State(state.clone()), seller()).await.unwrap();
    assert_eq!(unread_before.count, 1);

    let Json(list) = inbox(State(state.clone()), seller()).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].content, "bonjour");

    let status = mark_read(State(state.clone()), seller(), Path(sent.id)).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    let Json(unread_after) = unread(State(state), seller()).await.unwrap();
    assert_eq!(unread_after.count, 0);
}

#[tokio::test]
async fn empty_message_is_bad_request() {
    let state = test_app_state();
    let body = SendMessage { content: " ".into(), ..SendMessage::default() };
    assert_eq!(send(State(state), seller(), Json(body)).await.err(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn unread_watch_publishes_changes() {
    let state = fast_poll_state();
    let (mut rx, handle) = watch_unread(&state, &seller());

    timeout(Duration::from_millis(500), rx.changed()).await.unwrap().unwrap();
    assert_eq!(*rx.borrow_and_update(), Some(0));

    messages::send_message(state.store.as_ref(), &global_admin(), to_seller("nouveau"))
        .await
        .unwrap();
    timeout(Duration::from_millis(500), rx.changed()).await.unwrap().unwrap();
    assert_eq!(*rx.borrow_and_update(), Some(1));

    handle.stop();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.is_finished());
}

#[tokio::test]
async fn unchanged_count_is_not_republished() {
    let state = fast_poll_state();
    let (mut rx, _handle) = watch_unread(&state, &seller());
    timeout(Duration::from_millis(500), rx.changed()).await.unwrap().unwrap();
    rx.borrow_and_update();

    assert!(timeout(Duration::from_millis(100), rx.changed()).await.is_err());
}
