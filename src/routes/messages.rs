//! Messaging routes, including the unread-count event stream.
//!
//! DESIGN
//! ======
//! `GET /api/messages/unread/stream` owns a poll task per connection. The
//! task recounts unread messages every `UNREAD_POLL_SECS` and publishes the
//! count through a watch channel; the SSE stream emits only when the count
//! changes. The `PollHandle` lives inside the stream state, so the task stops
//! as soon as the client disconnects and Axum drops the stream.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::watch;

use super::auth::AuthUser;
use crate::model::Message;
use crate::services::messages::{self, MessageError, SendMessage};
use crate::services::poller::{PollConfig, PollHandle, spawn_poll};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: usize,
}

pub(crate) fn message_error_to_status(err: MessageError) -> StatusCode {
    match err {
        MessageError::Missing(_) => StatusCode::BAD_REQUEST,
        MessageError::NotFound(_) => StatusCode::NOT_FOUND,
        MessageError::Store(e) => super::store_error_to_status(&e),
    }
}

/// `GET /api/messages` — the caller's inbox, newest first.
pub async fn inbox(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Message>>, StatusCode> {
    let list = messages::inbox(state.store.as_ref(), &auth.user)
        .await
        .map_err(message_error_to_status)?;
    Ok(Json(list))
}

/// `POST /api/messages` — send a message.
pub async fn send(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SendMessage>,
) -> Result<(StatusCode, Json<Message>), StatusCode> {
    let message = messages::send_message(state.store.as_ref(), &auth.user, body)
        .await
        .map_err(message_error_to_status)?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// `POST /api/messages/:id/read`
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    messages::mark_read(state.store.as_ref(), &auth.user, &id)
        .await
        .map_err(message_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/messages/unread`
pub async fn unread(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UnreadCount>, StatusCode> {
    let count = messages::unread_count(state.store.as_ref(), &auth.user)
        .await
        .map_err(message_error_to_status)?;
    Ok(Json(UnreadCount { count }))
}

// =============================================================================
// UNREAD STREAM
// =============================================================================

/// Start polling the unread count of `auth`'s user into a watch channel.
pub(crate) fn watch_unread(state: &AppState, auth: &AuthUser) -> (watch::Receiver<Option<usize>>, PollHandle) {
    let (tx, rx) = watch::channel(None);
    let tx = Arc::new(tx);
    let store = Arc::clone(&state.store);
    let user = auth.user.clone();
    let config = PollConfig::new(state.config.unread_poll, state.config.poll_max_backoff);

    let handle = spawn_poll("unread_messages", config, move || {
        let store = Arc::clone(&store);
        let user = user.clone();
        let tx = Arc::clone(&tx);
        async move {
            let count = messages::unread_count(store.as_ref(), &user).await?;
            tx.send_if_modified(|current| {
                let changed = *current != Some(count);
                *current = Some(count);
                changed
            });
            Ok::<(), MessageError>(())
        }
    });
    (rx, handle)
}

/// `GET /api/messages/unread/stream` — server-sent `unread` events carrying
/// `{"count": n}` whenever the count changes.
pub async fn unread_stream(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (rx, handle) = watch_unread(&state, &auth);
    tracing::debug!(user_id = %auth.user.id, "unread stream opened");

    let events = stream::unfold((rx, handle), |(mut rx, handle)| async move {
        rx.changed().await.ok()?;
        let count = rx.borrow_and_update().unwrap_or(0);
        let event = Event::default().event("unread").json_data(UnreadCount { count });
        Some((event, (rx, handle)))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
#[path = "messages_test.rs"]
mod tests;
