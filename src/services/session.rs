//! Session management.
//!
//! ARCHITECTURE
//! ============
//! Identity comes from an external authentication service; this module only
//! tracks the sessions it hands out. A session is a random token stored in the
//! `sessions` collection under its own id, pointing at a `users` document.
//! Every request resolves its token into a `SessionContext`, so services never
//! read a process-wide "current user".
//!
//! Expired sessions resolve to `None` and are removed on the way out.

use std::fmt::Write;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::model::{Session, User};
use crate::store::{DocumentStore, StoreError, collections, encode, get_as};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The authenticated caller of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionContext {
    pub user: User,
    #[serde(skip)]
    pub token: String,
}

impl SessionContext {
    #[must_use]
    pub fn shop_id(&self) -> &str {
        &self.user.shop_id
    }
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Sign-in: create a session for an existing user, returning the token.
///
/// # Errors
///
/// `UnknownUser` if no `users` document has that id.
pub async fn create_session(store: &dyn DocumentStore, user_id: &str, ttl: Duration) -> Result<String, SessionError> {
    if get_as::<User>(store, collections::USERS, user_id).await?.is_none() {
        return Err(SessionError::UnknownUser(user_id.to_owned()));
    }

    let token = generate_token();
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2);
    let session = Session { id: String::new(), user_id: user_id.to_owned(), expires_at: now_unix() + ttl_secs };
    store.set(collections::SESSIONS, &token, encode(&session)?).await?;
    info!(%user_id, "session created");
    Ok(token)
}

/// Resolve a token into the caller's context.
///
/// Returns `None` for unknown or expired tokens and for sessions whose user
/// no longer exists.
///
/// # Errors
///
/// Propagates store failures.
pub async fn resolve_session(store: &dyn DocumentStore, token: &str) -> Result<Option<SessionContext>, SessionError> {
    resolve_session_at(store, token, now_unix()).await
}

pub(crate) async fn resolve_session_at(
    store: &dyn DocumentStore,
    token: &str,
    now: i64,
) -> Result<Option<SessionContext>, SessionError> {
    if token.is_empty() {
        return Ok(None);
    }
    let Some(session) = get_as::<Session>(store, collections::SESSIONS, token).await? else {
        return Ok(None);
    };
    if session.expires_at <= now {
        debug!(user_id = %session.user_id, "session expired");
        store.delete(collections::SESSIONS, token).await?;
        return Ok(None);
    }

    let user = get_as::<User>(store, collections::USERS, &session.user_id).await?;
    Ok(user.map(|user| SessionContext { user, token: token.to_owned() }))
}

/// Sign-out: remove the session. Unknown tokens are ignored.
///
/// # Errors
///
/// Propagates store failures.
pub async fn end_session(store: &dyn DocumentStore, token: &str) -> Result<(), SessionError> {
    store.delete(collections::SESSIONS, token).await?;
    Ok(())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
