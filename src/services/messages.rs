//! Internal messaging between shops and administrators.
//!
//! DESIGN
//! ======
//! Global administrators write to one user, one shop, or everyone. Anyone
//! else always writes to the administrators. New messages carry the tagged
//! `to` addressee plus the legacy `recipientId` string so older readers keep
//! working; reads accept either form.
//!
//! A user's inbox holds what is addressed to them, their shop or everyone,
//! plus what they sent. Global administrators see every message. The unread
//! count covers only messages addressed to the user and sent by someone else.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use super::period::now_timestamp;
use crate::model::{Message, MessageStatus, Recipient, User};
use crate::store::{DocumentStore, Query, StoreError, collections, encode, get_as, query_as};

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("message not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessage {
    /// Ignored unless the sender is a global administrator.
    #[serde(default)]
    pub to: Option<Recipient>,
    /// Display label of the addressee.
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub subject: String,
    pub content: String,
}

fn default_label(to: &Recipient) -> String {
    match to {
        Recipient::User { id } => id.clone(),
        Recipient::Shop { id } => format!("Shop {id}"),
        Recipient::Broadcast => "Tous les utilisateurs".to_owned(),
        Recipient::Admins => "Administrateur".to_owned(),
    }
}

/// Whether `user` may read `message`.
#[must_use]
pub fn visible_to(message: &Message, user: &User) -> bool {
    user.is_global_admin() || message.sender_id == user.id || addressed_to(message, user)
}

fn addressed_to(message: &Message, user: &User) -> bool {
    message.addressee().is_some_and(|to| to.reaches(user))
}

fn counts_as_unread(message: &Message, user: &User) -> bool {
    message.is_unread() && message.sender_id != user.id && addressed_to(message, user)
}

/// # Errors
///
/// `Missing` for empty content or a global administrator without addressee;
/// store failures.
pub async fn send_message(store: &dyn DocumentStore, sender: &User, input: SendMessage) -> Result<Message, MessageError> {
    if input.content.trim().is_empty() {
        return Err(MessageError::Missing("content"));
    }
    let (to, label) = if sender.is_global_admin() {
        let to = input.to.ok_or(MessageError::Missing("recipient"))?;
        let label = input.recipient.filter(|r| !r.trim().is_empty()).unwrap_or_else(|| default_label(&to));
        (to, label)
    } else {
        (Recipient::Admins, default_label(&Recipient::Admins))
    };

    let mut message = Message {
        id: String::new(),
        sender: sender.display_name(),
        sender_id: sender.id.clone(),
        recipient: label,
        recipient_id: Some(to.legacy_id()),
        to: Some(to),
        subject: input.subject,
        content: input.content,
        status: MessageStatus::Unread,
        date: now_timestamp(),
        shop_id: sender.shop_id.clone(),
        shop_name: sender.shop_name.clone(),
    };
    message.id = store.create(collections::MESSAGES, encode(&message)?).await?;
    info!(message_id = %message.id, sender_id = %sender.id, recipient = %message.recipient, "message sent");
    Ok(message)
}

/// Messages visible to `user`, newest first.
///
/// # Errors
///
/// Propagates store failures.
pub async fn inbox(store: &dyn DocumentStore, user: &User) -> Result<Vec<Message>, MessageError> {
    let query = Query::new().order_desc("date");
    let messages: Vec<Message> = query_as(store, collections::MESSAGES, &query).await?;
    Ok(messages.into_iter().filter(|m| visible_to(m, user)).collect())
}

/// # Errors
///
/// `NotFound` for unknown or invisible messages; store failures.
pub async fn mark_read(store: &dyn DocumentStore, user: &User, id: &str) -> Result<(), MessageError> {
    let message = get_as::<Message>(store, collections::MESSAGES, id)
        .await?
        .filter(|m| visible_to(m, user))
        .ok_or_else(|| MessageError::NotFound(id.to_owned()))?;
    if message.is_unread() {
        let mut patch = Map::new();
        patch.insert("status".into(), serde_json::to_value(MessageStatus::Read).map_err(StoreError::from)?);
        store.update(collections::MESSAGES, id, patch).await?;
    }
    Ok(())
}

/// Unread messages addressed to `user` by someone else.
///
/// # Errors
///
/// Propagates store failures.
pub async fn unread_count(store: &dyn DocumentStore, user: &User) -> Result<usize, MessageError> {
    let query = Query::new().equals("status", Value::String("non-lu".into()));
    let messages: Vec<Message> = query_as(store, collections::MESSAGES, &query).await?;
    Ok(messages.iter().filter(|m| counts_as_unread(m, user)).count())
}

#[cfg(test)]
#[path = "messages_test.rs"]
mod tests;
