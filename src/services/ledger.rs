//! Ledger service — revenue records, clients and card balances.
//!
//! DESIGN
//! ======
//! Every write is stamped with the shop it belongs to. Shop users always write
//! into their own shop; a global administrator names the target shop
//! explicitly. Reads are scoped the same way: a global administrator sees
//! every shop (or the one asked for), anyone else only their own.
//!
//! Card deposits and withdrawals (`depot_carte`) move a client's `solde`. The
//! movement document is written first and the balance second; there is no
//! transaction, so a failed balance update leaves the movement recorded and
//! is reported to the caller.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use super::period::{DateWindow, now_timestamp};
use crate::model::{CardMovement, CardMovementKind, Client, LedgerRecord, RecordKind, ShopScope, User, de_amount_opt};
use crate::store::{DocumentStore, Query, StoreError, collections, encode, get_as, query_as};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("amount must be a positive number")]
    InvalidAmount,
    #[error("insufficient balance: {balance} available, {requested} requested")]
    InsufficientBalance { balance: f64, requested: f64 },
    #[error("client not found: {0}")]
    ClientNotFound(String),
    #[error("a target shop is required")]
    MissingShop,
    #[error("shop not visible to caller: {0}")]
    Forbidden(String),
    #[error("administrators only")]
    AdminOnly,
    #[error("month must be YYYY-MM: {0}")]
    InvalidMonth(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// =============================================================================
// INPUT TYPES
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(default)]
    pub shop_id: Option<String>,
    #[serde(default)]
    pub shop_name: Option<String>,
    #[serde(default, deserialize_with = "de_amount_opt")]
    pub montant: Option<f64>,
    /// Defaults to now.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    #[serde(default)]
    pub shop_id: Option<String>,
    #[serde(default)]
    pub shop_name: Option<String>,
    pub nom: String,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default, deserialize_with = "de_amount_opt")]
    pub solde: Option<f64>,
}

/// Profile fields of a client that may be edited.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientPatch {
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub telephone: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CardRequest {
    #[serde(rename = "type")]
    pub kind: CardMovementKind,
    pub montant: f64,
}

// =============================================================================
// SCOPING
// =============================================================================

/// Resolve the shop a write lands in, as `(shop_id, shop_name)`.
pub(crate) fn target_shop(user: &User, shop_id: Option<&str>, shop_name: Option<&str>) -> Result<(String, String), LedgerError> {
    match user.scope() {
        ShopScope::Shop(own) => match shop_id {
            Some(requested) if requested != own => Err(LedgerError::Forbidden(requested.to_owned())),
            _ => Ok((own, user.shop_name.clone())),
        },
        ShopScope::All => {
            let shop_id = shop_id.filter(|s| !s.is_empty()).ok_or(LedgerError::MissingShop)?;
            Ok((shop_id.to_owned(), shop_name.unwrap_or(shop_id).to_owned()))
        }
    }
}

/// Query restricted to what `user` may read, optionally narrowed to one shop.
pub(crate) fn scoped_read(user: &User, shop_id: Option<&str>) -> Result<Query, LedgerError> {
    match (user.scope(), shop_id) {
        (ShopScope::All, None) => Ok(Query::new()),
        (ShopScope::All, Some(shop)) => Ok(Query::new().equals("shopId", shop)),
        (ShopScope::Shop(own), requested) => match requested {
            Some(shop) if shop != own => Err(LedgerError::Forbidden(shop.to_owned())),
            _ => Ok(Query::new().equals("shopId", own)),
        },
    }
}

/// `montant` if it is a finite amount above zero.
pub(crate) fn positive_amount(montant: f64) -> Result<f64, LedgerError> {
    if montant.is_finite() && montant > 0.0 { Ok(montant) } else { Err(LedgerError::InvalidAmount) }
}

// =============================================================================
// RECORDS
// =============================================================================

/// Create a revenue record stamped with shop, author and date.
///
/// # Errors
///
/// `Forbidden`/`MissingShop` for an unusable target shop; store failures.
pub async fn create_record(
    store: &dyn DocumentStore,
    user: &User,
    kind: RecordKind,
    input: NewRecord,
) -> Result<LedgerRecord, LedgerError> {
    let (shop_id, shop_name) = target_shop(user, input.shop_id.as_deref(), input.shop_name.as_deref())?;
    let mut extra = input.extra;
    extra.remove("id");
    extra.remove("userId");
    let mut record = LedgerRecord {
        id: String::new(),
        shop_id,
        shop_name: Some(shop_name),
        user_id: Some(user.id.clone()),
        date: input.date.filter(|d| !d.is_empty()).unwrap_or_else(now_timestamp),
        montant: input.montant,
        extra,
    };
    record.id = store.create(kind.collection(), encode(&record)?).await?;
    info!(collection = kind.collection(), shop_id = %record.shop_id, montant = record.amount(), "record created");
    Ok(record)
}

/// Records of one kind visible to `user`, newest first, optionally narrowed
/// to a shop and a window.
///
/// # Errors
///
/// `Forbidden` when asking for another shop; store failures.
pub async fn list_records(
    store: &dyn DocumentStore,
    user: &User,
    kind: RecordKind,
    shop_id: Option<&str>,
    window: Option<&DateWindow>,
) -> Result<Vec<LedgerRecord>, LedgerError> {
    let mut query = scoped_read(user, shop_id)?.order_desc("date");
    if let Some(window) = window {
        query = query.at_least("date", window.start_key());
    }
    let records: Vec<LedgerRecord> = query_as(store, kind.collection(), &query).await?;
    Ok(match window {
        Some(window) => records.into_iter().filter(|r| window.contains(&r.date)).collect(),
        None => records,
    })
}

// =============================================================================
// CLIENTS
// =============================================================================

/// # Errors
///
/// `Forbidden`/`MissingShop` for an unusable target shop; store failures.
pub async fn create_client(store: &dyn DocumentStore, user: &User, input: NewClient) -> Result<Client, LedgerError> {
    let (shop_id, shop_name) = target_shop(user, input.shop_id.as_deref(), input.shop_name.as_deref())?;
    let mut client = Client {
        id: String::new(),
        nom: input.nom,
        prenom: input.prenom,
        telephone: input.telephone,
        shop_id,
        shop_name: Some(shop_name),
        solde: input.solde.unwrap_or(0.0),
        extra: Map::new(),
    };
    client.id = store.create(collections::CLIENTS, encode(&client)?).await?;
    info!(client_id = %client.id, shop_id = %client.shop_id, "client created");
    Ok(client)
}

/// Clients visible to `user`, ordered by name.
///
/// # Errors
///
/// `Forbidden` when asking for another shop; store failures.
pub async fn list_clients(
    store: &dyn DocumentStore,
    user: &User,
    shop_id: Option<&str>,
) -> Result<Vec<Client>, LedgerError> {
    let query = scoped_read(user, shop_id)?.order_asc("nom");
    Ok(query_as(store, collections::CLIENTS, &query).await?)
}

async fn visible_client(store: &dyn DocumentStore, user: &User, client_id: &str) -> Result<Client, LedgerError> {
    let client = get_as::<Client>(store, collections::CLIENTS, client_id)
        .await?
        .ok_or_else(|| LedgerError::ClientNotFound(client_id.to_owned()))?;
    if !user.scope().allows(&client.shop_id) {
        return Err(LedgerError::ClientNotFound(client_id.to_owned()));
    }
    Ok(client)
}

/// # Errors
///
/// `ClientNotFound` for unknown or invisible clients; store failures.
pub async fn update_client(
    store: &dyn DocumentStore,
    user: &User,
    client_id: &str,
    patch: ClientPatch,
) -> Result<Client, LedgerError> {
    let mut client = visible_client(store, user, client_id).await?;
    let mut body = Map::new();
    if let Some(nom) = patch.nom {
        body.insert("nom".into(), Value::String(nom.clone()));
        client.nom = nom;
    }
    if let Some(prenom) = patch.prenom {
        body.insert("prenom".into(), Value::String(prenom.clone()));
        client.prenom = Some(prenom);
    }
    if let Some(telephone) = patch.telephone {
        body.insert("telephone".into(), Value::String(telephone.clone()));
        client.telephone = Some(telephone);
    }
    if !body.is_empty() {
        store.update(collections::CLIENTS, client_id, body).await?;
    }
    Ok(client)
}

// =============================================================================
// CARD MOVEMENTS
// =============================================================================

/// Balance after applying a movement, or why it cannot be applied.
///
/// # Errors
///
/// `InvalidAmount` for non-positive or non-finite amounts;
/// `InsufficientBalance` for a withdrawal above the balance.
pub fn apply_card_movement(balance: f64, kind: CardMovementKind, montant: f64) -> Result<f64, LedgerError> {
    let montant = positive_amount(montant)?;
    match kind {
        CardMovementKind::Depot => Ok(balance + montant),
        CardMovementKind::Retrait if montant > balance => {
            Err(LedgerError::InsufficientBalance { balance, requested: montant })
        }
        CardMovementKind::Retrait => Ok(balance - montant),
    }
}

/// Record a card deposit or withdrawal and update the client's balance.
/// Returns the movement and the client with its new balance.
///
/// # Errors
///
/// See [`apply_card_movement`]; `ClientNotFound`; store failures.
pub async fn card_movement(
    store: &dyn DocumentStore,
    user: &User,
    client_id: &str,
    request: CardRequest,
) -> Result<(CardMovement, Client), LedgerError> {
    let mut client = visible_client(store, user, client_id).await?;
    let balance = apply_card_movement(client.solde, request.kind, request.montant)?;

    let mut movement = CardMovement {
        id: String::new(),
        client_id: client.id.clone(),
        shop_id: client.shop_id.clone(),
        user_id: Some(user.id.clone()),
        kind: request.kind,
        montant: request.montant,
        date: now_timestamp(),
    };
    movement.id = store.create(collections::DEPOT_CARTE, encode(&movement)?).await?;

    let mut patch = Map::new();
    patch.insert("solde".into(), Value::from(balance));
    store.update(collections::CLIENTS, client_id, patch).await?;
    client.solde = balance;

    info!(client_id, kind = ?request.kind, montant = request.montant, balance, "card balance updated");
    Ok((movement, client))
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
