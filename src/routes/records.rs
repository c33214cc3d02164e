//! Revenue record, client and card balance routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use super::explicit_window;
use crate::model::{CardMovement, Client, LedgerRecord, RecordKind};
use crate::services::ledger::{self, CardRequest, ClientPatch, LedgerError, NewClient, NewRecord};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecordQuery {
    #[serde(default)]
    pub shop: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientQuery {
    #[serde(default)]
    pub shop: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CardMovementResponse {
    pub movement: CardMovement,
    pub client: Client,
}

pub(crate) fn ledger_error_to_status(err: LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidAmount | LedgerError::MissingShop | LedgerError::InvalidMonth(_) => StatusCode::BAD_REQUEST,
        LedgerError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::ClientNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Forbidden(_) | LedgerError::AdminOnly => StatusCode::FORBIDDEN,
        LedgerError::Store(e) => super::store_error_to_status(&e),
    }
}

fn record_kind(raw: &str) -> Result<RecordKind, StatusCode> {
    RecordKind::from_collection(raw).ok_or(StatusCode::NOT_FOUND)
}

// =============================================================================
// RECORDS
// =============================================================================

/// `GET /api/records/:kind?shop=&from=&to=` — records newest first.
pub async fn list_records(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(kind): Path<String>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<LedgerRecord>>, StatusCode> {
    let kind = record_kind(&kind)?;
    let window = explicit_window(query.from.as_deref(), query.to.as_deref())?;
    let records = ledger::list_records(state.store.as_ref(), &auth.user, kind, query.shop.as_deref(), window.as_ref())
        .await
        .map_err(ledger_error_to_status)?;
    Ok(Json(records))
}

/// `POST /api/records/:kind` — record an exchange, credit sale, deposit or
/// transaction.
pub async fn create_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(kind): Path<String>,
    Json(body): Json<NewRecord>,
) -> Result<(StatusCode, Json<LedgerRecord>), StatusCode> {
    let kind = record_kind(&kind)?;
    let record = ledger::create_record(state.store.as_ref(), &auth.user, kind, body)
        .await
        .map_err(ledger_error_to_status)?;
    Ok((StatusCode::CREATED, Json(record)))
}

// =============================================================================
// CLIENTS
// =============================================================================

/// `GET /api/clients?shop=` — clients ordered by name.
pub async fn list_clients(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ClientQuery>,
) -> Result<Json<Vec<Client>>, StatusCode> {
    let clients = ledger::list_clients(state.store.as_ref(), &auth.user, query.shop.as_deref())
        .await
        .map_err(ledger_error_to_status)?;
    Ok(Json(clients))
}

/// `POST /api/clients` — register a client.
pub async fn create_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewClient>,
) -> Result<(StatusCode, Json<Client>), StatusCode> {
    let client = ledger::create_client(state.store.as_ref(), &auth.user, body)
        .await
        .map_err(ledger_error_to_status)?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// `PATCH /api/clients/:id` — edit client details.
pub async fn update_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ClientPatch>,
) -> Result<Json<Client>, StatusCode> {
    let client = ledger::update_client(state.store.as_ref(), &auth.user, &id, body)
        .await
        .map_err(ledger_error_to_status)?;
    Ok(Json(client))
}

/// `POST /api/clients/:id/card` — card deposit or withdrawal.
pub async fn card_movement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<CardRequest>,
) -> Result<(StatusCode, Json<CardMovementResponse>), StatusCode> {
    let (movement, client) = ledger::card_movement(state.store.as_ref(), &auth.user, &id, body)
        .await
        .map_err(ledger_error_to_status)?;
    Ok((StatusCode::CREATED, Json(CardMovementResponse { movement, client })))
}

#[cfg(test)]
#[path = "records_test.rs"]
mod tests;
