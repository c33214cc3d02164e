//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api` plus a liveness check. Every
//! `/api` handler except the dev session bootstrap requires an `AuthUser`.
//!
//! ERROR HANDLING
//! ==============
//! Handlers return `Result<_, StatusCode>`; each route module maps its
//! service error through a `*_error_to_status` helper. Store failures are
//! logged here once, at the point they become a status code. Reporting
//! endpoints answer a store permission failure with demonstration data
//! wrapped in the `Reported` envelope when `DEMO_FALLBACK` is on.

pub mod auth;
pub mod cashbook;
pub mod dashboard;
pub mod directory;
pub mod loans;
pub mod messages;
pub mod records;
pub mod reports;
pub mod synthesis;

use axum::Router;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, patch, post};
use serde::Serialize;
use time::Date;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::services::ReportError;
use crate::services::demo::DEMO_BANNER;
use crate::services::period::{DateWindow, parse_date, today};
use crate::state::AppState;
use crate::store::StoreError;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/session/me", get(auth::me))
        .route("/api/session", axum::routing::delete(auth::logout))
        .route("/api/dev/session", post(auth::dev_session))
        .route("/api/dashboard", get(dashboard::dashboard))
        .route("/api/synthesis", get(synthesis::synthesis))
        .route("/api/synthesis/daily", get(synthesis::daily))
        .route("/api/synthesis/balance", get(synthesis::balance))
        .route("/api/synthesis/data", get(synthesis::data))
        .route("/api/shops", get(directory::list_shops).post(directory::create_shop))
        .route(
            "/api/shops/{id}",
            get(directory::get_shop)
                .patch(directory::update_shop)
                .delete(directory::delete_shop),
        )
        .route("/api/users", get(directory::list_users))
        .route(
            "/api/users/{id}",
            get(directory::get_user)
                .patch(directory::update_user)
                .delete(directory::delete_user),
        )
        .route("/api/records/{kind}", get(records::list_records).post(records::create_record))
        .route("/api/clients", get(records::list_clients).post(records::create_client))
        .route("/api/clients/{id}", patch(records::update_client))
        .route("/api/clients/{id}/card", post(records::card_movement))
        .route("/api/expenses", get(cashbook::list_expenses).post(cashbook::create_expense))
        .route("/api/movements", get(cashbook::list_movements).post(cashbook::create_movement))
        .route("/api/salaries", get(cashbook::list_salaries).post(cashbook::record_salary))
        .route("/api/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/api/loans/balance", get(loans::balances))
        .route("/api/loans/{id}", patch(loans::update_loan).delete(loans::delete_loan))
        .route("/api/messages", get(messages::inbox).post(messages::send))
        .route("/api/messages/unread", get(messages::unread))
        .route("/api/messages/unread/stream", get(messages::unread_stream))
        .route("/api/messages/{id}/read", post(messages::mark_read))
        .route(
            "/api/reports/operations",
            get(reports::list_operations).post(reports::create_operation),
        )
        .route("/api/reports/cash", get(reports::list_cash_reports))
        .route("/api/reports/recent", get(reports::recent))
        .route("/healthz", get(healthz))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Map a store failure to a status, logging anything that is not a
/// permission refusal.
pub(crate) fn store_error_to_status(err: &StoreError) -> StatusCode {
    if err.is_permission_denied() {
        warn!(error = %err, "store refused request");
        return StatusCode::FORBIDDEN;
    }
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => {
            error!(error = %err, "store request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Parse an optional `YYYY-MM-DD` query value, defaulting to today.
pub(crate) fn anchor_date(raw: Option<&str>) -> Result<Date, StatusCode> {
    match raw.filter(|r| !r.trim().is_empty()) {
        None => Ok(today()),
        Some(raw) => parse_date(raw.trim()).ok_or(StatusCode::BAD_REQUEST),
    }
}

/// An explicit `[from, to]` window. Both bounds or neither.
pub(crate) fn explicit_window(from: Option<&str>, to: Option<&str>) -> Result<Option<DateWindow>, StatusCode> {
    let parse = |raw: &str| parse_date(raw.trim()).ok_or(StatusCode::BAD_REQUEST);
    match (from.filter(|f| !f.is_empty()), to.filter(|t| !t.is_empty())) {
        (None, None) => Ok(None),
        (Some(from), Some(to)) => {
            let (start, end) = (parse(from)?, parse(to)?);
            if start > end {
                return Err(StatusCode::BAD_REQUEST);
            }
            Ok(Some(DateWindow::new(start, end)))
        }
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

// =============================================================================
// REPORTING ENVELOPE
// =============================================================================

/// Reporting payload, flagged when it carries demonstration data.
#[derive(Debug, Serialize)]
pub struct Reported<T> {
    pub demo_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<&'static str>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Reported<T> {
    fn live(data: T) -> Self {
        Self { demo_mode: false, banner: None, data }
    }

    fn demo(data: T) -> Self {
        Self { demo_mode: true, banner: Some(DEMO_BANNER), data }
    }
}

pub(crate) fn report_error_to_status(err: ReportError) -> StatusCode {
    match err {
        ReportError::DemoModeRequested | ReportError::Forbidden(_) => StatusCode::FORBIDDEN,
        ReportError::Store(e) => store_error_to_status(&e),
    }
}

/// Resolve a reporting result, substituting `demo()` for a permission
/// failure when the fallback is enabled.
pub(crate) fn reported<T>(
    state: &AppState,
    result: Result<T, ReportError>,
    demo: impl FnOnce() -> T,
) -> Result<Json<Reported<T>>, StatusCode> {
    match result {
        Ok(data) => Ok(Json(Reported::live(data))),
        Err(ReportError::DemoModeRequested) if state.config.demo_fallback => {
            warn!("store refused report read; serving demonstration data");
            Ok(Json(Reported::demo(demo())))
        }
        Err(e) => Err(report_error_to_status(e)),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
