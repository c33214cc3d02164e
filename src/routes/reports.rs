//! Cash report routes.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use super::explicit_window;
use crate::model::{CashRegisterReport, CashReport};
use crate::services::reports::{self, CashReportError, CashReportFilter, NewCashReport};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OperationsQuery {
    #[serde(default)]
    pub shop: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

pub(crate) fn cash_report_error_to_status(err: CashReportError) -> StatusCode {
    match err {
        CashReportError::Duplicate { .. } => StatusCode::CONFLICT,
        CashReportError::MissingShop => StatusCode::BAD_REQUEST,
        CashReportError::Forbidden(_) => StatusCode::FORBIDDEN,
        CashReportError::Store(e) => super::store_error_to_status(&e),
    }
}

/// `POST /api/reports/operations` — submit a morning or evening report.
pub async fn create_operation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewCashReport>,
) -> Result<(StatusCode, Json<CashReport>), StatusCode> {
    let report = reports::create_operation(state.store.as_ref(), &auth.user, body)
        .await
        .map_err(cash_report_error_to_status)?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// `GET /api/reports/operations?shop=&from=&to=`
pub async fn list_operations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<OperationsQuery>,
) -> Result<Json<Vec<CashReport>>, StatusCode> {
    let window = explicit_window(query.from.as_deref(), query.to.as_deref())?;
    let list = reports::list_operations(state.store.as_ref(), &auth.user, query.shop.as_deref(), window.as_ref())
        .await
        .map_err(cash_report_error_to_status)?;
    Ok(Json(list))
}

/// `GET /api/reports/cash?shop=&user=&date=` — submitted register reports.
pub async fn list_cash_reports(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<CashReportFilter>,
) -> Result<Json<Vec<CashRegisterReport>>, StatusCode> {
    let list = reports::list_cash_reports(state.store.as_ref(), &auth.user, &filter)
        .await
        .map_err(cash_report_error_to_status)?;
    Ok(Json(list))
}

/// `GET /api/reports/recent` — latest register reports from the polled
/// snapshot.
pub async fn recent(State(state): State<AppState>, auth: AuthUser) -> Json<Vec<CashRegisterReport>> {
    Json(reports::recent_for(&state.recent_reports, &auth.user).await)
}

#[cfg(test)]
#[path = "reports_test.rs"]
mod tests;
