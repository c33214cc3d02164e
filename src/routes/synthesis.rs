//! Profit synthesis and per-shop report routes.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use super::{Reported, anchor_date, explicit_window, reported};
use crate::model::{ShopScope, User};
use crate::services::demo;
use crate::services::period::{CalendarPeriod, DateWindow};
use crate::services::synthesis::{self, BalanceSheet, DailySummary, DataReport, Synthesis};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SynthesisQuery {
    #[serde(default)]
    pub period: Option<CalendarPeriod>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShopReportQuery {
    #[serde(default)]
    pub shop: Option<String>,
    #[serde(default)]
    pub period: Option<CalendarPeriod>,
    #[serde(default)]
    pub date: Option<String>,
}

/// The shop a per-shop report is about. Shop users default to their own;
/// a global administrator must name one.
fn report_shop(user: &User, requested: Option<String>) -> Result<String, StatusCode> {
    match (user.scope(), requested.filter(|s| !s.is_empty())) {
        (_, Some(shop)) => Ok(shop),
        (ShopScope::Shop(own), None) => Ok(own),
        (ShopScope::All, None) => Err(StatusCode::BAD_REQUEST),
    }
}

/// `GET /api/synthesis` — multi-shop profit over a calendar period or an
/// explicit `from`/`to` window.
pub async fn synthesis(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SynthesisQuery>,
) -> Result<Json<Reported<Synthesis>>, StatusCode> {
    let window = match explicit_window(query.from.as_deref(), query.to.as_deref())? {
        Some(window) => window,
        None => query.period.unwrap_or_default().window(anchor_date(query.date.as_deref())?),
    };
    let result = synthesis::build_synthesis(state.store.as_ref(), &auth.user, window.clone()).await;
    reported(&state, result, || demo::empty_synthesis(window))
}

/// `GET /api/synthesis/daily` — one shop's expenses, deposits, movements and
/// opening/closing totals for a day.
pub async fn daily(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ShopReportQuery>,
) -> Result<Json<Reported<DailySummary>>, StatusCode> {
    let shop_id = report_shop(&auth.user, query.shop)?;
    let window = DateWindow::single_day(anchor_date(query.date.as_deref())?);
    let result = synthesis::daily_summary(state.store.as_ref(), &auth.user, &shop_id, window.clone()).await;
    reported(&state, result, || demo::empty_daily_summary(&shop_id, window))
}

/// `GET /api/synthesis/balance` — one shop's balance sheet for a calendar
/// period.
pub async fn balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ShopReportQuery>,
) -> Result<Json<Reported<BalanceSheet>>, StatusCode> {
    let shop_id = report_shop(&auth.user, query.shop)?;
    let period = query.period.unwrap_or_default();
    let anchor = anchor_date(query.date.as_deref())?;
    let result = synthesis::shop_balance(state.store.as_ref(), &auth.user, &shop_id, period, anchor).await;
    reported(&state, result, || demo::empty_balance(&shop_id, period, period.window(anchor)))
}

/// `GET /api/synthesis/data` — one shop's sales, deposits and movements for a
/// calendar period.
pub async fn data(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ShopReportQuery>,
) -> Result<Json<Reported<DataReport>>, StatusCode> {
    let shop_id = report_shop(&auth.user, query.shop)?;
    let period = query.period.unwrap_or_default();
    let anchor = anchor_date(query.date.as_deref())?;
    let result = synthesis::data_report(state.store.as_ref(), &auth.user, &shop_id, period, anchor).await;
    reported(&state, result, || demo::empty_data_report(&shop_id, period.window(anchor)))
}

#[cfg(test)]
#[path = "synthesis_test.rs"]
mod tests;
