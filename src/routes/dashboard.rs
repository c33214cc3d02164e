//! Admin dashboard route.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use super::{Reported, reported};
use crate::services::dashboard::{self, Dashboard};
use crate::services::demo;
use crate::services::period::{TrailingPeriod, today};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub period: Option<TrailingPeriod>,
}

/// `GET /api/dashboard?period=` — revenue, shop performance and user stats
/// over a trailing window.
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Reported<Dashboard>>, StatusCode> {
    let period = query.period.unwrap_or_default();
    let today = today();
    let result = dashboard::build_dashboard(state.store.as_ref(), &auth.user, period, today).await;
    reported(&state, result, || demo::demo_dashboard(&auth.user, period, period.window(today)))
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
