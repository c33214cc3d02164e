//! Inter-shop loan routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use time::Date;

use super::auth::AuthUser;
use crate::model::{Currency, Loan, LoanKind};
use crate::services::loans::{self, LoanBalance, LoanError, LoanFilter, LoanPatch, NewLoan};
use crate::services::period::parse_date;
use crate::state::AppState;

/// Query-string form of `LoanFilter`; dates arrive as `YYYY-MM-DD`.
#[derive(Debug, Default, Deserialize)]
pub struct LoanQuery {
    #[serde(default)]
    pub devise: Option<Currency>,
    #[serde(default, rename = "type")]
    pub kind: Option<LoanKind>,
    #[serde(default)]
    pub shop: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

fn optional_date(raw: Option<&str>) -> Result<Option<Date>, StatusCode> {
    raw.filter(|r| !r.trim().is_empty())
        .map(|r| parse_date(r.trim()).ok_or(StatusCode::BAD_REQUEST))
        .transpose()
}

impl TryFrom<LoanQuery> for LoanFilter {
    type Error = StatusCode;

    fn try_from(query: LoanQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            from: optional_date(query.from.as_deref())?,
            to: optional_date(query.to.as_deref())?,
            devise: query.devise,
            kind: query.kind,
            shop: query.shop.filter(|s| !s.is_empty()),
            source: query.source.filter(|s| !s.is_empty()),
        })
    }
}

pub(crate) fn loan_error_to_status(err: LoanError) -> StatusCode {
    match err {
        LoanError::InvalidAmount => StatusCode::BAD_REQUEST,
        LoanError::NotFound(_) => StatusCode::NOT_FOUND,
        LoanError::Forbidden(_) => StatusCode::FORBIDDEN,
        LoanError::Store(e) => super::store_error_to_status(&e),
    }
}

/// `GET /api/loans` — filtered loan operations, newest first.
pub async fn list_loans(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<LoanQuery>,
) -> Result<Json<Vec<Loan>>, StatusCode> {
    let filter = LoanFilter::try_from(query)?;
    let list = loans::list_loans(state.store.as_ref(), &auth.user, &filter)
        .await
        .map_err(loan_error_to_status)?;
    Ok(Json(list))
}

/// `POST /api/loans` — record a borrowing or repayment.
pub async fn create_loan(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewLoan>,
) -> Result<(StatusCode, Json<Loan>), StatusCode> {
    let loan = loans::create_loan(state.store.as_ref(), &auth.user, body)
        .await
        .map_err(loan_error_to_status)?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// `PATCH /api/loans/:id`
pub async fn update_loan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<LoanPatch>,
) -> Result<Json<Loan>, StatusCode> {
    let loan = loans::update_loan(state.store.as_ref(), &auth.user, &id, body)
        .await
        .map_err(loan_error_to_status)?;
    Ok(Json(loan))
}

/// `DELETE /api/loans/:id`
pub async fn delete_loan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    loans::delete_loan(state.store.as_ref(), &auth.user, &id)
        .await
        .map_err(loan_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/loans/balance` — outstanding amount per shop and currency.
pub async fn balances(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<LoanBalance>>, StatusCode> {
    let rows = loans::loan_balances(state.store.as_ref(), &auth.user)
        .await
        .map_err(loan_error_to_status)?;
    Ok(Json(rows))
}

#[cfg(test)]
#[path = "loans_test.rs"]
mod tests;
