//! Expense, cash movement and salary routes.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;

use super::auth::AuthUser;
use super::explicit_window;
use super::records::{RecordQuery, ledger_error_to_status};
use crate::model::{Expense, Movement, Salary};
use crate::services::cashbook::{self, NewExpense, NewMovement, NewSalary, SalaryFilter};
use crate::state::AppState;

/// `GET /api/expenses?shop=&from=&to=` — expenses newest first.
pub async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<Expense>>, StatusCode> {
    let window = explicit_window(query.from.as_deref(), query.to.as_deref())?;
    let list = cashbook::list_expenses(state.store.as_ref(), &auth.user, query.shop.as_deref(), window.as_ref())
        .await
        .map_err(ledger_error_to_status)?;
    Ok(Json(list))
}

/// `POST /api/expenses`
pub async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewExpense>,
) -> Result<(StatusCode, Json<Expense>), StatusCode> {
    let expense = cashbook::create_expense(state.store.as_ref(), &auth.user, body)
        .await
        .map_err(ledger_error_to_status)?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// `GET /api/movements?shop=&from=&to=` — cash movements newest first.
pub async fn list_movements(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<Movement>>, StatusCode> {
    let window = explicit_window(query.from.as_deref(), query.to.as_deref())?;
    let list = cashbook::list_movements(state.store.as_ref(), &auth.user, query.shop.as_deref(), window.as_ref())
        .await
        .map_err(ledger_error_to_status)?;
    Ok(Json(list))
}

/// `POST /api/movements` — an `Entrée` or `Sortie` of cash.
pub async fn create_movement(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewMovement>,
) -> Result<(StatusCode, Json<Movement>), StatusCode> {
    let movement = cashbook::create_movement(state.store.as_ref(), &auth.user, body)
        .await
        .map_err(ledger_error_to_status)?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// `GET /api/salaries?shop=&mois=`
pub async fn list_salaries(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<SalaryFilter>,
) -> Result<Json<Vec<Salary>>, StatusCode> {
    let list = cashbook::list_salaries(state.store.as_ref(), &auth.user, &filter)
        .await
        .map_err(ledger_error_to_status)?;
    Ok(Json(list))
}

/// `POST /api/salaries`
pub async fn record_salary(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewSalary>,
) -> Result<(StatusCode, Json<Salary>), StatusCode> {
    let salary = cashbook::record_salary(state.store.as_ref(), &auth.user, body)
        .await
        .map_err(ledger_error_to_status)?;
    Ok((StatusCode::CREATED, Json(salary)))
}

#[cfg(test)]
#[path = "cashbook_test.rs"]
mod tests;
