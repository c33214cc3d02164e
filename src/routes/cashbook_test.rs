use super::*;
use crate::model::{MovementDirection, Role, User};
use crate::state::test_helpers::*;

fn as_auth(user: User) -> AuthUser {
    AuthUser { user, token: "t".into() }
}

fn seller() -> AuthUser {
    as_auth(shop_user("v1", Role::User, "s1", "Banunu"))
}

#[tokio::test]
async fn expense_created_then_listed_in_window() {
    let state = test_app_state();
    let body = NewExpense { montant: 18.0, date: Some("2024-01-05".into()), ..NewExpense::default() };
    let (status, Json(created)) = create_expense(State(state.clone()), seller(), Json(body)).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.shop_id, "s1");

    let query = RecordQuery { from: Some("2024-01-01".into()), to: Some("2024-01-31".into()), ..RecordQuery::default() };
    let Json(list) = list_expenses(State(state), seller(), Query(query)).await.unwrap();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn negative_movement_is_bad_request() {
    let state = test_app_state();
    let body = NewMovement {
        shop_id: None,
        operation: MovementDirection::Out,
        montant: -3.0,
        description: String::new(),
        devise: None,
        date: None,
    };
    let result = create_movement(State(state), seller(), Json(body)).await;
    assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn movement_window_needs_both_bounds() {
    let state = test_app_state();
    let query = RecordQuery { from: Some("2024-01-01".into()), ..RecordQuery::default() };
    let result = list_movements(State(state), seller(), Query(query)).await;
    assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn salaries_are_forbidden_to_sellers() {
    let state = test_app_state();
    let result = list_salaries(State(state), seller(), Query(SalaryFilter::default())).await;
    assert_eq!(result.err(), Some(StatusCode::FORBIDDEN));
}

#[tokio::test]
async fn bad_salary_month_filter_is_bad_request() {
    let state = test_app_state();
    let filter = SalaryFilter { mois: Some("2024-13".into()), ..SalaryFilter::default() };
    let result = list_salaries(State(state), as_auth(global_admin()), Query(filter)).await;
    assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
}
