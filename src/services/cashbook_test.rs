use super::*;
use crate::model::Role;
use crate::services::synthesis::daily_summary;
use crate::state::test_helpers::*;
use crate::store::{MemoryDocumentStore, get_as};
use serde_json::json;
use time::macros::date;

fn seller() -> User {
    shop_user("v1", Role::User, "s1", "Banunu")
}

fn shop_admin() -> User {
    shop_user("a1", Role::Admin, "s1", "Banunu")
}

fn expense(montant: f64, date: &str) -> NewExpense {
    NewExpense { montant, date: Some(date.into()), description: "Loyer".into(), ..NewExpense::default() }
}

fn movement(operation: MovementDirection, montant: f64, date: &str) -> NewMovement {
    NewMovement {
        shop_id: None,
        operation,
        montant,
        description: "Appoint caisse".into(),
        devise: Some("CDF".into()),
        date: Some(date.into()),
    }
}

fn salary(user_id: &str, montant: f64, mois: Option<&str>) -> NewSalary {
    NewSalary {
        user_id: user_id.into(),
        shop_id: None,
        montant,
        devise: Currency::Usd,
        mois: mois.map(str::to_owned),
        description: String::new(),
    }
}

// =============================================================================
// expenses
// =============================================================================

#[tokio::test]
async fn expense_is_stamped_and_categorised() {
    let store = MemoryDocumentStore::new();
    let created = create_expense(&store, &seller(), expense(30.0, "2024-01-05")).await.unwrap();
    assert_eq!(created.shop_id, "s1");
    assert_eq!(created.created_by.as_deref(), Some("v1"));
    assert_eq!(created.categorie, DEFAULT_EXPENSE_CATEGORY);

    let stored: Expense = get_as(&store, collections::DEPENSES, &created.id).await.unwrap().unwrap();
    assert_eq!(stored.date, "2024-01-05");
    assert!((stored.montant - 30.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn expense_date_defaults_to_today() {
    let store = MemoryDocumentStore::new();
    let input = NewExpense { montant: 5.0, ..NewExpense::default() };
    let created = create_expense(&store, &seller(), input).await.unwrap();
    assert_eq!(created.date, format_date(today()));
}

#[tokio::test]
async fn expense_requires_positive_amount() {
    let store = MemoryDocumentStore::new();
    let err = create_expense(&store, &seller(), expense(0.0, "2024-01-05")).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount));
    assert_eq!(store.count(collections::DEPENSES).await, 0);
}

#[tokio::test]
async fn expenses_feed_the_daily_summary() {
    let store = MemoryDocumentStore::new();
    create_expense(&store, &seller(), expense(30.0, "2024-01-05")).await.unwrap();
    create_expense(&store, &seller(), expense(12.5, "2024-01-05")).await.unwrap();
    create_expense(&store, &seller(), expense(99.0, "2024-01-06")).await.unwrap();

    let window = DateWindow::single_day(date!(2024 - 01 - 05));
    let listed = list_expenses(&store, &seller(), None, Some(&window)).await.unwrap();
    assert_eq!(listed.len(), 2);

    let summary = daily_summary(&store, &seller(), "s1", window).await.unwrap();
    assert!((summary.expenses - 42.5).abs() < f64::EPSILON);
}

// =============================================================================
// movements
// =============================================================================

#[tokio::test]
async fn movements_carry_direction_and_feed_totals() {
    let store = MemoryDocumentStore::new();
    let created = create_movement(&store, &seller(), movement(MovementDirection::In, 200.0, "2024-01-05"))
        .await
        .unwrap();
    assert_eq!(created.operation, Some(MovementDirection::In));
    create_movement(&store, &seller(), movement(MovementDirection::Out, 50.0, "2024-01-05"))
        .await
        .unwrap();

    let stored = store.get(collections::MOUVEMENTS, &created.id).await.unwrap().unwrap();
    assert_eq!(stored.get("operation"), Some(&json!("Entrée")));

    let window = DateWindow::single_day(date!(2024 - 01 - 05));
    let summary = daily_summary(&store, &seller(), "s1", window).await.unwrap();
    assert!((summary.movements_in - 200.0).abs() < f64::EPSILON);
    assert!((summary.movements_out - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn movement_listing_includes_untyped_entries() {
    let store = MemoryDocumentStore::new();
    seed_doc(&store, collections::MOUVEMENTS, json!({"shopId": "s1", "type": "init", "montant": 0, "date": "2024-01-01"})).await;
    create_movement(&store, &seller(), movement(MovementDirection::Out, 10.0, "2024-01-02"))
        .await
        .unwrap();
    seed_doc(&store, collections::MOUVEMENTS, json!({"shopId": "s2", "operation": "Entrée", "montant": 5, "date": "2024-01-02"})).await;

    let listed = list_movements(&store, &seller(), None, None).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].date, "2024-01-02");
    assert_eq!(listed[1].kind.as_deref(), Some("init"));
}

#[tokio::test]
async fn shop_user_cannot_move_cash_for_another_shop() {
    let store = MemoryDocumentStore::new();
    let input = NewMovement { shop_id: Some("s2".into()), ..movement(MovementDirection::In, 1.0, "2024-01-05") };
    let err = create_movement(&store, &seller(), input).await.unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(id) if id == "s2"));
}

// =============================================================================
// salaries
// =============================================================================

#[tokio::test]
async fn salaries_are_for_administrators() {
    let store = MemoryDocumentStore::new();
    let err = record_salary(&store, &seller(), salary("v1", 300.0, Some("2024-01"))).await.unwrap_err();
    assert!(matches!(err, LedgerError::AdminOnly));
    let err = list_salaries(&store, &seller(), &SalaryFilter::default()).await.unwrap_err();
    assert!(matches!(err, LedgerError::AdminOnly));
}

#[tokio::test]
async fn shop_admin_pays_own_shop_staff() {
    let store = MemoryDocumentStore::new();
    let paid = record_salary(&store, &shop_admin(), salary("v1", 300.0, Some("2024-01"))).await.unwrap();
    assert_eq!(paid.shop_id, "s1");
    assert_eq!(paid.paid_by.as_deref(), Some("a1"));
    assert!(!paid.date_paiement.is_empty());

    let mut foreign = salary("v9", 300.0, Some("2024-01"));
    foreign.shop_id = Some("s2".into());
    let err = record_salary(&store, &shop_admin(), foreign).await.unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
}

#[tokio::test]
async fn salary_month_is_validated_and_defaulted() {
    let store = MemoryDocumentStore::new();
    let err = record_salary(&store, &shop_admin(), salary("v1", 1.0, Some("janvier"))).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidMonth(m) if m == "janvier"));

    let paid = record_salary(&store, &shop_admin(), salary("v1", 1.0, None)).await.unwrap();
    assert_eq!(paid.mois, format_date(today())[..7]);
}

#[tokio::test]
async fn salaries_filter_by_shop_and_month() {
    let store = MemoryDocumentStore::new();
    let admin = global_admin();
    for (shop, mois) in [("s1", "2024-01"), ("s1", "2024-02"), ("s2", "2024-01")] {
        let mut input = salary("v1", 100.0, Some(mois));
        input.shop_id = Some(shop.into());
        record_salary(&store, &admin, input).await.unwrap();
    }

    let january = SalaryFilter { mois: Some("2024-01".into()), ..SalaryFilter::default() };
    assert_eq!(list_salaries(&store, &admin, &january).await.unwrap().len(), 2);

    let s1 = SalaryFilter { shop: Some("s1".into()), ..SalaryFilter::default() };
    assert_eq!(list_salaries(&store, &admin, &s1).await.unwrap().len(), 2);

    assert_eq!(list_salaries(&store, &shop_admin(), &SalaryFilter::default()).await.unwrap().len(), 2);
}
