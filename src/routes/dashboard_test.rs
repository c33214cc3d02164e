use super::*;
use crate::config::AppConfig;
use crate::model::{RecordKind, Role};
use crate::services::period::format_date;
use crate::state::test_helpers::*;
use crate::store::MemoryDocumentStore;
use std::sync::Arc;

fn admin() -> AuthUser {
    AuthUser { user: global_admin(), token: "t".into() }
}

#[tokio::test]
async fn live_dashboard_sums_todays_records() {
    let store = Arc::new(MemoryDocumentStore::new());
    let day = format_date(today());
    seed_record(store.as_ref(), RecordKind::Exchange, "s1", "Banunu", Some(100.0), &day).await;
    seed_record(store.as_ref(), RecordKind::Deposit, "s2", "Gombe", Some(50.0), &day).await;
    seed_record(store.as_ref(), RecordKind::Deposit, "s2", "Gombe", Some(10.0), "2001-01-01").await;
    let state = test_app_state_with_store(store);

    let query = DashboardQuery { period: Some(TrailingPeriod::Today) };
    let Json(body) = dashboard(State(state), admin(), Query(query)).await.unwrap();
    assert!(!body.demo_mode);
    assert!((body.data.stats.total_revenue - 150.0).abs() < f64::EPSILON);
    assert_eq!(body.data.shops.len(), 2);
    assert_eq!(body.data.shops[0].shop_name, "Banunu");
}

#[tokio::test]
async fn period_defaults_to_month() {
    let state = test_app_state();
    let Json(body) = dashboard(State(state), admin(), Query(DashboardQuery::default())).await.unwrap();
    assert_eq!(body.data.period, TrailingPeriod::Month);
    assert_eq!(body.data.window, TrailingPeriod::Month.window(today()));
}

#[tokio::test]
async fn permission_failure_serves_demo_dashboard() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.deny_all().await;
    let state = test_app_state_with_store(store);

    let seller = AuthUser { user: shop_user("v1", Role::User, "s1", "Banunu"), token: "t".into() };
    let Json(body) = dashboard(State(state), seller, Query(DashboardQuery::default())).await.unwrap();
    assert!(body.demo_mode);
    assert!(body.banner.is_some());
    assert_eq!(body.data.shops.len(), 1);
    assert_eq!(body.data.shops[0].shop_id, "s1");
    assert_eq!(body.data.user_stats.total, 12);
}

#[tokio::test]
async fn permission_failure_without_fallback_is_forbidden() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.deny_all().await;
    let state = AppState::new(store, AppConfig { demo_fallback: false, ..AppConfig::default() });
    let result = dashboard(State(state), admin(), Query(DashboardQuery::default())).await;
    assert_eq!(result.err(), Some(StatusCode::FORBIDDEN));
}
