use super::*;
use crate::model::Role;
use crate::state::test_helpers::*;
use crate::store::MemoryDocumentStore;
use serde_json::json;
use time::macros::date;

fn seller() -> User {
    shop_user("v1", Role::User, "s1", "Banunu")
}

fn new_record(montant: f64, date: &str) -> NewRecord {
    NewRecord { montant: Some(montant), date: Some(date.into()), ..NewRecord::default() }
}

async fn seed_client(store: &dyn DocumentStore, shop_id: &str, solde: f64) -> String {
    seed_doc(store, collections::CLIENTS, json!({"nom": "Mbala", "shopId": shop_id, "solde": solde})).await
}

// =============================================================================
// records
// =============================================================================

#[tokio::test]
async fn create_record_stamps_shop_and_author() {
    let store = MemoryDocumentStore::new();
    let mut input = new_record(250.0, "2024-01-05");
    input.extra.insert("deviseSource".into(), json!("USD"));
    input.extra.insert("userId".into(), json!("someone-else"));

    let record = create_record(&store, &seller(), RecordKind::Exchange, input).await.unwrap();
    assert_eq!(record.shop_id, "s1");
    assert_eq!(record.shop_name.as_deref(), Some("Banunu"));
    assert_eq!(record.user_id.as_deref(), Some("v1"));

    let stored: LedgerRecord = get_as(&store, collections::ECHANGES, &record.id).await.unwrap().unwrap();
    assert_eq!(stored.extra.get("deviseSource"), Some(&json!("USD")));
    assert_eq!(stored.user_id.as_deref(), Some("v1"));
    assert!((stored.amount() - 250.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn create_record_defaults_date_to_now() {
    let store = MemoryDocumentStore::new();
    let input = NewRecord { montant: Some(1.0), ..NewRecord::default() };
    let record = create_record(&store, &seller(), RecordKind::Deposit, input).await.unwrap();
    assert!(crate::services::period::parse_date(&record.date).is_some());
}

#[tokio::test]
async fn shop_user_cannot_write_into_another_shop() {
    let store = MemoryDocumentStore::new();
    let input = NewRecord { shop_id: Some("s2".into()), ..new_record(1.0, "2024-01-05") };
    let err = create_record(&store, &seller(), RecordKind::Exchange, input).await.unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(id) if id == "s2"));
}

#[tokio::test]
async fn global_admin_must_name_target_shop() {
    let store = MemoryDocumentStore::new();
    let err = create_record(&store, &global_admin(), RecordKind::Exchange, new_record(1.0, "2024-01-05"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::MissingShop));

    let input = NewRecord { shop_id: Some("s2".into()), ..new_record(1.0, "2024-01-05") };
    let record = create_record(&store, &global_admin(), RecordKind::Exchange, input).await.unwrap();
    assert_eq!(record.shop_id, "s2");
    assert_eq!(record.shop_name.as_deref(), Some("s2"));
}

#[tokio::test]
async fn list_records_is_scoped_and_newest_first() {
    let store = MemoryDocumentStore::new();
    seed_record(&store, RecordKind::CreditSale, "s1", "Banunu", Some(1.0), "2024-01-01").await;
    seed_record(&store, RecordKind::CreditSale, "s1", "Banunu", Some(2.0), "2024-01-03").await;
    seed_record(&store, RecordKind::CreditSale, "s2", "Gombe", Some(3.0), "2024-01-02").await;

    let own = list_records(&store, &seller(), RecordKind::CreditSale, None, None).await.unwrap();
    let dates: Vec<_> = own.iter().map(|r| r.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-01-03", "2024-01-01"]);

    let all = list_records(&store, &global_admin(), RecordKind::CreditSale, None, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].shop_id, "s2");

    let narrowed = list_records(&store, &global_admin(), RecordKind::CreditSale, Some("s2"), None).await.unwrap();
    assert_eq!(narrowed.len(), 1);
}

#[tokio::test]
async fn list_records_by_date_range_is_inclusive() {
    let store = MemoryDocumentStore::new();
    for date in ["2024-01-01", "2024-01-02T23:59:00Z", "2024-01-03", "2024-01-04"] {
        seed_record(&store, RecordKind::Transaction, "s1", "Banunu", Some(1.0), date).await;
    }
    let window = DateWindow::new(date!(2024 - 01 - 02), date!(2024 - 01 - 03));
    let records = list_records(&store, &seller(), RecordKind::Transaction, Some("s1"), Some(&window))
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn list_records_rejects_foreign_shop() {
    let store = MemoryDocumentStore::new();
    let err = list_records(&store, &seller(), RecordKind::Deposit, Some("s2"), None).await.unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
}

// =============================================================================
// clients
// =============================================================================

#[tokio::test]
async fn create_and_list_clients_by_shop() {
    let store = MemoryDocumentStore::new();
    let input = NewClient { nom: "Zola".into(), ..NewClient::default() };
    let created = create_client(&store, &seller(), input).await.unwrap();
    assert_eq!(created.shop_id, "s1");
    assert!(created.solde.abs() < f64::EPSILON);
    seed_client(&store, "s1", 10.0).await;
    seed_client(&store, "s2", 10.0).await;

    let clients = list_clients(&store, &seller(), None).await.unwrap();
    let names: Vec<_> = clients.iter().map(|c| c.nom.as_str()).collect();
    assert_eq!(names, vec!["Mbala", "Zola"]);
    assert_eq!(list_clients(&store, &global_admin(), None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn update_client_changes_profile_fields() {
    let store = MemoryDocumentStore::new();
    let id = seed_client(&store, "s1", 10.0).await;
    let patch = ClientPatch { telephone: Some("+243 81 000 0000".into()), ..ClientPatch::default() };
    let client = update_client(&store, &seller(), &id, patch).await.unwrap();
    assert_eq!(client.telephone.as_deref(), Some("+243 81 000 0000"));

    let stored: Client = get_as(&store, collections::CLIENTS, &id).await.unwrap().unwrap();
    assert_eq!(stored.nom, "Mbala");
    assert_eq!(stored.telephone.as_deref(), Some("+243 81 000 0000"));
}

#[tokio::test]
async fn clients_of_other_shops_are_not_found() {
    let store = MemoryDocumentStore::new();
    let id = seed_client(&store, "s2", 10.0).await;
    let err = update_client(&store, &seller(), &id, ClientPatch::default()).await.unwrap_err();
    assert!(matches!(err, LedgerError::ClientNotFound(_)));
}

// =============================================================================
// card movements
// =============================================================================

#[test]
fn apply_card_movement_rules() {
    assert!((apply_card_movement(100.0, CardMovementKind::Depot, 50.0).unwrap() - 150.0).abs() < f64::EPSILON);
    assert!((apply_card_movement(100.0, CardMovementKind::Retrait, 100.0).unwrap()).abs() < f64::EPSILON);
    assert!(matches!(
        apply_card_movement(100.0, CardMovementKind::Retrait, 100.5),
        Err(LedgerError::InsufficientBalance { .. })
    ));
    assert!(matches!(apply_card_movement(100.0, CardMovementKind::Depot, 0.0), Err(LedgerError::InvalidAmount)));
    assert!(matches!(apply_card_movement(100.0, CardMovementKind::Depot, -5.0), Err(LedgerError::InvalidAmount)));
    assert!(matches!(apply_card_movement(0.0, CardMovementKind::Depot, f64::NAN), Err(LedgerError::InvalidAmount)));
}

#[tokio::test]
async fn deposit_then_withdrawal_updates_balance() {
    let store = MemoryDocumentStore::new();
    let id = seed_client(&store, "s1", 100.0).await;

    let deposit = CardRequest { kind: CardMovementKind::Depot, montant: 40.0 };
    let (movement, client) = card_movement(&store, &seller(), &id, deposit).await.unwrap();
    assert_eq!(movement.client_id, id);
    assert_eq!(movement.shop_id, "s1");
    assert!((client.solde - 140.0).abs() < f64::EPSILON);

    let withdrawal = CardRequest { kind: CardMovementKind::Retrait, montant: 90.0 };
    card_movement(&store, &seller(), &id, withdrawal).await.unwrap();

    let stored: Client = get_as(&store, collections::CLIENTS, &id).await.unwrap().unwrap();
    assert!((stored.solde - 50.0).abs() < f64::EPSILON);
    assert_eq!(store.count(collections::DEPOT_CARTE).await, 2);
}

#[tokio::test]
async fn rejected_withdrawal_writes_nothing() {
    let store = MemoryDocumentStore::new();
    let id = seed_client(&store, "s1", 10.0).await;
    let withdrawal = CardRequest { kind: CardMovementKind::Retrait, montant: 11.0 };
    let err = card_movement(&store, &seller(), &id, withdrawal).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    assert_eq!(store.count(collections::DEPOT_CARTE).await, 0);
}

#[tokio::test]
async fn card_movement_for_unknown_client_fails() {
    let store = MemoryDocumentStore::new();
    let deposit = CardRequest { kind: CardMovementKind::Depot, montant: 1.0 };
    let err = card_movement(&store, &seller(), "missing", deposit).await.unwrap_err();
    assert!(matches!(err, LedgerError::ClientNotFound(id) if id == "missing"));
}
