use super::*;
use serde_json::json;

fn body(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("test body must be an object"),
    }
}

#[tokio::test]
async fn create_then_get_round_trips_body() {
    let store = MemoryDocumentStore::new();
    let id = store
        .create("shops", body(json!({"name": "Banunu"})))
        .await
        .unwrap();

    let doc = store.get("shops", &id).await.unwrap().expect("document");
    assert_eq!(doc.id, id);
    assert_eq!(doc.get("name"), Some(&json!("Banunu")));
}

#[tokio::test]
async fn get_missing_returns_none() {
    let store = MemoryDocumentStore::new();
    assert!(store.get("shops", "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn query_filters_orders_and_limits() {
    let store = MemoryDocumentStore::new();
    for (shop, date) in [("s1", "2024-01-02"), ("s2", "2024-01-03"), ("s1", "2024-01-01"), ("s1", "2024-01-05")] {
        store
            .create("echanges", body(json!({"shopId": shop, "date": date})))
            .await
            .unwrap();
    }

    let query = Query::new()
        .equals("shopId", "s1")
        .order_desc("date")
        .limit(2);
    let docs = store.query("echanges", &query).await.unwrap();
    let dates: Vec<_> = docs
        .iter()
        .filter_map(|d| d.get("date").and_then(Value::as_str))
        .collect();
    assert_eq!(dates, vec!["2024-01-05", "2024-01-02"]);
}

#[tokio::test]
async fn unordered_query_keeps_insertion_order() {
    let store = MemoryDocumentStore::new();
    for n in [3, 1, 2] {
        store.create("c", body(json!({"n": n}))).await.unwrap();
    }
    let docs = store.query("c", &Query::new()).await.unwrap();
    let ns: Vec<_> = docs
        .iter()
        .filter_map(|d| d.get("n").and_then(Value::as_i64))
        .collect();
    assert_eq!(ns, vec![3, 1, 2]);
}

#[tokio::test]
async fn update_merges_fields() {
    let store = MemoryDocumentStore::new();
    let id = store
        .create("clients", body(json!({"nom": "Kabila", "solde": 10})))
        .await
        .unwrap();
    store
        .update("clients", &id, body(json!({"solde": 25})))
        .await
        .unwrap();

    let doc = store.get("clients", &id).await.unwrap().unwrap();
    assert_eq!(doc.get("nom"), Some(&json!("Kabila")));
    assert_eq!(doc.get("solde"), Some(&json!(25)));
}

#[tokio::test]
async fn update_missing_is_not_found() {
    let store = MemoryDocumentStore::new();
    let err = store
        .update("clients", "ghost", Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn set_replaces_existing_body() {
    let store = MemoryDocumentStore::new();
    store
        .set("users", "u1", body(json!({"a": 1, "b": 2})))
        .await
        .unwrap();
    store.set("users", "u1", body(json!({"a": 3}))).await.unwrap();

    let doc = store.get("users", "u1").await.unwrap().unwrap();
    assert_eq!(doc.data, body(json!({"a": 3})));
    assert_eq!(store.count("users").await, 1);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let store = MemoryDocumentStore::new();
    let id = store.create("shops", Map::new()).await.unwrap();
    store.delete("shops", &id).await.unwrap();
    store.delete("shops", &id).await.unwrap();
    assert_eq!(store.count("shops").await, 0);
}

#[tokio::test]
async fn denied_collection_fails_with_permission_error() {
    let store = MemoryDocumentStore::new();
    store.deny("echanges").await;

    let err = store.query("echanges", &Query::new()).await.unwrap_err();
    assert!(err.is_permission_denied());
    assert!(store.query("shops", &Query::new()).await.is_ok());

    store.allow_all().await;
    assert!(store.query("echanges", &Query::new()).await.is_ok());
}

#[tokio::test]
async fn deny_all_blocks_every_collection() {
    let store = MemoryDocumentStore::new();
    store.deny_all().await;
    assert!(store.get("users", "u1").await.unwrap_err().is_permission_denied());
    assert!(store.create("shops", Map::new()).await.unwrap_err().is_permission_denied());
}
