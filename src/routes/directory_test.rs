use super::*;
use crate::model::Role;
use crate::state::test_helpers::*;
use crate::store::{MemoryDocumentStore, StoreError, collections};
use std::sync::Arc;

fn as_auth(user: User) -> AuthUser {
    AuthUser { user, token: "t".into() }
}

#[test]
fn directory_errors_map_to_statuses() {
    let not_found = DirectoryError::NotFound { collection: collections::USERS, id: "x".into() };
    assert_eq!(directory_error_to_status(not_found), StatusCode::NOT_FOUND);
    assert_eq!(directory_error_to_status(DirectoryError::Forbidden), StatusCode::FORBIDDEN);
    assert_eq!(directory_error_to_status(DirectoryError::Invalid("name")), StatusCode::BAD_REQUEST);
    assert_eq!(
        directory_error_to_status(DirectoryError::Store(StoreError::PermissionDenied("rules".into()))),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn shop_lifecycle_through_routes() {
    let state = test_app_state();
    let body = NewShop { name: "  Gombe ".into(), ..NewShop::default() };
    let (status, Json(created)) = create_shop(State(state.clone()), as_auth(global_admin()), Json(body))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.name, "Gombe");

    let patch = ShopPatch { location: Some("Kinshasa".into()), ..ShopPatch::default() };
    let Json(updated) = update_shop(State(state.clone()), as_auth(global_admin()), Path(created.id.clone()), Json(patch))
        .await
        .unwrap();
    assert_eq!(updated.location.as_deref(), Some("Kinshasa"));

    let Json(listed) = list_shops(State(state.clone()), as_auth(global_admin())).await.unwrap();
    assert_eq!(listed.len(), 1);

    let status = delete_shop(State(state.clone()), as_auth(global_admin()), Path(created.id.clone()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        get_shop(State(state), as_auth(global_admin()), Path(created.id)).await.err(),
        Some(StatusCode::NOT_FOUND)
    );
}

#[tokio::test]
async fn sellers_cannot_create_shops() {
    let state = test_app_state();
    let seller = as_auth(shop_user("v1", Role::User, "s1", "Banunu"));
    let body = NewShop { name: "Gombe".into(), ..NewShop::default() };
    assert_eq!(create_shop(State(state), seller, Json(body)).await.err(), Some(StatusCode::FORBIDDEN));
}

#[tokio::test]
async fn shop_admin_lists_own_shop_users() {
    let store = Arc::new(MemoryDocumentStore::new());
    seed_user(store.as_ref(), shop_user("a1", Role::Admin, "s1", "Banunu")).await;
    seed_user(store.as_ref(), shop_user("v1", Role::User, "s1", "Banunu")).await;
    seed_user(store.as_ref(), shop_user("v2", Role::User, "s2", "Gombe")).await;
    let state = test_app_state_with_store(store);

    let shop_admin = as_auth(shop_user("a1", Role::Admin, "s1", "Banunu"));
    let Json(users) = list_users(State(state.clone()), shop_admin, Query(ShopFilter::default()))
        .await
        .unwrap();
    let ids: Vec<_> = users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "v1"]);

    let foreign = ShopFilter { shop: Some("s2".into()) };
    let shop_admin = as_auth(shop_user("a1", Role::Admin, "s1", "Banunu"));
    assert_eq!(
        list_users(State(state), shop_admin, Query(foreign)).await.err(),
        Some(StatusCode::FORBIDDEN)
    );
}

#[tokio::test]
async fn user_edits_own_profile_but_not_role() {
    let store = Arc::new(MemoryDocumentStore::new());
    let me = seed_user(store.as_ref(), shop_user("v1", Role::User, "s1", "Banunu")).await;
    let state = test_app_state_with_store(store);

    let patch = UserPatch { telephone: Some("+243 81 000 0000".into()), ..UserPatch::default() };
    let Json(updated) = update_user(State(state.clone()), as_auth(me.clone()), Path("v1".into()), Json(patch))
        .await
        .unwrap();
    assert_eq!(updated.telephone.as_deref(), Some("+243 81 000 0000"));

    let promote = UserPatch { role: Some(Role::Admin), ..UserPatch::default() };
    assert_eq!(
        update_user(State(state.clone()), as_auth(me.clone()), Path("v1".into()), Json(promote)).await.err(),
        Some(StatusCode::FORBIDDEN)
    );
    assert_eq!(
        delete_user(State(state), as_auth(me), Path("v1".into())).await.err(),
        Some(StatusCode::FORBIDDEN)
    );
}

#[tokio::test]
async fn global_admin_reads_and_deletes_users() {
    let store = Arc::new(MemoryDocumentStore::new());
    seed_user(store.as_ref(), shop_user("v2", Role::User, "s2", "Gombe")).await;
    let state = test_app_state_with_store(Arc::clone(&store));

    let Json(user) = get_user(State(state.clone()), as_auth(global_admin()), Path("v2".into()))
        .await
        .unwrap();
    assert_eq!(user.shop_name, "Gombe");

    let status = delete_user(State(state), as_auth(global_admin()), Path("v2".into())).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(store.count(collections::USERS).await, 0);
}
