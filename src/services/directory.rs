//! Directory service — user profiles and shops.
//!
//! Global administrators manage every shop and user. A shop administrator
//! manages the users of their own shop; anyone may edit their own profile
//! fields. Role and shop assignment change only through a global
//! administrator.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use super::period::now_timestamp;
use crate::model::{Role, Shop, ShopScope, User};
use crate::store::{DocumentStore, Query, StoreError, collections, encode, get_as, query_as};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{collection} not found: {id}")]
    NotFound { collection: &'static str, id: String },
    #[error("operation not permitted for this user")]
    Forbidden,
    #[error("invalid input: {0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub sexe: Option<String>,
    pub poste: Option<String>,
    pub telephone: Option<String>,
    pub role: Option<Role>,
    pub shop_id: Option<String>,
    pub shop_name: Option<String>,
}

impl UserPatch {
    fn touches_assignment(&self) -> bool {
        self.role.is_some() || self.shop_id.is_some() || self.shop_name.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewShop {
    pub name: String,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub manager: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub manager: Option<String>,
    pub description: Option<String>,
}

fn require_global(caller: &User) -> Result<(), DirectoryError> {
    if caller.is_global_admin() { Ok(()) } else { Err(DirectoryError::Forbidden) }
}

fn put(body: &mut Map<String, Value>, field: &str, value: Option<String>) {
    if let Some(value) = value {
        body.insert(field.to_owned(), Value::String(value));
    }
}

// =============================================================================
// USERS
// =============================================================================

/// Users an administrator may manage: everyone for a global administrator
/// (optionally narrowed to one shop), the own shop for a shop administrator.
///
/// # Errors
///
/// `Forbidden` for non-administrators or a foreign shop; store failures.
pub async fn list_users(
    store: &dyn DocumentStore,
    caller: &User,
    shop_id: Option<&str>,
) -> Result<Vec<User>, DirectoryError> {
    if !caller.is_admin() {
        return Err(DirectoryError::Forbidden);
    }
    let query = match (caller.scope(), shop_id) {
        (ShopScope::All, None) => Query::new(),
        (ShopScope::All, Some(shop)) => Query::new().equals("shopId", shop),
        (ShopScope::Shop(own), Some(shop)) if shop != own => return Err(DirectoryError::Forbidden),
        (ShopScope::Shop(own), _) => Query::new().equals("shopId", own),
    };
    let mut users: Vec<User> = query_as(store, collections::USERS, &query).await?;
    users.sort_by(|a, b| a.nom.cmp(&b.nom).then_with(|| a.prenom.cmp(&b.prenom)));
    Ok(users)
}

fn may_manage(caller: &User, target: &User) -> bool {
    caller.id == target.id || caller.is_global_admin() || (caller.is_admin() && caller.shop_id == target.shop_id)
}

/// # Errors
///
/// `NotFound` for unknown users or users outside the caller's reach.
pub async fn get_user(store: &dyn DocumentStore, caller: &User, id: &str) -> Result<User, DirectoryError> {
    get_as::<User>(store, collections::USERS, id)
        .await?
        .filter(|target| may_manage(caller, target))
        .ok_or_else(|| DirectoryError::NotFound { collection: collections::USERS, id: id.to_owned() })
}

/// Apply a profile patch and return the updated user.
///
/// # Errors
///
/// `Forbidden` when a non-global caller changes role or shop; `NotFound` for
/// unknown or unreachable users; store failures.
pub async fn update_user(
    store: &dyn DocumentStore,
    caller: &User,
    id: &str,
    patch: UserPatch,
) -> Result<User, DirectoryError> {
    if patch.touches_assignment() {
        require_global(caller)?;
    }
    get_user(store, caller, id).await?;

    let mut body = Map::new();
    put(&mut body, "nom", patch.nom);
    put(&mut body, "prenom", patch.prenom);
    put(&mut body, "sexe", patch.sexe);
    put(&mut body, "poste", patch.poste);
    put(&mut body, "telephone", patch.telephone);
    put(&mut body, "shopId", patch.shop_id);
    put(&mut body, "shopName", patch.shop_name);
    if let Some(role) = patch.role {
        body.insert("role".into(), serde_json::to_value(role).map_err(StoreError::from)?);
    }

    if !body.is_empty() {
        store.update(collections::USERS, id, body).await?;
        info!(user_id = %id, by = %caller.id, "user updated");
    }
    get_as::<User>(store, collections::USERS, id)
        .await?
        .ok_or_else(|| DirectoryError::NotFound { collection: collections::USERS, id: id.to_owned() })
}

/// # Errors
///
/// `Forbidden` for non-administrators and self-deletion; `NotFound` for
/// unknown or unreachable users; store failures.
pub async fn delete_user(store: &dyn DocumentStore, caller: &User, id: &str) -> Result<(), DirectoryError> {
    if !caller.is_admin() || caller.id == id {
        return Err(DirectoryError::Forbidden);
    }
    get_user(store, caller, id).await?;
    store.delete(collections::USERS, id).await?;
    info!(user_id = %id, by = %caller.id, "user deleted");
    Ok(())
}

// =============================================================================
// SHOPS
// =============================================================================

/// Shops visible to the caller, ordered by name.
///
/// # Errors
///
/// Propagates store failures.
pub async fn list_shops(store: &dyn DocumentStore, caller: &User) -> Result<Vec<Shop>, DirectoryError> {
    let mut shops = match caller.scope() {
        ShopScope::All => query_as::<Shop>(store, collections::SHOPS, &Query::new()).await?,
        ShopScope::Shop(own) => get_as::<Shop>(store, collections::SHOPS, &own).await?.into_iter().collect(),
    };
    shops.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    Ok(shops)
}

/// # Errors
///
/// `NotFound` for unknown shops or shops outside the caller's scope.
pub async fn get_shop(store: &dyn DocumentStore, caller: &User, id: &str) -> Result<Shop, DirectoryError> {
    get_as::<Shop>(store, collections::SHOPS, id)
        .await?
        .filter(|_| caller.scope().allows(id))
        .ok_or_else(|| DirectoryError::NotFound { collection: collections::SHOPS, id: id.to_owned() })
}

/// Create a shop, stamping `createdAt`.
///
/// # Errors
///
/// `Forbidden` unless the caller is a global administrator; `Invalid` for an
/// empty name; store failures.
pub async fn create_shop(store: &dyn DocumentStore, caller: &User, input: NewShop) -> Result<Shop, DirectoryError> {
    require_global(caller)?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(DirectoryError::Invalid("shop name is required"));
    }
    let mut shop = Shop {
        id: String::new(),
        name: name.to_owned(),
        location: input.location,
        phone: input.phone,
        manager: input.manager,
        description: input.description,
        created_at: Some(now_timestamp()),
    };
    shop.id = store.create(collections::SHOPS, encode(&shop)?).await?;
    info!(shop_id = %shop.id, name = %shop.name, "shop created");
    Ok(shop)
}

/// # Errors
///
/// `Forbidden` unless the caller is a global administrator; `NotFound`;
/// store failures.
pub async fn update_shop(
    store: &dyn DocumentStore,
    caller: &User,
    id: &str,
    patch: ShopPatch,
) -> Result<Shop, DirectoryError> {
    require_global(caller)?;
    let mut body = Map::new();
    put(&mut body, "name", patch.name);
    put(&mut body, "location", patch.location);
    put(&mut body, "phone", patch.phone);
    put(&mut body, "manager", patch.manager);
    put(&mut body, "description", patch.description);

    match store.update(collections::SHOPS, id, body).await {
        Err(StoreError::NotFound { .. }) => {
            return Err(DirectoryError::NotFound { collection: collections::SHOPS, id: id.to_owned() });
        }
        other => other?,
    }
    get_shop(store, caller, id).await
}

/// # Errors
///
/// `Forbidden` unless the caller is a global administrator; store failures.
pub async fn delete_shop(store: &dyn DocumentStore, caller: &User, id: &str) -> Result<(), DirectoryError> {
    require_global(caller)?;
    store.delete(collections::SHOPS, id).await?;
    info!(shop_id = %id, "shop deleted");
    Ok(())
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
