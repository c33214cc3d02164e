//! Shop and user directory routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use crate::model::{Shop, User};
use crate::services::directory::{self, DirectoryError, NewShop, ShopPatch, UserPatch};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ShopFilter {
    #[serde(default)]
    pub shop: Option<String>,
}

pub(crate) fn directory_error_to_status(err: DirectoryError) -> StatusCode {
    match err {
        DirectoryError::NotFound { .. } => StatusCode::NOT_FOUND,
        DirectoryError::Forbidden => StatusCode::FORBIDDEN,
        DirectoryError::Invalid(_) => StatusCode::BAD_REQUEST,
        DirectoryError::Store(e) => super::store_error_to_status(&e),
    }
}

// =============================================================================
// SHOPS
// =============================================================================

/// `GET /api/shops` — shops visible to the caller.
pub async fn list_shops(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Shop>>, StatusCode> {
    let shops = directory::list_shops(state.store.as_ref(), &auth.user)
        .await
        .map_err(directory_error_to_status)?;
    Ok(Json(shops))
}

/// `POST /api/shops` — create a shop.
pub async fn create_shop(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewShop>,
) -> Result<(StatusCode, Json<Shop>), StatusCode> {
    let shop = directory::create_shop(state.store.as_ref(), &auth.user, body)
        .await
        .map_err(directory_error_to_status)?;
    Ok((StatusCode::CREATED, Json(shop)))
}

/// `GET /api/shops/:id` — fetch one shop.
pub async fn get_shop(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Shop>, StatusCode> {
    let shop = directory::get_shop(state.store.as_ref(), &auth.user, &id)
        .await
        .map_err(directory_error_to_status)?;
    Ok(Json(shop))
}

/// `PATCH /api/shops/:id` — edit shop details.
pub async fn update_shop(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ShopPatch>,
) -> Result<Json<Shop>, StatusCode> {
    let shop = directory::update_shop(state.store.as_ref(), &auth.user, &id, body)
        .await
        .map_err(directory_error_to_status)?;
    Ok(Json(shop))
}

/// `DELETE /api/shops/:id` — remove a shop.
pub async fn delete_shop(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    directory::delete_shop(state.store.as_ref(), &auth.user, &id)
        .await
        .map_err(directory_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// USERS
// =============================================================================

/// `GET /api/users?shop=` — users the caller administers.
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<ShopFilter>,
) -> Result<Json<Vec<User>>, StatusCode> {
    let users = directory::list_users(state.store.as_ref(), &auth.user, filter.shop.as_deref())
        .await
        .map_err(directory_error_to_status)?;
    Ok(Json(users))
}

/// `GET /api/users/:id` — one user profile.
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<User>, StatusCode> {
    let user = directory::get_user(state.store.as_ref(), &auth.user, &id)
        .await
        .map_err(directory_error_to_status)?;
    Ok(Json(user))
}

/// `PATCH /api/users/:id` — edit profile fields, role or shop assignment.
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UserPatch>,
) -> Result<Json<User>, StatusCode> {
    let user = directory::update_user(state.store.as_ref(), &auth.user, &id, body)
        .await
        .map_err(directory_error_to_status)?;
    Ok(Json(user))
}

/// `DELETE /api/users/:id` — remove a user.
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    directory::delete_user(state.store.as_ref(), &auth.user, &id)
        .await
        .map_err(directory_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
