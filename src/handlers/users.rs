use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    crypto::password,
    error::{AppError, Result},
    models::user::Principal,
    repositories::user::{self as user_repo, UserUpdate},
    state::AppState,
};

/// The query parameters for fetching a single user.
#[derive(Deserialize)]
pub struct GetUserQuery {
    pub id: Option<Uuid>,
}

/// The request payload for updating a user.
#[derive(Deserialize, Debug)]
pub struct UpdateUserRequest {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// The request payload for deleting a user.
#[derive(Deserialize, Debug)]
pub struct DeleteUserRequest {
    pub id: Option<Uuid>,
}

/// The response payload for a successful update.
#[derive(Serialize)]
pub struct UpdateUserResponse {
    pub success: bool,
    pub message: String,
    pub updated_id: Uuid,
}

/// The response payload for a successful delete.
#[derive(Serialize)]
pub struct DeleteUserResponse {
    pub success: bool,
}

/// Lists all users. Password hashes never leave the repository layer.
#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>) -> Result<Response> {
    let users = user_repo::list(&state.db).await?;
    let principals: Vec<Principal> = users.into_iter().map(Principal::from).collect();

    Ok((StatusCode::OK, Json(principals)).into_response())
}

/// Fetches a single user by `?id=`.
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Query(query): Query<GetUserQuery>,
) -> Result<Response> {
    let id = query
        .id
        .ok_or_else(|| AppError::BadRequest("Missing id".to_string()))?;

    let user = user_repo::find_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok((StatusCode::OK, Json(Principal::from(user))).into_response())
}

/// Updates a user from a typed field set.
///
/// A plaintext password in the payload is hashed before it reaches the
/// repository; an update with no fields set is rejected with 422.
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Response> {
    let id = payload
        .id
        .ok_or_else(|| AppError::BadRequest("Valid id required".to_string()))?;

    let password_hash = match payload.password.as_deref() {
        Some(plain) => {
            crate::validation::auth::validate_password(plain)?;
            Some(password::hash_password(plain)?)
        }
        None => None,
    };

    let changes = UserUpdate {
        name: payload.name,
        email: payload.email,
        password_hash,
        is_active: payload.is_active,
    };

    if changes.is_empty() {
        return Err(AppError::Validation("No data sent for update".to_string()));
    }

    user_repo::update(&state.db, &id, &changes).await?;

    tracing::info!("✅ User updated: {}", id);

    let response = UpdateUserResponse {
        success: true,
        message: "User updated successfully".to_string(),
        updated_id: id,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Deletes a user by id.
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Json(payload): Json<DeleteUserRequest>,
) -> Result<Response> {
    let id = payload
        .id
        .ok_or_else(|| AppError::Validation("Missing id".to_string()))?;

    user_repo::delete(&state.db, &id).await?;

    tracing::info!("🗑️ User deleted: {}", id);

    Ok((StatusCode::OK, Json(DeleteUserResponse { success: true })).into_response())
}
