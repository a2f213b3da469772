use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        middleware::AuthUser,
        password::hash_password,
        services::{find_by_email, is_valid_email, normalize_email, require_fields},
    },
    error::{AppError, AppResult},
    response::ApiResponse,
    state::AppState,
    users::{
        dto::{CreateUserRequest, UpdateUserRequest},
        repo::StoreError,
        repo_types::{User, UserPublic},
    },
};

type Reply<T> = AppResult<(StatusCode, Json<ApiResponse<T>>)>;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn require_id(id: &str) -> AppResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::Validation("user id not provided".into()));
    }
    Ok(id)
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Reply<Vec<UserPublic>> {
    let users = state.users.list().await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(users, "users fetched"))))
}

#[instrument(skip(state, auth, payload), fields(actor = %auth.user.id))]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Reply<UserPublic> {
    let Json(payload) = payload?;
    let name = payload.name.trim().to_string();
    let email = normalize_email(&payload.email);
    require_fields(&[&name, &email, &payload.password])?;

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("invalid email".into()));
    }

    let id = Uuid::new_v4().to_string();
    let password_hash = hash_password(&payload.password)?;

    // Not atomic with the insert below; concurrent registrations can still collide.
    match find_by_email(state.users.as_ref(), &payload.email).await {
        Ok(_) => {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("email already exists".into()));
        }
        Err(StoreError::NotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    let user = User {
        id,
        name,
        email,
        password_hash,
    };
    state.users.create(&user).await?;

    let created = state.users.get_by_id(&user.id).await.map_err(|e| {
        error!(error = %e, user_id = %user.id, "created user could not be re-read");
        AppError::from(e)
    })?;

    info!(user_id = %created.id, "user created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(created, "user added.")),
    ))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Reply<UserPublic> {
    let id = require_id(&id)?;
    let user = state.users.get_by_id(id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(user, "user found"))))
}

#[instrument(skip(state, auth, payload), fields(actor = %auth.user.id))]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Reply<UserPublic> {
    let id = require_id(&id)?;
    let Json(payload) = payload?;
    let name = payload.name.trim();
    require_fields(&[name])?;

    state.users.get_by_id(id).await?;
    state.users.update_name(id, name).await?;
    let updated = state.users.get_by_id(id).await?;

    info!(user_id = %id, "user updated");
    Ok((StatusCode::OK, Json(ApiResponse::ok(updated, "user updated."))))
}

#[instrument(skip(state, auth), fields(actor = %auth.user.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<ApiResponse<()>>)> {
    let id = require_id(&id)?;
    state.users.get_by_id(id).await?;

    if !state.users.delete(id).await? {
        // Removed by someone else between the check and the delete.
        return Err(AppError::NotFound("user not found".into()));
    }

    info!(user_id = %id, "user deleted");
    Ok((StatusCode::OK, Json(ApiResponse::empty(true, "user deleted."))))
}
