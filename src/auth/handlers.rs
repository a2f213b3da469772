use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse},
        jwt::JwtKeys,
        password::verify_password,
        services::{find_by_email, require_fields},
    },
    error::{AppError, AppResult},
    response::ApiResponse,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<LoginResponse>>)> {
    let Json(payload) = payload?;
    require_fields(&[payload.email.trim(), &payload.password])?;

    let user = find_by_email(state.users.as_ref(), &payload.email).await?;

    let ok = verify_password(&payload.password, &user.password_hash)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("unauthorized user.".into()));
    }

    let token = JwtKeys::from_ref(&state).issue(&user.id, &user.email)?;

    info!(user_id = %user.id, "user logged in");
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(LoginResponse { token }, "login success")),
    ))
}
