use axum::{
    extract::{FromRef, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::{
    auth::jwt::JwtKeys,
    error::{AppError, AppResult},
    state::AppState,
    users::{repo::StoreError, repo_types::UserPublic},
};

const SCHEME: &str = "Bearer ";

/// Identity admitted by [`require_auth`], available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserPublic,
}

fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let header = headers.get(AUTHORIZATION).ok_or(AppError::MissingHeader)?;
    let value = header.to_str().map_err(|_| AppError::MalformedHeader)?;
    value.strip_prefix(SCHEME).ok_or(AppError::MalformedHeader)
}

/// Admits the request only when the token is valid and still matches a live user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let token = bearer_token(req.headers())?;

    let claims = JwtKeys::from_ref(&state).validate(token)?;

    let user = state.users.get_by_id(&claims.sub).await.map_err(|e| {
        if let StoreError::NotFound { .. } = e {
            warn!(user_id = %claims.sub, "token subject no longer exists");
        }
        AppError::from(e)
    })?;

    if user.email != claims.iss {
        warn!(user_id = %user.id, "token issuer does not match current email");
        return Err(AppError::Unauthorized("wrong data provided.".into()));
    }

    debug!(user_id = %user.id, "request admitted");
    req.extensions_mut().insert(AuthUser { user });
    Ok(next.run(req).await)
}
