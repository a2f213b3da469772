use axum::{middleware, Router};

use crate::{auth::middleware::require_auth, state::AppState};

mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod repo_types;

/// All `/users` routes, guarded by bearer-token auth.
pub fn router(state: AppState) -> Router<AppState> {
    handlers::user_routes().route_layer(middleware::from_fn_with_state(state, require_auth))
}
