use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::{AppError, AppResult},
    users::{
        repo::{StoreError, StoreResult, UserStore},
        repo_types::User,
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Looks the email up as typed, then in its normalized form. Rows written
/// before normalization may hold mixed case and only match exactly.
pub(crate) async fn find_by_email(users: &dyn UserStore, email: &str) -> StoreResult<User> {
    let typed = email.trim();
    match users.get_by_email(typed).await {
        Err(StoreError::NotFound { .. }) => {
            let normalized = normalize_email(typed);
            if normalized == typed {
                return Err(StoreError::NotFound { op: "get_by_email" });
            }
            users.get_by_email(&normalized).await
        }
        found => found,
    }
}

/// Fails with a validation error when any field is empty.
pub(crate) fn require_fields(fields: &[&str]) -> AppResult<()> {
    if fields.iter().any(|f| f.is_empty()) {
        return Err(AppError::Validation("fields cannot be empty".into()));
    }
    Ok(())
}
