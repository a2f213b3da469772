use serde::Serialize;
use sqlx::FromRow;

/// Full user row, including the credential hash.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    #[sqlx(rename = "user_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
}

/// Public projection returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserPublic {
    #[sqlx(rename = "user_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserPublic {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_user_never_serializes_hash() {
        let user = User {
            id: "u-1".into(),
            name: "Ann".into(),
            email: "ann@x.com".into(),
            password_hash: "$argon2id$v=19$...".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains("ann@x.com"));
    }
}
