use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use crate::users::repo_types::{User, UserPublic};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{op}: user not found")]
    NotFound { op: &'static str },

    #[error("{op}: {source}")]
    Internal {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    fn internal(op: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| StoreError::Internal { op, source }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for the `users` table.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<UserPublic>>;
    /// Caller supplies the id and an already hashed password.
    async fn create(&self, user: &User) -> StoreResult<()>;
    async fn get_by_id(&self, id: &str) -> StoreResult<UserPublic>;
    async fn get_by_email(&self, email: &str) -> StoreResult<User>;
    /// Does not check that the row exists.
    async fn update_name(&self, id: &str, name: &str) -> StoreResult<()>;
    /// `Ok(false)` when no row was removed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self) -> StoreResult<Vec<UserPublic>> {
        let rows = sqlx::query_as::<_, UserPublic>(
            r#"
            SELECT user_id, name, email
            FROM users
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::internal("list"))?;
        debug!(count = rows.len(), "users listed");
        Ok(rows)
    }

    async fn create(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&self.db)
        .await
        .map_err(StoreError::internal("create"))?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<UserPublic> {
        sqlx::query_as::<_, UserPublic>(
            r#"
            SELECT user_id, name, email
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::internal("get_by_id"))?
        .ok_or(StoreError::NotFound { op: "get_by_id" })
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, name, email, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::internal("get_by_email"))?
        .ok_or(StoreError::NotFound { op: "get_by_email" })
    }

    async fn update_name(&self, id: &str, name: &str) -> StoreResult<()> {
        sqlx::query(r#"UPDATE users SET name = $1 WHERE user_id = $2"#)
            .bind(name)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(StoreError::internal("update_name"))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let res = sqlx::query(r#"DELETE FROM users WHERE user_id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(StoreError::internal("delete"))?;
        Ok(res.rows_affected() == 1)
    }
}
