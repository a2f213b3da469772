use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::users::{
    repo::{StoreError, StoreResult, UserStore},
    repo_types::{User, UserPublic},
};

/// Process-local store for tests. Rows are kept in insertion order.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
    broken: AtomicBool,
    drop_inserts: AtomicBool,
    lose_deletes: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call fail the way a dropped connection would.
    pub fn break_connection(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    /// `create` reports success but the row never becomes visible.
    pub fn drop_inserts(&self) {
        self.drop_inserts.store(true, Ordering::SeqCst);
    }

    /// `delete` finds nothing to remove, as if another request got there first.
    pub fn lose_deletes(&self) {
        self.lose_deletes.store(true, Ordering::SeqCst);
    }

    fn check(&self, op: &'static str) -> StoreResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Internal {
                op,
                source: sqlx::Error::PoolClosed,
            });
        }
        Ok(())
    }

    pub async fn raw(&self, id: &str) -> Option<User> {
        self.rows.lock().await.iter().find(|u| u.id == id).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> StoreResult<Vec<UserPublic>> {
        self.check("list")?;
        Ok(self.rows.lock().await.iter().map(UserPublic::from).collect())
    }

    async fn create(&self, user: &User) -> StoreResult<()> {
        self.check("create")?;
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|u| u.id == user.id) {
            return Err(StoreError::Internal {
                op: "create",
                source: sqlx::Error::Protocol("duplicate key value violates primary key".into()),
            });
        }
        if !self.drop_inserts.load(Ordering::SeqCst) {
            rows.push(user.clone());
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<UserPublic> {
        self.check("get_by_id")?;
        self.rows
            .lock()
            .await
            .iter()
            .find(|u| u.id == id)
            .map(UserPublic::from)
            .ok_or(StoreError::NotFound { op: "get_by_id" })
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<User> {
        self.check("get_by_email")?;
        self.rows
            .lock()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound { op: "get_by_email" })
    }

    async fn update_name(&self, id: &str, name: &str) -> StoreResult<()> {
        self.check("update_name")?;
        if let Some(u) = self.rows.lock().await.iter_mut().find(|u| u.id == id) {
            u.name = name.to_string();
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.check("delete")?;
        if self.lose_deletes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(before - rows.len() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            name: "Ann".into(),
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn list_is_empty_not_an_error() {
        let store = MemoryUserStore::new();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_keeps_insertion_order_and_hides_hash() {
        let store = MemoryUserStore::new();
        store.create(&user("b", "b@x.com")).await.unwrap();
        store.create(&user("a", "a@x.com")).await.unwrap();
        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn lookups_report_not_found() {
        let store = MemoryUserStore::new();
        assert!(matches!(
            store.get_by_id("nope").await,
            Err(StoreError::NotFound { op: "get_by_id" })
        ));
        assert!(matches!(
            store.get_by_email("nope@x.com").await,
            Err(StoreError::NotFound { op: "get_by_email" })
        ));
    }

    #[tokio::test]
    async fn get_by_email_returns_full_record() {
        let store = MemoryUserStore::new();
        store.create(&user("a", "a@x.com")).await.unwrap();
        let full = store.get_by_email("a@x.com").await.unwrap();
        assert_eq!(full.password_hash, "hash");
    }

    #[tokio::test]
    async fn update_changes_name_only() {
        let store = MemoryUserStore::new();
        store.create(&user("a", "a@x.com")).await.unwrap();
        store.update_name("a", "Bea").await.unwrap();
        let u = store.get_by_id("a").await.unwrap();
        assert_eq!(u.name, "Bea");
        assert_eq!(u.email, "a@x.com");
        // missing rows are silently ignored
        store.update_name("missing", "X").await.unwrap();
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_went_away() {
        let store = MemoryUserStore::new();
        store.create(&user("a", "a@x.com")).await.unwrap();
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn fault_switches_hide_writes() {
        let store = MemoryUserStore::new();
        store.create(&user("a", "a@x.com")).await.unwrap();
        store.drop_inserts();
        store.lose_deletes();
        store.create(&user("b", "b@x.com")).await.unwrap();
        assert!(store.raw("b").await.is_none());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.raw("a").await.is_some());
    }

    #[tokio::test]
    async fn broken_connection_surfaces_internal() {
        let store = MemoryUserStore::new();
        store.break_connection();
        assert!(matches!(
            store.list().await,
            Err(StoreError::Internal { op: "list", .. })
        ));
    }
}
