//! In-memory `UserStore` used as a test double.

use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use uuid::Uuid;

use super::error::RepoError;
use super::repo_types::{UserChanges, UserInDb};
use super::store::{ConnectionProvider, UserStore};

/// Clones share the same rows, so a clone acts as another connection to the same store.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    rows: Arc<Mutex<BTreeMap<Uuid, UserInDb>>>,
    connections: Arc<AtomicUsize>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times this store was asked for a connection.
    pub fn connections_handed_out(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn raw(&self, id: Uuid) -> Option<UserInDb> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn username_taken(rows: &BTreeMap<Uuid, UserInDb>, username: &str, except: Option<Uuid>) -> bool {
        rows.values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&mut self, username: &str) -> Result<Option<UserInDb>, RepoError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<UserInDb>, RepoError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn list(&mut self) -> Result<Vec<UserInDb>, RepoError> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn insert(
        &mut self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<UserInDb, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        if Self::username_taken(&rows, username, None) {
            return Err(RepoError::Conflict(username.to_string()));
        }
        let user = UserInDb {
            id: Uuid::new_v4(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            password_hash: password_hash.to_string(),
        };
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(
        &mut self,
        id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<UserInDb>, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&id) {
            return Ok(None);
        }
        if let Some(name) = &changes.username {
            if Self::username_taken(&rows, name, Some(id)) {
                return Err(RepoError::Conflict(name.clone()));
            }
        }
        let Some(user) = rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = &changes.username {
            user.username = v.clone();
        }
        if let Some(v) = &changes.full_name {
            user.full_name = v.clone();
        }
        if let Some(v) = &changes.password_hash {
            user.password_hash = v.clone();
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&mut self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }
}

#[async_trait]
impl ConnectionProvider for InMemoryUserStore {
    type Connection = InMemoryUserStore;

    async fn get_connection(&self) -> Result<Self::Connection, RepoError> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(self.clone())
    }
}
