use async_trait::async_trait;
use uuid::Uuid;

use super::error::RepoError;
use super::repo_types::{UserChanges, UserInDb};

/// Storage port for user records. Implemented by an exclusively-borrowed
/// connection; each call is a single statement.
#[async_trait]
pub trait UserStore: Send {
    async fn find_by_username(&mut self, username: &str) -> Result<Option<UserInDb>, RepoError>;

    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<UserInDb>, RepoError>;

    /// All records ordered by id.
    async fn list(&mut self) -> Result<Vec<UserInDb>, RepoError>;

    /// Inserts a record and returns it with the store-generated id.
    /// Fails with `Conflict` when the username is taken.
    async fn insert(
        &mut self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<UserInDb, RepoError>;

    /// Applies the present fields. `Ok(None)` when no row has this id.
    async fn update(
        &mut self,
        id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<UserInDb>, RepoError>;

    /// Returns whether a row was removed.
    async fn delete(&mut self, id: Uuid) -> Result<bool, RepoError>;
}

/// Lazily hands out one owned connection; dropping it releases it.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Connection: UserStore;

    async fn get_connection(&self) -> Result<Self::Connection, RepoError>;
}
