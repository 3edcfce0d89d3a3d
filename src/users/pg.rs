//! Postgres adapter for [`UserStore`].
//!
//! Expects `users(id uuid primary key default gen_random_uuid(), username text
//! not null unique, password_hash text not null, full_name text not null)`.

use async_trait::async_trait;
use sqlx::{pool::PoolConnection, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::error::RepoError;
use super::repo_types::{UserChanges, UserInDb};
use super::store::{ConnectionProvider, UserStore};

#[async_trait]
impl UserStore for PgConnection {
    async fn find_by_username(&mut self, username: &str) -> Result<Option<UserInDb>, RepoError> {
        let user = sqlx::query_as::<_, UserInDb>(
            r#"
            SELECT id, username, full_name, password_hash
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *self)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<UserInDb>, RepoError> {
        let user = sqlx::query_as::<_, UserInDb>(
            r#"
            SELECT id, username, full_name, password_hash
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self)
        .await?;
        Ok(user)
    }

    async fn list(&mut self) -> Result<Vec<UserInDb>, RepoError> {
        let rows = sqlx::query_as::<_, UserInDb>(
            r#"
            SELECT id, username, full_name, password_hash
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *self)
        .await?;
        Ok(rows)
    }

    async fn insert(
        &mut self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<UserInDb, RepoError> {
        sqlx::query_as::<_, UserInDb>(
            r#"
            INSERT INTO users (username, password_hash, full_name)
            VALUES ($1, $2, $3)
            RETURNING id, username, full_name, password_hash
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(full_name)
        .fetch_one(&mut *self)
        .await
        .map_err(|e| RepoError::from_write(e, username))
    }

    async fn update(
        &mut self,
        id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<UserInDb>, RepoError> {
        sqlx::query_as::<_, UserInDb>(
            r#"
            UPDATE users
               SET username      = COALESCE($2, username),
                   full_name     = COALESCE($3, full_name),
                   password_hash = COALESCE($4, password_hash)
             WHERE id = $1
            RETURNING id, username, full_name, password_hash
            "#,
        )
        .bind(id)
        .bind(changes.username.as_deref())
        .bind(changes.full_name.as_deref())
        .bind(changes.password_hash.as_deref())
        .fetch_optional(&mut *self)
        .await
        .map_err(|e| RepoError::from_write(e, changes.username.as_deref().unwrap_or_default()))
    }

    async fn delete(&mut self, id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

// Pooled connections deref to `PgConnection`; forward to the impl above.
#[async_trait]
impl UserStore for PoolConnection<Postgres> {
    async fn find_by_username(&mut self, username: &str) -> Result<Option<UserInDb>, RepoError> {
        UserStore::find_by_username(&mut **self, username).await
    }

    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<UserInDb>, RepoError> {
        UserStore::find_by_id(&mut **self, id).await
    }

    async fn list(&mut self) -> Result<Vec<UserInDb>, RepoError> {
        UserStore::list(&mut **self).await
    }

    async fn insert(
        &mut self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<UserInDb, RepoError> {
        UserStore::insert(&mut **self, username, password_hash, full_name).await
    }

    async fn update(
        &mut self,
        id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<UserInDb>, RepoError> {
        UserStore::update(&mut **self, id, changes).await
    }

    async fn delete(&mut self, id: Uuid) -> Result<bool, RepoError> {
        UserStore::delete(&mut **self, id).await
    }
}

#[async_trait]
impl ConnectionProvider for PgPool {
    type Connection = PoolConnection<Postgres>;

    async fn get_connection(&self) -> Result<Self::Connection, RepoError> {
        Ok(self.acquire().await?)
    }
}
