use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("configuration error: {0}")]
    Configuration(&'static str),
    #[error("user {0} not found")]
    NotFound(Uuid),
    #[error("username {0} is already taken")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        RepoError::Database(e)
    }
}

impl RepoError {
    /// Maps a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_write(e: sqlx::Error, username: &str) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(username.to_string())
            }
            _ => RepoError::Database(e),
        }
    }
}
