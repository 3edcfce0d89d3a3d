use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::error::RepoError;
use super::repo_types::{User, UserChanges, UserInDb, UserRegister, UserUpdate};
use super::store::{ConnectionProvider, UserStore};
use crate::auth::password::hash_password;

fn hash(plain: &str) -> Result<String, RepoError> {
    hash_password(plain).map_err(|e| RepoError::Hashing(e.to_string()))
}

/// Looks a user up by username, credentials included.
///
/// Uses `db` when given, otherwise takes a single connection from
/// `conn_provider` for the duration of the call. Absence is `Ok(None)`: this
/// runs speculatively during authentication.
#[instrument(skip(db, conn_provider))]
pub async fn get_user_by_username<P>(
    username: &str,
    db: Option<&mut P::Connection>,
    conn_provider: Option<&P>,
) -> Result<Option<UserInDb>, RepoError>
where
    P: ConnectionProvider + ?Sized,
{
    match (db, conn_provider) {
        (Some(db), _) => db.find_by_username(username).await,
        (None, Some(provider)) => {
            let mut conn = provider.get_connection().await?;
            conn.find_by_username(username).await
        }
        (None, None) => Err(RepoError::Configuration(
            "either a connection or a connection provider is required",
        )),
    }
}

pub async fn get_users<S>(db: &mut S) -> Result<Vec<User>, RepoError>
where
    S: UserStore + ?Sized,
{
    let rows = db.list().await?;
    Ok(rows.into_iter().map(User::from).collect())
}

pub async fn get_user_by_id<S>(user_id: Uuid, db: &mut S) -> Result<User, RepoError>
where
    S: UserStore + ?Sized,
{
    db.find_by_id(user_id)
        .await?
        .map(User::from)
        .ok_or(RepoError::NotFound(user_id))
}

#[instrument(skip(db))]
pub async fn create_user<S>(registration: UserRegister, db: &mut S) -> Result<User, RepoError>
where
    S: UserStore + ?Sized,
{
    let UserRegister {
        username,
        password,
        full_name,
    } = registration;
    let password_hash = hash(&password)?;
    drop(password);

    let created = db.insert(&username, &password_hash, &full_name).await?;
    info!(user_id = %created.id, username = %created.username, "user created");
    Ok(created.into())
}

#[instrument(skip(db))]
pub async fn update_user<S>(
    user_id: Uuid,
    update: UserUpdate,
    db: &mut S,
) -> Result<User, RepoError>
where
    S: UserStore + ?Sized,
{
    let UserUpdate {
        username,
        full_name,
        password,
    } = update;
    let password_hash = password.as_deref().map(hash).transpose()?;
    drop(password);

    let changes = UserChanges {
        username,
        full_name,
        password_hash,
    };
    debug!(?changes, "applying user changes");
    let updated = db
        .update(user_id, &changes)
        .await?
        .ok_or(RepoError::NotFound(user_id))?;
    info!(user_id = %updated.id, "user updated");
    Ok(updated.into())
}

/// Unknown ids fail with `NotFound` rather than being treated as a no-op.
#[instrument(skip(db))]
pub async fn delete_user<S>(user_id: Uuid, db: &mut S) -> Result<(), RepoError>
where
    S: UserStore + ?Sized,
{
    if !db.delete(user_id).await? {
        return Err(RepoError::NotFound(user_id));
    }
    info!(user_id = %user_id, "user deleted");
    Ok(())
}
