//! Login manager: issues tokens and resolves the current user through an
//! explicitly supplied [`UserLoader`].

use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password};
use crate::users::{get_user_by_username, ConnectionProvider, RepoError, User, UserInDb};

lazy_static! {
    /// Verified against on unknown usernames so a miss costs the same argon2 work.
    static ref DUMMY_HASH: String =
        hash_password("fabric-dummy-password").unwrap_or_default();
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("user no longer exists")]
    UnknownUser,
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("{0}")]
    Internal(String),
}

/// Identity resolver: maps a username to stored credentials.
#[async_trait]
pub trait UserLoader: Send + Sync {
    async fn load_user(&self, username: &str) -> Result<Option<UserInDb>, RepoError>;
}

/// Loader that runs outside any request-scoped connection and takes one from
/// the provider per lookup.
pub struct ProviderUserLoader<P> {
    provider: P,
}

impl<P> ProviderUserLoader<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: ConnectionProvider> UserLoader for ProviderUserLoader<P> {
    async fn load_user(&self, username: &str) -> Result<Option<UserInDb>, RepoError> {
        get_user_by_username(username, None, Some(&self.provider)).await
    }
}

pub struct LoginManager {
    keys: JwtKeys,
    loader: Arc<dyn UserLoader>,
}

impl LoginManager {
    pub fn new(keys: JwtKeys, loader: Arc<dyn UserLoader>) -> Self {
        Self { keys, loader }
    }

    pub fn create_access_token(&self, user_id: Uuid, username: &str) -> Result<String, AuthError> {
        self.keys.sign(user_id, username).map_err(|e| {
            error!(error = %e, "jwt sign failed");
            AuthError::Internal(e.to_string())
        })
    }

    /// Unknown usernames and wrong passwords are reported identically.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserInDb, AuthError> {
        let Some(user) = self.loader.load_user(username).await? else {
            let _ = verify_password(password, &DUMMY_HASH);
            warn!(username = %username, "login unknown username");
            return Err(AuthError::InvalidCredentials);
        };
        let ok = verify_password(password, &user.password_hash)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    /// The username must still belong to the account the token was issued for.
    pub async fn get_current_user(&self, token: &str) -> Result<UserInDb, AuthError> {
        let claims = self.keys.verify(token).map_err(|_| AuthError::InvalidToken)?;
        let user = self
            .loader
            .load_user(&claims.sub)
            .await?
            .ok_or(AuthError::UnknownUser)?;
        if user.id != claims.uid {
            warn!(token_uid = %claims.uid, user_id = %user.id, "token issued for another account");
            return Err(AuthError::UnknownUser);
        }
        Ok(user)
    }
}

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Arc<LoginManager>: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let manager = Arc::<LoginManager>::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header".to_string(),
            ))?;

        match manager.get_current_user(token).await {
            Ok(user) => Ok(CurrentUser(user.into())),
            Err(AuthError::Repo(e)) => {
                error!(error = %e, "user loader failed");
                Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
            }
            Err(e) => {
                warn!(error = %e, "rejected bearer token");
                Err((StatusCode::UNAUTHORIZED, e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::test_keys;
    use crate::users::{
        create_user, delete_user, memory::InMemoryUserStore, update_user, UserRegister,
        UserUpdate,
    };
    use axum::http::Request;

    fn register(username: &str, password: &str, full_name: &str) -> UserRegister {
        UserRegister {
            username: username.into(),
            password: password.into(),
            full_name: full_name.into(),
        }
    }

    async fn manager_with_alice() -> (Arc<LoginManager>, InMemoryUserStore, User) {
        let mut store = InMemoryUserStore::new();
        let alice = create_user(register("alice", "p@ssword", "Alice A"), &mut store)
            .await
            .unwrap();
        let loader = Arc::new(ProviderUserLoader::new(store.clone()));
        let manager = LoginManager::new(test_keys("s", "iss", "aud"), loader);
        (Arc::new(manager), store, alice)
    }

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/me");
        if let Some(v) = value {
            builder = builder.header("authorization", v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn authenticate_accepts_right_password_only() {
        let (manager, _, _) = manager_with_alice().await;
        let user = manager.authenticate("alice", "p@ssword").await.unwrap();
        assert_eq!(user.username, "alice");

        assert!(matches!(
            manager.authenticate("alice", "nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            manager.authenticate("ghost", "p@ssword").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        assert!(DUMMY_HASH.starts_with("$argon2id$"));
        assert!(!verify_password("p@ssword", &DUMMY_HASH).unwrap());
    }

    #[tokio::test]
    async fn loader_goes_through_provider() {
        let (manager, store, alice) = manager_with_alice().await;
        let token = manager.create_access_token(alice.id, "alice").unwrap();
        let before = store.connections_handed_out();
        let user = manager.get_current_user(&token).await.unwrap();
        assert_eq!(user.id, alice.id);
        assert_eq!(store.connections_handed_out(), before + 1);
    }

    #[tokio::test]
    async fn token_for_missing_user_is_unknown() {
        let (manager, _, _) = manager_with_alice().await;
        let token = manager.create_access_token(Uuid::new_v4(), "bob").unwrap();
        assert!(matches!(
            manager.get_current_user(&token).await,
            Err(AuthError::UnknownUser)
        ));
        assert!(matches!(
            manager.get_current_user("not-a-jwt").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn token_does_not_follow_username_to_a_new_account() {
        let (manager, mut store, alice) = manager_with_alice().await;
        let token = manager.create_access_token(alice.id, "alice").unwrap();

        delete_user(alice.id, &mut store).await.unwrap();
        let mallory = create_user(register("alice", "password1", "Mallory"), &mut store)
            .await
            .unwrap();
        assert_ne!(mallory.id, alice.id);

        assert!(matches!(
            manager.get_current_user(&token).await,
            Err(AuthError::UnknownUser)
        ));
    }

    #[tokio::test]
    async fn token_is_rejected_after_rename_frees_the_username() {
        let (manager, mut store, alice) = manager_with_alice().await;
        let token = manager.create_access_token(alice.id, "alice").unwrap();

        update_user(
            alice.id,
            UserUpdate {
                username: Some("alice2".into()),
                ..Default::default()
            },
            &mut store,
        )
        .await
        .unwrap();
        assert!(matches!(
            manager.get_current_user(&token).await,
            Err(AuthError::UnknownUser)
        ));

        create_user(register("alice", "password1", "Mallory"), &mut store)
            .await
            .unwrap();
        assert!(matches!(
            manager.get_current_user(&token).await,
            Err(AuthError::UnknownUser)
        ));

        let fresh = manager.create_access_token(alice.id, "alice2").unwrap();
        assert_eq!(manager.get_current_user(&fresh).await.unwrap().id, alice.id);
    }

    #[tokio::test]
    async fn extractor_resolves_bearer_token() {
        let (manager, _, alice) = manager_with_alice().await;
        let token = manager.create_access_token(alice.id, "alice").unwrap();
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &manager)
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.full_name, "Alice A");
    }

    #[tokio::test]
    async fn extractor_rejects_missing_or_malformed_header() {
        let (manager, _, _) = manager_with_alice().await;
        for header in [None, Some("Basic abc"), Some("Bearer nope")] {
            let mut parts = parts_with_auth(header);
            let Err((status, _)) = CurrentUser::from_request_parts(&mut parts, &manager).await
            else {
                panic!("header {header:?} should be rejected");
            };
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }
}
