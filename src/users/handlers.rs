use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sqlx::{pool::PoolConnection, Postgres};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::UserList,
    error::RepoError,
    repo::{delete_user, get_user_by_id, get_users, update_user},
    repo_types::{User, UserUpdate},
};
use crate::{auth::session::CurrentUser, state::AppState};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).patch(patch_user).delete(remove_user),
        )
}

/// Maps repository failures onto HTTP rejections.
pub(crate) fn repo_error(e: RepoError) -> (StatusCode, String) {
    let status = match &e {
        RepoError::NotFound(_) => StatusCode::NOT_FOUND,
        RepoError::Conflict(_) => StatusCode::CONFLICT,
        RepoError::Validation(_) => StatusCode::BAD_REQUEST,
        RepoError::Configuration(_) | RepoError::Hashing(_) | RepoError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        error!(error = %e, "user repository failure");
    } else {
        warn!(error = %e, %status, "user request rejected");
    }
    (status, e.to_string())
}

/// Accounts may only be modified or removed by their owner.
pub(crate) fn ensure_self(caller_id: Uuid, target_id: Uuid) -> Result<(), (StatusCode, String)> {
    if caller_id != target_id {
        warn!(caller = %caller_id, target = %target_id, "cross-account modification refused");
        return Err((
            StatusCode::FORBIDDEN,
            "Cannot modify another user's account".to_string(),
        ));
    }
    Ok(())
}

async fn connection(state: &AppState) -> Result<PoolConnection<Postgres>, (StatusCode, String)> {
    state
        .db
        .acquire()
        .await
        .map_err(|e| repo_error(RepoError::Database(e)))
}

#[instrument(skip(state, _caller))]
pub async fn list_users(
    State(state): State<AppState>,
    _caller: CurrentUser,
) -> Result<Json<UserList>, (StatusCode, String)> {
    let mut conn = connection(&state).await?;
    let users = get_users(&mut *conn).await.map_err(repo_error)?;
    Ok(Json(users.into()))
}

#[instrument(skip(state, _caller))]
pub async fn get_user(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, (StatusCode, String)> {
    let mut conn = connection(&state).await?;
    let user = get_user_by_id(id, &mut *conn).await.map_err(repo_error)?;
    Ok(Json(user))
}

#[instrument(skip(state, caller))]
pub async fn patch_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    Json(mut update): Json<UserUpdate>,
) -> Result<Json<User>, (StatusCode, String)> {
    ensure_self(caller.id, id)?;
    update.normalize_and_validate().map_err(repo_error)?;
    let mut conn = connection(&state).await?;
    let user = update_user(id, update, &mut *conn)
        .await
        .map_err(repo_error)?;
    info!(user_id = %user.id, "user patched");
    Ok(Json(user))
}

#[instrument(skip(state, caller))]
pub async fn remove_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    ensure_self(caller.id, id)?;
    let mut conn = connection(&state).await?;
    delete_user(id, &mut *conn).await.map_err(repo_error)?;
    info!(user_id = %id, "user removed");
    Ok(StatusCode::NO_CONTENT)
}
