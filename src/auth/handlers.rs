use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, TokenResponse},
        session::{AuthError, CurrentUser},
    },
    state::AppState,
    users::{create_user, handlers::repo_error, RegisterRequest, User},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), (StatusCode, String)> {
    let mut registration = payload.into_registration().map_err(|msg| {
        warn!("password confirmation mismatch");
        (StatusCode::BAD_REQUEST, msg.to_string())
    })?;
    registration.normalize_and_validate().map_err(repo_error)?;

    let mut conn = state.db.acquire().await.map_err(|e| {
        error!(error = %e, "acquire connection failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let user = create_user(registration, &mut *conn)
        .await
        .map_err(repo_error)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    payload.username = payload.username.trim().to_string();

    let user = match state
        .login
        .authenticate(&payload.username, &payload.password)
        .await
    {
        Ok(u) => u,
        Err(AuthError::InvalidCredentials) => {
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "authenticate failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let access_token = state
        .login
        .create_access_token(user.id, &user.username)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(TokenResponse::bearer(access_token, user.into())))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn token_response_serialization() {
        let response = TokenResponse::bearer(
            "abc.def.ghi".into(),
            User {
                id: Uuid::new_v4(),
                username: "alice".into(),
                full_name: "Alice A".into(),
            },
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["user"]["username"], "alice");
        assert!(json["user"].get("password_hash").is_none());
    }

    #[test]
    fn login_request_debug_hides_password() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username":"alice","password":"p@ss"}"#).unwrap();
        assert!(!format!("{:?}", req).contains("p@ss"));
    }
}
