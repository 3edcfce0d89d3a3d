mod dto;
mod error;
pub mod handlers;
#[cfg(test)]
pub(crate) mod memory;
mod pg;
mod repo;
mod repo_types;
mod store;
mod validation;

use crate::state::AppState;
use axum::Router;

pub use dto::RegisterRequest;
pub use error::RepoError;
pub use repo::{create_user, get_user_by_username};
#[cfg(test)]
pub(crate) use repo::{delete_user, update_user};
#[cfg(test)]
pub(crate) use repo_types::{UserRegister, UserUpdate};
pub use repo_types::{User, UserInDb};
pub use store::ConnectionProvider;

pub fn router() -> Router<AppState> {
    handlers::users_routes()
}
