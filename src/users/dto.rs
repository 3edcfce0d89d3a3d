use std::fmt;

use serde::{Deserialize, Serialize};

use super::repo_types::{User, UserRegister};

/// Request body for registration.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
    pub full_name: String,
}

impl RegisterRequest {
    /// Drops the confirmation after checking it.
    pub fn into_registration(self) -> Result<UserRegister, &'static str> {
        if let Some(confirm) = &self.confirm_password {
            if *confirm != self.password {
                return Err("Passwords must match");
            }
        }
        Ok(UserRegister {
            username: self.username,
            password: self.password,
            full_name: self.full_name,
        })
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

/// Response for list endpoints.
#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub count: usize,
}

impl From<Vec<User>> for UserList {
    fn from(users: Vec<User>) -> Self {
        Self {
            count: users.len(),
            users,
        }
    }
}
