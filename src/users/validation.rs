use lazy_static::lazy_static;
use regex::Regex;

use super::error::RepoError;
use super::repo_types::{UserRegister, UserUpdate};

pub(crate) const MIN_PASSWORD_LEN: usize = 8;
pub(crate) const MAX_FULL_NAME_LEN: usize = 128;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

fn invalid(msg: impl Into<String>) -> RepoError {
    RepoError::Validation(msg.into())
}

fn check_username(username: &str) -> Result<(), RepoError> {
    if !is_valid_username(username) {
        return Err(invalid(
            "Username must be 3-32 characters of letters, digits, '_', '.' or '-'",
        ));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), RepoError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid("Password too short"));
    }
    Ok(())
}

fn check_full_name(full_name: &str) -> Result<(), RepoError> {
    if full_name.is_empty() {
        return Err(invalid("Full name is required"));
    }
    if full_name.chars().count() > MAX_FULL_NAME_LEN {
        return Err(invalid("Full name too long"));
    }
    Ok(())
}

impl UserRegister {
    /// Trims the text fields in place, then checks their shape.
    pub fn normalize_and_validate(&mut self) -> Result<(), RepoError> {
        self.username = self.username.trim().to_string();
        self.full_name = self.full_name.trim().to_string();
        check_username(&self.username)?;
        check_password(&self.password)?;
        check_full_name(&self.full_name)
    }
}

impl UserUpdate {
    pub fn normalize_and_validate(&mut self) -> Result<(), RepoError> {
        if self.is_empty() {
            return Err(invalid("Nothing to update"));
        }
        if let Some(username) = self.username.as_mut() {
            *username = username.trim().to_string();
            check_username(username)?;
        }
        if let Some(full_name) = self.full_name.as_mut() {
            *full_name = full_name.trim().to_string();
            check_full_name(full_name)?;
        }
        if let Some(password) = &self.password {
            check_password(password)?;
        }
        Ok(())
    }
}
