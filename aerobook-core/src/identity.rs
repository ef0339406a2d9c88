use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::Deserialize;

use crate::{required, CoreError, CoreResult};

pub const MAX_USERNAME_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub id: i64,
    pub username: String,
    /// argon2id PHC string.
    pub hash: String,
}

impl AdminAccount {
    pub fn verify(&self, password: &str) -> bool {
        verify_password(password, &self.hash)
    }
}

/// Username/password pair posted by the create-account and login forms.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Trimmed username; the password is taken as typed.
    pub fn validate(&self) -> CoreResult<(String, &str)> {
        let username = required("Username", &self.username)?;
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(CoreError::Validation(format!(
                "Username must be at most {} characters.",
                MAX_USERNAME_LEN
            )));
        }
        if self.password.is_empty() {
            return Err(CoreError::Validation("Password is required.".to_string()));
        }
        Ok((username, &self.password))
    }
}

pub fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::Internal(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}
