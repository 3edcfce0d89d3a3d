use argon2::{
    password_hash::{self, PasswordHash, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

fn hashing_error(stage: &'static str, e: password_hash::Error) -> anyhow::Error {
    error!(error = %e, stage, "argon2 failure");
    anyhow::anyhow!("{stage}: {e}")
}

/// One-way hash of `plain` as an Argon2id PHC string, salted per call.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = PasswordHash::generate(Argon2::default(), plain.as_bytes(), &salt)
        .map_err(|e| hashing_error("hash", e))?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when `stored` is not a PHC string.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| hashing_error("parse", e))?;
    Ok(parsed
        .verify_password(&[&Argon2::default()], plain.as_bytes())
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_and_differs_from_plaintext() {
        let hash = hash_password("p@ss").expect("hashing should succeed");
        assert_ne!(hash, "p@ss");
        assert!(!hash.contains("p@ss"));
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("p@ss", &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("p@ss").unwrap();
        let b = hash_password("p@ss").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("p@ss", &a).unwrap());
        assert!(verify_password("p@ss", &b).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(err.to_string().starts_with("parse"));
    }
}
