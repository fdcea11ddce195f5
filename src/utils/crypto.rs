use crate::errors::{AppError, Result};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

pub struct PasswordManager;

impl PasswordManager {
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::InternalError(format!("Invalid password hash: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = PasswordManager::hash_password("secret12").unwrap();
        assert!(PasswordManager::verify_password("secret12", &hash).unwrap());
        assert!(!PasswordManager::verify_password("wrong-pass", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = PasswordManager::hash_password("secret12").unwrap();
        let b = PasswordManager::hash_password("secret12").unwrap();
        assert_ne!(a, b);
    }
}
