use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub display_name: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

pub struct JwtManager {
    secret: String,
}

impl JwtManager {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn generate_token(&self, user_id: &Uuid, email: &str, display_name: &str) -> Result<String> {
        let now = Utc::now();
        let expiration = now + Duration::hours(24); // Token expires in 24 hours
        let jti = Uuid::new_v4().to_string(); // Unique token ID

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            display_name: display_name.to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            jti,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| AppError::AuthenticationError(format!("Failed to generate token: {}", e)))?;

        Ok(token)
    }

    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

        Ok(token_data)
    }
}

#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub token_id: String,
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|e| AppError::ValidationError(format!("Invalid user ID in token: {}", e)))?;

        Ok(Self {
            user_id,
            email: claims.email,
            display_name: claims.display_name,
            token_id: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_validate() {
        let manager = JwtManager::new("test-secret".to_string());
        let user_id = Uuid::new_v4();
        let token = manager.generate_token(&user_id, "a@x.com", "A").unwrap();

        let data = manager.validate_token(&token).unwrap();
        let user = AuthenticatedUser::try_from(data.claims).unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email, "a@x.com");
        assert!(!user.token_id.is_empty());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let manager = JwtManager::new("test-secret".to_string());
        let token = manager
            .generate_token(&Uuid::new_v4(), "a@x.com", "A")
            .unwrap();

        let other = JwtManager::new("other-secret".to_string());
        assert!(other.validate_token(&token).is_err());
    }
}
