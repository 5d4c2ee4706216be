use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;

/// Claims carried by the storefront session token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id, stringified
    pub sub: String,
    pub email: String,
    pub exp: u64,
}

/// Validates HS256 bearer tokens issued by the storefront session layer.
///
/// Token issuance lives outside this service; this side only needs the
/// shared secret.
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str, leeway: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway.as_secs();

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<AuthenticatedUser> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        let user_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;

        Ok(AuthenticatedUser {
            user_id,
            email: data.claims.email,
        })
    }
}
