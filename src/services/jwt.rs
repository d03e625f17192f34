use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};
use crate::models::user::Role;

/// Signed identity claim set carried by every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stringified user id.
    pub sub: String,
    pub role: Role,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtManager {
    secret: String,
}

impl JwtManager {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn issue(&self, user_id: i64, role: Role, username: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| AppError::AuthenticationFailure(format!("Failed to generate token: {}", e)))
    }

    /// Verifies signature and structure only. Expired tokens still decode;
    /// callers must also check `is_live` before trusting the claims.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = false;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map_err(|e| AppError::AuthenticationFailure(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    pub fn is_live(&self, claims: &Claims) -> bool {
        Utc::now().timestamp() < claims.exp
    }
}

/// Identity attached to a request after the gate has validated its token.
/// Scoped to one request via extensions; the raw token is kept so outbound
/// calls to the Customer service can forward the caller's credential.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub token: String,
}

impl CurrentUser {
    pub fn from_claims(claims: Claims, token: String) -> Result<Self> {
        let user_id = claims.sub.parse::<i64>().map_err(|e| {
            AppError::AuthenticationFailure(format!("Invalid user id in token: {}", e))
        })?;

        Ok(Self {
            user_id,
            username: claims.username,
            role: claims.role,
            token,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
