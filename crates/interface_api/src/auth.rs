//! Authentication and authorization

use std::str::FromStr;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::UserId;
use domain_identity::{Role, User};

use crate::error::ApiError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// User's roles
    pub roles: Vec<String>,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Requires role {0}")]
    MissingRole(Role),
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Issues an HS256 token for `user`
pub fn create_token(user: &User, secret: &str, expiration_secs: u64) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user.id.as_uuid().to_string(),
        email: user.email.clone(),
        roles: vec![user.role.as_str().to_string()],
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Checks if the token carries `role`
pub fn has_role(claims: &Claims, role: Role) -> bool {
    claims.roles.iter().any(|r| r == role.as_str())
}

/// The authenticated caller, taken from the claims the auth middleware stored
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        let id: UserId = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        let role = claims
            .roles
            .first()
            .and_then(|r| Role::from_str(r).ok())
            .ok_or(AuthError::InvalidToken)?;
        Ok(Self {
            id,
            email: claims.email.clone(),
            role,
        })
    }

    pub fn is_insurer(&self) -> bool {
        self.role == Role::Insurer
    }

    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AuthError::MissingRole(role).into())
        }
    }

    /// Owners see their own claims; insurers see all
    pub fn require_owner_or_insurer(&self, owner: UserId) -> Result<(), ApiError> {
        if self.id == owner || self.is_insurer() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("not the owner of this claim".to_string()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .ok_or(AuthError::MissingToken)?;
        Ok(AuthUser::from_claims(claims)?)
    }
}
