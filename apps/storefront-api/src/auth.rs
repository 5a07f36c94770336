//! JWT authentication module.
//!
//! Handles session token generation and validation, password hashing, and
//! the request extractors that guard customer and admin routes.
//!
//! ```text
//! Authorization: Bearer <access token>
//!        │
//!        ▼
//! CurrentUser ──► any signed-in account
//! AdminUser   ──► role == admin, else 403
//! MaybeUser   ──► guest checkout; a bad token is still 401
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use stride_core::{User, UserRole};

use crate::error::ApiError;
use crate::state::AppState;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Account role at the time the token was issued
    pub role: UserRole,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type ("access" or "refresh")
    pub token_type: String,
}

/// Tokens handed out on login, registration and refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
    refresh_lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: String, access_lifetime_secs: i64, refresh_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
            refresh_lifetime_secs,
        }
    }

    fn generate(
        &self,
        user_id: &str,
        role: UserRole,
        token_type: &str,
        lifetime_secs: i64,
    ) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: token_type.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate {} token: {}", token_type, e)))
    }

    /// Generate an access token.
    pub fn generate_access_token(&self, user_id: &str, role: UserRole) -> Result<String, ApiError> {
        self.generate(user_id, role, ACCESS, self.access_lifetime_secs)
    }

    /// Generate a refresh token.
    pub fn generate_refresh_token(&self, user_id: &str, role: UserRole) -> Result<String, ApiError> {
        self.generate(user_id, role, REFRESH, self.refresh_lifetime_secs)
    }

    /// Access + refresh tokens for an account.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, ApiError> {
        Ok(TokenPair {
            access_token: self.generate_access_token(&user.id, user.role)?,
            refresh_token: self.generate_refresh_token(&user.id, user.role)?,
            token_type: "Bearer",
            expires_in: self.access_lifetime_secs,
        })
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != ACCESS {
            return Err(ApiError::unauthorized("Expected access token"));
        }

        Ok(claims)
    }

    /// Validate that a token is a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != REFRESH {
            return Err(ApiError::unauthorized("Expected refresh token"));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

/// Hashes a password with Argon2 and a random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Password hashing failed: {}", e)))
}

/// Checks a password against a stored PHC hash string.
pub fn verify_password(password_hash: &str, password: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| ApiError::internal(format!("Stored password hash is invalid: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// =============================================================================
// Extractors
// =============================================================================

/// The signed-in account behind an access token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Malformed Authorization header"))?;

    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        warn!(path = %parts.uri.path(), "Rejected session token: {}", e.message);
        e
    })?;

    Ok(Some(CurrentUser {
        id: claims.sub,
        role: claims.role,
    }))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?.ok_or_else(|| ApiError::unauthorized("Sign in required"))
    }
}

/// A signed-in account with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            warn!(user_id = %user.id, path = %parts.uri.path(), "Non-admin hit admin route");
            return Err(ApiError::forbidden("Admin access required"));
        }

        Ok(AdminUser(user))
    }
}

/// Optional session: `None` for guests.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate(parts, state)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret-test-secret-test-secret".to_string(), 3600, 86400)
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = manager();

        let access_token = manager
            .generate_access_token("user-001", UserRole::Admin)
            .unwrap();

        let claims = manager.validate_access_token(&access_token).unwrap();

        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_wrong_token_type() {
        let manager = manager();

        let access_token = manager
            .generate_access_token("user-001", UserRole::Customer)
            .unwrap();
        let refresh_token = manager
            .generate_refresh_token("user-001", UserRole::Customer)
            .unwrap();

        assert!(manager.validate_refresh_token(&access_token).is_err());
        assert!(manager.validate_access_token(&refresh_token).is_err());
        assert!(manager.validate_refresh_token(&refresh_token).is_ok());
    }

    #[test]
    fn test_expired_and_foreign_tokens_rejected() {
        let expired = JwtManager::new("test-secret-test-secret-test-secret".to_string(), -120, 86400)
            .generate_access_token("user-001", UserRole::Customer)
            .unwrap();
        assert!(manager().validate_access_token(&expired).is_err());

        let foreign = JwtManager::new("another-secret-another-secret-xx".to_string(), 3600, 86400)
            .generate_access_token("user-001", UserRole::Admin)
            .unwrap();
        assert!(manager().validate_access_token(&foreign).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct-horse").unwrap());
        assert!(!verify_password(&hash, "wrong-horse").unwrap());

        // Salted: same password, different hash
        assert_ne!(hash, hash_password("correct-horse").unwrap());
    }
}
