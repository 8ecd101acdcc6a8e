//! JWT Token handling
//!
//! Two token kinds are issued: short-lived access tokens that authorize
//! API requests, and longer-lived refresh tokens that can only be exchanged
//! for a new token pair. The kind is carried in the `token_type` claim so
//! one can never stand in for the other.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Access token expiration time in minutes
    pub access_expiration_minutes: i64,
    /// Refresh token expiration time in days
    pub refresh_expiration_days: i64,
    /// Issuer claim
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "super-secret-key-change-in-production".to_string()),
            access_expiration_minutes: std::env::var("JWT_ACCESS_EXPIRATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            refresh_expiration_days: 7,
            issuer: "contacts-service".to_string(),
        }
    }
}

/// Token kind carried in the `token_type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Token kind (`access` or `refresh`)
    pub token_type: TokenType,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create new claims for a subject with the given lifetime
    pub fn new(subject: &str, token_type: TokenType, ttl: Duration, config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + ttl;

        Self {
            sub: subject.to_string(),
            token_type,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

fn sign(claims: &Claims, config: &JwtConfig) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Create a short-lived access token for a subject
pub fn create_access_token(
    subject: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let ttl = Duration::minutes(config.access_expiration_minutes);
    sign(&Claims::new(subject, TokenType::Access, ttl, config), config)
}

/// Create a refresh token for a subject
pub fn create_refresh_token(
    subject: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let ttl = Duration::days(config.refresh_expiration_days);
    sign(&Claims::new(subject, TokenType::Refresh, ttl, config), config)
}

/// Verify and decode a JWT token
///
/// Signature, issuer and expiry are all checked here; callers still have to
/// check the `token_type` claim against what they expect.
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

/// Errors that can occur during authentication
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Token is missing
    MissingToken,
    /// Token is invalid
    InvalidToken,
    /// Token has expired
    ExpiredToken,
    /// Invalid credentials
    InvalidCredentials,
    /// User not found
    UserNotFound,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingToken => write!(f, "Missing authentication token"),
            Self::InvalidToken => write!(f, "Invalid authentication token"),
            Self::ExpiredToken => write!(f, "Token has expired"),
            Self::InvalidCredentials => write!(f, "Invalid credentials"),
            Self::UserNotFound => write!(f, "User not found"),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "unit-test-secret".to_string(),
            access_expiration_minutes: 15,
            refresh_expiration_days: 7,
            issuer: "contacts-service".to_string(),
        }
    }

    #[test]
    fn test_create_and_verify_access_token() {
        let config = test_config();
        let token = create_access_token("alice@example.com", &config).unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.iss, "contacts-service");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_refresh_token_carries_its_kind() {
        let config = test_config();
        let token = create_refresh_token("alice@example.com", &config).unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_invalid_token() {
        let config = test_config();
        let result = verify_token("invalid-token", &config);
        assert!(result.is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let config = test_config();
        let mut token = create_access_token("alice@example.com", &config).unwrap();
        token.push('x');
        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let config = test_config();
        let token = create_access_token("alice@example.com", &config).unwrap();

        let mut other = test_config();
        other.secret = "a-different-secret".to_string();
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = test_config();
        // Past the default 60s decode leeway
        let claims = Claims::new(
            "alice@example.com",
            TokenType::Access,
            Duration::minutes(-5),
            &config,
        );
        let token = sign(&claims, &config).unwrap();

        assert!(claims.is_expired());
        assert!(verify_token(&token, &config).is_err());
    }
}
