//! Authentication middleware for Axum
//!
//! Resolves the bearer token on every protected request back to a user row.
//! Every failure mode (missing header, bad signature, expired token, refresh
//! token on a protected route, unknown or deactivated subject) collapses to
//! a 401 response.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::json;

use super::jwt::{verify_token, AuthError, JwtConfig, TokenType};
use crate::infrastructure::database::entities::user;

/// Authentication state containing JWT config and database handle
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
    pub db: DatabaseConnection,
}

/// Authenticated user information resolved from a bearer token
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
}

/// Extract token from Authorization header
fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// JWT authentication middleware - requires a valid access token
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // Get Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let Some(auth_header) = auth_header else {
        return auth_error_response(AuthError::MissingToken);
    };

    let Some(token) = extract_token(&auth_header) else {
        return auth_error_response(AuthError::InvalidToken);
    };

    // Verify JWT token
    let claims = match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) => claims,
        Err(_) => return auth_error_response(AuthError::InvalidToken),
    };

    if claims.token_type != TokenType::Access {
        return auth_error_response(AuthError::InvalidToken);
    }

    if claims.is_expired() {
        return auth_error_response(AuthError::ExpiredToken);
    }

    // Resolve the subject to a user row
    let found = user::Entity::find()
        .filter(user::Column::Email.eq(&claims.sub))
        .one(&auth_state.db)
        .await;

    let user = match found {
        Ok(Some(user)) => user,
        Ok(None) => return auth_error_response(AuthError::UserNotFound),
        Err(e) => {
            tracing::error!("user lookup failed during authentication: {}", e);
            return auth_error_response(AuthError::InvalidToken);
        }
    };

    if !user.is_active {
        return auth_error_response(AuthError::InvalidCredentials);
    }

    // Add authenticated user to request extensions
    request.extensions_mut().insert(AuthenticatedUser {
        user_id: user.id,
        email: user.email,
    });

    next.run(request).await
}

/// Create an authentication error response
///
/// All authentication failures are 401 to the caller; the variant only
/// drives the message text.
fn auth_error_response(error: AuthError) -> Response {
    let message = match error {
        AuthError::MissingToken => "Missing authentication token",
        AuthError::InvalidToken => "Invalid authentication token",
        AuthError::ExpiredToken => "Token has expired",
        AuthError::InvalidCredentials => "Invalid credentials",
        AuthError::UserNotFound => "User not found",
    };

    let body = Json(json!({
        "success": false,
        "error": message
    }));

    (StatusCode::UNAUTHORIZED, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_token("bearer abc"), None);
        assert_eq!(extract_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_token(""), None);
    }
}
