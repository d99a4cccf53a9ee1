use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::error::ApiError;

/// Authenticated principal extracted from a verified access token. Proves
/// authentication only; authorization happens in the permission guard.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.unwrap_or_default(),
        }
    }
}

/// Access-token middleware for every protected route. Distinguishes a
/// missing credential (MISSING_TOKEN) from a bad one (INVALID_TOKEN).
pub async fn access_token_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;

    let claims = auth::verify_access_token(&token).map_err(|e| {
        tracing::debug!("Access token rejected: {}", e);
        ApiError::invalid_token("Invalid or expired access token")
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::missing_token("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::missing_token("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        _ => Err(ApiError::missing_token(
            "Authorization header must use Bearer token format",
        )),
    }
}
