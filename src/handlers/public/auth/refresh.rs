use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::PublicUser;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::TokenService;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// POST /auth/refresh - exchange a refresh token for a new pair.
///
/// Rotation-on-use: the presented token is retired in the same transaction
/// that activates its replacement, and replaying it afterwards fails with
/// INVALID_TOKEN. There is no retry; a failed rotation means the caller
/// must authenticate again.
pub async fn refresh(Json(payload): Json<RefreshRequest>) -> ApiResult<Value> {
    let presented = match payload.refresh_token {
        Some(token) if !token.trim().is_empty() => token,
        _ => return Err(ApiError::missing_token("Missing refresh token")),
    };

    let tokens = TokenService::new().await?;
    let (user, pair) = tokens.rotate(&presented).await?;

    Ok(ApiResponse::success(json!({
        "accessToken": pair.access_token,
        "refreshToken": pair.refresh_token,
        "user": PublicUser::from(&user),
    })))
}
