use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::PublicUser;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{TokenService, UserService};

use super::utils::{require_field, validate_email, validate_password};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /auth/register - create an account and start a session.
///
/// New accounts receive the configured default role, so the first
/// `/api/auth/me` call already reflects a non-empty permission set.
pub async fn register(Json(payload): Json<RegisterRequest>) -> ApiResult<Value> {
    let name = require_field(&payload.name, "name")?;
    let email = require_field(&payload.email, "email")?;
    let password = require_field(&payload.password, "password")?;
    validate_email(&email)?;
    validate_password(&password)?;

    let users = UserService::new().await?;
    let user = users.register(&name, &email, &password).await?;

    let tokens = TokenService::new().await?;
    let pair = tokens.issue_pair(&user).await?;

    tracing::info!("Registered account {}", user.id);

    Ok(ApiResponse::created(json!({
        "accessToken": pair.access_token,
        "refreshToken": pair.refresh_token,
        "user": PublicUser::from(&user),
    })))
}
