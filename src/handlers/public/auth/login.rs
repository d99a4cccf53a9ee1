use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::PublicUser;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{TokenService, UserService};

use super::utils::require_field;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /auth/login - authenticate with email and password.
///
/// Unknown email and wrong password return the same INVALID_CREDENTIALS
/// failure so the endpoint cannot be used to enumerate accounts.
pub async fn login(Json(payload): Json<LoginRequest>) -> ApiResult<Value> {
    let email = require_field(&payload.email, "email")?;
    let password = require_field(&payload.password, "password")?;

    let users = UserService::new().await?;
    let user = users.verify_credentials(&email, &password).await?;

    let tokens = TokenService::new().await?;
    let pair = tokens.issue_pair(&user).await?;

    Ok(ApiResponse::success(json!({
        "accessToken": pair.access_token,
        "refreshToken": pair.refresh_token,
        "user": PublicUser::from(&user),
    })))
}
