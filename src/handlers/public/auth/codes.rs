use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::CodePurpose;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AuditService, TokenService, UserService, VerificationService};

use super::utils::{require_field, validate_password};

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub purpose: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub purpose: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    pub password: Option<String>,
}

fn parse_purpose(raw: &Option<String>) -> Result<CodePurpose, ApiError> {
    let raw = require_field(raw, "type")?;
    CodePurpose::parse(&raw)
        .ok_or_else(|| ApiError::invalid_type(format!("Unknown verification type '{}'", raw)))
}

/// POST /auth/send-code - issue a 6-digit code for the email+type pair.
///
/// Responds 200 whether or not an account exists for the email; only the
/// resend throttle is surfaced, and it keys on the email itself.
pub async fn send_code(Json(payload): Json<SendCodeRequest>) -> ApiResult<Value> {
    let email = require_field(&payload.email, "email")?;
    let purpose = parse_purpose(&payload.purpose)?;

    let verification = VerificationService::new().await.map_err(ApiError::from)?;
    let code = verification.send(&email, purpose).await?;

    // Delivery belongs to the mailer; the code itself never goes in the
    // response body.
    tracing::debug!("Issued {} code for {}: {}", purpose.as_str(), email, code);

    Ok(ApiResponse::success(json!({ "sent": true })))
}

/// POST /auth/verify-code - consume a code.
///
/// Wrong code, expired code, and unknown email are indistinguishable to the
/// caller; the precise cause goes to internal logs only.
pub async fn verify_code(Json(payload): Json<VerifyCodeRequest>) -> ApiResult<Value> {
    let email = require_field(&payload.email, "email")?;
    let code = require_field(&payload.code, "code")?;
    let purpose = parse_purpose(&payload.purpose)?;

    let verification = VerificationService::new().await.map_err(ApiError::from)?;
    if let Err(e) = verification.verify(&email, &code, purpose).await {
        tracing::debug!("Code verification failed for {}: {}", email, e);
        return Err(e.into());
    }

    Ok(ApiResponse::success(json!({ "verified": true })))
}

/// POST /auth/reset-password - complete a password reset.
///
/// Accepts either an unused valid code or a code consumed by a verify-code
/// call moments ago; both paths end with the code used exactly once, the
/// new password stored, and every refresh token of the account revoked.
pub async fn reset_password(Json(payload): Json<ResetPasswordRequest>) -> ApiResult<Value> {
    let email = require_field(&payload.email, "email")?;
    let code = require_field(&payload.code, "code")?;
    let password = require_field(&payload.password, "password")?;
    validate_password(&password)?;

    let verification = VerificationService::new().await.map_err(ApiError::from)?;
    if let Err(e) = verification.redeem_for_reset(&email, &code).await {
        tracing::debug!("Password reset code rejected for {}: {}", email, e);
        return Err(e.into());
    }

    let users = UserService::new().await?;
    let user = match users.find_by_email_active(&email).await? {
        Some(user) => user,
        None => {
            // A valid code for a missing account; fail exactly like a bad
            // code so the endpoint leaks nothing about account existence.
            tracing::debug!("Reset code redeemed for nonexistent account {}", email);
            return Err(ApiError::verification_failed());
        }
    };

    users.set_password(user.id, &password).await?;

    let revoked = TokenService::new().await?.revoke_all(user.id).await.map_err(ApiError::from)?;
    tracing::info!("Password reset for {} revoked {} sessions", user.id, revoked);

    if let Ok(audit) = AuditService::new().await {
        audit
            .record(Some(user.id), "auth.password_reset", "user", Some(user.id), None)
            .await;
    }

    Ok(ApiResponse::success(json!({ "reset": true })))
}
