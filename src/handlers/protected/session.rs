use axum::Extension;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{AuditService, PermissionService, TokenService};

/// GET /api/auth/me - current principal with its live permission set.
///
/// Permissions are resolved fresh on every call; this is the endpoint
/// clients use to re-validate their local permission cache.
pub async fn me(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let permissions = PermissionService::new().await?;
    let context = permissions
        .resolve(auth_user.user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let mut codes: Vec<&String> = context.permissions.iter().collect();
    codes.sort();

    Ok(ApiResponse::success(json!({
        "user": context.user,
        "role": context.role_name,
        "permissions": codes,
    })))
}

/// DELETE /api/auth/session - log out by revoking every refresh token the
/// principal holds. The current access token stays valid until its short
/// expiry; nothing can be refreshed afterwards.
pub async fn logout(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let tokens = TokenService::new().await?;
    let revoked = tokens.revoke_all(auth_user.user_id).await.map_err(ApiError::from)?;

    if let Ok(audit) = AuditService::new().await {
        audit
            .record(
                Some(auth_user.user_id),
                "auth.logout",
                "user",
                Some(auth_user.user_id),
                None,
            )
            .await;
    }

    Ok(ApiResponse::success(json!({ "revoked": revoked })))
}
