use axum::extract::Path;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::PublicUser;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AuditService, AuthContext, RoleService, TokenService, UserService};

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    /// Null clears the role.
    #[serde(rename = "roleId")]
    pub role_id: Option<Uuid>,
}

/// GET /api/users - live accounts only; soft-deleted rows never surface.
pub async fn list(Extension(_ctx): Extension<AuthContext>) -> ApiResult<Value> {
    let users = UserService::new().await?;
    let list: Vec<PublicUser> = users.list_active().await?.iter().map(PublicUser::from).collect();
    Ok(ApiResponse::success(json!({ "users": list })))
}

/// DELETE /api/users/:id - soft delete plus session revocation. The row
/// stays for referential integrity; the account can never refresh again.
pub async fn remove(
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Value> {
    let users = UserService::new().await?;
    if !users.soft_delete(user_id).await? {
        return Err(ApiError::user_not_found());
    }

    let revoked = TokenService::new().await?.revoke_all(user_id).await.map_err(ApiError::from)?;

    if let Ok(audit) = AuditService::new().await {
        audit
            .record(
                Some(ctx.user.id),
                "users.delete",
                "user",
                Some(user_id),
                Some(json!({ "sessions_revoked": revoked })),
            )
            .await;
    }

    Ok(ApiResponse::success(json!({ "deleted": true })))
}

/// PUT /api/users/:id/role - assign or clear a role. The target's sessions
/// are revoked so the next login reflects the new permission set.
pub async fn assign_role(
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<Value> {
    if let Some(role_id) = payload.role_id {
        let roles = RoleService::new().await?;
        if roles.find(role_id).await?.is_none() {
            return Err(ApiError::not_found("Role not found"));
        }
    }

    let users = UserService::new().await?;
    if !users.assign_role(user_id, payload.role_id).await? {
        return Err(ApiError::user_not_found());
    }

    TokenService::new().await?.revoke_all(user_id).await.map_err(ApiError::from)?;

    if let Ok(audit) = AuditService::new().await {
        audit
            .record(
                Some(ctx.user.id),
                "users.assign_role",
                "user",
                Some(user_id),
                Some(json!({ "role_id": payload.role_id })),
            )
            .await;
    }

    Ok(ApiResponse::success(json!({ "updated": true })))
}
