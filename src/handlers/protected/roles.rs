use axum::extract::Path;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AuditService, AuthContext, RoleService, TokenService};

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// GET /api/roles
pub async fn list(Extension(_ctx): Extension<AuthContext>) -> ApiResult<Value> {
    let roles = RoleService::new().await?;
    Ok(ApiResponse::success(json!({ "roles": roles.list().await? })))
}

/// GET /api/permissions - the full capability catalog
pub async fn permissions(Extension(_ctx): Extension<AuthContext>) -> ApiResult<Value> {
    let roles = RoleService::new().await?;
    Ok(ApiResponse::success(json!({
        "permissions": roles.list_permissions().await?
    })))
}

/// POST /api/roles
pub async fn create(
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<Value> {
    let name = match payload.name {
        Some(ref name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => return Err(ApiError::missing_fields("Missing required field 'name'")),
    };

    let roles = RoleService::new().await?;
    let role = roles.create(&name, payload.description.as_deref()).await?;

    audit(&ctx, "roles.create", Some(role.id), Some(json!({ "name": role.name }))).await;

    Ok(ApiResponse::created(json!({ "role": role })))
}

/// PUT /api/roles/:id
pub async fn update(
    Extension(ctx): Extension<AuthContext>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Value> {
    let roles = RoleService::new().await?;
    let role = roles
        .update(role_id, payload.name.as_deref(), payload.description.as_deref())
        .await?;

    audit(&ctx, "roles.update", Some(role.id), Some(json!({ "name": role.name }))).await;

    Ok(ApiResponse::success(json!({ "role": role })))
}

/// DELETE /api/roles/:id - delete a non-system role. Holders drop to no
/// role and their sessions are revoked.
pub async fn remove(
    Extension(ctx): Extension<AuthContext>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Value> {
    let roles = RoleService::new().await?;
    let affected = roles.delete(role_id).await?;

    revoke_sessions(&affected).await?;
    audit(
        &ctx,
        "roles.delete",
        Some(role_id),
        Some(json!({ "users_revoked": affected.len() })),
    )
    .await;

    Ok(ApiResponse::success(json!({ "deleted": true, "usersRevoked": affected.len() })))
}

/// POST /api/roles/:id/permissions/:permission_id
pub async fn grant(
    Extension(ctx): Extension<AuthContext>,
    Path((role_id, permission_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    let roles = RoleService::new().await?;
    let affected = roles.grant(role_id, permission_id).await?;

    revoke_sessions(&affected).await?;
    audit(
        &ctx,
        "roles.grant_permission",
        Some(role_id),
        Some(json!({ "permission_id": permission_id, "users_revoked": affected.len() })),
    )
    .await;

    Ok(ApiResponse::success(json!({ "granted": true, "usersRevoked": affected.len() })))
}

/// DELETE /api/roles/:id/permissions/:permission_id
pub async fn revoke(
    Extension(ctx): Extension<AuthContext>,
    Path((role_id, permission_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    let roles = RoleService::new().await?;
    let affected = roles.revoke(role_id, permission_id).await?;

    revoke_sessions(&affected).await?;
    audit(
        &ctx,
        "roles.revoke_permission",
        Some(role_id),
        Some(json!({ "permission_id": permission_id, "users_revoked": affected.len() })),
    )
    .await;

    Ok(ApiResponse::success(json!({ "revoked": true, "usersRevoked": affected.len() })))
}

/// A changed permission set means every holder's existing sessions would
/// keep acting on stale permissions; force them to re-authenticate.
async fn revoke_sessions(user_ids: &[Uuid]) -> Result<(), ApiError> {
    if user_ids.is_empty() {
        return Ok(());
    }

    let tokens = TokenService::new().await?;
    for user_id in user_ids {
        tokens.revoke_all(*user_id).await.map_err(ApiError::from)?;
    }
    Ok(())
}

async fn audit(ctx: &AuthContext, action: &str, entity_id: Option<Uuid>, changes: Option<Value>) {
    if let Ok(audit) = AuditService::new().await {
        audit
            .record(Some(ctx.user.id), action, "role", entity_id, changes)
            .await;
    }
}
