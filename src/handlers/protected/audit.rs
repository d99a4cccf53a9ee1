use axum::extract::Query;
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AuditFilter, AuditService, AuthContext};

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub user_id: Option<Uuid>,
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub offset: Option<i64>,
}

/// GET /api/audit - newest-first page of audit rows, optionally filtered.
pub async fn list(
    Extension(_ctx): Extension<AuthContext>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Value> {
    let audit = AuditService::new().await?;
    let entries = audit
        .list(AuditFilter {
            user_id: query.user_id,
            entity_type: query.entity_type,
            action: query.action,
            offset: query.offset,
        })
        .await?;

    Ok(ApiResponse::success(json!({ "entries": entries })))
}
