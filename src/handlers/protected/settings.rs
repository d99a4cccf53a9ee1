use axum::{Extension, Json};
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{AuditService, AuthContext, SettingsService};

/// GET /api/settings - the current snapshot. Served from the bounded-TTL
/// cache; a concurrent write invalidates it, so staleness is capped at the
/// configured TTL.
pub async fn get(Extension(_auth): Extension<AuthUser>) -> ApiResult<Value> {
    let snapshot = SettingsService::instance().snapshot().await?;
    Ok(ApiResponse::success(json!({ "settings": snapshot.values })))
}

/// PUT /api/settings - upsert keys and invalidate the snapshot cache.
pub async fn put(
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    let entries: Map<String, Value> = match payload {
        Value::Object(map) if !map.is_empty() => map,
        Value::Object(_) => {
            return Err(ApiError::missing_fields("Settings body must contain at least one key"))
        }
        _ => {
            return Err(ApiError::validation_error(
                "Settings body must be a JSON object",
                None,
            ))
        }
    };

    let keys: Vec<String> = entries.keys().cloned().collect();
    SettingsService::instance().upsert(entries).await?;

    if let Ok(audit) = AuditService::new().await {
        audit
            .record(
                Some(ctx.user.id),
                "settings.update",
                "site_settings",
                None,
                Some(json!({ "keys": keys })),
            )
            .await;
    }

    Ok(ApiResponse::success(json!({ "updated": keys.len() })))
}
