use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::AuditLog;
use crate::error::ApiError;

/// Append-only audit trail. Handlers record an entry after a privileged
/// operation succeeds; the guard layer itself never writes here.
pub struct AuditService {
    pool: PgPool,
}

/// Optional filters for the audit listing endpoint.
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub user_id: Option<Uuid>,
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub offset: Option<i64>,
}

impl AuditService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self {
            pool: DatabaseManager::main_pool().await?,
        })
    }

    /// Best-effort append. A failed audit write is logged but never fails
    /// the operation it describes - the operation already committed.
    pub async fn record(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        entity_type: &str,
        entity_id: Option<Uuid>,
        changes: Option<Value>,
    ) {
        let result = sqlx::query(
            "INSERT INTO audit_logs (user_id, action, entity_type, entity_id, changes, status)
             VALUES ($1, $2, $3, $4, $5, 'success')",
        )
        .bind(user_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(changes)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to write audit log for {}: {}", action, e);
        }
    }

    pub async fn list(&self, filter: AuditFilter) -> Result<Vec<AuditLog>, ApiError> {
        let page_size = config::config().api.audit_page_size;

        let rows = sqlx::query_as::<_, AuditLog>(
            "SELECT id, user_id, action, entity_type, entity_id, changes, status, created_at
             FROM audit_logs
             WHERE ($1::uuid IS NULL OR user_id = $1)
               AND ($2::text IS NULL OR entity_type = $2)
               AND ($3::text IS NULL OR action = $3)
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5",
        )
        .bind(filter.user_id)
        .bind(filter.entity_type)
        .bind(filter.action)
        .bind(page_size)
        .bind(filter.offset.unwrap_or(0).max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Administrative cleanup-by-age: the only path that removes audit rows.
    pub async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
