use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Server-side record of an issued refresh token. `token_hash` is the
/// SHA-256 fingerprint of the JWT string; the raw token is never stored.
/// `deleted_at` marks both explicit revocation and rotation - a row with it
/// set must never authorize another rotation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
