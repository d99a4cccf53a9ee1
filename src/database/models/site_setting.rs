use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SiteSetting {
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}
