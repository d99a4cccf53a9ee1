use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::error::ApiError;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role_id, created_at, updated_at, deleted_at";

/// Account lifecycle: registration, credential checks, soft deletion, and
/// role assignment. Users are never hard-deleted.
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self {
            pool: DatabaseManager::main_pool().await?,
        })
    }

    /// Create an account with the configured default role.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, ApiError> {
        let security = &config::config().security;
        let password_hash = bcrypt::hash(password, security.bcrypt_cost).map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::internal_server_error("Registration temporarily unavailable")
        })?;

        let sql = format!(
            "INSERT INTO users (name, email, password_hash, role_id)
             VALUES ($1, $2, $3, (SELECT id FROM roles WHERE name = $4))
             RETURNING {USER_COLUMNS}"
        );

        let inserted = sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email)
            .bind(&password_hash)
            .bind(&security.default_role)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Err(ApiError::email_exists())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up by email and verify the password. Unknown email and wrong
    /// password produce the same failure.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let user = self
            .find_by_email_active(email)
            .await?
            .ok_or_else(ApiError::invalid_credentials)?;

        let matches = bcrypt::verify(password, &user.password_hash).map_err(|e| {
            tracing::error!("Password verification failed: {}", e);
            ApiError::internal_server_error("Login temporarily unavailable")
        })?;

        if !matches {
            return Err(ApiError::invalid_credentials());
        }

        Ok(user)
    }

    pub async fn find_active(&self, user_id: Uuid) -> Result<Option<User>, ApiError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_by_email_active(&self, email: &str) -> Result<Option<User>, ApiError> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_active(&self) -> Result<Vec<User>, ApiError> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY created_at");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    /// Mark an account removed. Returns false when no live account matched.
    pub async fn soft_delete(&self, user_id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = now(), updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Assign or clear a user's role. The caller is responsible for revoking
    /// the user's sessions afterwards.
    pub async fn assign_role(&self, user_id: Uuid, role_id: Option<Uuid>) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE users SET role_id = $2, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_password(&self, user_id: Uuid, password: &str) -> Result<(), ApiError> {
        let password_hash =
            bcrypt::hash(password, config::config().security.bcrypt_cost).map_err(|e| {
                tracing::error!("Password hashing failed: {}", e);
                ApiError::internal_server_error("Password reset temporarily unavailable")
            })?;

        sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(&password_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
