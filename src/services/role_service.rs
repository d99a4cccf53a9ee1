use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{Permission, Role};
use crate::error::ApiError;

const ROLE_COLUMNS: &str = "id, name, description, is_system, created_at, updated_at";

/// Role and permission-grant administration. Every mutation returns the ids
/// of users whose permission set changed; callers must revoke those users'
/// sessions so stale tokens cannot keep the old capabilities.
pub struct RoleService {
    pool: PgPool,
}

impl RoleService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self {
            pool: DatabaseManager::main_pool().await?,
        })
    }

    pub async fn list(&self) -> Result<Vec<Role>, ApiError> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY name");
        Ok(sqlx::query_as::<_, Role>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn find(&self, role_id: Uuid) -> Result<Option<Role>, ApiError> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1");
        Ok(sqlx::query_as::<_, Role>(&sql)
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn create(&self, name: &str, description: Option<&str>) -> Result<Role, ApiError> {
        let sql = format!(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING {ROLE_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Role>(&sql)
            .bind(name)
            .bind(description)
            .fetch_one(&self.pool)
            .await;

        match created {
            Ok(role) => Ok(role),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Err(ApiError::validation_error("A role with this name already exists", None))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Update name/description. System roles keep their seeded name.
    pub async fn update(
        &self,
        role_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Role, ApiError> {
        let role = self
            .find(role_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Role not found"))?;

        if role.is_system && name.is_some_and(|n| n != role.name) {
            return Err(ApiError::forbidden("System roles cannot be renamed"));
        }

        let sql = format!(
            "UPDATE roles SET name = COALESCE($2, name),
                              description = COALESCE($3, description),
                              updated_at = now()
             WHERE id = $1 RETURNING {ROLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Role>(&sql)
            .bind(role_id)
            .bind(name)
            .bind(description)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Delete a non-system role. Users holding it fall back to no role;
    /// their ids are returned for session revocation.
    pub async fn delete(&self, role_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        let role = self
            .find(role_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Role not found"))?;

        if role.is_system {
            return Err(ApiError::forbidden("System roles cannot be deleted"));
        }

        let affected = self.users_with_role(role_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE users SET role_id = NULL, updated_at = now() WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(affected)
    }

    /// Grant a permission to a role. Idempotent; the grant either way means
    /// every holder of the role must re-authenticate.
    pub async fn grant(&self, role_id: Uuid, permission_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        self.require_role_and_permission(role_id, permission_id).await?;

        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await?;

        self.users_with_role(role_id).await
    }

    pub async fn revoke(&self, role_id: Uuid, permission_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        self.require_role_and_permission(role_id, permission_id).await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await?;

        self.users_with_role(role_id).await
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, ApiError> {
        Ok(sqlx::query_as::<_, Permission>(
            "SELECT id, code, description, created_at FROM permissions ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn users_with_role(&self, role_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        let rows = sqlx::query("SELECT id FROM users WHERE role_id = $1 AND deleted_at IS NULL")
            .bind(role_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn require_role_and_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), ApiError> {
        if self.find(role_id).await?.is_none() {
            return Err(ApiError::not_found("Role not found"));
        }

        let known = sqlx::query("SELECT EXISTS(SELECT 1 FROM permissions WHERE id = $1) AS known")
            .bind(permission_id)
            .fetch_one(&self.pool)
            .await?;
        if !known.get::<bool, _>("known") {
            return Err(ApiError::not_found("Permission not found"));
        }

        Ok(())
    }
}
