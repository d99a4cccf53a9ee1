use std::collections::HashSet;

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::PublicUser;

/// Resolved authorization context for one request: the principal plus the
/// permission-code set derived from its role. Handlers receive this read-only;
/// nothing re-checks or mutates it downstream.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user: PublicUser,
    pub role_name: Option<String>,
    pub permissions: HashSet<String>,
}

impl AuthContext {
    /// Strict membership test. No wildcards, no hierarchy: a code either has
    /// a granting row behind it or it does not.
    pub fn has(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }
}

pub struct PermissionService {
    pool: PgPool,
}

impl PermissionService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::main_pool().await?,
        })
    }

    /// Load the principal together with its role and permission codes in one
    /// read-mostly join. Returns None when the user is missing or
    /// soft-deleted. Resolved fresh on every call - the guard layer must not
    /// cache, so a permission granted a moment ago is visible immediately.
    pub async fn resolve(&self, user_id: Uuid) -> Result<Option<AuthContext>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.name, u.email, u.role_id, r.name AS role_name, p.code
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            LEFT JOIN role_permissions rp ON rp.role_id = r.id
            LEFT JOIN permissions p ON p.id = rp.permission_id
            WHERE u.id = $1 AND u.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let first = match rows.first() {
            Some(row) => row,
            None => return Ok(None),
        };

        let user = PublicUser {
            id: first.get("id"),
            name: first.get("name"),
            email: first.get("email"),
            role_id: first.get("role_id"),
        };
        let role_name: Option<String> = first.get("role_name");

        let permissions = rows
            .iter()
            .filter_map(|row| row.get::<Option<String>, _>("code"))
            .collect::<HashSet<_>>();

        Ok(Some(AuthContext {
            user,
            role_name,
            permissions,
        }))
    }

    /// Whether a permission code exists in the catalog at all. Used by the
    /// guard to distinguish "user lacks the grant" from "nothing could ever
    /// grant this" in logs; the response is FORBIDDEN either way.
    pub async fn code_exists(&self, code: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM permissions WHERE code = $1) AS known")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<bool, _>("known"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(codes: &[&str]) -> AuthContext {
        AuthContext {
            user: PublicUser {
                id: Uuid::new_v4(),
                name: "Test".to_string(),
                email: "t@x.com".to_string(),
                role_id: None,
            },
            role_name: Some("instructor".to_string()),
            permissions: codes.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn membership_is_exact() {
        let ctx = context(&["courses.manage_own", "media.view"]);
        assert!(ctx.has("courses.manage_own"));
        assert!(!ctx.has("courses.manage_all"));
        // No prefix or wildcard semantics
        assert!(!ctx.has("courses"));
        assert!(!ctx.has("courses.*"));
    }

    #[test]
    fn empty_set_denies_everything() {
        let ctx = context(&[]);
        assert!(!ctx.has("media.view"));
    }
}
