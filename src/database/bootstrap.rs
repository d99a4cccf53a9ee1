use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use crate::config;

/// Permission catalog installed at seed time. The guard layer never
/// special-cases any of these codes; adding a capability is an insert here
/// (or directly in the database), not a code change.
pub const PERMISSIONS: &[(&str, &str)] = &[
    ("courses.manage_all", "Create, edit, and delete any course"),
    ("courses.manage_own", "Create and edit own courses"),
    ("courses.enroll", "Enroll in published courses"),
    ("enrollments.manage", "Manage enrollments across the platform"),
    ("earnings.view", "View instructor earnings reports"),
    ("media.view", "Browse the media library"),
    ("media.manage", "Upload and organize media"),
    ("roles.manage", "Manage roles and their permissions"),
    ("users.manage", "Manage user accounts and role assignments"),
    ("audit.view", "Read the audit log"),
    ("settings.manage", "Change site-wide settings"),
];

/// Baseline roles and their grants. `admin` is a system role and receives
/// every permission in the catalog.
const ROLES: &[(&str, &str, bool)] = &[
    ("admin", "Platform administrators", true),
    ("instructor", "Course authors", false),
    ("student", "Enrolled learners", false),
];

const ROLE_GRANTS: &[(&str, &[&str])] = &[
    (
        "instructor",
        &["courses.manage_own", "earnings.view", "media.view", "media.manage"],
    ),
    ("student", &["courses.enroll", "media.view"]),
];

/// Apply the embedded schema. Statements are idempotent, so re-running the
/// seed command against an existing database is safe.
pub async fn apply_schema(pool: &PgPool) -> anyhow::Result<()> {
    let schema = include_str!("schema.sql");
    for statement in schema.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Applied database schema");
    Ok(())
}

/// Install the permission catalog, baseline roles, and their grants.
pub async fn seed_baseline(pool: &PgPool) -> anyhow::Result<()> {
    for (code, description) in PERMISSIONS {
        sqlx::query(
            "INSERT INTO permissions (code, description) VALUES ($1, $2)
             ON CONFLICT (code) DO NOTHING",
        )
        .bind(code)
        .bind(description)
        .execute(pool)
        .await?;
    }

    for (name, description, is_system) in ROLES {
        sqlx::query(
            "INSERT INTO roles (name, description, is_system) VALUES ($1, $2, $3)
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .bind(is_system)
        .execute(pool)
        .await?;
    }

    // admin receives the whole catalog
    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id)
         SELECT r.id, p.id FROM roles r CROSS JOIN permissions p
         WHERE r.name = 'admin'
         ON CONFLICT DO NOTHING",
    )
    .execute(pool)
    .await?;

    for (role, grants) in ROLE_GRANTS {
        for code in *grants {
            sqlx::query(
                "INSERT INTO role_permissions (role_id, permission_id)
                 SELECT r.id, p.id FROM roles r, permissions p
                 WHERE r.name = $1 AND p.code = $2
                 ON CONFLICT DO NOTHING",
            )
            .bind(role)
            .bind(code)
            .execute(pool)
            .await?;
        }
    }

    info!("Seeded baseline roles and permissions");
    Ok(())
}

/// Create the initial admin account unless one already exists for the email.
/// Returns true when a new account was created.
pub async fn seed_admin(pool: &PgPool, email: &str, password: &str) -> anyhow::Result<bool> {
    let existing: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Ok(false);
    }

    let cost = config::config().security.bcrypt_cost;
    let password_hash = bcrypt::hash(password, cost).context("password hashing failed")?;

    sqlx::query(
        "INSERT INTO users (name, email, password_hash, role_id)
         SELECT 'Administrator', $1, $2, r.id FROM roles r WHERE r.name = 'admin'",
    )
    .bind(email)
    .bind(&password_hash)
    .execute(pool)
    .await?;

    info!("Seeded admin account {}", email);
    Ok(true)
}
