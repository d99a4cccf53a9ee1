use chrono::Utc;
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::auth::{self, JwtError};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::User;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signature failure, expired token, unknown or already-rotated token.
    /// Deliberately coarse: the caller learns only that re-authentication is
    /// required, not which check tripped.
    #[error("invalid refresh token")]
    InvalidToken,
    #[error("owning user is missing or deactivated")]
    UserNotFound,
    #[error("signing secret not configured")]
    SigningKeyMissing,
    #[error("token encoding failed: {0}")]
    Jwt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<DatabaseError> for TokenError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlx(e) => TokenError::Database(e),
            other => TokenError::Jwt(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues access/refresh pairs and owns the server-side refresh-token
/// lifecycle: persistence, rotation-on-use, and revocation.
pub struct TokenService {
    pool: PgPool,
}

impl TokenService {
    pub async fn new() -> Result<Self, TokenError> {
        Ok(Self {
            pool: DatabaseManager::main_pool().await?,
        })
    }

    /// Issue a fresh pair for a user and persist the refresh half.
    /// The access token is stateless; only the refresh token gets a row.
    pub async fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        let access_token =
            auth::generate_access_token(user.id, &user.email).map_err(issue_error)?;
        let (refresh_token, expires_at) =
            auth::generate_refresh_token(user.id).map_err(issue_error)?;

        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user.id)
        .bind(auth::token_fingerprint(&refresh_token))
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new pair, retiring the presented one.
    ///
    /// The stored expiry is checked independently of the JWT's own `exp`
    /// claim; both are maintained separately and both must pass. Replaying a
    /// token that was already rotated fails: the lookup requires a live row,
    /// and the retire step requires this request to be the one that won it.
    pub async fn rotate(&self, presented: &str) -> Result<(User, TokenPair), TokenError> {
        let claims = auth::verify_refresh_token(presented).map_err(|e| match e {
            JwtError::MissingSecret => TokenError::SigningKeyMissing,
            _ => TokenError::InvalidToken,
        })?;

        let row = sqlx::query(
            r#"
            SELECT rt.id AS token_id, rt.expires_at AS token_expires_at,
                   u.id, u.name, u.email, u.password_hash, u.role_id,
                   u.created_at, u.updated_at, u.deleted_at
            FROM refresh_tokens rt
            JOIN users u ON u.id = rt.user_id
            WHERE rt.token_hash = $1 AND rt.deleted_at IS NULL
            "#,
        )
        .bind(auth::token_fingerprint(presented))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(TokenError::InvalidToken)?;

        let token_id: Uuid = row.get("token_id");
        let token_expires_at: chrono::DateTime<Utc> = row.get("token_expires_at");

        let user = User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            role_id: row.get("role_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            deleted_at: row.get("deleted_at"),
        };

        if user.deleted_at.is_some() {
            return Err(TokenError::UserNotFound);
        }
        if user.id != claims.sub {
            // Fingerprint collision with a foreign token; treat as forged
            tracing::warn!("refresh token subject mismatch for user {}", user.id);
            return Err(TokenError::InvalidToken);
        }
        if token_expires_at <= Utc::now() {
            return Err(TokenError::InvalidToken);
        }

        let access_token =
            auth::generate_access_token(user.id, &user.email).map_err(issue_error)?;
        let (refresh_token, expires_at) =
            auth::generate_refresh_token(user.id).map_err(issue_error)?;

        // Retire-old and activate-new as one unit so a crash in between
        // cannot strand a legitimately re-authenticating session.
        let mut tx = self.pool.begin().await?;

        let retired = sqlx::query(
            "UPDATE refresh_tokens SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(token_id)
        .execute(&mut *tx)
        .await?;

        if retired.rows_affected() == 0 {
            // A concurrent rotation of the same physical token won the race
            tx.rollback().await?;
            return Err(TokenError::InvalidToken);
        }

        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user.id)
        .bind(auth::token_fingerprint(&refresh_token))
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((
            user,
            TokenPair {
                access_token,
                refresh_token,
            },
        ))
    }

    /// Soft-delete every live refresh token owned by a user. Invoked on
    /// logout, password reset, and role/permission changes so stale sessions
    /// cannot keep acting on permissions the user no longer holds.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, TokenError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET deleted_at = now()
             WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn issue_error(err: JwtError) -> TokenError {
    match err {
        JwtError::MissingSecret => TokenError::SigningKeyMissing,
        other => TokenError::Jwt(other.to_string()),
    }
}
