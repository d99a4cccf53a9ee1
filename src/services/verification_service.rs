use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::CodePurpose;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("no matching code")]
    NoMatch,
    #[error("code expired")]
    Expired,
    #[error("code already used")]
    AlreadyUsed,
    #[error("a code was issued too recently")]
    Throttled,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<DatabaseError> for VerificationError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlx(e) => VerificationError::Database(e),
            other => VerificationError::Database(sqlx::Error::Protocol(other.to_string())),
        }
    }
}

/// Issues and consumes single-use 6-digit codes. Delivery (email) is a
/// collaborator concern; this service only owns the stored lifecycle.
pub struct VerificationService {
    pool: PgPool,
}

impl VerificationService {
    pub async fn new() -> Result<Self, VerificationError> {
        Ok(Self {
            pool: DatabaseManager::main_pool().await?,
        })
    }

    /// Generate and persist a code for the email+purpose pair. Refuses to
    /// issue again within the configured resend window.
    pub async fn send(&self, email: &str, purpose: CodePurpose) -> Result<String, VerificationError> {
        let security = &config::config().security;

        let last_issued: Option<DateTime<Utc>> = sqlx::query(
            "SELECT created_at FROM verification_codes
             WHERE email = $1 AND purpose = $2
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(email)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(|row| row.get("created_at"));

        if let Some(last) = last_issued {
            if Utc::now() - last < Duration::seconds(security.verification_resend_seconds) {
                return Err(VerificationError::Throttled);
            }
        }

        let code = generate_code();
        let expires_at = Utc::now() + Duration::minutes(security.verification_code_minutes);

        sqlx::query(
            "INSERT INTO verification_codes (email, code, purpose, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(email)
        .bind(&code)
        .bind(purpose.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(code)
    }

    /// Consume a code: the UPDATE's `used_at IS NULL` predicate is the
    /// single irreversible transition, so of two concurrent verifiers only
    /// one can win. The returned error distinguishes causes for internal
    /// logging; the HTTP layer flattens them all to one generic failure.
    pub async fn verify(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<(), VerificationError> {
        let consumed = sqlx::query(
            "UPDATE verification_codes SET used_at = now()
             WHERE email = $1 AND code = $2 AND purpose = $3
               AND used_at IS NULL AND expires_at > now()
             RETURNING id",
        )
        .bind(email)
        .bind(code)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if consumed.is_some() {
            return Ok(());
        }

        // Figure out which check failed, for logs only
        let row = sqlx::query(
            "SELECT used_at, expires_at FROM verification_codes
             WHERE email = $1 AND code = $2 AND purpose = $3
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(email)
        .bind(code)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) if row.get::<Option<DateTime<Utc>>, _>("used_at").is_some() => {
                Err(VerificationError::AlreadyUsed)
            }
            Some(_) => Err(VerificationError::Expired),
            None => Err(VerificationError::NoMatch),
        }
    }

    /// Accept a reset code through either convergence path: an unused valid
    /// code presented directly (consumed now), or a code already consumed by
    /// a verify call within the trust window. Either way the code ends up
    /// used exactly once.
    pub async fn redeem_for_reset(&self, email: &str, code: &str) -> Result<(), VerificationError> {
        match self.verify(email, code, CodePurpose::PasswordReset).await {
            Ok(()) => Ok(()),
            Err(VerificationError::AlreadyUsed) => {
                let window =
                    Duration::minutes(config::config().security.reset_trust_window_minutes);
                let trusted = sqlx::query(
                    "SELECT EXISTS(
                         SELECT 1 FROM verification_codes
                         WHERE email = $1 AND code = $2 AND purpose = $3
                           AND used_at IS NOT NULL AND used_at > $4
                     ) AS trusted",
                )
                .bind(email)
                .bind(code)
                .bind(CodePurpose::PasswordReset.as_str())
                .bind(Utc::now() - window)
                .fetch_one(&self.pool)
                .await?;

                if trusted.get::<bool, _>("trusted") {
                    Ok(())
                } else {
                    Err(VerificationError::AlreadyUsed)
                }
            }
            Err(other) => Err(other),
        }
    }
}

/// Zero-padded 6-digit numeric code.
fn generate_code() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
