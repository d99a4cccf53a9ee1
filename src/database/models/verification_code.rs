use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One-time 6-digit code bound to an email and a purpose. `used_at` is the
/// single irreversible state transition: once set, the code never authorizes
/// a second action.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VerificationCode {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Closed enumeration of code purposes. Unknown values from clients fail
/// with `INVALID_TYPE` at the parse boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    PasswordReset,
    EmailVerify,
}

impl CodePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePurpose::PasswordReset => "password_reset",
            CodePurpose::EmailVerify => "email_verify",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "password_reset" => Some(CodePurpose::PasswordReset),
            "email_verify" => Some(CodePurpose::EmailVerify),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_round_trips() {
        for purpose in [CodePurpose::PasswordReset, CodePurpose::EmailVerify] {
            assert_eq!(CodePurpose::parse(purpose.as_str()), Some(purpose));
        }
    }

    #[test]
    fn unknown_purpose_is_rejected() {
        assert_eq!(CodePurpose::parse("phone_verify"), None);
        assert_eq!(CodePurpose::parse(""), None);
        // Case-sensitive on purpose: codes are stored lowercase
        assert_eq!(CodePurpose::parse("PASSWORD_RESET"), None);
    }
}
