use crate::error::ApiError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Pull a required string field out of an optional body slot.
/// Absent and blank are both MISSING_FIELDS.
pub fn require_field(value: &Option<String>, name: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ApiError::missing_fields(format!("Missing required field '{}'", name))),
    }
}

/// Cheap structural email check. Deliverability is the mailer's problem.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ApiError::validation_error("Invalid email format", None));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation_error(
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            None,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_blank_fields_are_missing() {
        assert_eq!(
            require_field(&None, "name").unwrap_err().error_code(),
            "MISSING_FIELDS"
        );
        assert_eq!(
            require_field(&Some("   ".to_string()), "name").unwrap_err().error_code(),
            "MISSING_FIELDS"
        );
        assert_eq!(require_field(&Some(" a ".to_string()), "name").unwrap(), "a");
    }

    #[test]
    fn rejects_structurally_bad_emails() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }

    #[test]
    fn rejects_short_passwords() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("secret123").is_ok());
    }
}
