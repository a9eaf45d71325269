use crate::error::ApiError;

const MAX_EMAIL_LEN: usize = 254;

/// Structural email check: one `@`, a non-empty local part, and a dotted
/// domain with no empty labels.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| {
            !label.is_empty() && !label.starts_with('-') && !label.ends_with('-')
        })
}

pub fn require_email(email: Option<&str>) -> Result<String, ApiError> {
    let email = email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("Email is required".into()))?;
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Invalid email format".into()));
    }
    Ok(email.to_string())
}

pub fn validate_signup(username: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::Validation(
            "Username must be between 3 and 32 characters".into(),
        ));
    }
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Invalid email format".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        for ok in ["a@b.co", "first.last+tag@mail.example.org", "x_y@sub-domain.io"] {
            assert!(is_valid_email(ok), "{ok} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "plainaddress",
            "@no-local.com",
            "no-domain@",
            "no-dot@localhost",
            "two@@ats.com",
            "a@b@c.com",
            "space in@mail.com",
            "a@.leading.dot",
            "a@trailing.dot.",
            "a@-dash.com",
        ] {
            assert!(!is_valid_email(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn require_email_distinguishes_missing_from_malformed() {
        assert_eq!(
            require_email(None).unwrap_err().to_string(),
            "Email is required"
        );
        assert_eq!(
            require_email(Some("")).unwrap_err().to_string(),
            "Email is required"
        );
        assert_eq!(
            require_email(Some("nope")).unwrap_err().to_string(),
            "Invalid email format"
        );
        assert_eq!(require_email(Some("a@b.co")).unwrap(), "a@b.co");
    }

    #[test]
    fn signup_rules() {
        assert!(validate_signup("alice", "a@b.co", "longenough").is_ok());
        assert!(validate_signup("al", "a@b.co", "longenough").is_err());
        assert!(validate_signup("alice", "bad", "longenough").is_err());
        assert!(validate_signup("alice", "a@b.co", "short").is_err());
    }
}
