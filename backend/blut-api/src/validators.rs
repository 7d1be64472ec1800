use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Input validation helpers shared by the request DTOs

static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Hardcoded pattern; a failure here is a source bug.
    Regex::new(r"^[A-Za-z0-9_]{3,32}$").expect("hardcoded username regex is invalid")
});

/// 3-32 characters of letters, digits and underscores
pub fn is_valid_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
}

/// validator crate compatible custom validator for username shape
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if is_valid_username(username) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_username");
        err.message =
            Some("Username must be 3-32 characters of letters, digits or underscores".into());
        Err(err)
    }
}

/// Rejects strings that are empty once trimmed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Mask an email for logs: `a***@example.com`
pub fn mask_email(email: &str) -> String {
    match email.find('@') {
        Some(at) if at > 2 => format!("{}***{}", &email[..1], &email[at..]),
        Some(at) => format!("**{}", &email[at..]),
        None => "***@***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_shape() {
        assert!(is_valid_username("alice_01"));
        assert!(is_valid_username("abc"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("dash-name"));
        assert!(!is_valid_username(&"x".repeat(33)));
    }

    #[test]
    fn test_not_blank() {
        assert!(validate_not_blank("  hi ").is_ok());
        assert!(validate_not_blank(" \n ").is_err());
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("alice@example.com"), "a***@example.com");
        assert_eq!(mask_email("al@example.com"), "**@example.com");
        assert_eq!(mask_email("nonsense"), "***@***");
    }
}
