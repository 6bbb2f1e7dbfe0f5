//! Field validators shared by user and organization endpoints.

use validator::ValidateEmail;

pub const USER_STATUS_ACTIVE: &str = "ACTIVE";
pub const USER_STATUS_SUSPENDED: &str = "SUSPENDED";
pub const USER_STATUS_INACTIVE: &str = "INACTIVE";

pub const VALID_USER_STATUSES: &[&str] = &[
    USER_STATUS_ACTIVE,
    USER_STATUS_SUSPENDED,
    USER_STATUS_INACTIVE,
];

pub const MAX_FULL_NAME_LENGTH: usize = 200;

/// Minimum password length for new and changed passwords.
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.validate_email() {
        Ok(())
    } else {
        Err(format!("Invalid email address '{email}'"))
    }
}

/// Lower-case and trim so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_full_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err("Full name is required".to_string());
    }
    if len > MAX_FULL_NAME_LENGTH {
        return Err(format!(
            "Full name must be at most {MAX_FULL_NAME_LENGTH} characters"
        ));
    }
    Ok(())
}

pub fn validate_user_status(status: &str) -> Result<(), String> {
    if VALID_USER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(format!(
            "Invalid user status '{status}'. Must be one of: {}",
            VALID_USER_STATUSES.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("somchai@example.go.th").is_ok());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Admin@Example.COM "), "admin@example.com");
    }

    #[test]
    fn test_full_name() {
        assert!(validate_full_name(" ").is_err());
        assert!(validate_full_name("Somchai Jaidee").is_ok());
    }

    #[test]
    fn test_user_status() {
        assert!(validate_user_status("SUSPENDED").is_ok());
        assert!(validate_user_status("BANNED").is_err());
    }
}
