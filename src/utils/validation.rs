use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref URL_SAFE_TOKEN: Regex = Regex::new(r"^[A-Za-z0-9_-]{16,128}$").unwrap();
    static ref PHONE_NUMBER: Regex = Regex::new(r"^\+?[0-9 ()\-]{6,20}$").unwrap();
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    error
}

pub fn validate_token_format(token: &str) -> Result<(), ValidationError> {
    if !URL_SAFE_TOKEN.is_match(token) {
        return Err(error("invalid_format", "The token format is invalid"));
    }

    Ok(())
}

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(error(
            "too_short",
            "The password must be at least 8 characters long",
        ));
    }

    if password.trim().is_empty() {
        return Err(error("blank", "The password must not be blank"));
    }

    Ok(())
}

pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    if !PHONE_NUMBER.is_match(phone) {
        return Err(error(
            "invalid_format",
            "The phone number may only contain digits, spaces, dashes and parentheses",
        ));
    }

    Ok(())
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "This field must not be blank"));
    }

    Ok(())
}

/// Emails are compared case-insensitively everywhere.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_format_accepts_generated_tokens() {
        let token = crate::utils::crypto::generate_token();
        assert!(validate_token_format(&token).is_ok());
        assert!(validate_token_format("short").is_err());
        assert!(validate_token_format("has spaces in it, not allowed").is_err());
    }

    #[test]
    fn password_strength_requires_eight_characters() {
        assert!(validate_password_strength("1234567").is_err());
        assert!(validate_password_strength("12345678").is_ok());
        assert!(validate_password_strength("        ").is_err());
    }

    #[test]
    fn phone_numbers() {
        assert!(validate_phone_number("+20 100 123 4567").is_ok());
        assert!(validate_phone_number("(02) 555-0101").is_ok());
        assert!(validate_phone_number("call me").is_err());
    }

    #[test]
    fn emails_are_case_folded() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }
}
