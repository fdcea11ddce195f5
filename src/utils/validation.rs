use crate::errors::{AppError, Result};
use regex::Regex;

/// Largest accepted ID document: 5 MiB.
pub const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

/// MIME types accepted for ID documents.
pub const ALLOWED_DOCUMENT_TYPES: [&str; 4] =
    ["image/jpeg", "image/jpg", "image/png", "application/pdf"];

pub struct Validator;

impl Validator {
    pub fn validate_email(email: &str) -> Result<()> {
        let email_regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .map_err(|e| AppError::InternalError(format!("Regex error: {}", e)))?;

        if !email_regex.is_match(email) {
            return Err(AppError::ValidationError("Invalid email format".to_string()));
        }

        if email.len() > 254 {
            return Err(AppError::ValidationError("Email too long".to_string()));
        }

        Ok(())
    }

    pub fn validate_display_name(name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Display name cannot be empty".to_string(),
            ));
        }
        if name.len() > 60 {
            return Err(AppError::ValidationError(
                "Display name must be less than 60 characters".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_password(password: &str) -> Result<()> {
        if password.len() < 8 {
            return Err(AppError::ValidationError(
                "Password must be at least 8 characters long".to_string(),
            ));
        }

        if password.len() > 128 {
            return Err(AppError::ValidationError(
                "Password must be less than 128 characters".to_string(),
            ));
        }

        let has_letter = password.chars().any(|c| c.is_alphabetic());
        let has_digit = password.chars().any(|c| c.is_numeric());

        if !has_letter || !has_digit {
            return Err(AppError::ValidationError(
                "Password must contain at least one letter and one digit".to_string(),
            ));
        }

        Ok(())
    }

    /// Gate an ID document before any storage or database write.
    /// Accepted: JPG, PNG, PDF, at most 5 MiB.
    pub fn validate_document(file_name: &str, content_type: &str, size: usize) -> Result<()> {
        Self::validate_file_name(file_name)?;

        if !ALLOWED_DOCUMENT_TYPES.contains(&content_type) {
            return Err(AppError::ValidationError(
                "Please select a valid file type (JPG, PNG, or PDF)".to_string(),
            ));
        }

        if size == 0 {
            return Err(AppError::ValidationError(
                "The selected file is empty".to_string(),
            ));
        }

        if size > MAX_DOCUMENT_BYTES {
            return Err(AppError::ValidationError(
                "File size must be less than 5MB".to_string(),
            ));
        }

        Ok(())
    }

    /// File names become blob-store path segments, so path separators and
    /// parent references are refused outright.
    pub fn validate_file_name(file_name: &str) -> Result<()> {
        if file_name.is_empty() || file_name.len() > 255 {
            return Err(AppError::ValidationError("Invalid file name".to_string()));
        }
        if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
            return Err(AppError::ValidationError("Invalid file name".to_string()));
        }
        Ok(())
    }

    /// A rejection must carry a non-empty reason.
    pub fn validate_rejection_reason(reason: &str) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(AppError::ValidationError(
                "A rejection reason is required".to_string(),
            ));
        }
        if reason.len() > 500 {
            return Err(AppError::ValidationError(
                "Rejection reason must be less than 500 characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_document_types_within_limit() {
        for ty in ALLOWED_DOCUMENT_TYPES {
            assert!(Validator::validate_document("id.jpg", ty, 2 * 1024 * 1024).is_ok());
        }
    }

    #[test]
    fn rejects_disallowed_mime_type() {
        assert!(Validator::validate_document("id.gif", "image/gif", 1024).is_err());
        assert!(Validator::validate_document("id.txt", "text/plain", 1024).is_err());
    }

    #[test]
    fn rejects_oversized_document() {
        assert!(Validator::validate_document("id.png", "image/png", MAX_DOCUMENT_BYTES + 1).is_err());
        assert!(Validator::validate_document("id.png", "image/png", MAX_DOCUMENT_BYTES).is_ok());
    }

    #[test]
    fn rejects_path_traversal_in_file_name() {
        assert!(Validator::validate_file_name("../secrets.png").is_err());
        assert!(Validator::validate_file_name("a/b.png").is_err());
        assert!(Validator::validate_file_name("passport.png").is_ok());
    }

    #[test]
    fn rejection_reason_must_be_non_empty() {
        assert!(Validator::validate_rejection_reason("").is_err());
        assert!(Validator::validate_rejection_reason("   ").is_err());
        assert!(Validator::validate_rejection_reason("blurry").is_ok());
    }

    #[test]
    fn email_and_password_rules() {
        assert!(Validator::validate_email("a@x.com").is_ok());
        assert!(Validator::validate_email("not-an-email").is_err());
        assert!(Validator::validate_password("secret12").is_ok());
        assert!(Validator::validate_password("short1").is_err());
        assert!(Validator::validate_password("lettersonly").is_err());
    }
}
