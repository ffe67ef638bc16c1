//! Configuration validation

use crate::{ConfigError, Result};

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a value is present and not empty
    pub fn required(value: Option<&str>, field: &str) -> Result<()> {
        match value {
            Some(value) => Self::not_empty(value, field),
            None => Err(ConfigError::ValidationError(format!("{} is required", field))),
        }
    }

    /// Validate URL format
    pub fn is_url(value: &str, field: &str) -> Result<()> {
        if !value.starts_with("http://") && !value.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a valid URL",
                field
            )));
        }
        Ok(())
    }

    /// Validate that `lower` does not exceed `upper`
    pub fn ordered<T: PartialOrd>(lower: T, upper: T, lower_field: &str, upper_field: &str) -> Result<()> {
        if lower > upper {
            return Err(ConfigError::ValidationError(format!(
                "{} must not exceed {}",
                lower_field, upper_field
            )));
        }
        Ok(())
    }

    /// Validate that a number is positive
    pub fn positive(value: u64, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than zero",
                field
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("", "field").is_err());
        assert!(ConfigValidator::not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_required_validation() {
        assert!(ConfigValidator::required(Some("x"), "field").is_ok());
        let err = ConfigValidator::required(None, "token_url").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: token_url is required");
    }

    #[test]
    fn test_url_validation() {
        assert!(ConfigValidator::is_url("https://example.com", "url").is_ok());
        assert!(ConfigValidator::is_url("http://localhost:8080", "url").is_ok());
        assert!(ConfigValidator::is_url("example.com", "url").is_err());
    }

    #[test]
    fn test_ordered_validation() {
        assert!(ConfigValidator::ordered(1000, 60_000, "base_delay_ms", "max_delay_ms").is_ok());
        assert!(ConfigValidator::ordered(5, 5, "a", "b").is_ok());
        assert!(ConfigValidator::ordered(10, 5, "a", "b").is_err());
    }

    #[test]
    fn test_positive_validation() {
        assert!(ConfigValidator::positive(1, "timeout_ms").is_ok());
        assert!(ConfigValidator::positive(0, "timeout_ms").is_err());
    }
}
