use crate::errors::{EngineError, EngineResult};

/// Trait for configuration validation
pub trait ConfigValidator {
    fn validate(&self) -> EngineResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field_name: &str) -> EngineResult<()> {
        if value.trim().is_empty() {
            return Err(EngineError::Configuration(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// Validate that a count is reasonable
    pub fn validate_count(count: usize, field_name: &str) -> EngineResult<()> {
        if count == 0 {
            return Err(EngineError::Configuration(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > 10000 {
            return Err(EngineError::Configuration(format!(
                "{field_name} must be less than or equal to 10000"
            )));
        }
        Ok(())
    }

    /// Validate that a timeout is reasonable
    pub fn validate_timeout_seconds(timeout_seconds: u64) -> EngineResult<()> {
        if timeout_seconds == 0 {
            return Err(EngineError::Configuration(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if timeout_seconds > 86400 {
            return Err(EngineError::Configuration(
                "timeout_seconds must be less than or equal to 86400".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate a UTC offset expressed in minutes (UTC-14:00 .. UTC+14:00)
    pub fn validate_utc_offset_minutes(offset_minutes: i32) -> EngineResult<()> {
        if !(-14 * 60..=14 * 60).contains(&offset_minutes) {
            return Err(EngineError::Configuration(format!(
                "timezone_offset_minutes must be within ±840, got {offset_minutes}"
            )));
        }
        Ok(())
    }
}
