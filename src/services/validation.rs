use anyhow::{anyhow, Result};
use regex::Regex;

use crate::database::entities::FieldType;

/// Service for input validation and sanitization
pub struct ValidationService;

impl ValidationService {
    /// Sanitize and validate a tier name
    pub fn validate_tier_name(name: &str) -> Result<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Tier name cannot be empty"));
        }

        if trimmed.len() > 100 {
            return Err(anyhow!("Tier name is too long (max 100 characters)"));
        }

        Ok(trimmed.to_string())
    }

    /// Sanitize and validate a field name
    pub fn validate_field_name(name: &str) -> Result<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Field name cannot be empty"));
        }

        if trimmed.len() > 100 {
            return Err(anyhow!("Field name is too long (max 100 characters)"));
        }

        Ok(trimmed.to_string())
    }

    /// Sanitize and validate a project or template name
    pub fn validate_project_name(name: &str) -> Result<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Name cannot be empty"));
        }

        if trimmed.len() > 100 {
            return Err(anyhow!("Name is too long (max 100 characters)"));
        }

        Ok(trimmed.to_string())
    }

    /// Normalize a newline-delimited dropdown option list: trim each line,
    /// drop blanks, require at least one remaining option.
    pub fn normalize_dropdown_options(raw: &str) -> Result<String> {
        let options: Vec<&str> = raw
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();

        if options.is_empty() {
            return Err(anyhow!("Dropdown fields require at least one option"));
        }

        Ok(options.join("\n"))
    }

    /// Validate a textual payload against its field type before storage.
    /// Types without a structured format accept any text.
    pub fn validate_text_value(
        field_type: FieldType,
        value: &str,
        options: Option<&str>,
    ) -> Result<()> {
        match field_type {
            FieldType::Email => {
                let regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
                    .map_err(|e| anyhow!("Failed to compile email regex: {}", e))?;
                if !regex.is_match(value) {
                    return Err(anyhow!("'{}' is not a valid email address", value));
                }
            }
            FieldType::Phone => {
                let regex = Regex::new(r"^\+?[0-9 ()\-]{3,20}$")
                    .map_err(|e| anyhow!("Failed to compile phone regex: {}", e))?;
                if !regex.is_match(value) {
                    return Err(anyhow!("'{}' is not a valid phone number", value));
                }
            }
            FieldType::Color => {
                let regex = Regex::new(r"^#[0-9a-fA-F]{6}$")
                    .map_err(|e| anyhow!("Failed to compile color regex: {}", e))?;
                if !regex.is_match(value) {
                    return Err(anyhow!("'{}' is not a valid hex color", value));
                }
            }
            FieldType::Url => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(anyhow!("'{}' is not a valid URL", value));
                }
            }
            FieldType::Date => {
                chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| anyhow!("'{}' is not a valid date (YYYY-MM-DD)", value))?;
            }
            FieldType::Time => {
                chrono::NaiveTime::parse_from_str(value, "%H:%M")
                    .or_else(|_| chrono::NaiveTime::parse_from_str(value, "%H:%M:%S"))
                    .map_err(|_| anyhow!("'{}' is not a valid time (HH:MM)", value))?;
            }
            FieldType::Datetime => {
                chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
                    .or_else(|_| {
                        chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                    })
                    .map_err(|_| anyhow!("'{}' is not a valid datetime", value))?;
            }
            FieldType::Dropdown => {
                if let Some(options) = options {
                    if !options.lines().any(|opt| opt.trim() == value) {
                        return Err(anyhow!("'{}' is not one of the dropdown options", value));
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_name_is_trimmed_and_non_empty() {
        assert_eq!(
            ValidationService::validate_tier_name("  Team A  ").unwrap(),
            "Team A"
        );
        assert!(ValidationService::validate_tier_name("   ").is_err());
        assert!(ValidationService::validate_tier_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn dropdown_options_drop_blank_lines() {
        let normalized =
            ValidationService::normalize_dropdown_options("Red\n\n  Green  \nBlue\n").unwrap();
        assert_eq!(normalized, "Red\nGreen\nBlue");
        assert!(ValidationService::normalize_dropdown_options("\n  \n").is_err());
    }

    #[test]
    fn email_and_color_formats_are_checked() {
        assert!(
            ValidationService::validate_text_value(FieldType::Email, "a@b.com", None).is_ok()
        );
        assert!(
            ValidationService::validate_text_value(FieldType::Email, "not-an-email", None)
                .is_err()
        );
        assert!(
            ValidationService::validate_text_value(FieldType::Color, "#a1b2c3", None).is_ok()
        );
        assert!(ValidationService::validate_text_value(FieldType::Color, "red", None).is_err());
    }

    #[test]
    fn dropdown_value_must_match_an_option() {
        let options = Some("Red\nGreen\nBlue");
        assert!(
            ValidationService::validate_text_value(FieldType::Dropdown, "Green", options).is_ok()
        );
        assert!(
            ValidationService::validate_text_value(FieldType::Dropdown, "Purple", options)
                .is_err()
        );
    }

    #[test]
    fn date_and_time_formats_are_checked() {
        assert!(
            ValidationService::validate_text_value(FieldType::Date, "2024-06-01", None).is_ok()
        );
        assert!(
            ValidationService::validate_text_value(FieldType::Date, "06/01/2024", None).is_err()
        );
        assert!(ValidationService::validate_text_value(FieldType::Time, "09:30", None).is_ok());
    }
}
