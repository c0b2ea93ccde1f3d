//! Free-text field validation.

use crate::error::{GuidanceError, Result};

/// Trim a required text field, rejecting blank values.
///
/// # Errors
///
/// Returns `GuidanceError::Validation` naming the field if it is blank.
pub fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GuidanceError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field, mapping blank values to `None`.
#[must_use]
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  Asha ").unwrap(), "Asha");
        assert_eq!(
            required("name", " \t"),
            Err(GuidanceError::Validation("name is required".into()))
        );
    }

    #[test]
    fn optional_maps_blank_to_none() {
        assert_eq!(optional(None), None);
        assert_eq!(optional(Some("")), None);
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" Ravi ")), Some("Ravi".to_string()));
    }
}
