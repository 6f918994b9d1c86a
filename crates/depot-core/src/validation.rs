//! # Validation
//!
//! Checks that run on a request before the ledger opens a transaction. The
//! schema repeats the numeric ones as CHECK constraints.
//!
//! ```text
//! request ──► validation (here) ──► StockLedger tx ──► SQLite CHECK / UNIQUE / FK
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use depot_core::validation::{validate_code, validate_quantity};
//!
//! // Validate a scanned code before looking it up
//! validate_code("item code", "SCREW-M4").unwrap();
//!
//! // Validate quantity before recording a movement
//! validate_quantity(5).unwrap();
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::{MAX_CODE_LEN, MAX_NAME_LEN, MAX_QUANTITY};

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of free-text fields (remark, purpose, supplier, ...).
pub const MAX_TEXT_LEN: usize = 1000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an item or location code.
///
/// ## Rules
/// - Must not be empty
/// - At most `MAX_CODE_LEN` characters
/// - Letters, digits, hyphens, underscores and dots only
///
/// ## Example
/// ```rust
/// use depot_core::validation::validate_code;
///
/// assert!(validate_code("code", "SCREW-M4").is_ok());
/// assert!(validate_code("code", "A-01.3").is_ok());
/// assert!(validate_code("code", "").is_err());
/// assert!(validate_code("code", "has space").is_err());
/// ```
pub fn validate_code(field: &str, code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores, and dots"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a display name.
///
/// ## Rules
/// - Must not be empty
/// - At most `MAX_NAME_LEN` characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an optional free-text field. `None` always passes.
pub fn validate_optional_text(field: &str, text: Option<&str>) -> ValidationResult<()> {
    match text {
        Some(text) if text.chars().count() > MAX_TEXT_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates a non-empty reference such as an operator or record id.
///
/// Ids are opaque; only presence is checked.
pub fn validate_reference(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Quantities on every record and movement lie in `1..=MAX_QUANTITY`.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a low-stock threshold.
///
/// ## Example
/// ```rust
/// use depot_core::validation::validate_min_stock;
///
/// assert!(validate_min_stock(0).is_ok());
/// assert!(validate_min_stock(10).is_ok());
/// assert!(validate_min_stock(-1).is_err());
/// ```
pub fn validate_min_stock(min_stock: i64) -> ValidationResult<()> {
    if min_stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "min_stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates an inclusive date range where either end may be open.
pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ValidationResult<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "date range".to_string(),
                reason: format!("start {} is after end {}", from, to),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_code() {
        assert!(validate_code("code", "SCREW-M4").is_ok());
        assert!(validate_code("code", "A-01").is_ok());
        assert!(validate_code("code", "bolt_8.8").is_ok());

        assert!(validate_code("code", "").is_err());
        assert!(validate_code("code", "   ").is_err());
        assert!(validate_code("code", "has space").is_err());
        assert!(validate_code("code", &"A".repeat(MAX_CODE_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_code_reports_field() {
        let err = validate_code("location code", "").unwrap_err();
        assert_eq!(err.to_string(), "location code is required");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "M4 screw, stainless").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(1_000_000).is_ok());
        assert!(validate_quantity(MAX_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(matches!(
            validate_quantity(MAX_QUANTITY + 1),
            Err(ValidationError::OutOfRange { max: MAX_QUANTITY, .. })
        ));
        assert!(validate_quantity(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_optional_text() {
        assert!(validate_optional_text("remark", None).is_ok());
        assert!(validate_optional_text("remark", Some("for line 3")).is_ok());
        assert!(validate_optional_text("remark", Some(&"x".repeat(MAX_TEXT_LEN + 1))).is_err());
    }

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("operator_id", "admin-1").is_ok());
        assert!(validate_reference("operator_id", " ").is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();

        assert!(validate_date_range(Some(d1), Some(d2)).is_ok());
        assert!(validate_date_range(Some(d1), Some(d1)).is_ok());
        assert!(validate_date_range(None, Some(d1)).is_ok());
        assert!(validate_date_range(None, None).is_ok());
        assert!(validate_date_range(Some(d2), Some(d1)).is_err());
    }
}
