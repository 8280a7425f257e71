//! Field validation rules
//!
//! Pure functions, one per rule. Each returns the causes it finds and the
//! caller unions them:
//! - required: all three fields
//! - format: birthdate must be `YYYY-MM-DD`
//! - future date: birthdate must not be after today (same day is fine)
//!
//! ```rust
//! use chrono::NaiveDate;
//! use formdeck::model::{ErrorCause, Field};
//! use formdeck::validators::validate_field;
//!
//! let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let errors = validate_field(Field::Birthdate, "2024-06-02", today);
//! assert!(errors.contains(Field::Birthdate, ErrorCause::FutureDate));
//! ```

use chrono::NaiveDate;

use crate::model::{ErrorCause, ErrorSet, Field};

/// Date format produced by date inputs
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Required: the value must be non-empty
pub fn required(value: &str) -> bool {
    !value.is_empty()
}

/// Parse a birthdate, `None` when malformed
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// True if `date` is strictly after `today`
pub fn is_future(date: NaiveDate, today: NaiveDate) -> bool {
    date > today
}

/// Run every synchronous rule for one field
pub fn validate_field(field: Field, value: &str, today: NaiveDate) -> ErrorSet {
    let mut errors = ErrorSet::new();

    if !required(value) {
        errors.insert(field, ErrorCause::Required);
        return errors;
    }

    if field == Field::Birthdate {
        match parse_date(value) {
            Some(date) if is_future(date, today) => {
                errors.insert(field, ErrorCause::FutureDate);
            }
            Some(_) => {}
            None => errors.insert(field, ErrorCause::Format),
        }
    }

    errors
}
