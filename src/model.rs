//! Form data model
//!
//! Identities, field names, error causes, snapshots and the wire shapes
//! exchanged with the submission backend.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// IDENTITY + FIELDS
// ============================================================================

/// Stable identity of a form, allocated by the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(pub u64);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The three editable fields of a profile form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Country,
    Username,
    Birthdate,
}

impl Field {
    /// All fields in display order
    pub const ALL: [Field; 3] = [Field::Country, Field::Username, Field::Birthdate];

    /// Next field (wraps)
    pub fn next(self) -> Self {
        match self {
            Field::Country => Field::Username,
            Field::Username => Field::Birthdate,
            Field::Birthdate => Field::Country,
        }
    }

    /// Previous field (wraps)
    pub fn prev(self) -> Self {
        match self {
            Field::Country => Field::Birthdate,
            Field::Username => Field::Country,
            Field::Birthdate => Field::Username,
        }
    }

    /// Message shown when the field has any error
    pub fn error_message(self) -> &'static str {
        match self {
            Field::Country => "Please select a country",
            Field::Username => "Please provide a correct Username",
            Field::Birthdate => "Please provide a valid date",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Country => "Country",
            Field::Username => "Username",
            Field::Birthdate => "Birthdate",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// ERROR CAUSES
// ============================================================================

/// Why a field is invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCause {
    Required,
    Format,
    FutureDate,
    Taken,
}

/// Set of (field, cause) pairs
///
/// Each validator contributes its own causes and the sets are unioned, so
/// the availability result can never clobber the required/format checks
/// (or the other way around).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSet(BTreeSet<(Field, ErrorCause)>);

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, cause: ErrorCause) {
        self.0.insert((field, cause));
    }

    /// Add every cause in `other`
    pub fn union(mut self, other: ErrorSet) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn contains(&self, field: Field, cause: ErrorCause) -> bool {
        self.0.contains(&(field, cause))
    }

    /// True if the field has at least one cause
    pub fn has_field(&self, field: Field) -> bool {
        self.0.iter().any(|(f, _)| *f == field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(Field, ErrorCause)> for ErrorSet {
    fn from_iter<I: IntoIterator<Item = (Field, ErrorCause)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

/// Snapshot of one form, emitted upward after every change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub id: FormId,
    pub country: String,
    pub username: String,
    pub birthdate: String,
    pub is_valid: bool,
    /// User-facing messages, keyed by field. Empty when valid.
    pub errors: BTreeMap<Field, String>,
    /// Every current cause, independent of touched state
    #[serde(skip)]
    pub causes: ErrorSet,
}

impl FormRecord {
    /// Strip derived state for the wire
    pub fn to_submitted(&self) -> SubmittedForm {
        SubmittedForm {
            id: self.id,
            country: self.country.clone(),
            username: self.username.clone(),
            birthdate: self.birthdate.clone(),
        }
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

/// One validated record as sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedForm {
    pub id: FormId,
    pub country: String,
    pub username: String,
    pub birthdate: String,
}

/// Body of `POST /api/checkUsername`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckUsernameRequest {
    pub username: String,
}

/// Reply to `POST /api/checkUsername`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckUsernameResponse {
    pub is_available: bool,
}

/// Body of `POST /api/submitForm`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitFormsRequest {
    pub forms: Vec<SubmittedForm>,
}

/// Reply to `POST /api/submitForm`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub result: Option<String>,
}

impl SubmitResponse {
    pub fn with_result(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
        }
    }
}

// ============================================================================
// NOTICES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Message surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
