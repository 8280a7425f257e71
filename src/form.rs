//! Form unit: one entry's field state and derived validity
//!
//! A unit never talks to other units or to the container. The session feeds
//! it edits and availability results, then asks it for a snapshot.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{ErrorCause, ErrorSet, Field, FormId, FormRecord};
use crate::validators::validate_field;

/// Field values plus touched flags for one form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormUnit {
    id: FormId,
    country: String,
    username: String,
    birthdate: String,
    touched: [bool; 3],
    /// Username the backend reported as taken
    taken_for: Option<String>,
}

impl FormUnit {
    /// Create an empty, untouched form
    pub fn new(id: FormId) -> Self {
        Self {
            id,
            country: String::new(),
            username: String::new(),
            birthdate: String::new(),
            touched: [false; 3],
            taken_for: None,
        }
    }

    pub fn id(&self) -> FormId {
        self.id
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Country => &self.country,
            Field::Username => &self.username,
            Field::Birthdate => &self.birthdate,
        }
    }

    /// Replace a field value and mark it touched
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Country => self.country = value,
            Field::Username => {
                if value != self.username {
                    self.taken_for = None;
                }
                self.username = value;
            }
            Field::Birthdate => self.birthdate = value,
        }
        self.touch(field);
    }

    /// Mark a field as visited (blur)
    pub fn touch(&mut self, field: Field) {
        self.touched[field_index(field)] = true;
    }

    pub fn is_touched(&self, field: Field) -> bool {
        self.touched[field_index(field)]
    }

    /// True if nothing was entered or visited yet
    pub fn is_pristine(&self) -> bool {
        self.touched.iter().all(|t| !t)
    }

    /// Record an availability result
    ///
    /// Returns false when `username` is no longer the current value; the
    /// result is dropped in that case.
    pub fn apply_availability(&mut self, username: &str, available: bool) -> bool {
        if username != self.username {
            return false;
        }
        self.taken_for = if available {
            None
        } else {
            Some(username.to_string())
        };
        true
    }

    /// True if the current username was reported as taken
    pub fn is_taken(&self) -> bool {
        !self.username.is_empty() && self.taken_for.as_deref() == Some(self.username.as_str())
    }

    /// Every cause currently present
    pub fn causes(&self, today: NaiveDate) -> ErrorSet {
        let mut taken = ErrorSet::new();
        if self.is_taken() {
            taken.insert(Field::Username, ErrorCause::Taken);
        }

        Field::ALL
            .into_iter()
            .map(|field| validate_field(field, self.value(field), today))
            .fold(taken, ErrorSet::union)
    }

    /// Full snapshot for the container
    ///
    /// `check_pending` marks an outstanding availability check; such a form
    /// is not valid yet but carries no message for it.
    pub fn snapshot(&self, today: NaiveDate, check_pending: bool) -> FormRecord {
        let causes = self.causes(today);

        let mut errors = BTreeMap::new();
        for field in Field::ALL {
            let taken = causes.contains(field, ErrorCause::Taken);
            if taken || (causes.has_field(field) && self.is_touched(field)) {
                errors.insert(field, field.error_message().to_string());
            }
        }

        FormRecord {
            id: self.id,
            country: self.country.clone(),
            username: self.username.clone(),
            birthdate: self.birthdate.clone(),
            is_valid: causes.is_empty() && !check_pending,
            errors,
            causes,
        }
    }
}

fn field_index(field: Field) -> usize {
    match field {
        Field::Country => 0,
        Field::Username => 1,
        Field::Birthdate => 2,
    }
}
