//! Session audit trail
//!
//! Append-only record of what happened to the forms and the submission.
//! - Event: envelope with id + timestamp + kind
//! - EventKind: form-level and submission-level variants
//! - EventLog: thread-safe, bounded log (oldest entries are dropped first)

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Field, FormId};

/// Single entry in the session log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since session start (ms)
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

/// All possible event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // FORM LEVEL
    // ═══════════════════════════════════════════
    FormAdded {
        form_id: FormId,
    },
    FormRemoved {
        form_id: FormId,
    },
    FieldEdited {
        form_id: FormId,
        field: Field,
    },
    /// Form validity flipped
    FormChanged {
        form_id: FormId,
        is_valid: bool,
    },
    UsernameCheckStarted {
        form_id: FormId,
        username: String,
    },
    UsernameChecked {
        form_id: FormId,
        username: String,
        available: bool,
    },
    UsernameCheckFailed {
        form_id: FormId,
        username: String,
        error: String,
    },

    // ═══════════════════════════════════════════
    // SUBMISSION LEVEL
    // ═══════════════════════════════════════════
    CountdownStarted {
        from: u32,
    },
    CountdownTick {
        remaining: u32,
    },
    SubmitCancelled,
    SubmitStarted {
        form_count: usize,
    },
    SubmitSucceeded {
        message: Option<String>,
    },
    SubmitFailed {
        error: String,
    },
    ContainerReset,
}

impl EventKind {
    /// Extract form_id if event is form-related
    pub fn form_id(&self) -> Option<FormId> {
        match self {
            Self::FormAdded { form_id }
            | Self::FormRemoved { form_id }
            | Self::FieldEdited { form_id, .. }
            | Self::FormChanged { form_id, .. }
            | Self::UsernameCheckStarted { form_id, .. }
            | Self::UsernameChecked { form_id, .. }
            | Self::UsernameCheckFailed { form_id, .. } => Some(*form_id),
            Self::CountdownStarted { .. }
            | Self::CountdownTick { .. }
            | Self::SubmitCancelled
            | Self::SubmitStarted { .. }
            | Self::SubmitSucceeded { .. }
            | Self::SubmitFailed { .. }
            | Self::ContainerReset => None,
        }
    }
}

/// Entries kept before the oldest are discarded
pub const DEFAULT_CAPACITY: usize = 4096;

/// Thread-safe, append-only event log with a fixed capacity
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<VecDeque<Event>>>,
    capacity: usize,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    /// Create a new event log (call at session start)
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Keep at most `capacity` entries (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(256)))),
            capacity,
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event (thread-safe, returns event ID)
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        };

        let mut events = self.events.write();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        id
    }

    /// Get all events (cloned)
    pub fn events(&self) -> Vec<Event> {
        self.events.read().iter().cloned().collect()
    }

    /// Events of one form
    pub fn filter_form(&self, form_id: FormId) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind.form_id() == Some(form_id))
            .collect()
    }

    /// Count events matching a predicate
    pub fn count(&self, pred: impl Fn(&EventKind) -> bool) -> usize {
        self.events.read().iter().filter(|e| pred(&e.kind)).count()
    }

    /// Serialize to JSON for debugging
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("len", &self.len()).finish()
    }
}
