//! Forms container: identity bookkeeping, aggregate validity and the
//! submission lifecycle
//!
//! ```text
//!            begin_countdown          tick() == Expired
//!   Idle ─────────────────► CountingDown ─────────────► Submitting
//!    ▲                           │                          │
//!    └──────── cancel_submit ────┘                          │
//!    └──────────────── finish_submit / cancel_submit ───────┘
//! ```
//!
//! The container holds snapshots only. Field state lives in the form
//! units, timers live in the session.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::FormdeckError;
use crate::model::{FormId, FormRecord, Notice, SubmitResponse, SubmittedForm};

/// Message shown when the batch call fails for any reason
pub const SUBMIT_ERROR_MESSAGE: &str = "An error occurred while submitting forms. Please try again.";

/// Submission lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    Idle,
    CountingDown { remaining: u32 },
    Submitting,
}

impl std::fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitStatus::Idle => write!(f, "IDLE"),
            SubmitStatus::CountingDown { remaining } => write!(f, "SUBMITTING IN {remaining}"),
            SubmitStatus::Submitting => write!(f, "SUBMITTING"),
        }
    }
}

/// Result of one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    Remaining(u32),
    Expired,
}

/// What `finish_submit` did with the form data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted with a message; the container was reset
    Reset(Notice),
    /// Accepted without a message; data kept
    Kept,
    /// Call failed; data kept for retry
    Failed(Notice),
}

impl SubmitOutcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            SubmitOutcome::Reset(n) | SubmitOutcome::Failed(n) => Some(n),
            SubmitOutcome::Kept => None,
        }
    }
}

/// Ordered list of forms plus their latest snapshots
#[derive(Debug, Clone)]
pub struct FormsContainer {
    order: Vec<FormId>,
    records: BTreeMap<FormId, FormRecord>,
    next_id: u64,
    invalid_count: usize,
    status: SubmitStatus,
}

impl Default for FormsContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl FormsContainer {
    /// Empty container, no forms yet
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            records: BTreeMap::new(),
            next_id: 1,
            invalid_count: 0,
            status: SubmitStatus::Idle,
        }
    }

    /// Container with its first empty form
    pub fn with_initial_form() -> Self {
        let mut container = Self::new();
        container.add_form();
        container
    }

    // ─────────────────────────────────────────────────────────────────────
    // Form bookkeeping
    // ─────────────────────────────────────────────────────────────────────

    /// Append a form with a fresh identity
    pub fn add_form(&mut self) -> FormId {
        let id = FormId(self.next_id);
        self.next_id += 1;
        self.order.push(id);
        id
    }

    /// Remove a form and its snapshot; false if absent
    pub fn remove_form(&mut self, id: FormId) -> bool {
        let before = self.order.len();
        self.order.retain(|f| *f != id);
        if self.order.len() == before {
            return false;
        }
        self.records.remove(&id);
        self.update_invalid_count();
        true
    }

    /// Store the latest snapshot of a form
    pub fn on_form_change(&mut self, record: FormRecord) {
        if !self.contains(record.id) {
            debug!(form_id = record.id.0, "Ignoring snapshot for a removed form");
            return;
        }
        self.records.insert(record.id, record);
        self.update_invalid_count();
    }

    fn update_invalid_count(&mut self) {
        self.invalid_count = self.records.values().filter(|r| !r.is_valid).count();
    }

    pub fn contains(&self, id: FormId) -> bool {
        self.order.contains(&id)
    }

    /// Identities in display order
    pub fn order(&self) -> &[FormId] {
        &self.order
    }

    pub fn record(&self, id: FormId) -> Option<&FormRecord> {
        self.records.get(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = &FormRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid_count
    }

    /// True iff at least one snapshot exists and none is invalid
    pub fn can_submit(&self) -> bool {
        !self.records.is_empty() && self.invalid_count == 0
    }

    // ─────────────────────────────────────────────────────────────────────
    // Submission lifecycle
    // ─────────────────────────────────────────────────────────────────────

    pub fn status(&self) -> SubmitStatus {
        self.status
    }

    /// Enter the countdown; false if already counting down or submitting
    pub fn begin_countdown(&mut self, from: u32) -> bool {
        if self.status != SubmitStatus::Idle {
            return false;
        }
        self.status = SubmitStatus::CountingDown { remaining: from };
        true
    }

    /// One countdown step. `None` outside the countdown.
    pub fn tick(&mut self) -> Option<CountdownStep> {
        let SubmitStatus::CountingDown { remaining } = self.status else {
            return None;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.status = SubmitStatus::Submitting;
            Some(CountdownStep::Expired)
        } else {
            self.status = SubmitStatus::CountingDown { remaining };
            Some(CountdownStep::Remaining(remaining))
        }
    }

    /// Back to idle; form data untouched. False if already idle.
    pub fn cancel_submit(&mut self) -> bool {
        let was_active = self.status != SubmitStatus::Idle;
        self.status = SubmitStatus::Idle;
        was_active
    }

    /// Valid records in display order, derived fields stripped
    pub fn submission_batch(&self) -> Vec<SubmittedForm> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(|r| r.is_valid)
            .map(FormRecord::to_submitted)
            .collect()
    }

    /// Apply the gateway reply
    pub fn finish_submit(
        &mut self,
        result: Result<SubmitResponse, FormdeckError>,
    ) -> SubmitOutcome {
        self.status = SubmitStatus::Idle;
        match result {
            Ok(SubmitResponse {
                result: Some(message),
            }) if !message.is_empty() => {
                self.reset();
                SubmitOutcome::Reset(Notice::info(message))
            }
            Ok(_) => SubmitOutcome::Kept,
            Err(_) => SubmitOutcome::Failed(Notice::error(SUBMIT_ERROR_MESSAGE)),
        }
    }

    /// Drop everything and start over with one empty form
    pub fn reset(&mut self) {
        self.order.clear();
        self.records.clear();
        self.next_id = 1;
        self.invalid_count = 0;
        self.status = SubmitStatus::Idle;
        self.add_form();
    }
}
