//! Username availability checker
//!
//! Debounce, dedupe and cancel in front of `SubmissionGateway::check_username`.
//!
//! Each form has at most one slot: the latest candidate plus the task
//! working on it (a debounce timer, then the request). Every new edit
//! aborts the slot's task and issues a fresh generation. Completions carry
//! their generation back through the session channel and anything that no
//! longer matches the slot is dropped, so a superseded candidate can never
//! be applied.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::FormdeckError;
use crate::gateway::SubmissionGateway;
use crate::model::FormId;
use crate::session::SessionEvent;

/// What happened when the quiescence window closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// A newer edit replaced this candidate
    Stale,
    /// Below the minimum length; nothing sent
    TooShort,
    /// Same value as the last answered check
    Cached { username: String, available: bool },
    /// Request sent to the gateway
    Dispatched { username: String },
}

/// What a finished request means for the form
#[derive(Debug)]
pub enum CheckOutcome {
    Stale,
    Available { username: String, available: bool },
    Failed { username: String, error: FormdeckError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Debouncing,
    InFlight,
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    candidate: String,
    phase: Phase,
    task: JoinHandle<()>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Per-form debounce + request pipeline
pub struct UsernameChecker {
    gateway: Arc<dyn SubmissionGateway>,
    events: UnboundedSender<SessionEvent>,
    debounce: Duration,
    min_len: usize,
    slots: HashMap<FormId, Slot>,
    /// Last answered (username, available) per form
    answered: HashMap<FormId, (String, bool)>,
    /// Session-wide, never reused, so events from before a reset are stale
    next_generation: u64,
}

impl UsernameChecker {
    pub fn new(
        gateway: Arc<dyn SubmissionGateway>,
        events: UnboundedSender<SessionEvent>,
        debounce: Duration,
        min_len: usize,
    ) -> Self {
        Self {
            gateway,
            events,
            debounce,
            min_len,
            slots: HashMap::new(),
            answered: HashMap::new(),
            next_generation: 1,
        }
    }

    fn issue_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.saturating_add(1);
        generation
    }

    /// Restart the quiescence window for a new candidate
    pub fn schedule(&mut self, form_id: FormId, candidate: &str) {
        let generation = self.issue_generation();
        let events = self.events.clone();
        let debounce = self.debounce;

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let _ = events.send(SessionEvent::UsernameDebounced {
                form_id,
                generation,
            });
        });

        // Replacing the slot drops (and aborts) the previous one
        self.slots.insert(
            form_id,
            Slot {
                generation,
                candidate: candidate.to_string(),
                phase: Phase::Debouncing,
                task,
            },
        );
    }

    /// The quiescence window closed for `generation`
    pub fn on_debounced(&mut self, form_id: FormId, generation: u64) -> DebounceOutcome {
        let Some(slot) = self
            .slots
            .get(&form_id)
            .filter(|s| s.generation == generation && s.phase == Phase::Debouncing)
        else {
            debug!(form_id = form_id.0, generation, "Dropping stale debounce");
            return DebounceOutcome::Stale;
        };
        let candidate = slot.candidate.clone();

        if candidate.chars().count() < self.min_len {
            self.slots.remove(&form_id);
            return DebounceOutcome::TooShort;
        }

        if let Some((username, available)) = self.answered.get(&form_id) {
            if *username == candidate {
                let available = *available;
                self.slots.remove(&form_id);
                return DebounceOutcome::Cached {
                    username: candidate,
                    available,
                };
            }
        }

        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();
        let username = candidate.clone();
        let task = tokio::spawn(async move {
            let result = gateway.check_username(&username).await;
            let _ = events.send(SessionEvent::UsernameChecked {
                form_id,
                generation,
                username,
                result,
            });
        });

        debug!(form_id = form_id.0, generation, username = %candidate, "Dispatching username check");
        if let Some(slot) = self.slots.get_mut(&form_id) {
            // The timer task already finished; swap in the request task
            slot.task = task;
            slot.phase = Phase::InFlight;
        }
        DebounceOutcome::Dispatched {
            username: candidate,
        }
    }

    /// A request finished
    pub fn on_checked(
        &mut self,
        form_id: FormId,
        generation: u64,
        username: String,
        result: Result<bool, FormdeckError>,
    ) -> CheckOutcome {
        let current = self
            .slots
            .get(&form_id)
            .is_some_and(|s| s.generation == generation && s.phase == Phase::InFlight);
        if !current {
            debug!(form_id = form_id.0, generation, username = %username, "Dropping stale username check");
            return CheckOutcome::Stale;
        }
        self.slots.remove(&form_id);

        match result {
            Ok(available) => {
                self.answered
                    .insert(form_id, (username.clone(), available));
                CheckOutcome::Available {
                    username,
                    available,
                }
            }
            Err(error) => CheckOutcome::Failed { username, error },
        }
    }

    /// Debounce or request outstanding
    pub fn is_pending(&self, form_id: FormId) -> bool {
        self.slots.contains_key(&form_id)
    }

    /// Request in flight (the "checking" indicator)
    pub fn is_checking(&self, form_id: FormId) -> bool {
        self.slots
            .get(&form_id)
            .is_some_and(|s| s.phase == Phase::InFlight)
    }

    pub fn has_pending(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Abort work for one form and forget its answers
    pub fn cancel(&mut self, form_id: FormId) {
        self.slots.remove(&form_id);
        self.answered.remove(&form_id);
    }

    /// Abort everything (container reset)
    pub fn cancel_all(&mut self) {
        self.slots.clear();
        self.answered.clear();
    }
}
