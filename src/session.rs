//! Form session: the single-threaded event loop
//!
//! User commands ([`Command`]) and async completions ([`SessionEvent`]) are
//! the only two ways state changes. Spawned tasks never touch state. They
//! sleep or await the gateway, then post an event tagged with the generation
//! they were started for.
//!
//! ```text
//!   Command ──► dispatch() ──► FormUnit ──snapshot──► FormsContainer
//!                   │                                     │
//!                   ▼                                     ▼
//!           UsernameChecker / Countdown / submit task ──► SessionEvent
//!                                                         │
//!                         handle_event() ◄────────────────┘
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::availability::{CheckOutcome, DebounceOutcome, UsernameChecker};
use crate::config::{FormdeckConfig, TimingConfig};
use crate::container::{CountdownStep, FormsContainer, SubmitOutcome, SubmitStatus};
use crate::countdown::Countdown;
use crate::error::FormdeckError;
use crate::event_log::{EventKind, EventLog};
use crate::form::FormUnit;
use crate::gateway::SubmissionGateway;
use crate::model::{Field, FormId, Notice, SubmitResponse};

/// Shown when the countdown expires with nothing valid left
pub const NOTHING_TO_SUBMIT_MESSAGE: &str = "No valid forms to submit";

// ─────────────────────────────────────────────────────────────────────────────
// Commands + Events
// ─────────────────────────────────────────────────────────────────────────────

/// User intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddForm,
    RemoveForm(FormId),
    Edit {
        id: FormId,
        field: Field,
        value: String,
    },
    /// Field lost focus
    Touch {
        id: FormId,
        field: Field,
    },
    StartSubmit,
    CancelSubmit,
}

/// Completion posted by a spawned task
#[derive(Debug)]
pub enum SessionEvent {
    UsernameDebounced {
        form_id: FormId,
        generation: u64,
    },
    UsernameChecked {
        form_id: FormId,
        generation: u64,
        username: String,
        result: Result<bool, FormdeckError>,
    },
    CountdownTick {
        generation: u64,
    },
    SubmitFinished {
        generation: u64,
        result: Result<SubmitResponse, FormdeckError>,
    },
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

pub struct FormSession {
    gateway: Arc<dyn SubmissionGateway>,
    timing: TimingConfig,
    container: FormsContainer,
    units: BTreeMap<FormId, FormUnit>,
    checker: UsernameChecker,
    countdown: Countdown,
    /// (generation, task) of the in-flight batch call
    submit_task: Option<(u64, JoinHandle<()>)>,
    next_submit_generation: u64,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
    notices: VecDeque<Notice>,
    log: EventLog,
    clock: Clock,
}

impl FormSession {
    /// New session with one empty form
    pub fn new(gateway: Arc<dyn SubmissionGateway>, config: &FormdeckConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let checker = UsernameChecker::new(
            Arc::clone(&gateway),
            events_tx.clone(),
            config.timing.debounce(),
            config.validation.min_username_len,
        );

        let mut session = Self {
            gateway,
            timing: config.timing,
            container: FormsContainer::new(),
            units: BTreeMap::new(),
            checker,
            countdown: Countdown::new(config.timing.tick()),
            submit_task: None,
            next_submit_generation: 1,
            events_tx,
            events_rx,
            notices: VecDeque::new(),
            log: EventLog::new(),
            clock: Box::new(|| chrono::Local::now().date_naive()),
        };
        session.add_form();
        session
    }

    /// Replace the source of "today" for the birthdate rule
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read access
    // ─────────────────────────────────────────────────────────────────────

    pub fn container(&self) -> &FormsContainer {
        &self.container
    }

    pub fn status(&self) -> SubmitStatus {
        self.container.status()
    }

    pub fn can_submit(&self) -> bool {
        self.container.can_submit()
    }

    pub fn unit(&self, id: FormId) -> Option<&FormUnit> {
        self.units.get(&id)
    }

    /// Username request in flight for this form
    pub fn is_checking(&self, id: FormId) -> bool {
        self.checker.is_checking(id)
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    /// Drain notices raised since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Any timer, request or submission outstanding
    pub fn has_pending_work(&self) -> bool {
        self.checker.has_pending() || self.countdown.is_running() || self.submit_task.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────

    /// Apply a user command. Returns false when it had no effect.
    pub fn dispatch(&mut self, command: Command) -> bool {
        match command {
            Command::AddForm => {
                self.add_form();
                true
            }
            Command::RemoveForm(id) => self.remove_form(id),
            Command::Edit { id, field, value } => self.edit(id, field, value),
            Command::Touch { id, field } => {
                let Some(unit) = self.units.get_mut(&id) else {
                    return false;
                };
                unit.touch(field);
                self.emit_change(id);
                true
            }
            Command::StartSubmit => self.start_submit_countdown(),
            Command::CancelSubmit => self.cancel_submit(),
        }
    }

    fn add_form(&mut self) -> FormId {
        let id = self.container.add_form();
        self.units.insert(id, FormUnit::new(id));
        self.log.emit(EventKind::FormAdded { form_id: id });
        id
    }

    fn remove_form(&mut self, id: FormId) -> bool {
        if !self.container.remove_form(id) {
            return false;
        }
        self.units.remove(&id);
        self.checker.cancel(id);
        self.log.emit(EventKind::FormRemoved { form_id: id });
        true
    }

    fn edit(&mut self, id: FormId, field: Field, value: String) -> bool {
        let Some(unit) = self.units.get_mut(&id) else {
            return false;
        };
        if field == Field::Username {
            self.checker.schedule(id, &value);
        }
        unit.set_field(field, value);
        self.log.emit(EventKind::FieldEdited { form_id: id, field });
        self.emit_change(id);
        true
    }

    /// Push the unit's current snapshot into the container
    fn emit_change(&mut self, id: FormId) {
        let Some(unit) = self.units.get(&id) else {
            return;
        };
        let record = unit.snapshot(self.today(), self.checker.is_pending(id));
        // Log validity flips only, not every keystroke
        let was_valid = self.container.record(id).map(|r| r.is_valid);
        if was_valid != Some(record.is_valid) {
            self.log.emit(EventKind::FormChanged {
                form_id: id,
                is_valid: record.is_valid,
            });
        }
        self.container.on_form_change(record);
    }

    fn start_submit_countdown(&mut self) -> bool {
        if !self.container.can_submit() {
            debug!(
                invalid = self.container.invalid_count(),
                "Submit requested while forms are not ready"
            );
            return false;
        }
        if !self.container.begin_countdown(self.timing.countdown_from) {
            return false;
        }
        self.countdown.start(self.events_tx.clone());
        self.log.emit(EventKind::CountdownStarted {
            from: self.timing.countdown_from,
        });
        true
    }

    fn cancel_submit(&mut self) -> bool {
        self.countdown.stop();
        if let Some((generation, task)) = self.submit_task.take() {
            debug!(generation, "Abandoning in-flight submission");
            task.abort();
        }
        if !self.container.cancel_submit() {
            return false;
        }
        self.log.emit(EventKind::SubmitCancelled);
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────

    /// Apply one async completion
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::UsernameDebounced {
                form_id,
                generation,
            } => self.on_username_debounced(form_id, generation),
            SessionEvent::UsernameChecked {
                form_id,
                generation,
                username,
                result,
            } => self.on_username_checked(form_id, generation, username, result),
            SessionEvent::CountdownTick { generation } => self.on_countdown_tick(generation),
            SessionEvent::SubmitFinished { generation, result } => {
                self.on_submit_finished(generation, result)
            }
        }
    }

    fn on_username_debounced(&mut self, form_id: FormId, generation: u64) {
        match self.checker.on_debounced(form_id, generation) {
            DebounceOutcome::Stale => {}
            DebounceOutcome::TooShort => self.emit_change(form_id),
            DebounceOutcome::Cached {
                username,
                available,
            } => {
                if let Some(unit) = self.units.get_mut(&form_id) {
                    unit.apply_availability(&username, available);
                }
                self.emit_change(form_id);
            }
            DebounceOutcome::Dispatched { username } => {
                self.log.emit(EventKind::UsernameCheckStarted { form_id, username });
            }
        }
    }

    fn on_username_checked(
        &mut self,
        form_id: FormId,
        generation: u64,
        username: String,
        result: Result<bool, FormdeckError>,
    ) {
        match self.checker.on_checked(form_id, generation, username, result) {
            CheckOutcome::Stale => return,
            CheckOutcome::Available {
                username,
                available,
            } => {
                let applied = self
                    .units
                    .get_mut(&form_id)
                    .is_some_and(|unit| unit.apply_availability(&username, available));
                if applied {
                    self.log.emit(EventKind::UsernameChecked {
                        form_id,
                        username,
                        available,
                    });
                }
            }
            CheckOutcome::Failed { username, error } => {
                warn!(
                    form_id = form_id.0,
                    username = %username,
                    gateway = error.is_gateway_error(),
                    error = %error,
                    "Username check failed"
                );
                self.log.emit(EventKind::UsernameCheckFailed {
                    form_id,
                    username,
                    error: error.to_string(),
                });
            }
        }
        self.emit_change(form_id);
    }

    fn on_countdown_tick(&mut self, generation: u64) {
        if !self.countdown.accept(generation) {
            debug!(generation, "Dropping stale countdown tick");
            return;
        }
        match self.container.tick() {
            Some(CountdownStep::Remaining(remaining)) => {
                self.log.emit(EventKind::CountdownTick { remaining });
            }
            Some(CountdownStep::Expired) => {
                self.countdown.stop();
                self.log.emit(EventKind::CountdownTick { remaining: 0 });
                self.submit();
            }
            None => self.countdown.stop(),
        }
    }

    fn submit(&mut self) {
        let batch = self.container.submission_batch();
        if batch.is_empty() {
            self.container.cancel_submit();
            self.notices.push_back(Notice::info(NOTHING_TO_SUBMIT_MESSAGE));
            return;
        }

        let generation = self.next_submit_generation;
        self.next_submit_generation += 1;
        info!(generation, count = batch.len(), "Submitting forms");
        self.log.emit(EventKind::SubmitStarted {
            form_count: batch.len(),
        });

        let gateway = Arc::clone(&self.gateway);
        let events = self.events_tx.clone();
        let task = tokio::spawn(async move {
            let result = gateway.submit_forms(batch).await;
            let _ = events.send(SessionEvent::SubmitFinished { generation, result });
        });
        self.submit_task = Some((generation, task));
    }

    fn on_submit_finished(
        &mut self,
        generation: u64,
        result: Result<SubmitResponse, FormdeckError>,
    ) {
        let current = self.submit_task.as_ref().map(|(g, _)| *g);
        if current != Some(generation) {
            debug!(generation, "Dropping stale submission result");
            return;
        }
        self.submit_task = None;

        match &result {
            Ok(response) => {
                info!(generation, result = ?response.result, "Submission accepted");
                self.log.emit(EventKind::SubmitSucceeded {
                    message: response.result.clone(),
                });
            }
            Err(error) => {
                warn!(
                    generation,
                    gateway = error.is_gateway_error(),
                    error = %error,
                    "Submission failed"
                );
                self.log.emit(EventKind::SubmitFailed {
                    error: error.to_string(),
                });
            }
        }

        let outcome = self.container.finish_submit(result);
        if let SubmitOutcome::Reset(_) = outcome {
            self.rebuild_units();
        }
        if let Some(notice) = outcome.notice() {
            self.notices.push_back(notice.clone());
        }
    }

    /// Mirror a container reset: fresh units, no outstanding checks
    fn rebuild_units(&mut self) {
        self.checker.cancel_all();
        self.units = self
            .container
            .order()
            .iter()
            .map(|id| (*id, FormUnit::new(*id)))
            .collect();
        self.log.emit(EventKind::ContainerReset);
        for id in self.container.order() {
            self.log.emit(EventKind::FormAdded { form_id: *id });
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Driving the loop
    // ─────────────────────────────────────────────────────────────────────

    /// Wait for the next completion
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Apply every completion already queued; returns how many
    pub fn drain_ready(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Process completions until nothing is outstanding
    pub async fn settle(&mut self) {
        while self.has_pending_work() {
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
        self.drain_ready();
    }

    /// Process completions for a fixed amount of time
    pub async fn run_for(&mut self, duration: Duration) {
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }
        self.drain_ready();
    }

    /// Headless loop: apply commands and completions until the command
    /// channel closes, then settle
    pub async fn run(&mut self, mut commands: UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        self.dispatch(command);
                    }
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }
        self.settle().await;
    }
}

impl std::fmt::Debug for FormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("gateway", &self.gateway.name())
            .field("forms", &self.container.len())
            .field("status", &self.container.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;

    fn session(gateway: &MockGateway) -> FormSession {
        FormSession::new(Arc::new(gateway.clone()), &FormdeckConfig::default())
    }

    #[tokio::test]
    async fn test_new_session_has_one_pristine_form() {
        let session = session(&MockGateway::new());
        assert_eq!(session.container().order(), &[FormId(1)]);
        assert!(session.unit(FormId(1)).unwrap().is_pristine());
        assert!(!session.can_submit());
        assert!(!session.has_pending_work());
    }

    #[tokio::test]
    async fn test_commands_on_unknown_form_are_rejected() {
        let mut session = session(&MockGateway::new());
        assert!(!session.dispatch(Command::RemoveForm(FormId(7))));
        assert!(!session.dispatch(Command::Edit {
            id: FormId(7),
            field: Field::Country,
            value: "Peru".into(),
        }));
        assert!(!session.dispatch(Command::Touch {
            id: FormId(7),
            field: Field::Country,
        }));
    }

    #[tokio::test]
    async fn test_touch_reveals_required_message() {
        let mut session = session(&MockGateway::new());
        session.dispatch(Command::Touch {
            id: FormId(1),
            field: Field::Country,
        });

        let record = session.container().record(FormId(1)).unwrap();
        assert!(!record.is_valid);
        assert_eq!(
            record.errors.get(&Field::Country).map(String::as_str),
            Some("Please select a country")
        );
        assert_eq!(session.container().invalid_count(), 1);
    }

    #[tokio::test]
    async fn test_start_submit_requires_ready_forms() {
        let mut session = session(&MockGateway::new());
        assert!(!session.dispatch(Command::StartSubmit));
        assert_eq!(session.status(), SubmitStatus::Idle);
        assert!(!session.dispatch(Command::CancelSubmit));
    }

    #[tokio::test(start_paused = true)]
    async fn test_username_edit_is_pending_until_checked() {
        let gateway = MockGateway::new();
        let mut session = session(&gateway);
        session.dispatch(Command::Edit {
            id: FormId(1),
            field: Field::Username,
            value: "hank".into(),
        });
        assert!(session.has_pending_work());

        session.settle().await;
        assert!(!session.has_pending_work());
        assert_eq!(gateway.checked_usernames(), vec!["hank"]);
        assert!(session
            .event_log()
            .filter_form(FormId(1))
            .iter()
            .any(|e| matches!(e.kind, EventKind::UsernameChecked { available: true, .. })));
    }
}
