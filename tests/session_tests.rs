//! # Session Tests
//!
//! End-to-end behaviour of a `FormSession` against the in-memory gateway:
//! validation, debounced availability checks, the submit countdown and the
//! three submission outcomes. Time is paused so debounce windows and
//! countdown ticks advance deterministically.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use formdeck::container::SUBMIT_ERROR_MESSAGE;
use formdeck::model::NoticeLevel;
use formdeck::session::NOTHING_TO_SUBMIT_MESSAGE;
use formdeck::{
    Command, ErrorCause, EventKind, Field, FormId, FormSession, FormdeckConfig, MockGateway,
    SubmitStatus, SubmittedForm,
};

// ============================================================================
// TEST HELPERS
// ============================================================================

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn session_with(gateway: &MockGateway) -> FormSession {
    FormSession::new(Arc::new(gateway.clone()), &FormdeckConfig::default()).with_clock(today)
}

fn edit(session: &mut FormSession, id: FormId, field: Field, value: &str) -> bool {
    session.dispatch(Command::Edit {
        id,
        field,
        value: value.to_string(),
    })
}

fn fill(session: &mut FormSession, id: FormId, country: &str, username: &str, birthdate: &str) {
    edit(session, id, Field::Country, country);
    edit(session, id, Field::Username, username);
    edit(session, id, Field::Birthdate, birthdate);
}

fn fill_valid(session: &mut FormSession, id: FormId) {
    fill(session, id, "Mexico", "Bob New", "1990-01-01");
}

fn error_message(session: &FormSession, id: FormId, field: Field) -> Option<String> {
    session
        .container()
        .record(id)
        .and_then(|r| r.errors.get(&field).cloned())
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_complete_form_enables_submit() {
    let gateway = MockGateway::new();
    let mut session = session_with(&gateway);

    fill_valid(&mut session, FormId(1));
    session.settle().await;

    let record = session.container().record(FormId(1)).unwrap();
    assert!(record.is_valid);
    assert!(record.errors.is_empty());
    assert_eq!(session.container().invalid_count(), 0);
    assert!(session.can_submit());
    assert_eq!(gateway.checked_usernames(), vec!["Bob New"]);
}

#[tokio::test(start_paused = true)]
async fn test_birthdate_tomorrow_rejected_today_accepted() {
    let mut session = session_with(&MockGateway::new());
    fill(&mut session, FormId(1), "Peru", "carla", "2024-06-16");
    session.settle().await;

    let record = session.container().record(FormId(1)).unwrap();
    assert!(!record.is_valid);
    assert!(record.causes.contains(Field::Birthdate, ErrorCause::FutureDate));
    assert_eq!(
        error_message(&session, FormId(1), Field::Birthdate).as_deref(),
        Some("Please provide a valid date")
    );

    edit(&mut session, FormId(1), Field::Birthdate, "2024-06-15");
    assert!(session.container().record(FormId(1)).unwrap().is_valid);
    assert!(session.can_submit());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_birthdate_is_a_format_error() {
    let mut session = session_with(&MockGateway::new());
    edit(&mut session, FormId(1), Field::Birthdate, "15/06/1990");

    let record = session.container().record(FormId(1)).unwrap();
    assert!(record.causes.contains(Field::Birthdate, ErrorCause::Format));
}

#[tokio::test(start_paused = true)]
async fn test_untouched_fields_are_invalid_but_silent() {
    let mut session = session_with(&MockGateway::new());
    edit(&mut session, FormId(1), Field::Country, "Chile");

    let record = session.container().record(FormId(1)).unwrap();
    assert!(!record.is_valid);
    assert!(record.causes.contains(Field::Username, ErrorCause::Required));
    assert_eq!(error_message(&session, FormId(1), Field::Username), None);

    session.dispatch(Command::Touch {
        id: FormId(1),
        field: Field::Username,
    });
    assert_eq!(
        error_message(&session, FormId(1), Field::Username).as_deref(),
        Some("Please provide a correct Username")
    );
}

// ============================================================================
// Availability checks
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_check_only_final_value() {
    let gateway = MockGateway::new();
    let mut session = session_with(&gateway);

    for value in ["b", "bo", "bob", "bobb", "bobby"] {
        edit(&mut session, FormId(1), Field::Username, value);
        session.run_for(Duration::from_millis(100)).await;
    }
    session.settle().await;

    assert_eq!(gateway.checked_usernames(), vec!["bobby"]);
}

#[tokio::test(start_paused = true)]
async fn test_taken_username_shows_error() {
    let gateway = MockGateway::new().with_taken(["admin"]);
    let mut session = session_with(&gateway);

    fill(&mut session, FormId(1), "Mexico", "admin", "1990-01-01");
    session.settle().await;

    let record = session.container().record(FormId(1)).unwrap();
    assert!(!record.is_valid);
    assert!(record.causes.contains(Field::Username, ErrorCause::Taken));
    assert_eq!(
        error_message(&session, FormId(1), Field::Username).as_deref(),
        Some("Please provide a correct Username")
    );
    assert!(!session.can_submit());

    edit(&mut session, FormId(1), Field::Username, "admin2");
    session.settle().await;
    assert!(session.can_submit());
}

#[tokio::test(start_paused = true)]
async fn test_short_usernames_are_never_checked() {
    let gateway = MockGateway::new();
    let mut session = session_with(&gateway);

    fill(&mut session, FormId(1), "Mexico", "ab", "1990-01-01");
    session.settle().await;

    assert!(gateway.checked_usernames().is_empty());
    assert!(session.can_submit());
}

#[tokio::test(start_paused = true)]
async fn test_returning_to_last_checked_value_reuses_answer() {
    let gateway = MockGateway::new().with_taken(["bob"]);
    let mut session = session_with(&gateway);

    edit(&mut session, FormId(1), Field::Username, "bob");
    session.settle().await;

    edit(&mut session, FormId(1), Field::Username, "bobx");
    edit(&mut session, FormId(1), Field::Username, "bob");
    session.settle().await;

    assert_eq!(gateway.checked_usernames(), vec!["bob"]);
    let record = session.container().record(FormId(1)).unwrap();
    assert!(record.causes.contains(Field::Username, ErrorCause::Taken));
}

#[tokio::test(start_paused = true)]
async fn test_failed_recheck_does_not_revive_old_taken_answer() {
    let gateway = MockGateway::new().with_taken(["bob"]);
    let mut session = session_with(&gateway);

    edit(&mut session, FormId(1), Field::Username, "bob");
    session.settle().await;
    edit(&mut session, FormId(1), Field::Username, "bobx");
    session.settle().await;

    gateway.fail_checks(true);
    edit(&mut session, FormId(1), Field::Username, "bob");
    let record = session.container().record(FormId(1)).unwrap();
    assert!(!record.causes.contains(Field::Username, ErrorCause::Taken));

    session.settle().await;
    assert_eq!(gateway.checked_usernames(), vec!["bob", "bobx", "bob"]);
    let record = session.container().record(FormId(1)).unwrap();
    assert!(!record.causes.contains(Field::Username, ErrorCause::Taken));
    assert_eq!(error_message(&session, FormId(1), Field::Username), None);
}

#[tokio::test(start_paused = true)]
async fn test_stale_check_result_is_dropped() {
    let gateway = MockGateway::new()
        .with_taken(["admin"])
        .with_latency(Duration::from_secs(1));
    let mut session = session_with(&gateway);

    edit(&mut session, FormId(1), Field::Username, "alice");
    session.run_for(Duration::from_millis(400)).await;
    assert!(session.is_checking(FormId(1)));

    edit(&mut session, FormId(1), Field::Username, "admin");
    session.settle().await;

    assert_eq!(gateway.checked_usernames(), vec!["alice", "admin"]);
    let alice_answers = session.event_log().count(|kind| {
        matches!(kind, EventKind::UsernameChecked { username, .. } if username == "alice")
    });
    assert_eq!(alice_answers, 0);
    assert!(session
        .container()
        .record(FormId(1))
        .unwrap()
        .causes
        .contains(Field::Username, ErrorCause::Taken));
}

#[tokio::test(start_paused = true)]
async fn test_failed_check_does_not_mark_taken() {
    let gateway = MockGateway::new();
    gateway.fail_checks(true);
    let mut session = session_with(&gateway);

    fill_valid(&mut session, FormId(1));
    session.settle().await;

    assert!(session.container().record(FormId(1)).unwrap().is_valid);
    assert_eq!(
        session
            .event_log()
            .count(|kind| matches!(kind, EventKind::UsernameCheckFailed { .. })),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_pending_check_blocks_submit() {
    let gateway = MockGateway::new().with_latency(Duration::from_secs(2));
    let mut session = session_with(&gateway);

    fill_valid(&mut session, FormId(1));
    session.run_for(Duration::from_millis(500)).await;

    let record = session.container().record(FormId(1)).unwrap();
    assert!(!record.is_valid);
    assert!(record.errors.is_empty());
    assert!(!session.dispatch(Command::StartSubmit));

    session.settle().await;
    assert!(session.dispatch(Command::StartSubmit));
}

// ============================================================================
// Container bookkeeping
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_removing_form_with_inflight_check() {
    let gateway = MockGateway::new().with_latency(Duration::from_secs(1));
    let mut session = session_with(&gateway);
    fill_valid(&mut session, FormId(1));

    assert!(session.dispatch(Command::AddForm));
    edit(&mut session, FormId(2), Field::Username, "ghost");
    session.run_for(Duration::from_millis(400)).await;

    assert!(session.dispatch(Command::RemoveForm(FormId(2))));
    session.settle().await;

    assert_eq!(session.container().order(), &[FormId(1)]);
    assert!(session.container().record(FormId(2)).is_none());
    assert_eq!(session.container().invalid_count(), 0);
    assert!(session.can_submit());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_count_tracks_adds_and_removes() {
    let mut session = session_with(&MockGateway::new());
    session.dispatch(Command::AddForm);
    session.dispatch(Command::AddForm);
    edit(&mut session, FormId(2), Field::Country, "Peru");
    edit(&mut session, FormId(3), Field::Country, "Chile");
    assert_eq!(session.container().invalid_count(), 2);

    session.dispatch(Command::RemoveForm(FormId(2)));
    assert_eq!(session.container().invalid_count(), 1);
    assert_eq!(session.container().order(), &[FormId(1), FormId(3)]);

    session.dispatch(Command::AddForm);
    assert_eq!(session.container().order(), &[FormId(1), FormId(3), FormId(4)]);
}

// ============================================================================
// Submission
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_successful_submit_resets_to_one_pristine_form() {
    let gateway = MockGateway::new();
    let mut session = session_with(&gateway);
    fill_valid(&mut session, FormId(1));
    session.dispatch(Command::AddForm);
    fill(&mut session, FormId(2), "Peru", "carla", "1985-03-04");
    session.settle().await;

    assert!(session.dispatch(Command::StartSubmit));
    assert_eq!(
        session.status(),
        SubmitStatus::CountingDown { remaining: 5 }
    );
    session.settle().await;

    let submissions = gateway.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(
        submissions[0],
        vec![
            SubmittedForm {
                id: FormId(1),
                country: "Mexico".into(),
                username: "Bob New".into(),
                birthdate: "1990-01-01".into(),
            },
            SubmittedForm {
                id: FormId(2),
                country: "Peru".into(),
                username: "carla".into(),
                birthdate: "1985-03-04".into(),
            },
        ]
    );

    assert_eq!(session.container().order(), &[FormId(1)]);
    assert!(session.unit(FormId(1)).unwrap().is_pristine());
    assert_eq!(session.status(), SubmitStatus::Idle);

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "nice job");
    assert!(matches!(notices[0].level, NoticeLevel::Info));
}

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_down_then_submits() {
    let gateway = MockGateway::new();
    let mut session = session_with(&gateway);
    fill_valid(&mut session, FormId(1));
    session.settle().await;

    session.dispatch(Command::StartSubmit);
    session.run_for(Duration::from_millis(2500)).await;
    assert_eq!(
        session.status(),
        SubmitStatus::CountingDown { remaining: 3 }
    );
    assert!(gateway.submissions().is_empty());

    session.run_for(Duration::from_secs(3)).await;
    assert_eq!(gateway.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_countdown_keeps_data() {
    let gateway = MockGateway::new();
    let mut session = session_with(&gateway);
    fill_valid(&mut session, FormId(1));
    session.settle().await;

    session.dispatch(Command::StartSubmit);
    session.run_for(Duration::from_millis(2500)).await;
    assert!(session.dispatch(Command::CancelSubmit));
    assert_eq!(session.status(), SubmitStatus::Idle);

    session.run_for(Duration::from_secs(10)).await;
    assert!(gateway.submissions().is_empty());
    assert_eq!(
        session.unit(FormId(1)).unwrap().value(Field::Country),
        "Mexico"
    );
    assert!(session.can_submit());
}

#[tokio::test(start_paused = true)]
async fn test_failed_submit_keeps_data_and_reports() {
    let gateway = MockGateway::new();
    gateway.fail_submissions(true);
    let mut session = session_with(&gateway);
    fill_valid(&mut session, FormId(1));
    session.settle().await;

    session.dispatch(Command::StartSubmit);
    session.settle().await;

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, SUBMIT_ERROR_MESSAGE);
    assert!(matches!(notices[0].level, NoticeLevel::Error));

    assert_eq!(session.status(), SubmitStatus::Idle);
    assert_eq!(
        session.unit(FormId(1)).unwrap().value(Field::Username),
        "Bob New"
    );
    assert!(session.can_submit());
}

#[tokio::test(start_paused = true)]
async fn test_empty_result_keeps_data_silently() {
    let gateway = MockGateway::new().with_result(None);
    let mut session = session_with(&gateway);
    fill_valid(&mut session, FormId(1));
    session.settle().await;

    session.dispatch(Command::StartSubmit);
    session.settle().await;

    assert_eq!(gateway.submissions().len(), 1);
    assert!(session.take_notices().is_empty());
    assert!(!session.unit(FormId(1)).unwrap().is_pristine());
}

#[tokio::test(start_paused = true)]
async fn test_invalidating_during_countdown_sends_nothing() {
    let gateway = MockGateway::new();
    let mut session = session_with(&gateway);
    fill_valid(&mut session, FormId(1));
    session.settle().await;

    session.dispatch(Command::StartSubmit);
    session.run_for(Duration::from_millis(1500)).await;
    edit(&mut session, FormId(1), Field::Country, "");
    session.settle().await;

    assert!(gateway.submissions().is_empty());
    assert_eq!(session.status(), SubmitStatus::Idle);
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, NOTHING_TO_SUBMIT_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_request_discards_response() {
    let gateway = MockGateway::new().with_latency(Duration::from_secs(3));
    let mut session = session_with(&gateway);
    fill_valid(&mut session, FormId(1));
    session.settle().await;

    session.dispatch(Command::StartSubmit);
    session.run_for(Duration::from_millis(5500)).await;
    assert_eq!(session.status(), SubmitStatus::Submitting);

    assert!(session.dispatch(Command::CancelSubmit));
    session.run_for(Duration::from_secs(5)).await;

    assert_eq!(session.status(), SubmitStatus::Idle);
    assert!(session.take_notices().is_empty());
    assert!(!session.unit(FormId(1)).unwrap().is_pristine());
}

// ============================================================================
// Event log
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_event_log_stays_bounded_while_typing() {
    let mut session = session_with(&MockGateway::new());
    for n in 0..(formdeck::event_log::DEFAULT_CAPACITY + 500) {
        let value = if n % 2 == 0 { "Peru" } else { "Chile" };
        edit(&mut session, FormId(1), Field::Country, value);
    }

    assert_eq!(session.event_log().len(), formdeck::event_log::DEFAULT_CAPACITY);
    // Validity never flipped after the first snapshot
    let changes = session
        .event_log()
        .count(|kind| matches!(kind, EventKind::FormChanged { .. }));
    assert!(changes <= 1);
}

// ============================================================================
// Headless loop
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_run_applies_commands_then_settles() {
    let gateway = MockGateway::new();
    let mut session = session_with(&gateway);
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tx.send(Command::AddForm).unwrap();
    for (field, value) in [
        (Field::Country, "Mexico"),
        (Field::Username, "Bob New"),
        (Field::Birthdate, "1990-01-01"),
    ] {
        tx.send(Command::Edit {
            id: FormId(2),
            field,
            value: value.to_string(),
        })
        .unwrap();
    }
    drop(tx);

    session.run(rx).await;

    assert_eq!(session.container().len(), 2);
    assert!(session.container().record(FormId(2)).unwrap().is_valid);
    assert_eq!(gateway.checked_usernames(), vec!["Bob New"]);

    let log = session.event_log().to_json();
    assert!(log.to_string().contains("username_checked"));
}
