//! Formdeck - multi-form profile entry with debounced availability checks
//! and countdown batch submission

pub mod availability;
pub mod config;
pub mod container;
pub mod countdown;
pub mod error;
pub mod event_log;
pub mod form;
pub mod gateway;
pub mod model;
pub mod session;
pub mod tui;
pub mod validators;

pub use config::FormdeckConfig;
pub use container::{FormsContainer, SubmitStatus};
pub use error::{FixSuggestion, FormdeckError};
pub use event_log::{Event, EventKind, EventLog};
pub use form::FormUnit;
pub use gateway::{create_gateway, HttpGateway, MockGateway, SubmissionGateway};
pub use model::{ErrorCause, Field, FormId, FormRecord, Notice, SubmittedForm};
pub use session::{Command, FormSession, SessionEvent};
