//! Mock gateway for testing
//!
//! Answers from memory without touching the network. Records every call
//! so tests can assert on what the session sent.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::SubmissionGateway;
use crate::error::{FormdeckError, Result};
use crate::model::{SubmitResponse, SubmittedForm};

/// Mock gateway with configurable answers
#[derive(Clone)]
pub struct MockGateway {
    taken: Arc<Mutex<HashSet<String>>>,
    /// Message returned by `submit_forms`
    result: Arc<Mutex<Option<String>>>,
    fail_submit: Arc<Mutex<bool>>,
    fail_check: Arc<Mutex<bool>>,
    latency: Duration,
    /// Every username checked, in call order
    checks: Arc<Mutex<Vec<String>>>,
    /// Every batch submitted, in call order
    submissions: Arc<Mutex<Vec<Vec<SubmittedForm>>>>,
}

impl MockGateway {
    /// Everything available, submissions answer "nice job"
    pub fn new() -> Self {
        Self {
            taken: Arc::new(Mutex::new(HashSet::new())),
            result: Arc::new(Mutex::new(Some("nice job".to_string()))),
            fail_submit: Arc::new(Mutex::new(false)),
            fail_check: Arc::new(Mutex::new(false)),
            latency: Duration::ZERO,
            checks: Arc::new(Mutex::new(Vec::new())),
            submissions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Usernames reported as taken
    pub fn with_taken<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.taken.lock().extend(names.into_iter().map(Into::into));
        self
    }

    /// Message returned on submit (`None` answers `{}`)
    pub fn with_result(self, result: Option<String>) -> Self {
        *self.result.lock() = result;
        self
    }

    /// Delay applied to every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make subsequent submissions fail
    pub fn fail_submissions(&self, fail: bool) {
        *self.fail_submit.lock() = fail;
    }

    /// Make subsequent username checks fail
    pub fn fail_checks(&self, fail: bool) {
        *self.fail_check.lock() = fail;
    }

    pub fn mark_taken(&self, username: impl Into<String>) {
        self.taken.lock().insert(username.into());
    }

    /// Usernames checked so far
    pub fn checked_usernames(&self) -> Vec<String> {
        self.checks.lock().clone()
    }

    /// Batches submitted so far
    pub fn submissions(&self) -> Vec<Vec<SubmittedForm>> {
        self.submissions.lock().clone()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check_username(&self, username: &str) -> Result<bool> {
        self.checks.lock().push(username.to_string());
        self.delay().await;

        if *self.fail_check.lock() {
            return Err(FormdeckError::Gateway("mock check failure".to_string()));
        }
        Ok(!self.taken.lock().contains(username))
    }

    async fn submit_forms(&self, forms: Vec<SubmittedForm>) -> Result<SubmitResponse> {
        self.submissions.lock().push(forms);
        self.delay().await;

        if *self.fail_submit.lock() {
            return Err(FormdeckError::Gateway("mock submit failure".to_string()));
        }
        Ok(SubmitResponse {
            result: self.result.lock().clone(),
        })
    }
}
