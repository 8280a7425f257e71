//! # Submission Gateway
//!
//! Trait and implementations for the backend the forms talk to.
//!
//! ## Overview
//!
//! - [`SubmissionGateway`] - one async method per backend exchange
//! - [`HttpGateway`] - JSON over HTTP (`/api/checkUsername`, `/api/submitForm`)
//! - [`MockGateway`] - in-memory double with configurable answers
//!
//! ## Creating Gateways
//!
//! Use [`create_gateway`] to build one from configuration:
//!
//! ```rust
//! use formdeck::config::GatewayConfig;
//! use formdeck::gateway::create_gateway;
//!
//! let mut config = GatewayConfig::default();
//! config.kind = "mock".to_string();
//! let gateway = create_gateway(&config).unwrap();
//! assert_eq!(gateway.name(), "mock");
//!
//! config.kind = "carrier-pigeon".to_string();
//! assert!(create_gateway(&config).is_err());
//! ```

pub(crate) mod http;
mod mock;

pub use http::HttpGateway;
pub use mock::MockGateway;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::GatewayConfig;
use crate::error::{FormdeckError, Result};
use crate::model::{SubmitResponse, SubmittedForm};

// ============================================================================
// GATEWAY TRAIT (ASYNC)
// ============================================================================

/// Backend the session checks usernames against and submits batches to
///
/// Implementations are shared across spawned tasks, hence `Send + Sync`.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    /// Returns the gateway name (e.g., "http", "mock")
    fn name(&self) -> &str;

    /// True if nobody has registered `username` yet
    async fn check_username(&self, username: &str) -> Result<bool>;

    /// Submit one batch of validated records
    async fn submit_forms(&self, forms: Vec<SubmittedForm>) -> Result<SubmitResponse>;
}

// ============================================================================
// GATEWAY FACTORY
// ============================================================================

/// Create a gateway from configuration
///
/// | Kind | Description |
/// |------|-------------|
/// | `http` | Real backend at `base_url` |
/// | `mock` | In-memory, answers from `gateway.mock` |
pub fn create_gateway(config: &GatewayConfig) -> Result<Arc<dyn SubmissionGateway>> {
    match config.kind.to_lowercase().as_str() {
        "http" => Ok(Arc::new(HttpGateway::new(
            &config.base_url,
            Duration::from_millis(config.timeout_ms),
        )?)),
        "mock" => Ok(Arc::new(
            MockGateway::new()
                .with_taken(config.mock.taken.iter().cloned())
                .with_result(config.mock.result.clone()),
        )),
        _ => Err(FormdeckError::UnknownGateway {
            kind: config.kind.clone(),
        }),
    }
}
