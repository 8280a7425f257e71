//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

pub type Result<T> = std::result::Result<T, FormdeckError>;

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum FormdeckError {
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Configuration errors (FD-010 to FD-012)
    // ─────────────────────────────────────────────────────────────
    #[error("FD-010: Cannot read config file '{path}': {reason}")]
    ConfigRead { path: String, reason: String },

    #[error("FD-011: Cannot parse config file '{path}': {reason}")]
    ConfigParse { path: String, reason: String },

    #[error("FD-012: Invalid config value for '{key}': {reason}")]
    ConfigInvalid { key: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Gateway setup errors (FD-020 to FD-021)
    // ─────────────────────────────────────────────────────────────
    #[error("FD-020: Invalid gateway URL '{url}': {reason}")]
    InvalidGatewayUrl { url: String, reason: String },

    #[error("FD-021: Unknown gateway '{kind}'. Available: http, mock")]
    UnknownGateway { kind: String },

    // ─────────────────────────────────────────────────────────────
    // Gateway call errors (FD-030 to FD-033)
    // ─────────────────────────────────────────────────────────────
    #[error("FD-030: HTTP request to '{endpoint}' failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("FD-031: '{endpoint}' answered with status {status}: {body}")]
    GatewayStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("FD-032: Malformed response from '{endpoint}': {details}")]
    MalformedResponse { endpoint: String, details: String },

    #[error("FD-033: Gateway failure: {0}")]
    Gateway(String),
}

impl FormdeckError {
    /// True for errors raised while talking to the backend
    pub fn is_gateway_error(&self) -> bool {
        matches!(
            self,
            FormdeckError::Http { .. }
                | FormdeckError::GatewayStatus { .. }
                | FormdeckError::MalformedResponse { .. }
                | FormdeckError::Gateway(_)
        )
    }
}

impl FixSuggestion for FormdeckError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            FormdeckError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            FormdeckError::Io(_) => Some("Check file path and permissions"),
            FormdeckError::ConfigRead { .. } => {
                Some("Pass an existing file to --config or remove the flag")
            }
            FormdeckError::ConfigParse { .. } => {
                Some("Compare your file with the output of `formdeck config`")
            }
            FormdeckError::ConfigInvalid { .. } => {
                Some("Timing values must be positive and URLs must be absolute")
            }
            FormdeckError::InvalidGatewayUrl { .. } => {
                Some("Use an absolute URL such as http://localhost:4200")
            }
            FormdeckError::UnknownGateway { .. } => Some("Use --gateway http or --gateway mock"),
            FormdeckError::Http { .. } => {
                Some("Check that the backend is running and FORMDECK_API_URL points at it")
            }
            FormdeckError::GatewayStatus { .. } => Some("Inspect the backend logs for this request"),
            FormdeckError::MalformedResponse { .. } => {
                Some("Verify the backend returns {\"isAvailable\": bool} / {\"result\": string}")
            }
            FormdeckError::Gateway(_) => None,
        }
    }
}
