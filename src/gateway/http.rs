//! HTTP gateway using the backend's JSON API
//!
//! `POST {base}/api/checkUsername` and `POST {base}/api/submitForm`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::SubmissionGateway;
use crate::error::{FormdeckError, Result};
use crate::model::{
    CheckUsernameRequest, CheckUsernameResponse, SubmitFormsRequest, SubmitResponse, SubmittedForm,
};

const CHECK_USERNAME_PATH: &str = "api/checkUsername";
const SUBMIT_FORMS_PATH: &str = "api/submitForm";

/// Gateway that talks to a real backend
pub struct HttpGateway {
    /// Shared HTTP client (connection pooling)
    client: reqwest::Client,
    check_url: Url,
    submit_url: Url,
}

impl HttpGateway {
    /// Create a gateway for `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = parse_base_url(base_url)?;
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| FormdeckError::InvalidGatewayUrl {
                    url: base_url.to_string(),
                    reason: e.to_string(),
                })
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent("formdeck/0.1")
            .build()
            .map_err(|e| FormdeckError::Http {
                endpoint: base_url.to_string(),
                source: e,
            })?;

        Ok(Self {
            client,
            check_url: join(CHECK_USERNAME_PATH)?,
            submit_url: join(SUBMIT_FORMS_PATH)?,
        })
    }

    pub fn check_url(&self) -> &Url {
        &self.check_url
    }

    pub fn submit_url(&self) -> &Url {
        &self.submit_url
    }

    async fn post_json<B, R>(&self, url: &Url, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let endpoint = url.path().to_string();

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| FormdeckError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                endpoint = %endpoint,
                status = %status,
                "Backend returned an error status"
            );
            return Err(FormdeckError::GatewayStatus {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| FormdeckError::MalformedResponse {
                endpoint,
                details: e.to_string(),
            })
    }
}

/// Validate the base URL and make sure relative joins keep its path
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).map_err(|e| FormdeckError::InvalidGatewayUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FormdeckError::InvalidGatewayUrl {
            url: base_url.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl SubmissionGateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn check_username(&self, username: &str) -> Result<bool> {
        tracing::debug!(username, "Checking username availability");
        let body = CheckUsernameRequest {
            username: username.to_string(),
        };
        let response: CheckUsernameResponse = self.post_json(&self.check_url, &body).await?;
        Ok(response.is_available)
    }

    async fn submit_forms(&self, forms: Vec<SubmittedForm>) -> Result<SubmitResponse> {
        tracing::info!(count = forms.len(), "Submitting forms");
        let body = SubmitFormsRequest { forms };
        self.post_json(&self.submit_url, &body).await
    }
}
