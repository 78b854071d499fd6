use std::fmt;
use std::time::Duration;

use base64::Engine;
use const_format::concatcp;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::backend::{HttpBackend, HttpRequest, HttpResponse, ReqwestBackend, RequestBody};
use crate::error::{Result, SyncError};

pub const API_VERSION: &str = "7.1";
pub const API_VERSION_PARAM: &str = concatcp!("api-version=", API_VERSION);
const ADO_HOST: &str = "https://dev.azure.com";
const EXCERPT_LIMIT: usize = 500;

/// Organization, project and personal access token for one ADO project.
#[derive(Clone)]
pub struct Credentials {
    pub organization: String,
    pub project: String,
    pat: String,
}

impl Credentials {
    pub fn new(organization: String, project: String, pat: String) -> Self {
        Self {
            organization,
            project,
            pat,
        }
    }

    /// `https://dev.azure.com/{org}`
    pub fn org_url(&self) -> String {
        format!("{ADO_HOST}/{}", self.organization)
    }

    /// `https://dev.azure.com/{org}/{project}/_apis`, project URL-encoded.
    pub fn base_url(&self) -> String {
        format!(
            "{}/{}/_apis",
            self.org_url(),
            urlencoding::encode(&self.project)
        )
    }

    pub fn auth_header(&self) -> String {
        basic_auth_header(&self.pat)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("pat", &"<redacted>")
            .finish()
    }
}

/// Basic auth with an empty user name, which is how ADO accepts PATs.
pub fn basic_auth_header(pat: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{pat}"));
    format!("Basic {encoded}")
}

/// Delay and backoff schedule applied to every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Courtesy delay before every attempt.
    pub call_delay: Duration,
    /// First backoff after a 429; doubles per attempt.
    pub rate_limit_backoff: Duration,
    /// First backoff after a 5xx; doubles per attempt.
    pub server_error_backoff: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            call_delay: Duration::from_millis(300),
            rate_limit_backoff: Duration::from_secs(2),
            server_error_backoff: Duration::from_secs(1),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// No sleeping at all. Same attempt cap as the default.
    pub fn immediate() -> Self {
        Self {
            call_delay: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
            server_error_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Backoff before retrying after `status` on the zero-based `attempt`,
    /// or `None` when the status is not retryable.
    pub fn backoff(&self, status: u16, attempt: u32) -> Option<Duration> {
        let base = match status {
            429 => self.rate_limit_backoff,
            s if s >= 500 => self.server_error_backoff,
            _ => return None,
        };
        Some(base.saturating_mul(2u32.saturating_pow(attempt)))
    }
}

/// Authenticated, throttled, retrying ADO transport.
pub struct AdoClient {
    backend: Box<dyn HttpBackend>,
    credentials: Credentials,
    policy: RetryPolicy,
}

impl AdoClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_backend(credentials, RetryPolicy::default(), Box::new(ReqwestBackend::new()))
    }

    pub fn with_backend(
        credentials: Credentials,
        policy: RetryPolicy,
        backend: Box<dyn HttpBackend>,
    ) -> Self {
        Self {
            backend,
            credentials,
            policy,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Project-scoped API URL: `{base}/{path}?{query}&api-version=7.1`.
    pub fn api_url(&self, path: &str, query: Option<&str>) -> String {
        let base = self.credentials.base_url();
        match query {
            Some(q) => format!("{base}/{path}?{q}&{API_VERSION_PARAM}"),
            None => format!("{base}/{path}?{API_VERSION_PARAM}"),
        }
    }

    /// Run one logical API call, retrying 429 and 5xx up to the policy cap.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<RequestBody>,
    ) -> Result<serde_json::Value> {
        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: vec![("Authorization", self.credentials.auth_header())],
            body,
        };

        let mut attempt = 0;
        loop {
            sleep(self.policy.call_delay).await;
            debug!(method = %request.method, url, attempt, "ADO request");

            let response = self.backend.send(&request).await?;
            if response.is_success() {
                return decode_body(url, &response);
            }

            attempt += 1;
            let backoff = self.policy.backoff(response.status, attempt - 1);
            match backoff {
                Some(delay) if attempt < self.policy.max_attempts => {
                    if response.status == 429 {
                        warn!("Rate limited, waiting {}s...", delay.as_secs_f32());
                    } else {
                        warn!(
                            status = response.status,
                            "Server error, retrying in {}s...",
                            delay.as_secs_f32()
                        );
                    }
                    sleep(delay).await;
                }
                _ => return Err(api_error(url, &response, attempt)),
            }
        }
    }

    /// `execute` followed by decoding into a typed response.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<RequestBody>,
    ) -> Result<T> {
        let value = self.execute(method, url, body).await?;
        serde_json::from_value(value).map_err(|e| SyncError::UnexpectedResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

async fn sleep(delay: std::time::Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn decode_body(url: &str, response: &HttpResponse) -> Result<serde_json::Value> {
    let text = response.text();
    if text.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(&text).map_err(|e| SyncError::UnexpectedResponse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn api_error(url: &str, response: &HttpResponse, attempts: u32) -> SyncError {
    SyncError::Api {
        status: response.status,
        reason: response.reason.clone(),
        url: url.to_string(),
        excerpt: excerpt(&response.text(), EXCERPT_LIMIT),
        attempts,
    }
}

/// First `max` characters of `text`.
pub fn excerpt(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
