//! Raw HTTP exchange behind the ADO and Figma clients.
//!
//! Both clients only need "send this request, give me status and body", so
//! that is all the backend trait exposes. Production uses reqwest; tests plug
//! in a scripted backend.

use std::borrow::Cow;

use async_trait::async_trait;
use reqwest::{Client, Method};

use crate::error::Result;

pub const JSON: &str = "application/json";
pub const JSON_PATCH: &str = "application/json-patch+json";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Request payload. JSON for everything except attachment uploads.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json {
        value: serde_json::Value,
        content_type: &'static str,
    },
    Bytes(Vec<u8>),
}

impl RequestBody {
    pub fn json(value: serde_json::Value) -> Self {
        RequestBody::Json {
            value,
            content_type: JSON,
        }
    }

    pub fn json_patch(value: serde_json::Value) -> Self {
        RequestBody::Json {
            value,
            content_type: JSON_PATCH,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Json { content_type, .. } => content_type,
            RequestBody::Bytes(_) => OCTET_STREAM,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Credential headers; everything else is derived from the body.
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

pub struct ReqwestBackend {
    http: Client,
}

impl ReqwestBackend {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for ReqwestBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .header("Accept", JSON);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.header("Content-Type", body.content_type());
            builder = match body {
                RequestBody::Json { value, .. } => builder.body(serde_json::to_vec(value)?),
                RequestBody::Bytes(bytes) => builder.body(bytes.clone()),
            };
        }

        let response = builder.send().await?;
        let status = response.status();

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            body: response
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .unwrap_or_else(|_| b"<failed to read response body>".to_vec()),
        })
    }
}

#[cfg(test)]
pub mod fake {
    //! Scripted backend for tests: replies are consumed in order and every
    //! request is recorded for later assertions.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    pub struct FakeBackend {
        replies: Arc<Mutex<VecDeque<HttpResponse>>>,
        fallback: Arc<Mutex<Option<HttpResponse>>>,
        pub requests: Arc<Mutex<Vec<HttpRequest>>>,
    }

    pub fn reply(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            reason: reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("")
                .to_string(),
            body: body.to_string().into_bytes(),
        }
    }

    /// 200 with a raw, non-JSON body.
    pub fn bytes_reply(bytes: &[u8]) -> HttpResponse {
        HttpResponse {
            status: 200,
            reason: "OK".to_string(),
            body: bytes.to_vec(),
        }
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, response: HttpResponse) -> &Self {
            self.replies.lock().unwrap().push_back(response);
            self
        }

        pub fn push_json(&self, body: serde_json::Value) -> &Self {
            self.push(reply(200, body))
        }

        /// Reply used once the scripted queue is exhausted.
        pub fn always(&self, response: HttpResponse) -> &Self {
            *self.fallback.lock().unwrap() = Some(response);
            self
        }

        pub fn recorded(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self.replies.lock().unwrap().pop_front();
            Ok(next
                .or_else(|| self.fallback.lock().unwrap().clone())
                .unwrap_or_else(|| reply(200, serde_json::json!({}))))
        }
    }
}
