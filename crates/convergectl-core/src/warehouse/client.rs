//! HTTP client for the warehouse control-plane API
//!
//! A thin typed wrapper over reqwest: API-key auth, JSON bodies, and
//! decoding of the control plane's error envelope into [`RemoteError`].
//! Network timeouts are this client's concern; the stabilizer's budget
//! covers only polling.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::adapter::{RemoteError, RemoteOperation, RemoteRequest, RemoteResponse};
use crate::error::{EngineError, Result};

/// Default user agent for control-plane requests
const DEFAULT_USER_AGENT: &str = concat!("convergectl/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated client for one control-plane endpoint.
///
/// Cloning is cheap; the underlying connection pool is shared, which is the
/// intended way to run many reconciliations against one endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Route a built request to the control plane.
    pub async fn dispatch(
        &self,
        request: RemoteRequest,
    ) -> std::result::Result<RemoteResponse, RemoteError> {
        let payload = match request.operation {
            RemoteOperation::Create => {
                self.execute(Method::POST, &request.target, Some(&request.payload), &[])
                    .await?
            }
            RemoteOperation::Read => {
                self.execute(Method::GET, &request.target, None, &[]).await?
            }
            RemoteOperation::Update => {
                self.execute(Method::PATCH, &request.target, Some(&request.payload), &[])
                    .await?
            }
            RemoteOperation::Delete => {
                self.execute(Method::DELETE, &request.target, None, &[])
                    .await?
            }
            RemoteOperation::List => {
                let query: Vec<(&str, &str)> = request
                    .payload
                    .get("cursor")
                    .and_then(Value::as_str)
                    .map(|c| vec![("cursor", c)])
                    .unwrap_or_default();
                self.execute(Method::GET, &request.target, None, &query)
                    .await?
            }
        };
        Ok(RemoteResponse::new(payload))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> std::result::Result<Value, RemoteError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| RemoteError::transport(format!("invalid request path '{path}': {e}")))?;

        let mut builder = self.http.request(method, url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))?;

        let status = response.status();
        let payload: Value = match response.text().await {
            Ok(text) if text.trim().is_empty() => Value::Null,
            Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            Err(e) => return Err(RemoteError::transport(e.to_string())),
        };

        if status.is_success() {
            return Ok(payload);
        }
        Err(decode_error(status, &payload))
    }
}

/// Decode the control plane's error envelope.
///
/// The envelope is `{"error": {"code": ..., "message": ...}}`; older
/// endpoints put `code`/`message` at the top level.
fn decode_error(status: StatusCode, payload: &Value) -> RemoteError {
    let envelope = payload.get("error").unwrap_or(payload);
    let code = envelope
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = envelope
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("control plane returned HTTP {status}"));

    RemoteError {
        code,
        message,
        status: Some(status.as_u16()),
    }
}

/// Builder for [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    insecure: bool,
}

impl ClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Skip TLS certificate verification, for self-signed deployments.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| EngineError::Config("client base URL is required".to_string()))?;
        let api_key = self
            .api_key
            .ok_or_else(|| EngineError::Config("client API key is required".to_string()))?;

        // A trailing slash makes Url::join treat the last segment as a
        // directory, which is what relative targets expect.
        let normalized = if base_url.ends_with('/') {
            base_url
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| EngineError::Config(format!("invalid base URL: {e}")))?;

        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(&api_key)
            .map_err(|_| EngineError::Config("API key contains invalid characters".to_string()))?;
        key_value.set_sensitive(true);
        headers.insert("x-api-key", key_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()))
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .danger_accept_invalid_certs(self.insecure)
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Client { http, base_url })
    }
}
