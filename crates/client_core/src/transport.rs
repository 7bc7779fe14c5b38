//! The network collaborator behind [`crate::boundary::HttpBoundary`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use shared::{Method, RequestConfig, ResponseEnvelope, TransportError};
use tracing::debug;
use url::Url;

/// Performs one request. Non-2xx responses and requests that never got a
/// response both come back as `Err`, carrying the same envelope shape as a
/// success.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, config: RequestConfig) -> Result<ResponseEnvelope, ResponseEnvelope>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Option<Url>,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, TransportError> {
        let parsed = Url::parse(base_url).map_err(|source| TransportError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        self.base_url = Some(parsed);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn resolve_url(&self, raw: &str) -> Result<Url, TransportError> {
        let parsed = match &self.base_url {
            Some(base) => base.join(raw),
            None => Url::parse(raw),
        };
        parsed.map_err(|source| TransportError::InvalidUrl {
            url: raw.to_string(),
            source,
        })
    }

    async fn send(&self, config: &RequestConfig) -> Result<ResponseEnvelope, TransportError> {
        let url = self.resolve_url(&config.url)?;
        let mut request = self
            .client
            .request(reqwest_method(config.method), url.clone())
            .query(&config.params);
        for (name, value) in &config.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request_body(config) {
            request = request.json(body);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|err| TransportError::Connection {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| TransportError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        debug!(%url, status, bytes = bytes.len(), "response received");
        Ok(ResponseEnvelope {
            data: decode_body(&bytes),
            status,
            headers,
            request_config: config.clone(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, config: RequestConfig) -> Result<ResponseEnvelope, ResponseEnvelope> {
        match self.send(&config).await {
            Ok(envelope) if envelope.is_success() => Ok(envelope),
            Ok(envelope) => Err(envelope),
            Err(err) => Err(ResponseEnvelope::new(
                0,
                json!({ "error": err.to_string() }),
                config,
            )),
        }
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

/// JSON when the body parses as JSON, a string otherwise, `null` when empty.
/// The body to send, if the method carries one.
fn request_body(config: &RequestConfig) -> Option<&Value> {
    let body = config.body.as_ref()?;
    if !config.method.has_body() {
        debug!(
            method = %config.method,
            url = %config.url,
            "ignoring body on a bodiless method"
        );
        return None;
    }
    Some(body)
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
