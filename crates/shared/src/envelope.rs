//! Request/response records exchanged with the transport collaborator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{domain::Method, domain::RequestId, error::ErrorCode};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub request_id: RequestId,
    pub method: Method,
    pub url: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl RequestConfig {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, url).with_body(body)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The outcome of one transport call, used both as fulfillment value and as
/// rejection reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub data: Value,
    /// HTTP status; `0` when no response was received at all.
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub request_config: RequestConfig,
}

impl ResponseEnvelope {
    pub fn new(status: u16, data: Value, request_config: RequestConfig) -> Self {
        Self {
            data,
            status,
            headers: BTreeMap::new(),
            request_config,
        }
    }

    /// Envelope produced by a failure hook that recovers with raw data.
    pub fn recovered(data: Value, request_config: RequestConfig) -> Self {
        Self::new(200, data, request_config)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_status(self.status)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Deserializes `data` into a typed record.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let envelope = ResponseEnvelope::new(200, json!(null), RequestConfig::get("/items"))
            .with_header("Content-Type", "application/json");
        assert_eq!(envelope.header("content-type"), Some("application/json"));
        assert_eq!(envelope.header("etag"), None);
    }

    #[test]
    fn classifies_success_and_failure_statuses() {
        let ok = ResponseEnvelope::new(204, json!(null), RequestConfig::delete("/items/1"));
        assert!(ok.is_success());
        assert_eq!(ok.error_code(), None);

        let missing = ResponseEnvelope::new(404, json!(null), RequestConfig::get("/items/9"));
        assert!(!missing.is_success());
        assert_eq!(missing.error_code(), Some(ErrorCode::NotFound));
    }

    #[test]
    fn decodes_typed_payload() {
        #[derive(Deserialize)]
        struct Item {
            name: String,
        }

        let envelope = ResponseEnvelope::new(
            200,
            json!({ "name": "widget" }),
            RequestConfig::get("/items/1"),
        );
        let item: Item = envelope.json().expect("decode item");
        assert_eq!(item.name, "widget");
    }

    #[test]
    fn request_config_serializes_method_uppercase() {
        let config = RequestConfig::post("/items", json!({ "name": "widget" }))
            .with_param("page", "2");
        let encoded = serde_json::to_value(&config).expect("encode");
        assert_eq!(encoded["method"], "POST");
        assert_eq!(encoded["params"]["page"], "2");
    }
}
