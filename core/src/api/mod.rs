//! REST API request shaping
//!
//! Requests are described as [`ApiRequest`]s so the same shape can be sent
//! directly or queued on the batch API.

pub mod attachment;
pub mod batch;
pub mod table;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

pub use attachment::AttachmentApi;
pub use batch::{BatchApi, BatchResult};
pub use table::TableApi;

/// Ordered query parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, replacing an existing value in place
    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `k=v&k=v` without percent-encoding, an estimate of the URL length
    pub fn raw_len(&self) -> usize {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
            .len()
    }

    /// Percent-encoded query string
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Adds the parameters every Table API read needs
    pub(crate) fn with_defaults(mut self) -> Self {
        if !self.contains("sysparm_display_value") {
            self.set("sysparm_display_value", "all");
        }
        self.set("sysparm_exclude_reference_link", "true");
        // Required for large queries
        self.set("sysparm_suppress_pagination_header", "true");
        self
    }
}

/// A request against the instance, relative to its base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub params: Params,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Params::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: &Value) -> Result<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self.header("Content-Type", "application/json"))
    }

    pub fn body(mut self, body: impl Into<Bytes>, content_type: &str) -> Self {
        self.body = Some(body.into());
        self.header("Content-Type", content_type)
    }

    /// Path plus encoded query string, as used inside batch requests
    pub fn relative_url(&self) -> String {
        if self.params.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.params.encode())
        }
    }
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self { status, headers, body })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// `X-Total-Count`, the size of the whole result set
    pub fn total_count(&self) -> Option<usize> {
        self.header("X-Total-Count").and_then(|v| v.trim().parse().ok())
    }

    /// Errors out on any status >= 400, decoding the ServiceNow error body
    /// when there is one.
    pub fn validate(self) -> Result<Self> {
        if self.status < 400 {
            return Ok(self);
        }
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(body) => Err(Error::from_status(self.status, &body)),
            Err(_) => Err(Error::Request(self.text())),
        }
    }

    /// The `result` member of a Table/Attachment API body
    pub fn result(&self) -> Result<Value> {
        let mut body: Value = self.json().map_err(|e| self.decode_error(e))?;
        body.get_mut("result")
            .map(Value::take)
            .ok_or_else(|| Error::Request(format!("response has no result: {}", self.text())))
    }

    pub(crate) fn decode_error(&self, e: Error) -> Error {
        let text = self.text();
        tracing::debug!("Failed to decode response: {}", text);
        if text.contains("Transaction cancelled: maximum execution time exceeded") {
            return Error::Request("Maximum execution time exceeded. Lower batch size.".to_string());
        }
        e
    }
}
