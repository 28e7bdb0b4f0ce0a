//! Batch API - `/api/now/v1/batch`
//!
//! Queues table requests and services them with a single POST. Each queued
//! request gets an id; [`BatchApi::execute`] hands back the responses keyed by
//! those ids.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{table, ApiRequest, ApiResponse, Params};
use crate::client::ServiceNowClient;
use crate::error::{Error, Result};

pub const API_VERSION: &str = "v1";

#[derive(Debug, Serialize)]
struct NameValue {
    name: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct RestRequest {
    id: String,
    method: String,
    url: String,
    headers: Vec<NameValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    batch_request_id: String,
    rest_requests: &'a [RestRequest],
}

#[derive(Debug, Deserialize)]
struct ServicedRequest {
    id: String,
    status_code: u16,
    #[serde(default)]
    headers: Vec<ResponseHeader>,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct ResponseHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    batch_request_id: Value,
    #[serde(default)]
    serviced_requests: Vec<ServicedRequest>,
    #[serde(default)]
    unserviced_requests: Vec<Value>,
}

/// Outcome of one batch call
#[derive(Debug, Default)]
pub struct BatchResult {
    pub batch_request_id: String,
    pub responses: HashMap<String, ApiResponse>,
    /// Ids the instance did not get to, e.g. because the batch timed out
    pub unserviced: Vec<String>,
}

impl BatchResult {
    pub fn get(&self, id: &str) -> Option<&ApiResponse> {
        self.responses.get(id)
    }

    /// True when every queued request was serviced with the given status
    pub fn all_status(&self, status: u16) -> bool {
        self.unserviced.is_empty() && self.responses.values().all(|r| r.status == status)
    }
}

pub struct BatchApi {
    client: ServiceNowClient,
    requests: Vec<RestRequest>,
}

impl BatchApi {
    pub fn new(client: ServiceNowClient) -> Self {
        Self {
            client,
            requests: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Queue a request, returning the id its response will carry
    pub fn add(&mut self, request: ApiRequest) -> String {
        let id = (self.requests.len() + 1).to_string();
        let mut headers: Vec<NameValue> = request
            .headers
            .iter()
            .map(|(name, value)| NameValue {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        if !request.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("Accept")) {
            headers.push(NameValue {
                name: "Accept".to_string(),
                value: "application/json".to_string(),
            });
        }

        self.requests.push(RestRequest {
            id: id.clone(),
            method: request.method.to_string(),
            url: request.relative_url(),
            headers,
            body: request.body.as_ref().map(|b| STANDARD.encode(b)),
        });
        id
    }

    pub fn get(&mut self, table_name: &str, sys_id: &str, params: Params) -> String {
        self.add(table::get_request(table_name, sys_id, params))
    }

    pub fn list(&mut self, table_name: &str, params: Params) -> String {
        self.add(table::list_request(table_name, params))
    }

    pub fn patch(&mut self, table_name: &str, sys_id: &str, body: &Value) -> Result<String> {
        Ok(self.add(table::patch_request(table_name, sys_id, body)?))
    }

    pub fn put(&mut self, table_name: &str, sys_id: &str, body: &Value) -> Result<String> {
        self.patch(table_name, sys_id, body)
    }

    pub fn post(&mut self, table_name: &str, body: &Value) -> Result<String> {
        Ok(self.add(table::post_request(table_name, body)?))
    }

    pub fn delete(&mut self, table_name: &str, sys_id: &str) -> String {
        self.add(table::delete_request(table_name, sys_id))
    }

    /// Send everything queued. The queue is emptied whether or not the call
    /// succeeds.
    pub async fn execute(&mut self) -> Result<BatchResult> {
        let requests = std::mem::take(&mut self.requests);
        let batch_id = self.client.next_batch_id().to_string();

        if requests.is_empty() {
            return Ok(BatchResult {
                batch_request_id: batch_id,
                ..BatchResult::default()
            });
        }

        let body = serde_json::to_value(BatchRequest {
            batch_request_id: batch_id.clone(),
            rest_requests: &requests,
        })?;
        tracing::debug!("Executing batch {} with {} request(s)", batch_id, requests.len());

        let request = ApiRequest::new(Method::POST, format!("/api/now/{}/batch", API_VERSION)).json(&body)?;
        let response = self.client.execute(request).await?;
        let data: BatchResponse = response.json()?;

        let echoed = match &data.batch_request_id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if echoed != batch_id {
            return Err(Error::Request(format!(
                "batch response id {} does not match request id {}",
                echoed, batch_id
            )));
        }

        let mut result = BatchResult {
            batch_request_id: batch_id,
            ..BatchResult::default()
        };
        for serviced in data.serviced_requests {
            if !requests.iter().any(|r| r.id == serviced.id) {
                return Err(Error::Request(format!("batch returned unknown request id {}", serviced.id)));
            }
            let id = serviced.id.clone();
            result.responses.insert(id, to_response(serviced)?);
        }
        for unserviced in data.unserviced_requests {
            let id = match &unserviced {
                Value::String(s) => s.clone(),
                other => other
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| other.to_string()),
            };
            tracing::warn!("Batch request {} was not serviced", id);
            result.unserviced.push(id);
        }

        Ok(result)
    }
}

fn to_response(serviced: ServicedRequest) -> Result<ApiResponse> {
    let mut headers = HeaderMap::new();
    for header in serviced.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(header.name.as_bytes()),
            HeaderValue::from_str(&header.value),
        ) {
            headers.append(name, value);
        }
    }
    let body = STANDARD.decode(serviced.body.as_bytes())?;

    Ok(ApiResponse {
        status: serviced.status_code,
        headers,
        body: Bytes::from(body),
    })
}
