//! Table API - `/api/now/table/{table}`

use reqwest::Method;
use serde_json::Value;

use super::{ApiRequest, ApiResponse, Params};
use crate::client::ServiceNowClient;
use crate::error::Result;

pub(crate) fn target(table: &str, sys_id: Option<&str>) -> String {
    match sys_id {
        Some(id) => format!("/api/now/table/{}/{}", table, id),
        None => format!("/api/now/table/{}", table),
    }
}

pub fn list_request(table: &str, params: Params) -> ApiRequest {
    ApiRequest::new(Method::GET, target(table, None)).params(params.with_defaults())
}

/// Single row fetch; paging parameters make no sense here
pub fn get_request(table: &str, sys_id: &str, params: Params) -> ApiRequest {
    let mut params = params.with_defaults();
    params.remove("sysparm_offset");
    ApiRequest::new(Method::GET, target(table, Some(sys_id))).params(params)
}

pub fn patch_request(table: &str, sys_id: &str, body: &Value) -> Result<ApiRequest> {
    ApiRequest::new(Method::PATCH, target(table, Some(sys_id)))
        .params(Params::new().with_defaults())
        .json(body)
}

pub fn post_request(table: &str, body: &Value) -> Result<ApiRequest> {
    ApiRequest::new(Method::POST, target(table, None))
        .params(Params::new().with_defaults())
        .json(body)
}

pub fn delete_request(table: &str, sys_id: &str) -> ApiRequest {
    ApiRequest::new(Method::DELETE, target(table, Some(sys_id)))
}

#[derive(Clone)]
pub struct TableApi {
    client: ServiceNowClient,
}

impl TableApi {
    pub fn new(client: ServiceNowClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, table: &str, params: Params) -> Result<ApiResponse> {
        self.client.execute(list_request(table, params)).await
    }

    pub async fn get(&self, table: &str, sys_id: &str, params: Params) -> Result<ApiResponse> {
        self.client.execute(get_request(table, sys_id, params)).await
    }

    /// Statuses >= 400 become errors; callers check for the expected success code.
    pub async fn patch(&self, table: &str, sys_id: &str, body: &Value) -> Result<ApiResponse> {
        self.client.execute(patch_request(table, sys_id, body)?).await
    }

    pub async fn put(&self, table: &str, sys_id: &str, body: &Value) -> Result<ApiResponse> {
        self.patch(table, sys_id, body).await
    }

    pub async fn post(&self, table: &str, body: &Value) -> Result<ApiResponse> {
        self.client.execute(post_request(table, body)?).await
    }

    pub async fn delete(&self, table: &str, sys_id: &str) -> Result<ApiResponse> {
        self.client.execute(delete_request(table, sys_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target() {
        assert_eq!(target("incident", None), "/api/now/table/incident");
        assert_eq!(target("incident", Some("abc")), "/api/now/table/incident/abc");
    }

    #[test]
    fn test_get_drops_offset() {
        let mut params = Params::new();
        params.set("sysparm_offset", 0);
        params.set("sysparm_fields", "sys_id,name");
        let req = get_request("sys_user", "abc", params);
        assert!(!req.params.contains("sysparm_offset"));
        assert_eq!(req.params.get("sysparm_fields"), Some("sys_id,name"));
        assert_eq!(req.method, Method::GET);
    }

    #[test]
    fn test_post_body() {
        let req = post_request("problem", &json!({"short_description": "x"})).unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body.as_deref(), Some(&br#"{"short_description":"x"}"#[..]));
        assert!(req.headers.iter().any(|(k, v)| k == "Content-Type" && v == "application/json"));
    }
}
