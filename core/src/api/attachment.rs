//! Attachment API - `/api/now/v1/attachment`

use bytes::Bytes;
use reqwest::Method;

use super::{ApiRequest, ApiResponse, Params};
use crate::client::ServiceNowClient;
use crate::error::Result;

pub const API_VERSION: &str = "v1";

pub(crate) fn target(sys_id: Option<&str>) -> String {
    match sys_id {
        Some(id) => format!("/api/now/{}/attachment/{}", API_VERSION, id),
        None => format!("/api/now/{}/attachment", API_VERSION),
    }
}

/// Parameters for an upload to `/attachment/file`
#[derive(Debug, Clone)]
pub struct Upload<'a> {
    pub file_name: &'a str,
    pub table_name: &'a str,
    pub table_sys_id: &'a str,
    pub content_type: Option<&'a str>,
    pub encryption_context: Option<&'a str>,
}

impl Upload<'_> {
    fn request(&self, data: Bytes) -> ApiRequest {
        let mut params = Params::new();
        params.set("file_name", self.file_name);
        params.set("table_name", self.table_name);
        params.set("table_sys_id", self.table_sys_id);
        if let Some(ctx) = self.encryption_context {
            params.set("encryption_context", ctx);
        }
        let content_type = self.content_type.unwrap_or("application/octet-stream");

        ApiRequest::new(Method::POST, format!("{}/file", target(None)))
            .params(params)
            .body(data, content_type)
    }
}

#[derive(Clone)]
pub struct AttachmentApi {
    client: ServiceNowClient,
}

impl AttachmentApi {
    pub fn new(client: ServiceNowClient) -> Self {
        Self { client }
    }

    /// Attachment metadata
    pub async fn get(&self, sys_id: &str) -> Result<ApiResponse> {
        self.client
            .execute(ApiRequest::new(Method::GET, target(Some(sys_id))))
            .await
    }

    /// File content, fully read
    pub async fn get_file(&self, sys_id: &str) -> Result<ApiResponse> {
        self.client.execute(file_request(sys_id)).await
    }

    /// File content as a live response, for streaming
    pub async fn get_file_stream(&self, sys_id: &str) -> Result<reqwest::Response> {
        self.client.execute_stream(file_request(sys_id)).await
    }

    pub async fn list(&self, params: Params) -> Result<ApiResponse> {
        let request = ApiRequest::new(Method::GET, target(None))
            .params(params.with_defaults())
            .header("Accept", "application/json");
        self.client.execute(request).await
    }

    pub async fn upload_file(&self, upload: &Upload<'_>, data: impl Into<Bytes>) -> Result<ApiResponse> {
        self.client.execute(upload.request(data.into())).await
    }

    pub async fn delete(&self, sys_id: &str) -> Result<ApiResponse> {
        self.client
            .execute(ApiRequest::new(Method::DELETE, target(Some(sys_id))))
            .await
    }
}

fn file_request(sys_id: &str) -> ApiRequest {
    ApiRequest::new(Method::GET, format!("{}/file", target(Some(sys_id))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_request() {
        let upload = Upload {
            file_name: "notes.txt",
            table_name: "problem",
            table_sys_id: "abc",
            content_type: None,
            encryption_context: Some("ctx"),
        };
        let req = upload.request(Bytes::from_static(b"hello"));
        assert_eq!(req.path, "/api/now/v1/attachment/file");
        assert_eq!(req.params.get("file_name"), Some("notes.txt"));
        assert_eq!(req.params.get("table_name"), Some("problem"));
        assert_eq!(req.params.get("table_sys_id"), Some("abc"));
        assert_eq!(req.params.get("encryption_context"), Some("ctx"));
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "Content-Type" && v == "application/octet-stream"));
    }

    #[test]
    fn test_file_request() {
        assert_eq!(file_request("abc").path, "/api/now/v1/attachment/abc/file");
    }
}
