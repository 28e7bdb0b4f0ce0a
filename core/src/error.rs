//! Error types shared by every part of the client

use serde_json::Value;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or rejected credentials, or an HTTP 401
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// HTTP 403, the user lacks a role for the operation
    #[error("insufficient role: {0}")]
    Role(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Any other failed request, or a response body we could not make sense of
    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid instance: {0}")]
    Instance(String),

    #[error("insert failed ({status}): {message}")]
    Insert { status: u16, message: String },

    #[error("update failed ({status}): {message}")]
    Update { status: u16, message: String },

    #[error("delete failed ({status}): {message}")]
    Delete { status: u16, message: String },

    #[error("upload failed: {0}")]
    Upload(String),

    /// Field access without a current row
    #[error("no current record: {0}")]
    NoRecord(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Maps an HTTP error status and its decoded body to the matching variant
    pub(crate) fn from_status(status: u16, body: &Value) -> Self {
        let message = error_message(body);
        match status {
            401 => Error::Authentication(message),
            403 => Error::Role(message),
            404 => Error::NotFound(message),
            _ => Error::Request(message),
        }
    }

    /// HTTP status carried by the error, when there is one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Insert { status, .. }
            | Error::Update { status, .. }
            | Error::Delete { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Pulls `error.message` (and `error.detail`) out of a ServiceNow error body,
/// falling back to the raw JSON.
pub(crate) fn error_message(body: &Value) -> String {
    let error = match body.get("error") {
        Some(e) => e,
        None => return body.to_string(),
    };
    match error.get("message").and_then(|m| m.as_str()) {
        Some(message) => match error.get("detail").and_then(|d| d.as_str()) {
            Some(detail) if !detail.is_empty() => format!("{} ({})", message, detail),
            _ => message.to_string(),
        },
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_status_maps_codes() {
        let body = json!({"error": {"message": "No Record found", "detail": "Record doesn't exist"}});
        assert!(matches!(Error::from_status(404, &body), Error::NotFound(_)));
        assert!(matches!(Error::from_status(403, &body), Error::Role(_)));
        assert!(matches!(Error::from_status(401, &body), Error::Authentication(_)));
        assert!(matches!(Error::from_status(500, &body), Error::Request(_)));
    }

    #[test]
    fn test_error_message() {
        let body = json!({"error": {"message": "No Record found", "detail": "Record doesn't exist"}});
        assert_eq!(error_message(&body), "No Record found (Record doesn't exist)");

        let body = json!({"error": {"message": "User Not Authenticated", "detail": ""}});
        assert_eq!(error_message(&body), "User Not Authenticated");

        let body = json!({"status": "failure"});
        assert_eq!(error_message(&body), r#"{"status":"failure"}"#);
    }
}
