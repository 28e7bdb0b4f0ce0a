#![allow(dead_code)]

use serde_json::{json, Value};
use snc_core::ServiceNowClient;
use wiremock::MockServer;

pub fn client(server: &MockServer) -> ServiceNowClient {
    ServiceNowClient::builder(&server.uri())
        .basic_auth("admin", "admin")
        .allow_insecure_http(true)
        .build()
        .expect("client builds against mock server")
}

/// A row the way `sysparm_display_value=all` returns it
pub fn row(fields: &[(&str, &str, &str)]) -> Value {
    let mut obj = serde_json::Map::new();
    for (name, value, display) in fields {
        obj.insert(name.to_string(), json!({"value": value, "display_value": display}));
    }
    Value::Object(obj)
}

pub fn problem(sys_id: &str, number: &str) -> Value {
    row(&[
        ("sys_id", sys_id, sys_id),
        ("number", number, number),
        ("state", "1", "New"),
    ])
}

pub fn sys_id(n: usize) -> String {
    format!("{:032}", n)
}
