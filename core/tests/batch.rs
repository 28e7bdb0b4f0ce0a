mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use snc_core::api::Params;
use snc_core::Error;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use common::{client, problem, sys_id};

fn serviced(id: &str, status: u16, body: Option<&Value>) -> Value {
    json!({
        "id": id,
        "status_code": status,
        "status_text": "",
        "headers": [{"name": "Content-Type", "value": "application/json"}],
        "body": body.map(|b| STANDARD.encode(b.to_string())).unwrap_or_default(),
        "execution_time": 1
    })
}

/// Echoes every queued request back with the given status
fn echo_batch(status: u16) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static {
    move |request: &Request| {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let serviced_requests: Vec<Value> = body["rest_requests"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| serviced(r["id"].as_str().unwrap(), status, None))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({
            "batch_request_id": body["batch_request_id"],
            "serviced_requests": serviced_requests,
            "unserviced_requests": []
        }))
    }
}

#[tokio::test]
async fn test_batch_get_and_unserviced() {
    let server = MockServer::start().await;
    let id = sys_id(1);
    Mock::given(method("POST"))
        .and(path("/api/now/v1/batch"))
        .and(body_partial_json(json!({"batch_request_id": "1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batch_request_id": "1",
            "serviced_requests": [serviced("1", 200, Some(&json!({"result": problem(&id, "PRB001")})))],
            "unserviced_requests": ["2"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut batch = client.batch_api();
    let get_id = batch.get("problem", &id, Params::new());
    let list_id = batch.list("problem", Params::new());
    assert_eq!(batch.len(), 2);

    let result = batch.execute().await.unwrap();
    assert!(batch.is_empty());
    assert_eq!(result.batch_request_id, "1");

    let response = result.get(&get_id).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.result().unwrap()["number"]["value"], json!("PRB001"));
    assert_eq!(result.unserviced, vec![list_id]);
    assert!(!result.all_status(200));
}

#[tokio::test]
async fn test_batch_requests_are_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/now/v1/batch"))
        .respond_with(|request: &Request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let rest = &body["rest_requests"][0];
            assert_eq!(rest["method"], json!("POST"));
            assert!(rest["url"].as_str().unwrap().starts_with("/api/now/table/problem?"));
            let decoded = STANDARD.decode(rest["body"].as_str().unwrap()).unwrap();
            assert_eq!(
                serde_json::from_slice::<Value>(&decoded).unwrap(),
                json!({"short_description": "batched"})
            );
            ResponseTemplate::new(200).set_body_json(json!({
                "batch_request_id": body["batch_request_id"],
                "serviced_requests": [serviced("1", 201, Some(&json!({"result": {}})))],
                "unserviced_requests": []
            }))
        })
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut batch = client.batch_api();
    batch.post("problem", &json!({"short_description": "batched"})).unwrap();
    assert!(batch.execute().await.unwrap().all_status(201));
}

#[tokio::test]
async fn test_batch_id_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/now/v1/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batch_request_id": "999",
            "serviced_requests": [],
            "unserviced_requests": []
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let mut batch = client.batch_api();
    batch.delete("problem", &sys_id(1));
    assert!(matches!(batch.execute().await, Err(Error::Request(_))));
    assert!(batch.is_empty());
}

#[tokio::test]
async fn test_delete_multiple() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/now/table/problem"))
        .and(query_param("sysparm_fields", "sys_id"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "2")
                .set_body_json(json!({"result": [{"sys_id": sys_id(1)}, {"sys_id": sys_id(2)}]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/now/v1/batch"))
        .respond_with(echo_batch(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut gr = client(&server).glide_record("problem");
    gr.add_query("short_description", "LIKE", Some("delete me"));
    assert!(gr.delete_multiple().await.unwrap());
}

#[tokio::test]
async fn test_update_multiple_only_changed_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/now/table/problem"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "3")
                .set_body_json(json!({"result": [
                    problem(&sys_id(1), "PRB001"),
                    problem(&sys_id(2), "PRB002"),
                    problem(&sys_id(3), "PRB003"),
                ]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/now/v1/batch"))
        .respond_with(|request: &Request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let rest = body["rest_requests"].as_array().unwrap();
            assert_eq!(rest.len(), 2);
            assert!(rest.iter().all(|r| r["method"] == json!("PATCH")));
            echo_batch(200)(request)
        })
        .expect(1)
        .mount(&server)
        .await;

    let mut gr = client(&server).glide_record("problem");
    gr.query().await.unwrap();
    while gr.next().await.unwrap() {
        if gr.get_value("number").unwrap() != Some(&json!("PRB002")) {
            gr.set_value("state", "2").unwrap();
        }
    }
    assert!(gr.update_multiple().await.unwrap());
}

#[tokio::test]
async fn test_update_multiple_reports_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/now/table/problem"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "1")
                .set_body_json(json!({"result": [problem(&sys_id(1), "PRB001")]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/now/v1/batch"))
        .respond_with(echo_batch(400))
        .mount(&server)
        .await;

    let mut gr = client(&server).glide_record("problem");
    gr.query().await.unwrap();
    assert!(gr.next().await.unwrap());
    gr.set_value("state", "7").unwrap();

    let result = gr.update_multiple_responses().await.unwrap();
    assert_eq!(result.responses.len(), 1);
    assert!(!result.all_status(200));
}
