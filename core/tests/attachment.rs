mod common;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client, sys_id};

fn attachment_row(id: &str, file_name: &str) -> serde_json::Value {
    json!({
        "sys_id": {"value": id, "display_value": id},
        "file_name": {"value": file_name, "display_value": file_name},
        "table_name": {"value": "problem", "display_value": "problem"},
        "table_sys_id": {"value": sys_id(1), "display_value": sys_id(1)},
        "content_type": {"value": "text/plain", "display_value": "text/plain"}
    })
}

async fn mount_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/now/v1/attachment"))
        .and(query_param(
            "sysparm_query",
            format!("table_name=problem^table_sys_id={}", sys_id(1)),
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "1")
                .set_body_json(json!({"result": [attachment_row("att1", "notes.txt")]})),
        )
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/now/v1/attachment/att1/file"))
        .respond_with(ResponseTemplate::new(200).set_body_string("line one\nline two"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_record_attachments_read() {
    let server = MockServer::start().await;
    mount_list(&server).await;

    let client = client(&server);
    let mut gr = client.glide_record("problem");
    gr.initialize();
    gr.set_value("sys_id", sys_id(1)).unwrap();

    let mut attachments = gr.get_attachments().await.unwrap();
    assert_eq!(attachments.len(), 1);
    assert!(attachments.next().await.unwrap());
    assert_eq!(attachments.file_name().as_deref(), Some("notes.txt"));
    assert_eq!(attachments.get_value("content_type"), Some(&json!("text/plain")));
    assert_eq!(
        attachments.get_link(),
        Some(format!("{}/api/now/v1/attachment/att1/file", server.uri()))
    );

    assert_eq!(&attachments.read().await.unwrap()[..], b"line one\nline two");
    assert_eq!(
        attachments.read_lines("\n").await.unwrap(),
        vec!["line one".to_string(), "line two".to_string()]
    );

    let mut stream = Box::pin(attachments.stream().await.unwrap());
    let mut streamed = Vec::new();
    while let Some(chunk) = stream.next().await {
        streamed.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(streamed, b"line one\nline two");

    assert!(!attachments.next().await.unwrap());
}

#[tokio::test]
async fn test_write_to_directory_uses_file_name() {
    let server = MockServer::start().await;
    mount_list(&server).await;

    let client = client(&server);
    let mut attachments = client.attachment("problem");
    attachments.add_query("table_sys_id", &sys_id(1), None);
    attachments.query().await.unwrap();
    assert!(attachments.next().await.unwrap());

    let dir = tempfile::tempdir().unwrap();
    let written = attachments.write_to(dir.path()).await.unwrap();
    assert_eq!(written, dir.path().join("notes.txt"));
    assert_eq!(std::fs::read_to_string(&written).unwrap(), "line one\nline two");

    let explicit = dir.path().join("copy.txt");
    assert_eq!(attachments.write_to(&explicit).await.unwrap(), explicit);
    assert!(explicit.exists());
}

#[tokio::test]
async fn test_upload() {
    let server = MockServer::start().await;
    let location = format!("{}/api/now/attachment/new1", server.uri());
    Mock::given(method("POST"))
        .and(path("/api/now/v1/attachment/file"))
        .and(query_param("file_name", "hello.txt"))
        .and(query_param("table_name", "problem"))
        .and(query_param("table_sys_id", sys_id(1)))
        .and(header("Content-Type", "text/plain"))
        .and(body_string("hello world"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", location.as_str())
                .set_body_json(json!({"result": attachment_row("new1", "hello.txt")})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut gr = client.glide_record("problem");
    gr.initialize();
    gr.set_value("sys_id", sys_id(1)).unwrap();
    let url = gr
        .add_attachment("hello.txt", "hello world", Some("text/plain"), None)
        .await
        .unwrap();
    assert_eq!(url, location);
}

#[tokio::test]
async fn test_get_and_delete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/now/v1/attachment/att1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": attachment_row("att1", "notes.txt")})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/now/v1/attachment/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "Record doesn't exist", "detail": ""}
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/now/v1/attachment/att1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut attachment = client.attachment("problem");
    assert!(!attachment.get("gone").await.unwrap());
    assert!(attachment.get("att1").await.unwrap());
    assert_eq!(attachment.sys_id().as_deref(), Some("att1"));
    attachment.delete().await.unwrap();
}
