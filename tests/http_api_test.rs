mod common;

use axum::http::{self, Request, StatusCode};
use common::{test_app, tomorrow_rfc3339};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

const BOUNDARY: &str = "taskflow-test-boundary";

fn multipart_request(field: &str, filename: &str, content_type: &str, content: &str) -> Request<String> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

async fn create(app: &axum::Router, description: &str) -> Value {
    let body = json!({ "description": description, "dueDate": tomorrow_rfc3339() }).to_string();
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/todo", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// --- health ---

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app().await;
    let resp = app.router.oneshot(empty_request("GET", "/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = test_app().await;
    let resp = app.router.oneshot(empty_request("GET", "/health")).await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}

// --- create ---

#[tokio::test]
async fn create_todo_returns_201_and_publishes() {
    let app = test_app().await;
    let todo = create(&app.router, "Buy milk").await;

    assert_eq!(todo["description"], "Buy milk");
    assert_eq!(todo["createdAt"], todo["updatedAt"]);
    assert!(todo.get("fileId").is_none());

    app.dispatcher.flush().await;
    let events = app.publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["id"], todo["id"]);
}

#[tokio::test]
async fn create_todo_with_past_due_date_returns_400() {
    let app = test_app().await;
    let body = json!({ "description": "late", "dueDate": "2000-01-01T00:00:00Z" }).to_string();
    let resp = app
        .router
        .oneshot(json_request("POST", "/todo", &body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "due date must be in the future");
}

#[tokio::test]
async fn create_todo_without_description_returns_400() {
    let app = test_app().await;
    let body = json!({ "description": "", "dueDate": tomorrow_rfc3339() }).to_string();
    let resp = app
        .router
        .oneshot(json_request("POST", "/todo", &body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "description is required");
}

#[tokio::test]
async fn create_todo_malformed_json_returns_400() {
    let app = test_app().await;
    let resp = app
        .router
        .oneshot(json_request("POST", "/todo", r#"{"description": 1"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Invalid request body");
    assert!(body["details"].is_string());
}

// --- get ---

#[tokio::test]
async fn get_todo_invalid_uuid_returns_400() {
    let app = test_app().await;
    let resp = app
        .router
        .oneshot(empty_request("GET", "/todo/not-a-uuid"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Invalid UUID format");
}

#[tokio::test]
async fn get_todo_unknown_returns_404() {
    let app = test_app().await;
    let uri = format!("/todo/{}", uuid::Uuid::new_v4());
    let resp = app.router.oneshot(empty_request("GET", &uri)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "Todo not found");
}

#[tokio::test]
async fn get_todo_returns_created_item() {
    let app = test_app().await;
    let created = create(&app.router, "fetch me").await;
    let uri = format!("/todo/{}", created["id"].as_str().unwrap());

    let resp = app.router.oneshot(empty_request("GET", &uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, created);
}

// --- list ---

#[tokio::test]
async fn list_todos_echoes_normalized_pagination() {
    let app = test_app().await;
    for i in 0..3 {
        create(&app.router, &format!("task {i}")).await;
    }

    let resp = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/todo?limit=2&offset=0"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["todos"].as_array().unwrap().len(), 2);
    assert_eq!(body["todos"][0]["description"], "task 2");
    assert_eq!(body["pagination"], json!({ "limit": 2, "offset": 0, "count": 2 }));

    let resp = app
        .router
        .oneshot(empty_request("GET", "/todo?limit=1000&offset=-1"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["pagination"], json!({ "limit": 10, "offset": 0, "count": 3 }));
}

#[tokio::test]
async fn list_todos_ignores_garbage_parameters() {
    let app = test_app().await;
    let resp = app
        .router
        .oneshot(empty_request("GET", "/todo?limit=abc&offset=xyz"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["pagination"], json!({ "limit": 10, "offset": 0, "count": 0 }));
}

// --- update ---

#[tokio::test]
async fn update_todo_patches_only_given_fields() {
    let app = test_app().await;
    let created = create(&app.router, "original").await;
    let uri = format!("/todo/{}", created["id"].as_str().unwrap());

    let resp = app
        .router
        .clone()
        .oneshot(json_request("PUT", &uri, r#"{"fileId":"abc.png"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["description"], "original");
    assert_eq!(updated["dueDate"], created["dueDate"]);
    assert_eq!(updated["fileId"], "abc.png");
    assert_eq!(updated["createdAt"], created["createdAt"]);

    let resp = app
        .router
        .oneshot(json_request("PUT", &uri, r#"{"fileId":null}"#))
        .await
        .unwrap();
    let cleared = body_json(resp).await;
    assert!(cleared.get("fileId").is_none());
    assert_eq!(cleared["description"], "original");
}

#[tokio::test]
async fn update_todo_unknown_returns_404() {
    let app = test_app().await;
    let uri = format!("/todo/{}", uuid::Uuid::new_v4());
    let resp = app
        .router
        .oneshot(json_request("PUT", &uri, r#"{"description":"x"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- delete ---

#[tokio::test]
async fn delete_todo_returns_204_then_404() {
    let app = test_app().await;
    let created = create(&app.router, "short lived").await;
    let uri = format!("/todo/{}", created["id"].as_str().unwrap());

    let resp = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", &uri))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", &uri))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.router.oneshot(empty_request("GET", &uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- files ---

#[tokio::test]
async fn upload_then_download_round_trips_content() {
    let app = test_app().await;
    let resp = app
        .router
        .clone()
        .oneshot(multipart_request("file", "notes.txt", "text/plain", "hello taskflow"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let uploaded = body_json(resp).await;
    let file_id = uploaded["fileId"].as_str().unwrap().to_string();
    assert_eq!(app.objects.len().await, 1);

    let resp = app
        .router
        .clone()
        .oneshot(empty_request("GET", &format!("/files/{file_id}")))
        .await
        .unwrap();
    let record = body_json(resp).await;
    assert_eq!(record["filename"], "notes.txt");
    assert_eq!(record["size"], 14);
    assert!(record["storageKey"].as_str().unwrap().ends_with(".txt"));

    let resp = app
        .router
        .oneshot(empty_request("GET", &format!("/files/{file_id}/download")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/plain");
    assert_eq!(
        resp.headers()[http::header::CONTENT_DISPOSITION],
        "attachment; filename=\"notes.txt\""
    );
    assert_eq!(body_bytes(resp).await.as_ref(), b"hello taskflow");
}

#[tokio::test]
async fn upload_rejects_disallowed_extension() {
    let app = test_app().await;
    let resp = app
        .router
        .oneshot(multipart_request("file", "run.exe", "application/octet-stream", "MZ"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "file type not allowed");
    assert_eq!(app.objects.len().await, 0);
}

#[tokio::test]
async fn upload_without_file_field_returns_400() {
    let app = test_app().await;
    let resp = app
        .router
        .oneshot(multipart_request("attachment", "notes.txt", "text/plain", "hi"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "No file provided");
}

#[tokio::test]
async fn file_metadata_update_list_and_delete() {
    let app = test_app().await;
    let resp = app
        .router
        .clone()
        .oneshot(multipart_request("file", "a.txt", "text/plain", "aaa"))
        .await
        .unwrap();
    let file_id = body_json(resp).await["fileId"].as_str().unwrap().to_string();
    let uri = format!("/files/{file_id}");

    let resp = app
        .router
        .clone()
        .oneshot(json_request("PUT", &uri, r#"{"filename":"renamed.txt"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["filename"], "renamed.txt");

    let resp = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/files"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["pagination"]["count"], 1);
    assert_eq!(body["files"][0]["filename"], "renamed.txt");

    let resp = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", &uri))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.objects.len().await, 0);

    let resp = app.router.oneshot(empty_request("GET", &uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "File not found");
}
