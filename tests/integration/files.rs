//! File management integration tests

use axum::http::StatusCode;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::TestHarness;

const BOUNDARY: &str = "gateway-test-boundary";

fn multipart_body(field: &str, filename: &str, contents: &str) -> Bytes {
    Bytes::from(format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    ))
}

fn multipart_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

async fn upload(harness: &TestHarness, filename: &str, contents: &str) -> axum_test::TestResponse {
    harness
        .post("/files/upload")
        .content_type(&multipart_type())
        .bytes(multipart_body("file", filename, contents))
        .await
}

#[tokio::test]
async fn test_upload_list_delete_round() {
    let harness = TestHarness::new().await;

    let response = upload(&harness, "notes.txt", "hello file").await;
    response.assert_status_ok();
    let stored: Value = response.json();
    assert_eq!(stored["filename"], "notes.txt");
    assert_eq!(stored["size"], 10);

    let on_disk = harness.upload_dir.path().join("notes.txt");
    assert_eq!(std::fs::read_to_string(&on_disk).unwrap(), "hello file");

    let listed: Value = harness.get("/files/list").await.json();
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["filename"], "notes.txt");

    let deleted = harness.delete("/files/notes.txt").await;
    deleted.assert_status_ok();
    let body: Value = deleted.json();
    assert_eq!(body["message"], "File notes.txt deleted");
    assert!(!on_disk.exists());

    let listed: Value = harness.get("/files/list").await.json();
    assert_eq!(listed, serde_json::json!([]));
}

#[tokio::test]
async fn test_upload_strips_directory_components() {
    let harness = TestHarness::new().await;

    let response = upload(&harness, "../../escape.txt", "contained").await;

    response.assert_status_ok();
    let stored: Value = response.json();
    assert_eq!(stored["filename"], "escape.txt");
    assert!(harness.upload_dir.path().join("escape.txt").exists());
}

#[tokio::test]
async fn test_upload_without_file_field_is_bad_request() {
    let harness = TestHarness::new().await;

    let response = harness
        .post("/files/upload")
        .content_type(&multipart_type())
        .bytes(multipart_body("attachment", "a.txt", "x"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_missing_file_is_not_found() {
    let harness = TestHarness::new().await;

    let response = harness.delete("/files/nothing.txt").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_file_endpoints_require_auth() {
    let harness = TestHarness::new().await;

    harness
        .server
        .get("/files/list")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    harness
        .server
        .delete("/files/notes.txt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
