//! Tests for the JSON endpoints next to the WebDAV tree.

mod common;

use common::TestServer;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_get_files_empty() {
    let server = TestServer::start().await;
    assert_eq!(server.get_files().await, json!({ "files": [] }));
}

#[tokio::test]
async fn test_get_files_lists_records() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"one").await;
    server.seed("def456", "Budget.xlsx", b"two").await;

    let files = server.get_files().await;
    let files = files["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);

    let doc = files
        .iter()
        .find(|f| f["documentId"] == "abc123")
        .expect("seeded record missing");
    assert_eq!(doc["title"], "Quarterly");
    assert_eq!(doc["extension"], "docx");
    assert_eq!(doc["key"], "abc123.docx");
    assert!(doc["createdOn"].is_string());
    assert!(doc["updatedOn"].is_string());
}

#[tokio::test]
async fn test_get_signed_url_registers_document() {
    let server = TestServer::start().await;

    let resp = server
        .get_signed_url(r#"{"filename": " Board Minutes .docx", "type": "application/msword"}"#)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["ms-author-via"], "DAV");
    let body: serde_json::Value = resp.json().await.unwrap();
    let url = body["signedUrl"].as_str().unwrap().to_string();

    let files = server.get_files().await;
    let files = files["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    let record = &files[0];
    assert_eq!(record["title"], "Board Minutes");
    assert_eq!(record["extension"], "docx");
    assert_eq!(record["createdOn"], record["updatedOn"]);

    let id = record["documentId"].as_str().unwrap();
    assert_eq!(record["key"], format!("{id}.docx"));
    assert!(url.starts_with(&format!("memory:///{id}.docx")), "{url}");
    assert!(url.contains("expires-in=60"), "{url}");
}

#[tokio::test]
async fn test_registered_document_readable_after_upload() {
    let server = TestServer::start().await;

    let resp = server
        .get_signed_url(r#"{"filename": "Plan.xlsx", "type": "application/vnd.ms-excel"}"#)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let files = server.get_files().await;
    let id = files["files"][0]["documentId"].as_str().unwrap().to_string();
    let key = files["files"][0]["key"].as_str().unwrap().to_string();

    // Before the client uploads, there is nothing to read.
    assert_eq!(
        server.get(&format!("/{id}/latest/Plan.xlsx")).await.status(),
        StatusCode::NOT_FOUND
    );

    // Simulate the direct upload to the presigned URL.
    docdav_store::BlobStore::put_object(
        &server.blobs.inner,
        &key,
        bytes::Bytes::from_static(b"sheet"),
    )
    .await
    .unwrap();

    let body = server
        .get_bytes(&format!("/{id}/latest/Plan.xlsx"))
        .await
        .unwrap();
    assert_eq!(body.as_ref(), b"sheet");
}

#[tokio::test]
async fn test_get_signed_url_bad_requests() {
    let server = TestServer::start().await;

    for body in [
        "",
        "not json",
        r#"{"filename": "a.docx"}"#,
        r#"{"type": "text/plain"}"#,
        r#"{"filename": "README", "type": "text/plain"}"#,
        r#"{"filename": ".docx", "type": "text/plain"}"#,
    ] {
        let resp = server.get_signed_url(body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
    assert!(server.records.is_empty());
}

#[tokio::test]
async fn test_unknown_route() {
    let server = TestServer::start().await;
    let resp = server
        .get_signed_url(r#"{"filename": "a.docx", "type": "text/plain"}"#)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = reqwest::get(server.url("/nothing/here")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["ms-author-via"], "DAV");
}
