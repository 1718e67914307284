//! End-to-end read/write workflows over HTTP.
//!
//! These mirror how an office application uses the server: open a document
//! URL, read it, save it back, and read the new version.

mod common;

use common::{SEEDED_ETAG, TestServer};
use reqwest::StatusCode;

const WORD: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_get_latest_document() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"hello world").await;

    let resp = server.get("/abc123/latest/Quarterly.docx").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], WORD);
    assert_eq!(resp.headers()["etag"], SEEDED_ETAG);
    assert_eq!(resp.headers()["ms-author-via"], "DAV");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"hello world");
}

#[tokio::test]
async fn test_version_segment_defaults_to_latest() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"hello world").await;

    let body = server.get_bytes("/abc123").await.unwrap();
    assert_eq!(body.as_ref(), b"hello world");
}

#[tokio::test]
async fn test_trailing_segments_ignored() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"hello world").await;

    let body = server
        .get_bytes("/abc123/latest/any/name/at/all.docx")
        .await
        .unwrap();
    assert_eq!(body.as_ref(), b"hello world");
}

#[tokio::test]
async fn test_head_document() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"hello world").await;

    let resp = server.head("/abc123/latest/Quarterly.docx").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["etag"], SEEDED_ETAG);
}

#[tokio::test]
async fn test_get_unknown_document() {
    let server = TestServer::start().await;
    let resp = server.get("/ghost/latest/x.docx").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_unknown_version() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"hello world").await;

    let resp = server.get("/abc123/not-a-version/x.docx").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_record_without_blob() {
    let server = TestServer::start().await;
    let record = docdav_store::DocumentRecord::register_with_id(
        "pending",
        "Draft.docx",
        common::seeded_created_on(),
    )
    .unwrap();
    docdav_store::RecordStore::create(server.records.as_ref(), &record)
        .await
        .unwrap();

    let resp = server.get("/pending/latest/Draft.docx").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_put_then_get() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"hello world").await;

    server
        .put_ok("/abc123/latest/Quarterly.docx", b"edited in place".to_vec())
        .await;

    let resp = server.get("/abc123/latest/Quarterly.docx").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_ne!(resp.headers()["etag"], SEEDED_ETAG);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"edited in place");
    assert_eq!(server.blobs.inner.version_count("abc123.docx"), 2);
}

#[tokio::test]
async fn test_put_updates_record_timestamp_only() {
    let server = TestServer::start().await;
    let seeded = server.seed("abc123", "Quarterly.docx", b"v1").await;

    server.put_ok("/abc123/latest/Quarterly.docx", b"v2".to_vec()).await;

    let stored = docdav_store::RecordStore::find_one(server.records.as_ref(), "abc123")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.updated_on > seeded.updated_on);
    assert_eq!(stored.created_on, seeded.created_on);
    assert_eq!(stored.key, seeded.key);
    assert_eq!(stored.title, "Quarterly");
}

#[tokio::test]
async fn test_pinned_version_survives_write() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"first draft").await;
    let versions = docdav_store::BlobStore::list_versions(&server.blobs.inner, "abc123.docx")
        .await
        .unwrap();
    let first = versions[0].version_id.clone();

    server
        .put_ok("/abc123/latest/Quarterly.docx", b"second draft".to_vec())
        .await;

    let pinned = server
        .get_bytes(&format!("/abc123/{first}/Quarterly.docx"))
        .await
        .unwrap();
    assert_eq!(pinned.as_ref(), b"first draft");
    let latest = server.get_bytes("/abc123/latest/Quarterly.docx").await.unwrap();
    assert_eq!(latest.as_ref(), b"second draft");
}

#[tokio::test]
async fn test_put_unknown_document_rejected() {
    let server = TestServer::start().await;
    let resp = server.put("/ghost/latest/x.docx", b"data".to_vec()).await;
    assert!(!resp.status().is_success(), "got {}", resp.status());
    assert!(server.records.is_empty());
    assert_eq!(server.blobs.puts(), 0);
}

#[tokio::test]
async fn test_large_put_is_single_version() {
    let server = TestServer::start().await;
    server.seed("big", "Deck.pptx", b"small").await;

    let content: Vec<u8> = (0..512 * 1024).map(|i| (i % 251) as u8).collect();
    server.put_ok("/big/latest/Deck.pptx", content.clone()).await;

    assert_eq!(server.blobs.puts(), 1);
    let body = server.get_bytes("/big/latest/Deck.pptx").await.unwrap();
    assert_eq!(body.len(), content.len());
    assert_eq!(body.as_ref(), content.as_slice());
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_propfind_document() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"hello world").await;

    let (status, body) = server
        .propfind_body("/abc123/latest/Quarterly.docx", "0")
        .await;
    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert!(body.contains("getetag"), "{body}");
    assert!(body.contains("1d-zHQ09YxHELJkHiSyGXrRDJ1rd4I"), "{body}");
    assert!(body.contains("getcontentlength>11<"), "{body}");
}

#[tokio::test]
async fn test_propfind_root() {
    let server = TestServer::start().await;
    let (status, body) = server.propfind_body("/", "0").await;
    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert!(body.contains("collection"), "{body}");
}

#[tokio::test]
async fn test_proppatch_then_propfind() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"hello world").await;

    let (status, _) = server
        .proppatch("/abc123/latest/Quarterly.docx", "lastauthor", "sam")
        .await;
    assert_eq!(status, StatusCode::MULTI_STATUS);

    let (_, body) = server
        .propfind_body("/abc123/latest/Quarterly.docx", "0")
        .await;
    assert!(body.contains("lastauthor"), "{body}");
    assert!(body.contains("sam"), "{body}");
}

// ============================================================================
// Unsupported operations
// ============================================================================

#[tokio::test]
async fn test_delete_rejected() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"hello world").await;

    let resp = server.delete("/abc123/latest/Quarterly.docx").await;
    assert!(!resp.status().is_success(), "got {}", resp.status());

    let body = server.get_bytes("/abc123/latest/Quarterly.docx").await.unwrap();
    assert_eq!(body.as_ref(), b"hello world");
}

#[tokio::test]
async fn test_mkcol_rejected() {
    let server = TestServer::start().await;
    let resp = server.mkcol("/folder").await;
    assert!(!resp.status().is_success(), "got {}", resp.status());
}

#[tokio::test]
async fn test_move_rejected() {
    let server = TestServer::start().await;
    server.seed("abc123", "Quarterly.docx", b"hello world").await;
    server.seed("def456", "Other.docx", b"other").await;

    let resp = server
        .move_("/abc123/latest/Quarterly.docx", "/def456/latest/Other.docx")
        .await;
    assert!(!resp.status().is_success(), "got {}", resp.status());
    let body = server.get_bytes("/def456/latest/Other.docx").await.unwrap();
    assert_eq!(body.as_ref(), b"other");
}

#[tokio::test]
async fn test_options_headers() {
    let server = TestServer::start().await;
    let resp = server.options("/").await;
    let headers = resp.headers();
    assert_eq!(headers["allow"], docdav_webdav::ALLOWED_METHODS);
    assert_eq!(
        headers["access-control-allow-methods"],
        docdav_webdav::ALLOWED_METHODS
    );
    assert_eq!(headers["access-control-allow-headers"], "*");
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["ms-author-via"], "DAV");
}
