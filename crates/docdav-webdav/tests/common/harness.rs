//! Test server harness for WebDAV integration tests.
//!
//! Provides a `TestServer` that runs the real HTTP server over in-memory
//! stores, along with HTTP convenience methods.

use super::CountingBlobStore;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use docdav_store::{BlobStore, DocumentRecord, MemoryRecordStore, RecordStore};
use docdav_webdav::{AdapterConfig, CacheConfig, DocumentFs, ServerConfig, WebDavServer};
use reqwest::{Client, Method, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// `createdOn` of seeded documents.
pub fn seeded_created_on() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 17, 9, 30, 5).unwrap()
}

/// `updatedOn` of seeded documents, before any write.
pub fn seeded_updated_on() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Quoted ETag of a seeded, never-written document.
pub const SEEDED_ETAG: &str = "\"1d-zHQ09YxHELJkHiSyGXrRDJ1rd4I\"";

const LOCK_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:exclusive/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
  <D:owner><D:href>docdav-tests</D:href></D:owner>
</D:lockinfo>"#;

/// Test server with HTTP client and automatic cleanup.
pub struct TestServer {
    /// The running server.
    server: WebDavServer,
    /// HTTP client for making requests.
    client: Client,
    /// Base URL for the server (no prefix).
    pub base_url: String,
    pub records: Arc<MemoryRecordStore>,
    pub blobs: Arc<CountingBlobStore>,
    pub fs: DocumentFs,
}

impl TestServer {
    /// Start a server with empty stores and the cache disabled.
    pub async fn start() -> Self {
        Self::with_config(AdapterConfig::default()).await
    }

    /// Start a server with the metadata cache enabled.
    pub async fn with_cache() -> Self {
        Self::with_config(AdapterConfig {
            cache: CacheConfig {
                enabled: true,
                ttl: None,
            },
            ..AdapterConfig::default()
        })
        .await
    }

    pub async fn with_config(config: AdapterConfig) -> Self {
        let records = Arc::new(MemoryRecordStore::new());
        let blobs = Arc::new(CountingBlobStore::new());
        let fs = DocumentFs::new(
            Arc::clone(&records) as Arc<dyn RecordStore>,
            Arc::clone(&blobs) as Arc<dyn BlobStore>,
            config,
        );

        // Start server on random port
        let server = WebDavServer::start(fs.clone(), ServerConfig::default())
            .await
            .expect("Failed to start WebDAV server");
        let base_url = server.url();

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let test_server = Self {
            server,
            client,
            base_url,
            records,
            blobs,
            fs,
        };

        // Wait for server to be ready
        test_server.wait_ready().await;

        test_server
    }

    /// Wait for the server to be ready to accept connections.
    async fn wait_ready(&self) {
        for _ in 0..50 {
            if let Ok(resp) = self.client.get(self.url("/getFiles")).send().await
                && resp.status().is_success()
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("Server did not become ready in time");
    }

    /// Create a record with fixed timestamps and upload its first version.
    pub async fn seed(&self, document_id: &str, filename: &str, content: &[u8]) -> DocumentRecord {
        let mut record =
            DocumentRecord::register_with_id(document_id, filename, seeded_created_on())
                .expect("Invalid seed filename");
        record.updated_on = seeded_updated_on();
        self.records
            .create(&record)
            .await
            .expect("Failed to create record");
        self.blobs
            .inner
            .put_object(&record.key, Bytes::copy_from_slice(content))
            .await
            .expect("Failed to upload blob");
        record
    }

    /// Build a full URL from a path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a URL below the WebDAV prefix.
    pub fn dav(&self, path: &str) -> String {
        format!("{}{}", self.server.webdav_url(), path)
    }

    fn request(&self, method: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.request(
            Method::from_bytes(method.as_bytes()).unwrap(),
            self.dav(path),
        )
    }

    // ========== HTTP Convenience Methods ==========

    /// GET a document.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.dav(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET with If-None-Match.
    pub async fn get_if_none_match(&self, path: &str, etag: &str) -> Response {
        self.client
            .get(self.dav(path))
            .header("If-None-Match", etag)
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET a document's contents as bytes.
    pub async fn get_bytes(&self, path: &str) -> Result<Bytes, (StatusCode, String)> {
        let resp = self.get(path).await;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.bytes().await.expect("Failed to read response bytes"))
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err((status, body))
        }
    }

    pub async fn head(&self, path: &str) -> Response {
        self.client
            .head(self.dav(path))
            .send()
            .await
            .expect("HEAD request failed")
    }

    /// PUT document contents.
    pub async fn put(&self, path: &str, body: impl Into<reqwest::Body>) -> Response {
        self.client
            .put(self.dav(path))
            .body(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    /// PUT with an `If` header carrying a lock token.
    pub async fn put_with_lock(
        &self,
        path: &str,
        token: &str,
        body: impl Into<reqwest::Body>,
    ) -> Response {
        self.client
            .put(self.dav(path))
            .header("If", format!("(<{token}>)"))
            .body(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    /// PUT document contents and assert success.
    pub async fn put_ok(&self, path: &str, body: impl Into<reqwest::Body>) {
        let resp = self.put(path, body).await;
        let status = resp.status();
        assert!(
            status.is_success(),
            "PUT {} failed with status {}: {}",
            path,
            status,
            resp.text().await.unwrap_or_default()
        );
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.request("DELETE", path)
            .send()
            .await
            .expect("DELETE request failed")
    }

    pub async fn mkcol(&self, path: &str) -> Response {
        self.request("MKCOL", path)
            .send()
            .await
            .expect("MKCOL request failed")
    }

    /// MOVE a document.
    pub async fn move_(&self, from: &str, to: &str) -> Response {
        self.request("MOVE", from)
            .header("Destination", self.dav(to))
            .header("Overwrite", "T")
            .send()
            .await
            .expect("MOVE request failed")
    }

    pub async fn options(&self, path: &str) -> Response {
        self.request("OPTIONS", path)
            .send()
            .await
            .expect("OPTIONS request failed")
    }

    /// PROPFIND and return status and body.
    pub async fn propfind_body(&self, path: &str, depth: &str) -> (StatusCode, String) {
        let resp = self
            .request("PROPFIND", path)
            .header("Depth", depth)
            .send()
            .await
            .expect("PROPFIND request failed");
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        (status, body)
    }

    /// PROPPATCH setting one dead property.
    pub async fn proppatch(&self, path: &str, name: &str, value: &str) -> (StatusCode, String) {
        let body = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<D:propertyupdate xmlns:D="DAV:" xmlns:Z="urn:docdav-tests">
  <D:set><D:prop><Z:{name}>{value}</Z:{name}></D:prop></D:set>
</D:propertyupdate>"#
        );
        let resp = self
            .request("PROPPATCH", path)
            .header("Content-Type", "application/xml")
            .body(body)
            .send()
            .await
            .expect("PROPPATCH request failed");
        let status = resp.status();
        (status, resp.text().await.unwrap_or_default())
    }

    /// LOCK a document exclusively.
    pub async fn lock(&self, path: &str) -> Response {
        self.request("LOCK", path)
            .header("Content-Type", "application/xml")
            .header("Timeout", "Second-600")
            .body(LOCK_BODY)
            .send()
            .await
            .expect("LOCK request failed")
    }

    /// LOCK and return the lock token (without angle brackets).
    pub async fn lock_token(&self, path: &str) -> String {
        let resp = self.lock(path).await;
        assert!(
            resp.status().is_success(),
            "LOCK {} failed with status {}",
            path,
            resp.status()
        );
        resp.headers()
            .get("Lock-Token")
            .expect("LOCK response without Lock-Token")
            .to_str()
            .unwrap()
            .trim_matches(|c| c == '<' || c == '>')
            .to_string()
    }

    pub async fn unlock(&self, path: &str, token: &str) -> Response {
        self.request("UNLOCK", path)
            .header("Lock-Token", format!("<{token}>"))
            .send()
            .await
            .expect("UNLOCK request failed")
    }

    /// GET /getFiles as JSON.
    pub async fn get_files(&self) -> serde_json::Value {
        let resp = self
            .client
            .get(self.url("/getFiles"))
            .send()
            .await
            .expect("getFiles request failed");
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json().await.expect("getFiles returned invalid JSON")
    }

    /// POST /getSignedUrl with a raw body.
    pub async fn get_signed_url(&self, body: impl Into<reqwest::Body>) -> Response {
        self.client
            .post(self.url("/getSignedUrl"))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("getSignedUrl request failed")
    }

    /// Stop the server explicitly (otherwise happens on drop).
    pub async fn stop(self) {
        self.server.stop().await;
    }
}
