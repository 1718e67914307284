//! HTTP server lifecycle management and request routing.
//!
//! Requests are routed three ways:
//!
//! - `GET /getFiles` and `POST /getSignedUrl` are JSON endpoints over the
//!   record and blob stores.
//! - `GET`/`HEAD` on a document under the WebDAV prefix is answered from
//!   [`DocumentFs::open_read`], so conditional requests never fetch content.
//! - Everything else under the prefix goes to the dav-server handler.
//!
//! Every response carries `MS-Author-Via: DAV`.

use crate::address::ResourceAddress;
use crate::error::{WebDavError, WebDavResult};
use crate::filesystem::{DocumentFs, ReadOutcome};
use crate::locks::DocumentLockSystem;
use bytes::Bytes;
use dav_server::DavHandler;
use dav_server::body::Body;
use docdav_store::DocumentRecord;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Methods advertised on `OPTIONS`.
pub const ALLOWED_METHODS: &str =
    "PROPPATCH,PROPFIND,OPTIONS,DELETE,UNLOCK,COPY,LOCK,MKCOL,MOVE,HEAD,POST,PUT,GET";

const MS_AUTHOR_VIA: &str = "ms-author-via";

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 = auto-assign).
    pub port: u16,
    /// Bind address.
    pub bind_address: std::net::IpAddr,
    /// URL prefix the WebDAV tree is mounted under.
    pub webdav_prefix: String,
    /// Validity of presigned upload URLs.
    pub upload_url_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0, // Auto-assign
            bind_address: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            webdav_prefix: "/webdav".to_string(),
            upload_url_ttl: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SignedUrlRequest {
    filename: String,
    #[serde(rename = "type")]
    content_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedUrlResponse {
    signed_url: String,
}

#[derive(Debug, Serialize)]
struct FilesResponse {
    files: Vec<DocumentRecord>,
}

/// Routes requests between the JSON endpoints, the read path and dav-server.
struct Router {
    fs: DocumentFs,
    dav: DavHandler,
    prefix: String,
    upload_url_ttl: Duration,
}

impl Router {
    fn new(fs: DocumentFs, config: &ServerConfig) -> Self {
        let prefix = config.webdav_prefix.trim_end_matches('/').to_string();
        let dav = DavHandler::builder()
            .filesystem(Box::new(fs.clone()))
            .locksystem(Box::new(DocumentLockSystem::new(fs.clone())))
            .strip_prefix(prefix.clone())
            .build_handler();
        Self {
            fs,
            dav,
            prefix,
            upload_url_ttl: config.upload_url_ttl,
        }
    }

    /// The address below the WebDAV prefix, if `path` is under it.
    fn webdav_address(&self, path: &str) -> Option<ResourceAddress> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        Some(ResourceAddress::parse(rest))
    }

    async fn handle(&self, req: Request<Incoming>) -> Response<Body> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        debug!(method = %method, path = %path, "request");

        let mut resp = match (&method, path.as_str()) {
            (&Method::GET, "/getFiles") => self.get_files().await,
            (&Method::POST, "/getSignedUrl") => self.get_signed_url(req).await,
            _ => match self.webdav_address(&path) {
                Some(addr @ ResourceAddress::Document { .. })
                    if method == Method::GET || method == Method::HEAD =>
                {
                    let if_none_match = req
                        .headers()
                        .get(header::IF_NONE_MATCH)
                        .and_then(|v| v.to_str().ok());
                    self.read_document(&addr, if_none_match, method == Method::HEAD)
                        .await
                }
                Some(_) => self.dav.handle(req).await,
                None => status_response(StatusCode::NOT_FOUND, "not found"),
            },
        };

        let headers = resp.headers_mut();
        headers.insert(MS_AUTHOR_VIA, HeaderValue::from_static("DAV"));
        if method == Method::OPTIONS {
            let allowed = HeaderValue::from_static(ALLOWED_METHODS);
            headers.insert(header::ALLOW, allowed.clone());
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, allowed);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("*"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );
        }
        resp
    }

    async fn read_document(
        &self,
        addr: &ResourceAddress,
        if_none_match: Option<&str>,
        head: bool,
    ) -> Response<Body> {
        match self.fs.open_read(addr, if_none_match).await {
            Ok(ReadOutcome::NotModified { etag }) => Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(header::ETAG, etag)
                .body(Body::empty())
                .unwrap_or_else(|_| internal_error()),
            Ok(ReadOutcome::Content {
                etag,
                content_type,
                size,
                body,
            }) => {
                let body = if head { Body::empty() } else { Body::from(body) };
                Response::builder()
                    .status(StatusCode::OK)
                    .header(header::ETAG, etag)
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CONTENT_LENGTH, size)
                    .body(body)
                    .unwrap_or_else(|_| internal_error())
            }
            Err(e) => error_response(&e),
        }
    }

    async fn get_files(&self) -> Response<Body> {
        match self.fs.records().find_all().await {
            Ok(files) => json_response(StatusCode::OK, &FilesResponse { files }),
            Err(e) => {
                error!(error = %e, "listing documents failed");
                status_response(StatusCode::INTERNAL_SERVER_ERROR, "listing documents failed")
            }
        }
    }

    async fn get_signed_url(&self, req: Request<Incoming>) -> Response<Body> {
        match self.register_upload(req).await {
            Ok(signed_url) => json_response(StatusCode::OK, &SignedUrlResponse { signed_url }),
            Err(e) => error_response(&e),
        }
    }

    async fn register_upload(&self, req: Request<Incoming>) -> WebDavResult<String> {
        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| WebDavError::InvalidRequest(e.to_string()))?
            .to_bytes();
        let request: SignedUrlRequest = serde_json::from_slice(&body)
            .map_err(|e| WebDavError::InvalidRequest(e.to_string()))?;

        let (_, signed_url) = self
            .fs
            .register(&request.filename, &request.content_type, self.upload_url_ttl)
            .await?;
        Ok(signed_url)
    }
}

fn internal_error() -> Response<Body> {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    resp
}

fn status_response(status: StatusCode, message: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(format!("{message}\n")))
        .unwrap_or_else(|_| internal_error())
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(json) => Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(Bytes::from(json)))
            .unwrap_or_else(|_| internal_error()),
        Err(e) => {
            error!(error = %e, "serializing response failed");
            internal_error()
        }
    }
}

fn error_response(err: &WebDavError) -> Response<Body> {
    let status = match err {
        WebDavError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        WebDavError::NotSupported => StatusCode::NOT_IMPLEMENTED,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(error = %err, "request failed");
    } else {
        debug!(error = %err, status = %status, "request rejected");
    }
    status_response(status, &err.to_string())
}

/// A running WebDAV server instance.
pub struct WebDavServer {
    /// The actual bound address.
    pub addr: SocketAddr,
    prefix: String,
    /// Shutdown signal sender.
    shutdown_tx: Option<oneshot::Sender<()>>,
    /// Server task handle.
    server_handle: Option<tokio::task::JoinHandle<()>>,
    /// Cache purge task, present when the cache has a TTL.
    purge_handle: Option<tokio::task::JoinHandle<()>>,
}

impl WebDavServer {
    /// Start a new WebDAV server.
    pub async fn start(fs: DocumentFs, config: ServerConfig) -> Result<Self, std::io::Error> {
        let addr = SocketAddr::new(config.bind_address, config.port);
        let listener = TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;

        let purge_handle = fs.cache().spawn_purger();
        let router = Arc::new(Router::new(fs, &config));
        info!(addr = %actual_addr, prefix = %router.prefix, "Starting WebDAV server");
        let prefix = router.prefix.clone();

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        // Spawn the server task
        let server_handle = tokio::spawn(async move {
            tokio::select! {
                () = run_server(listener, router) => {
                    debug!("Server loop ended");
                }
                _ = shutdown_rx => {
                    info!("Received shutdown signal");
                }
            }
        });

        Ok(Self {
            addr: actual_addr,
            prefix,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
            purge_handle,
        })
    }

    /// Get the base URL for this server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the URL of the WebDAV tree.
    pub fn webdav_url(&self) -> String {
        format!("{}{}", self.url(), self.prefix)
    }

    /// Stop the server.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.purge_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
        info!("WebDAV server stopped");
    }

    /// Stop the server synchronously (for use in Drop).
    fn stop_sync(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.purge_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

impl Drop for WebDavServer {
    fn drop(&mut self) {
        self.stop_sync();
    }
}

/// Run the server accept loop.
async fn run_server(listener: TcpListener, router: Arc<Router>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let router = router.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req: Request<Incoming>| {
                        let router = router.clone();
                        async move { Ok::<_, Infallible>(router.handle(req).await) }
                    });

                    if let Err(e) = auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await
                    {
                        warn!(peer = %peer_addr, error = %e, "HTTP connection error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
