//! S3-compatible blob store using the AWS SDK.
//!
//! Works against AWS S3 with bucket versioning enabled, and against
//! S3-compatible services such as MinIO via a custom endpoint with
//! path-style addressing.

use super::{BlobObject, BlobStore, ObjectVersion};
use crate::error::{BlobError, BlobResult};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for [`S3BlobStore`].
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub bucket: String,
    /// Defaults to `us-east-1`.
    pub region: Option<String>,
    /// Custom endpoint, e.g. `http://minio:9000`. Bare `host:port` gets `http://`.
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Path-style URLs (`endpoint/bucket/key`). Required for MinIO.
    pub force_path_style: bool,
}

/// Blob store backed by a versioned S3 bucket.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    endpoint: Option<String>,
    region: String,
}

impl std::fmt::Debug for S3BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobStore")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3BlobStore {
    /// Build a client from explicit settings, falling back to the ambient
    /// AWS credential chain when no keys are given.
    pub async fn new(settings: S3Settings) -> BlobResult<Self> {
        if settings.bucket.is_empty() {
            return Err(BlobError::Config("s3 bucket must not be empty".to_string()));
        }
        if settings.access_key_id.is_some() != settings.secret_access_key.is_some() {
            return Err(BlobError::Config(
                "s3 config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ));
        }

        let region = settings
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut builder = match (settings.access_key_id, settings.secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials =
                    aws_sdk_s3::config::Credentials::new(key_id, secret, None, None, "docdav-config");
                aws_sdk_s3::config::Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .region(aws_config::Region::new(region.clone()))
                    .credentials_provider(credentials)
            }
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(aws_config::Region::new(region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        let endpoint = settings.endpoint.map(|url| normalize_endpoint(&url));
        if let Some(url) = &endpoint {
            builder = builder.endpoint_url(url);
        }
        builder = builder.force_path_style(settings.force_path_style);

        let client = Client::from_conf(builder.build());
        debug!(bucket = %settings.bucket, ?endpoint, %region, "Created S3 blob store");

        Ok(Self {
            client,
            bucket: settings.bucket,
            endpoint,
            region,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn normalize_endpoint(url: &str) -> String {
    let lower = url.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

fn sdk_error<E>(err: aws_sdk_s3::error::SdkError<E>) -> BlobError
where
    E: std::error::Error + Send + Sync + 'static,
{
    BlobError::S3(Box::new(err))
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(level = "debug", skip(self), fields(bucket = %self.bucket))]
    async fn list_versions(&self, key_prefix: &str) -> BlobResult<Vec<ObjectVersion>> {
        let mut listing = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut version_marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_object_versions()
                .bucket(&self.bucket)
                .prefix(key_prefix)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_marker.take())
                .send()
                .await
                .map_err(sdk_error)?;

            for version in output.versions() {
                let (Some(key), Some(version_id)) = (version.key(), version.version_id()) else {
                    continue;
                };
                listing.push(ObjectVersion {
                    key: key.to_string(),
                    version_id: version_id.to_string(),
                    is_latest: version.is_latest().unwrap_or(false),
                });
            }

            if !output.is_truncated().unwrap_or(false) {
                break;
            }
            key_marker = output.next_key_marker().map(str::to_string);
            version_marker = output.next_version_id_marker().map(str::to_string);
            if key_marker.is_none() {
                break;
            }
        }

        debug!(count = listing.len(), "Listed object versions");
        Ok(listing)
    }

    #[instrument(level = "debug", skip(self), fields(bucket = %self.bucket))]
    async fn get_object(&self, key: &str, version_id: Option<&str>) -> BlobResult<BlobObject> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_version_id(version_id.map(str::to_string))
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                err if err.is_no_such_key() => BlobError::NotFound(key.to_string()),
                err => BlobError::S3(Box::new(err)),
            })?;

        let reported_length = output
            .content_length()
            .and_then(|len| u64::try_from(len).ok());
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| BlobError::S3(Box::new(e)))?
            .into_bytes();

        Ok(BlobObject {
            content_length: reported_length.unwrap_or(body.len() as u64),
            body,
        })
    }

    #[instrument(level = "debug", skip(self, body), fields(bucket = %self.bucket, len = body.len()))]
    async fn put_object(&self, key: &str, body: Bytes) -> BlobResult<Option<String>> {
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.version_id().map(str::to_string))
    }

    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> BlobResult<String> {
        let config =
            PresigningConfig::expires_in(ttl).map_err(|e| BlobError::Config(e.to_string()))?;
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(config)
            .await
            .map_err(sdk_error)?;
        Ok(request.uri().to_string())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
