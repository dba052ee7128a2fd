//! S3-compatible remote store
//!
//! Implements [`RemoteStore`] against any S3 API (AWS or MinIO). Objects are
//! stored under content-addressed keys so identical bytes always land on the
//! same key regardless of how many times they are uploaded.

use anyhow::Result;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::SdkError,
    primitives::ByteStream,
    Client,
};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info, instrument};

use crate::store::{canonical_key, RemoteObject, RemoteStore, RemoteStoreError};
use async_trait::async_trait;

/// Remote store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStoreConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
    /// Base URL the CDN serves objects from; canonical URLs are
    /// `<public_base_url>/upload/<identifier>`
    pub public_base_url: String,
}

impl RemoteStoreConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: env::var("MEDREC_S3_ENDPOINT").ok(),
            region: env::var("MEDREC_S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            bucket: env::var("MEDREC_S3_BUCKET").unwrap_or_else(|_| "medrec-media".to_string()),
            access_key: env::var("MEDREC_S3_ACCESS_KEY")
                .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
                .unwrap_or_else(|_| "minioadmin".to_string()),
            secret_key: env::var("MEDREC_S3_SECRET_KEY")
                .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
                .unwrap_or_else(|_| "minioadmin".to_string()),
            path_style: env::var("MEDREC_S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            public_base_url: env::var("MEDREC_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "https://cdn.example.com".to_string()),
        })
    }

    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            public_base_url: endpoint.clone(),
            endpoint: Some(endpoint),
            region: "us-east-1".to_string(),
            bucket: bucket.into(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            path_style: true,
        }
    }
}

/// [`RemoteStore`] backed by an S3-compatible bucket
#[derive(Clone)]
pub struct S3RemoteStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3RemoteStore {
    pub fn new(config: RemoteStoreConfig) -> Self {
        debug!(bucket = %config.bucket, endpoint = ?config.endpoint, "Initializing remote store");

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "medrec-remote-store",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(bucket = %config.bucket, "Remote store client initialized");

        Self {
            client,
            bucket: config.bucket,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Canonical CDN URL for an identifier.
    pub fn public_url(&self, identifier: &str) -> String {
        format!("{}/upload/{}", self.public_base_url, identifier)
    }
}

#[async_trait]
impl RemoteStore for S3RemoteStore {
    #[instrument(skip(self))]
    async fn exists(&self, identifier: &str) -> Result<bool, RemoteStoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(identifier)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(ctx)) => {
                if ctx.err().is_not_found() {
                    return Ok(false);
                }
                let status = ctx.raw().status().as_u16();
                let message = format!("head s3://{}/{}: HTTP {}", self.bucket, identifier, status);
                if status == 401 || status == 403 {
                    Err(RemoteStoreError::Permanent(message))
                } else {
                    Err(RemoteStoreError::Transient(message))
                }
            }
            Err(err) => Err(RemoteStoreError::Transient(format!(
                "head s3://{}/{}: {}",
                self.bucket, identifier, err
            ))),
        }
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        name: &str,
    ) -> Result<RemoteObject, RemoteStoreError> {
        let key = canonical_key(folder, name, &bytes);
        let content_type = guess_content_type(name);

        debug!(key = %key, size = bytes.len(), "Uploading to s3://{}/{}", self.bucket, key);

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(key = %key, "Upload complete");
                Ok(RemoteObject {
                    url: self.public_url(&key),
                    identifier: key,
                })
            }
            Err(SdkError::ServiceError(ctx)) => {
                let status = ctx.raw().status().as_u16();
                let message = format!(
                    "put s3://{}/{}: HTTP {} ({})",
                    self.bucket,
                    key,
                    status,
                    ctx.err()
                );
                if status == 401 || status == 403 {
                    Err(RemoteStoreError::Permanent(message))
                } else {
                    Err(RemoteStoreError::Transient(message))
                }
            }
            Err(err) => Err(RemoteStoreError::Transient(format!(
                "put s3://{}/{}: {}",
                self.bucket, key, err
            ))),
        }
    }
}

/// Content type from the file extension; octet-stream when unknown.
fn guess_content_type(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) => match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "avif" => "image/avif",
            "svg" => "image/svg+xml",
            _ => "application/octet-stream",
        },
        None => "application/octet-stream",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_for_minio() {
        let config = RemoteStoreConfig::for_minio("http://localhost:9000", "test-bucket");
        assert_eq!(config.endpoint, Some("http://localhost:9000".to_string()));
        assert_eq!(config.bucket, "test-bucket");
        assert!(config.path_style);
        assert_eq!(config.access_key, "minioadmin");
    }

    #[test]
    fn test_public_url() {
        let store = S3RemoteStore::new(RemoteStoreConfig {
            endpoint: None,
            region: "us-east-1".to_string(),
            bucket: "media".to_string(),
            access_key: "k".to_string(),
            secret_key: "s".to_string(),
            path_style: false,
            public_base_url: "https://cdn.example.com/".to_string(),
        });

        assert_eq!(
            store.public_url("properties/house-abc123.jpg"),
            "https://cdn.example.com/upload/properties/house-abc123.jpg"
        );
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("house.jpg"), "image/jpeg");
        assert_eq!(guess_content_type("house.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("plan.webp"), "image/webp");
        assert_eq!(guess_content_type("house"), "application/octet-stream");
    }
}
