//! S3-backed object store.
//!
//! Works against AWS S3 and S3-compatible backends (MinIO, R2, ...)
//! via an optional custom endpoint, which switches the client to
//! path-style addressing. Credentials come from the standard AWS SDK
//! credential chain; nothing here reads key material directly.

use std::path::Path;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::config::StorageConfig;
use crate::error::{ConfigError, UploadError};
use crate::storage::ObjectStore;

#[derive(Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
    public_base_url: Option<String>,
}

impl S3Store {
    /// Build a store from configuration, loading the SDK credential
    /// chain. Fails fast when no destination bucket is configured.
    pub async fn connect(config: &StorageConfig) -> Result<Self, ConfigError> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "AUDIOCAT_S3_BUCKET".to_string(),
                hint: "set the destination bucket for merged output".to_string(),
            })?;

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(ref endpoint) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        Ok(Self {
            client,
            bucket,
            region: config.region.clone(),
            public_base_url: config.public_base_url.clone(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, local: &Path, key: &str) -> Result<String, UploadError> {
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| UploadError::Read {
                path: local.display().to_string(),
                reason: e.to_string(),
            })?;

        let content_type = mime_guess::from_path(key).first_or_octet_stream();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type.as_ref())
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::Rejected {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        let url = self.public_url(key);
        tracing::info!(key, url = %url, "uploaded object");
        Ok(url)
    }
}
