//! S3-compatible cover storage

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use sha2::{Digest, Sha256};

use super::{guess_mime, MediaUploader, UploadedMedia};
use crate::config::StorageConfig;
use crate::error::{AppError, Result};

/// Stores covers under `covers/{sha256}.{ext}`, so re-ingesting the same
/// image overwrites the same object.
#[derive(Clone)]
pub struct S3MediaUploader {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3MediaUploader {
    /// Create a new uploader from configuration
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "novel-ingest",
        );

        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = Client::from_conf(s3_config);

        let bucket = config.bucket.clone();
        if let Err(e) = client.head_bucket().bucket(&bucket).send().await {
            tracing::warn!(
                "Could not verify bucket {}: {}. Will attempt uploads anyway.",
                bucket,
                e
            );
        }

        Ok(Self {
            client,
            bucket,
            public_base_url: config.public_base_url(),
        })
    }

    fn object_key(file_name: &str, data: &[u8]) -> String {
        let digest = hex::encode(Sha256::digest(data));
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string());
        format!("covers/{}.{}", digest, ext)
    }
}

#[async_trait::async_trait]
impl MediaUploader for S3MediaUploader {
    async fn upload(&self, file_name: &str, data: &[u8]) -> Result<UploadedMedia> {
        let key = Self::object_key(file_name, data);
        let mime_type = guess_mime(file_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&mime_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload {}: {}", key, e)))?;

        tracing::info!(key = %key, size = data.len(), "Uploaded cover image");

        Ok(UploadedMedia {
            url: format!("{}/{}", self.public_base_url.trim_end_matches('/'), key),
            mime_type,
            size: data.len() as i64,
        })
    }
}
