//! Cover image upload
//!
//! Ingestion hands cover bytes to a [`MediaUploader`] before opening its
//! transaction. A failed upload only costs the novel its cover.

mod s3;

pub use s3::S3MediaUploader;

use tokio::sync::Mutex;

use crate::error::{AppError, Result};

/// Where an uploaded file ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
    pub mime_type: String,
    pub size: i64,
}

/// Trait for media storage backends
#[async_trait::async_trait]
pub trait MediaUploader: Send + Sync {
    /// Store a file and return its public location
    async fn upload(&self, file_name: &str, data: &[u8]) -> Result<UploadedMedia>;
}

/// MIME type from the file extension
pub fn guess_mime(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Keeps uploads in memory; used by tests and dry runs
#[derive(Default)]
pub struct InMemoryMediaUploader {
    uploads: Mutex<Vec<(String, usize)>>,
    fail: bool,
}

impl InMemoryMediaUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// An uploader whose every upload fails
    pub fn failing() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// File names and sizes uploaded so far
    pub async fn uploads(&self) -> Vec<(String, usize)> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl MediaUploader for InMemoryMediaUploader {
    async fn upload(&self, file_name: &str, data: &[u8]) -> Result<UploadedMedia> {
        if self.fail {
            return Err(AppError::Storage(format!("upload of {} rejected", file_name)));
        }

        self.uploads
            .lock()
            .await
            .push((file_name.to_string(), data.len()));

        Ok(UploadedMedia {
            url: format!("memory://{}", file_name),
            mime_type: guess_mime(file_name),
            size: data.len() as i64,
        })
    }
}
