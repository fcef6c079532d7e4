//! Object storage for answer videos.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 upload failed: {0}")]
    Upload(String),

    #[error("Empty upload")]
    Empty,
}

/// An answer recording as received from the client.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl VideoUpload {
    /// File extension for the stored object, from content type, then file name.
    pub fn extension(&self) -> &str {
        let from_type = match self.content_type.as_deref() {
            Some("video/mp4") => Some("mp4"),
            Some("video/quicktime") => Some("mov"),
            Some("video/webm") => Some("webm"),
            _ => None,
        };
        from_type
            .or_else(|| {
                self.file_name
                    .as_deref()
                    .and_then(|name| name.rsplit_once('.'))
                    .map(|(_, ext)| ext)
                    .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            })
            .unwrap_or("webm")
    }
}

#[async_trait]
pub trait VideoStorage: Send + Sync {
    /// Stores the recording for one turn and returns its durable URL.
    async fn upload_answer_video(
        &self,
        video: &VideoUpload,
        owner_id: Uuid,
        session_id: Uuid,
        turn_index: usize,
    ) -> Result<String, StorageError>;
}

pub fn answer_video_key(owner_id: Uuid, session_id: Uuid, turn_index: usize, ext: &str) -> String {
    format!("interviews/{owner_id}/{session_id}/q{turn_index}.{ext}")
}

pub struct S3VideoStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3VideoStorage {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl VideoStorage for S3VideoStorage {
    async fn upload_answer_video(
        &self,
        video: &VideoUpload,
        owner_id: Uuid,
        session_id: Uuid,
        turn_index: usize,
    ) -> Result<String, StorageError> {
        if video.bytes.is_empty() {
            return Err(StorageError::Empty);
        }

        let key = answer_video_key(owner_id, session_id, turn_index, video.extension());
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(video.bytes.clone()))
            .content_type(video.content_type.as_deref().unwrap_or("video/webm"))
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        info!(
            "Uploaded answer video to s3://{}/{} ({} bytes)",
            self.bucket,
            key,
            video.bytes.len()
        );

        Ok(format!("{}/{}/{}", self.public_base_url, self.bucket, key))
    }
}
