use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use kernel::{Completion, FileSource, UploadError, UploadFile};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use reqwest::{Body, Client, StatusCode};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::resource::Resource;
use crate::ClientError;

/// Receives the fraction of a file sent so far.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Moves one file into a bucket.
///
/// Progress must be reported in order and before the call returns. The
/// returned future may be dropped at any point to abort the transfer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        file: &UploadFile,
        bucket: &str,
        progress: ProgressFn,
        token: Option<&str>,
    ) -> Result<Completion, UploadError>;
}

/// Streams files to the bucket insert endpoint, `POST {base}/api/{bucket}/{name}`.
pub struct HttpTransport {
    base: Resource,
    client: Client,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self::with_client(Resource::parse(base_url)?, Client::new()))
    }

    #[must_use]
    pub fn with_client(base: Resource, client: Client) -> Self {
        Self {
            base,
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[allow(clippy::cast_precision_loss)]
    async fn body(&self, file: &UploadFile, progress: ProgressFn) -> Result<Body, UploadError> {
        let total = file.size;
        let mut sent: u64 = 0;
        let report = move |chunk: &Bytes| {
            sent += chunk.len() as u64;
            if total > 0 {
                progress(sent as f64 / total as f64);
            }
        };

        match &file.source {
            FileSource::Path(path) => {
                let f = File::open(path).await.map_err(|e| {
                    UploadError::validation(format!("cannot open {}: {e}", path.display()))
                })?;
                let stream = ReaderStream::with_capacity(f, self.chunk_size).inspect_ok(report);
                Ok(Body::wrap_stream(stream))
            }
            FileSource::Bytes(data) => {
                let chunks = split_into_chunks(data, self.chunk_size)
                    .into_iter()
                    .map(Ok::<Bytes, io::Error>);
                let stream = futures::stream::iter(chunks).inspect_ok(report);
                Ok(Body::wrap_stream(stream))
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        file: &UploadFile,
        bucket: &str,
        progress: ProgressFn,
        token: Option<&str>,
    ) -> Result<Completion, UploadError> {
        let target = self.base.upload_target(bucket, &file.name);
        tracing::debug!("sending {} ({} bytes) to {target}", file.name, file.size);

        let body = self.body(file, progress).await?;
        let mut request = self
            .client
            .post(target.as_str())
            .header(CONTENT_LENGTH, file.size)
            .body(body);
        if let Some(content_type) = &file.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::transport(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(UploadError::unauthenticated(format!(
                "backend answered {status}"
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                status.to_string()
            } else {
                text
            };
            return Err(UploadError::transport(Some(status.as_u16()), message));
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let payload = response
            .bytes()
            .await
            .map_err(|e| UploadError::transport(Some(status.as_u16()), e.to_string()))?;
        // The insert endpoint answers with the ids of inserted files
        let file_id = serde_json::from_slice::<Vec<i64>>(&payload)
            .ok()
            .and_then(|ids| ids.first().copied());

        Ok(Completion::now(file_id, etag))
    }
}

fn split_into_chunks(data: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let chunk_size = chunk_size.max(1);
    (0..data.len())
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect()
}
