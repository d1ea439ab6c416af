//! Direct upload transport
//!
//! PUTs file bytes to a presigned URL. The body is streamed in fixed-size
//! chunks so progress can be reported as the request is written.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use std::time::Duration;
use vitrine_core::{AppError, ClientConfig, LocalFile, ProgressFn, UploadTransport};

use crate::{check_status, transport_error};

#[derive(Clone, Debug)]
pub struct HttpUploadTransport {
    client: Client,
    chunk_bytes: usize,
}

impl HttpUploadTransport {
    pub fn new(timeout: Duration, chunk_bytes: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create upload HTTP client")?;
        Ok(Self {
            client,
            chunk_bytes: chunk_bytes.max(1),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            Duration::from_secs(config.timeout_secs),
            config.upload_chunk_bytes,
        )
    }

    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }
}

/// Split `data` into zero-copy slices of at most `size` bytes.
fn chunks(data: &Bytes, size: usize) -> Vec<Bytes> {
    let mut out = Vec::with_capacity(data.len() / size + 1);
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + size).min(data.len());
        out.push(data.slice(offset..end));
        offset = end;
    }
    out
}

/// Percentage written so far. 100 is reserved for an acknowledged upload.
fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((sent * 100 / total).min(99)) as u8
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn put(
        &self,
        upload_url: &str,
        file: &LocalFile,
        on_progress: ProgressFn,
    ) -> Result<(), AppError> {
        let total = file.size();
        let progress = on_progress.clone();
        let mut sent = 0u64;
        let body = stream::iter(chunks(&file.data, self.chunk_bytes).into_iter().map(
            move |chunk| {
                sent += chunk.len() as u64;
                progress(percent(sent, total));
                Ok::<Bytes, std::io::Error>(chunk)
            },
        ));

        tracing::debug!(
            filename = %file.filename,
            size = total,
            chunk_bytes = self.chunk_bytes,
            "Uploading to presigned URL"
        );

        let response = self
            .client
            .put(upload_url)
            .header(CONTENT_TYPE, file.content_type.as_str())
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(body))
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;

        on_progress(100);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_cover_the_whole_file() {
        let data = Bytes::from(vec![1u8; 10]);
        let parts = chunks(&data, 4);
        assert_eq!(
            parts.iter().map(Bytes::len).collect::<Vec<_>>(),
            vec![4, 4, 2]
        );
        assert!(chunks(&Bytes::new(), 4).is_empty());
    }

    #[test]
    fn test_percent_is_capped_until_acknowledged() {
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(5, 10), 50);
        assert_eq!(percent(10, 10), 99);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let transport = HttpUploadTransport::new(Duration::from_secs(1), 0).unwrap();
        assert_eq!(transport.chunk_bytes(), 1);
    }
}
