//! HTTP transport for dataset downloads
//!
//! The [`Fetcher`] trait is the seam between the download pipeline and the network:
//! "stream the bytes at this URL into this file, reporting progress as you go".
//! [`HttpFetcher`] implements it on top of `reqwest`.

use crate::config::DownloadConfig;
use crate::error::{DownloadError, Error, FileOperation, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Progress of a running fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    /// Bytes written to disk so far
    pub downloaded: u64,
    /// Content-Length, when the server sent one
    pub total: Option<u64>,
}

/// Callback invoked after every chunk written to disk
pub type ProgressFn<'a> = &'a (dyn Fn(FetchProgress) + Send + Sync);

/// Trait for streaming a URL into a local file
///
/// Implementations must not hold more than `chunk_size` bytes of the body in memory
/// at once, and must call `on_progress` after each chunk reaches the file.
///
/// # Examples
///
/// ```no_run
/// use dataset_dl::config::DownloadConfig;
/// use dataset_dl::fetch::{Fetcher, HttpFetcher};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpFetcher::new(&DownloadConfig::default())?;
/// let size = fetcher
///     .fetch(
///         "https://example.com/data.zip",
///         Path::new("data.zip"),
///         1024 * 1024,
///         &|p| println!("{} bytes", p.downloaded),
///     )
///     .await?;
/// println!("fetched {} bytes", size);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Stream `url` into `dest`, creating or truncating it
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        chunk_size: usize,
        on_progress: ProgressFn<'_>,
    ) -> Result<u64>;
}

/// Streaming HTTP(S) fetcher backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher using the configured user agent and timeouts
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| Error::Config {
            message: format!("failed to create HTTP client: {}", e),
            key: Some("download".to_string()),
        })?;

        Ok(Self { client })
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        chunk_size: usize,
        on_progress: ProgressFn<'_>,
    ) -> Result<u64> {
        debug!(url, ?dest, chunk_size, "stream downloading");

        let transport = |e: reqwest::Error| -> Error {
            DownloadError::Transport {
                url: url.to_string(),
                source: e,
            }
            .into()
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let total = response.content_length();
        debug!(url, ?total, "response accepted");

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::filesystem(dest, FileOperation::Create, e))?;

        let chunk_size = chunk_size.max(1);
        let mut buffer: Vec<u8> = Vec::with_capacity(chunk_size);
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(piece) = stream.next().await {
            let piece = piece.map_err(transport)?;
            let mut remaining = &piece[..];

            while !remaining.is_empty() {
                let take = (chunk_size - buffer.len()).min(remaining.len());
                buffer.extend_from_slice(&remaining[..take]);
                remaining = &remaining[take..];

                if buffer.len() == chunk_size {
                    downloaded += flush_chunk(&mut file, &mut buffer, dest).await?;
                    on_progress(FetchProgress { downloaded, total });
                }
            }
        }

        if !buffer.is_empty() {
            downloaded += flush_chunk(&mut file, &mut buffer, dest).await?;
            on_progress(FetchProgress { downloaded, total });
        }

        file.flush()
            .await
            .map_err(|e| Error::filesystem(dest, FileOperation::Write, e))?;

        debug!(url, downloaded, "stream download finished");
        Ok(downloaded)
    }
}

/// Write the buffered chunk to disk and empty the buffer
async fn flush_chunk(file: &mut tokio::fs::File, buffer: &mut Vec<u8>, dest: &Path) -> Result<u64> {
    file.write_all(buffer)
        .await
        .map_err(|e| Error::filesystem(dest, FileOperation::Write, e))?;
    let written = buffer.len() as u64;
    buffer.clear();
    Ok(written)
}
