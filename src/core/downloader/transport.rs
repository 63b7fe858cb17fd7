use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::core::config::LauncherConfig;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;

pub type ChunkStream = BoxStream<'static, LauncherResult<Vec<u8>>>;

/// An open transfer: the byte offset it starts at plus the remaining chunks.
pub struct TransferStream {
    /// Offset of the first chunk. Zero unless the transport honoured a range.
    pub start_offset: u64,
    /// Full length of the resource when known.
    pub total_len: Option<u64>,
    pub chunks: ChunkStream,
}

impl std::fmt::Debug for TransferStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferStream")
            .field("start_offset", &self.start_offset)
            .field("total_len", &self.total_len)
            .finish_non_exhaustive()
    }
}

/// Byte source for artifact downloads.
///
/// `range_start` asks for the resource from that offset on. Transports that
/// cannot resume ignore it and report `start_offset == 0`.
#[async_trait]
pub trait ArtifactTransport: Send + Sync {
    async fn fetch(&self, url: &str, range_start: Option<u64>) -> LauncherResult<TransferStream>;
}

/// HTTP transport with `Range` support.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &LauncherConfig) -> LauncherResult<Self> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl ArtifactTransport for ReqwestTransport {
    async fn fetch(&self, url: &str, range_start: Option<u64>) -> LauncherResult<TransferStream> {
        let mut request = self.client.get(url);
        if let Some(start) = range_start.filter(|s| *s > 0) {
            request = request.header(RANGE, format!("bytes={}-", start));
        }

        let response = request.send().await.map_err(|e| LauncherError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let start_offset = if status == StatusCode::PARTIAL_CONTENT {
            range_start.unwrap_or(0)
        } else {
            0
        };
        let total_len = response.content_length().map(|len| len + start_offset);
        debug!(
            "GET {} -> {} (offset {}, length {:?})",
            url, status, start_offset, total_len
        );

        let owned_url = url.to_string();
        let chunks = response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map(|bytes| bytes.to_vec()).map_err(|e| LauncherError::Transport {
                    url: owned_url.clone(),
                    message: e.to_string(),
                })
            })
            .boxed();

        Ok(TransferStream {
            start_offset,
            total_len,
            chunks,
        })
    }
}
