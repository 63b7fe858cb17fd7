// ─── In-Memory Transport ───
// Serves registered byte buffers with a scripted chunk/failure schedule.
// Used for offline mirrors and deterministic tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;

use super::transport::{ArtifactTransport, TransferStream};
use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePlan {
    Never,
    /// Refuse the first `n` requests, then serve normally.
    FirstAttempts(u32),
    Always,
}

#[derive(Debug, Clone)]
pub struct MemoryObject {
    body: Vec<u8>,
    chunk_size: usize,
    failures: FailurePlan,
    corrupt: bool,
    resumable: bool,
    stall_after_chunks: Option<usize>,
    interrupt_first_after: Option<usize>,
    chunk_delay: Option<Duration>,
}

impl MemoryObject {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            chunk_size: 4096,
            failures: FailurePlan::Never,
            corrupt: false,
            resumable: false,
            stall_after_chunks: None,
            interrupt_first_after: None,
            chunk_delay: None,
        }
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn failing(mut self, plan: FailurePlan) -> Self {
        self.failures = plan;
        self
    }

    /// Serve bytes of the right length but the wrong content.
    pub fn corrupted(mut self) -> Self {
        self.corrupt = true;
        self
    }

    /// Honour `range_start` requests.
    pub fn resumable(mut self) -> Self {
        self.resumable = true;
        self
    }

    /// Deliver `n` chunks, then never produce another one.
    pub fn stalling_after(mut self, n: usize) -> Self {
        self.stall_after_chunks = Some(n);
        self
    }

    /// On the first request only, break the stream after `n` chunks.
    pub fn interrupted_once_after(mut self, n: usize) -> Self {
        self.interrupt_first_after = Some(n);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }
}

#[derive(Debug, Default)]
pub struct MemoryTransport {
    objects: HashMap<String, MemoryObject>,
    attempts: Mutex<HashMap<String, u32>>,
    log: Mutex<Vec<(String, Option<u64>)>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, object: MemoryObject) {
        self.objects.insert(url.into(), object);
    }

    pub fn with(mut self, url: impl Into<String>, object: MemoryObject) -> Self {
        self.insert(url, object);
        self
    }

    /// Number of `fetch` calls seen for `url`.
    pub fn attempts(&self, url: &str) -> u32 {
        self.attempts.lock().get(url).copied().unwrap_or(0)
    }

    /// Every `fetch` call in arrival order, with the requested range start.
    pub fn fetch_log(&self) -> Vec<(String, Option<u64>)> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl ArtifactTransport for MemoryTransport {
    async fn fetch(&self, url: &str, range_start: Option<u64>) -> LauncherResult<TransferStream> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            let counter = attempts.entry(url.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };
        self.log.lock().push((url.to_string(), range_start));

        let object = self.objects.get(url).ok_or_else(|| LauncherError::DownloadFailed {
            url: url.to_string(),
            status: 404,
        })?;

        let refuse = match object.failures {
            FailurePlan::Never => false,
            FailurePlan::FirstAttempts(n) => attempt <= n,
            FailurePlan::Always => true,
        };
        if refuse {
            return Err(LauncherError::Transport {
                url: url.to_string(),
                message: format!("scripted failure on attempt {}", attempt),
            });
        }

        let mut body = object.body.clone();
        if object.corrupt {
            for byte in body.iter_mut() {
                *byte ^= 0xff;
            }
        }

        let len = body.len() as u64;
        let start_offset = if object.resumable {
            range_start.unwrap_or(0).min(len)
        } else {
            0
        };

        let mut items: Vec<LauncherResult<Vec<u8>>> = body[start_offset as usize..]
            .chunks(object.chunk_size)
            .map(|c| Ok(c.to_vec()))
            .collect();

        if let Some(n) = object.interrupt_first_after.filter(|_| attempt == 1) {
            items.truncate(n);
            items.push(Err(LauncherError::Transport {
                url: url.to_string(),
                message: "connection reset".into(),
            }));
        }

        let delay = object.chunk_delay;
        let paced = stream::iter(items).then(move |item| async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            item
        });

        let chunks = match object.stall_after_chunks {
            Some(n) => paced
                .take(n)
                .chain(stream::pending::<LauncherResult<Vec<u8>>>())
                .boxed(),
            None => paced.boxed(),
        };

        Ok(TransferStream {
            start_offset,
            total_len: Some(len),
            chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(transport: &MemoryTransport, url: &str, range: Option<u64>) -> (u64, Vec<u8>) {
        let transfer = transport.fetch(url, range).await.unwrap();
        let chunks: Vec<_> = transfer.chunks.collect().await;
        let bytes = chunks.into_iter().flat_map(|c| c.unwrap()).collect();
        (transfer.start_offset, bytes)
    }

    #[tokio::test]
    async fn serves_body_in_chunks() {
        let transport =
            MemoryTransport::new().with("mem://a", MemoryObject::new(b"hello world".to_vec()).with_chunk_size(4));
        let (start, bytes) = collect(&transport, "mem://a", None).await;
        assert_eq!(start, 0);
        assert_eq!(bytes, b"hello world");
        assert_eq!(transport.attempts("mem://a"), 1);
    }

    #[tokio::test]
    async fn range_is_ignored_unless_resumable() {
        let transport = MemoryTransport::new()
            .with("mem://plain", MemoryObject::new(b"0123456789".to_vec()))
            .with("mem://resume", MemoryObject::new(b"0123456789".to_vec()).resumable());

        let (start, bytes) = collect(&transport, "mem://plain", Some(4)).await;
        assert_eq!((start, bytes.as_slice()), (0, &b"0123456789"[..]));

        let (start, bytes) = collect(&transport, "mem://resume", Some(4)).await;
        assert_eq!((start, bytes.as_slice()), (4, &b"456789"[..]));
    }

    #[tokio::test]
    async fn scripted_failures_then_success() {
        let transport = MemoryTransport::new().with(
            "mem://flaky",
            MemoryObject::new(b"x".to_vec()).failing(FailurePlan::FirstAttempts(2)),
        );
        assert!(transport.fetch("mem://flaky", None).await.is_err());
        assert!(transport.fetch("mem://flaky", None).await.is_err());
        assert!(transport.fetch("mem://flaky", None).await.is_ok());
        assert_eq!(transport.attempts("mem://flaky"), 3);
    }

    #[tokio::test]
    async fn unknown_url_is_not_found() {
        let transport = MemoryTransport::new();
        let err = transport.fetch("mem://missing", None).await.unwrap_err();
        assert!(matches!(err, LauncherError::DownloadFailed { status: 404, .. }));
    }
}
