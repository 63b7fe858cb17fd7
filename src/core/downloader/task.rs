use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{FailureKind, LauncherError, LauncherResult};
use crate::core::resolver::ArtifactRef;

/// Lifecycle of a single artifact transfer.
///
/// ```text
/// pending -> downloading -> completed | failed | cancelled
/// downloading <-> paused
/// failed -> downloading        (automatic retry)
/// pending | paused | failed -> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Downloading,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Pending, Cancelled)
                | (Downloading, Completed)
                | (Downloading, Failed)
                | (Downloading, Cancelled)
                | (Downloading, Paused)
                | (Paused, Downloading)
                | (Paused, Cancelled)
                | (Failed, Downloading)
                | (Failed, Cancelled)
        )
    }

    /// Completed and cancelled never change again. A failed task may still
    /// be retried until the orchestrator gives up on it.
    pub fn is_final(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Paused => "paused",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Mutable per-artifact state owned by one orchestrator batch.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub id: Uuid,
    pub artifact: ArtifactRef,
    status: TaskStatus,
    bytes_downloaded: u64,
    started_at: Option<Instant>,
    /// Bytes/second measured between the two most recent deltas.
    last_speed_sample: f64,
    last_delta_at: Option<Instant>,
    attempts: u32,
    last_error: Option<String>,
    last_failure: Option<FailureKind>,
}

impl DownloadTask {
    pub fn new(artifact: ArtifactRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            artifact,
            status: TaskStatus::Pending,
            bytes_downloaded: 0,
            started_at: None,
            last_speed_sample: 0.0,
            last_delta_at: None,
            attempts: 0,
            last_error: None,
            last_failure: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn last_speed_sample(&self) -> f64 {
        self.last_speed_sample
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_failure(&self) -> Option<FailureKind> {
        self.last_failure
    }

    pub fn transition(&mut self, next: TaskStatus) -> LauncherResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(LauncherError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Enter `downloading` for a new attempt.
    pub fn begin_attempt(&mut self, now: Instant) -> LauncherResult<()> {
        self.transition(TaskStatus::Downloading)?;
        self.attempts += 1;
        self.started_at.get_or_insert(now);
        self.last_delta_at = Some(now);
        Ok(())
    }

    /// Align the byte count with the offset the transport actually serves.
    pub fn restart_at(&mut self, offset: u64) {
        self.bytes_downloaded = offset.min(self.artifact.size_bytes);
    }

    /// Record received bytes. Never lets the count pass the artifact size.
    pub fn advance(&mut self, delta: u64, now: Instant) -> LauncherResult<()> {
        let next = self.bytes_downloaded + delta;
        if next > self.artifact.size_bytes {
            return Err(LauncherError::SizeMismatch {
                path: self.artifact.target_path.clone(),
                expected: self.artifact.size_bytes,
                actual: next,
            });
        }

        if let Some(prev) = self.last_delta_at {
            let elapsed = now.saturating_duration_since(prev).as_secs_f64();
            if elapsed > 0.0 {
                self.last_speed_sample = delta as f64 / elapsed;
            }
        }
        self.last_delta_at = Some(now);
        self.bytes_downloaded = next;
        Ok(())
    }

    pub fn record_failure(&mut self, error: &LauncherError) -> LauncherResult<()> {
        self.transition(TaskStatus::Failed)?;
        self.last_error = Some(error.to_string());
        self.last_failure = error.failure_kind();
        Ok(())
    }
}
