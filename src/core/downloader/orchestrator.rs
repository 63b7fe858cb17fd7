// ─── Download Orchestrator ───
// Bounded-concurrency artifact retrieval: retries with backoff, stall
// detection, resumable `.part` files, integrity checks and aggregate progress.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::control::DownloadControl;
use super::integrity::{self, IntegrityHash};
use super::progress::{
    eta_seconds, ignore_progress, AggregateProgress, ArtifactProgress, ProgressCallback,
    ProgressThrottle, SpeedWindow,
};
use super::task::{DownloadTask, TaskStatus};
use super::transport::ArtifactTransport;
use crate::core::assets::AssetIndex;
use crate::core::config::{InstallLayout, LauncherConfig, RetryPolicy, RESOURCES_URL};
use crate::core::error::{FailureKind, LauncherError, LauncherResult};
use crate::core::resolver::{ArtifactKind, ArtifactRef, ResolvedManifest};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub retry: RetryPolicy,
    /// Longest time a transfer may go without receiving a chunk.
    pub stall_timeout: Duration,
    pub progress_interval: Duration,
    pub speed_window: Duration,
    /// Base URL of the hash-addressed asset objects.
    pub resources_url: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            stall_timeout: Duration::from_secs(30),
            progress_interval: Duration::from_millis(100),
            speed_window: Duration::from_secs(3),
            resources_url: RESOURCES_URL.to_string(),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &LauncherConfig) -> Self {
        Self {
            retry: config.retry_policy(),
            stall_timeout: config.stall_timeout(),
            progress_interval: config.progress_interval(),
            speed_window: config.speed_window(),
            resources_url: config.resources_url.clone(),
        }
    }
}

// ── Outcome ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub artifact: ArtifactRef,
    pub status: TaskStatus,
    pub attempts: u32,
    pub bytes_downloaded: u64,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
}

impl TaskReport {
    fn from_task(task: &DownloadTask) -> Self {
        Self {
            artifact: task.artifact.clone(),
            status: task.status(),
            attempts: task.attempts(),
            bytes_downloaded: task.bytes_downloaded(),
            error: task.last_error().map(str::to_string),
            failure: task.last_failure(),
        }
    }
}

/// An artifact that was still failing once its attempts ran out.
#[derive(Debug, Clone, Serialize)]
pub struct FailedArtifact {
    pub artifact: ArtifactRef,
    pub kind: Option<FailureKind>,
    pub error: String,
    pub attempts: u32,
}

/// Per-task results in manifest order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub tasks: Vec<TaskReport>,
    /// Bytes received over the transport, retries included.
    pub bytes_transferred: u64,
    pub elapsed: Duration,
    /// Artifacts skipped because they were already on disk.
    pub already_present: usize,
    /// Objects listed by the asset index, present or not.
    pub asset_objects: usize,
}

impl FetchReport {
    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }

    pub fn completed(&self) -> impl Iterator<Item = &ArtifactRef> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .map(|t| &t.artifact)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Completed(FetchReport),
    /// At least one artifact exhausted its attempts. Siblings ran to the end.
    PartialFailure {
        failed: Vec<FailedArtifact>,
        report: FetchReport,
    },
    Cancelled(FetchReport),
}

impl FetchOutcome {
    pub fn report(&self) -> &FetchReport {
        match self {
            FetchOutcome::Completed(report)
            | FetchOutcome::Cancelled(report)
            | FetchOutcome::PartialFailure { report, .. } => report,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, FetchOutcome::Completed(_))
    }

    pub fn failed(&self) -> &[FailedArtifact] {
        match self {
            FetchOutcome::PartialFailure { failed, .. } => failed,
            _ => &[],
        }
    }

    fn report_mut(&mut self) -> &mut FetchReport {
        match self {
            FetchOutcome::Completed(report)
            | FetchOutcome::Cancelled(report)
            | FetchOutcome::PartialFailure { report, .. } => report,
        }
    }
}

/// Fold a completed earlier batch into the outcome of the main one.
fn prepend_report(first: FetchReport, outcome: FetchOutcome) -> FetchOutcome {
    let merge = |mut second: FetchReport| {
        let mut tasks = first.tasks;
        tasks.append(&mut second.tasks);
        FetchReport {
            tasks,
            bytes_transferred: first.bytes_transferred + second.bytes_transferred,
            elapsed: first.elapsed + second.elapsed,
            already_present: first.already_present + second.already_present,
            asset_objects: first.asset_objects + second.asset_objects,
        }
    };
    match outcome {
        FetchOutcome::Completed(report) => FetchOutcome::Completed(merge(report)),
        FetchOutcome::Cancelled(report) => FetchOutcome::Cancelled(merge(report)),
        FetchOutcome::PartialFailure { failed, report } => FetchOutcome::PartialFailure {
            failed,
            report: merge(report),
        },
    }
}

// ── Batch progress ──────────────────────────────────────

struct BatchState {
    per_task: Vec<ArtifactProgress>,
    total_bytes: u64,
    total_tasks: usize,
    completed: usize,
    /// Wire bytes, monotonic even when a task restarts from zero.
    transferred: u64,
    speed: SpeedWindow,
    throttle: ProgressThrottle,
}

impl BatchState {
    fn downloaded(&self) -> u64 {
        self.per_task.iter().map(|t| t.bytes_downloaded).sum()
    }

    /// `current` names the task whose update triggered the snapshot.
    fn snapshot(&mut self, now: Instant, current: Option<usize>) -> AggregateProgress {
        let bytes_downloaded = self.downloaded();
        let speed = self.speed.rate(now);
        AggregateProgress {
            bytes_downloaded,
            total_bytes: self.total_bytes,
            bytes_per_second: speed,
            eta_seconds: eta_seconds(self.total_bytes.saturating_sub(bytes_downloaded), speed),
            completed_tasks: self.completed,
            total_tasks: self.total_tasks,
            artifact: current.and_then(|index| self.per_task.get(index)).cloned(),
        }
    }
}

/// Shared by every worker of one batch. The callback runs under the lock so
/// updates reach the caller in time order.
struct BatchProgress {
    state: Mutex<BatchState>,
    on_progress: ProgressCallback,
}

impl BatchProgress {
    fn new(artifacts: &[ArtifactRef], settings: &OrchestratorSettings, on_progress: ProgressCallback) -> Self {
        let total_bytes = artifacts.iter().map(|a| a.size_bytes).sum();
        Self {
            state: Mutex::new(BatchState {
                per_task: artifacts
                    .iter()
                    .enumerate()
                    .map(|(index, a)| ArtifactProgress {
                        index,
                        url: a.url.clone(),
                        target_path: a.target_path.clone(),
                        bytes_downloaded: 0,
                        size_bytes: a.size_bytes,
                    })
                    .collect(),
                total_bytes,
                total_tasks: artifacts.len(),
                completed: 0,
                transferred: 0,
                speed: SpeedWindow::new(settings.speed_window),
                throttle: ProgressThrottle::new(settings.progress_interval, total_bytes),
            }),
            on_progress,
        }
    }

    fn restart(&self, index: usize, offset: u64) {
        self.state.lock().per_task[index].bytes_downloaded = offset;
    }

    fn advance(&self, index: usize, position: u64, delta: u64, now: Instant) {
        let mut state = self.state.lock();
        state.per_task[index].bytes_downloaded = position;
        state.transferred += delta;
        let transferred = state.transferred;
        state.speed.record(now, transferred);

        let downloaded = state.downloaded();
        if state.throttle.should_emit(now, downloaded) {
            let snapshot = state.snapshot(now, Some(index));
            (self.on_progress)(&snapshot);
        }
    }

    fn complete(&self, index: usize, size: u64, now: Instant) {
        let mut state = self.state.lock();
        state.per_task[index].bytes_downloaded = size;
        state.completed += 1;
        let snapshot = state.snapshot(now, Some(index));
        (self.on_progress)(&snapshot);
    }

    /// Emit the closing snapshot and return the wire byte count.
    fn finish(&self, now: Instant) -> u64 {
        let mut state = self.state.lock();
        let snapshot = state.snapshot(now, None);
        (self.on_progress)(&snapshot);
        state.transferred
    }
}

// ── Orchestrator ────────────────────────────────────────

/// Where a transfer keeps its bytes until the artifact is verified.
pub fn part_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

pub struct DownloadOrchestrator {
    transport: Arc<dyn ArtifactTransport>,
    layout: InstallLayout,
    settings: OrchestratorSettings,
}

impl DownloadOrchestrator {
    pub fn new(
        transport: Arc<dyn ArtifactTransport>,
        layout: InstallLayout,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            transport,
            layout,
            settings,
        }
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Fetch whatever `manifest` still misses.
    ///
    /// The asset bundle is fetched as its index document first, then expanded
    /// into one artifact per object. Files already on disk with their expected
    /// size are skipped and counted in `already_present`.
    pub async fn fetch_all(
        &self,
        manifest: &ResolvedManifest,
        concurrency_limit: usize,
        on_progress: ProgressCallback,
        control: &DownloadControl,
    ) -> FetchOutcome {
        let mut work: Vec<ArtifactRef> = manifest
            .artifacts
            .iter()
            .filter(|a| a.kind != ArtifactKind::AssetBundle)
            .cloned()
            .collect();
        let mut prior: Option<FetchReport> = None;
        let mut asset_objects = 0;

        if let Some(bundle) = manifest.asset_bundle() {
            match self.expand_asset_bundle(manifest, bundle, control).await {
                Ok((fetched, objects)) => {
                    prior = fetched;
                    asset_objects = objects.len();
                    work.extend(objects);
                }
                Err(outcome) => return outcome,
            }
        }

        let mut missing = Vec::with_capacity(work.len());
        let mut already_present = 0;
        for artifact in work {
            if self.is_present(&artifact).await {
                already_present += 1;
            } else {
                missing.push(artifact);
            }
        }
        info!(
            "{} artifact(s) missing for {}, {} already present",
            missing.len(),
            manifest.runtime_metadata.version_name,
            already_present
        );

        let outcome = self
            .fetch_artifacts(&missing, concurrency_limit, on_progress, control)
            .await;
        let mut outcome = match prior {
            Some(first) => prepend_report(first, outcome),
            None => outcome,
        };
        let report = outcome.report_mut();
        report.already_present = already_present;
        report.asset_objects = asset_objects;
        outcome
    }

    /// Make sure the bundle's index document is on disk and intact, then list
    /// its objects. A failure comes back as the outcome to return.
    async fn expand_asset_bundle(
        &self,
        manifest: &ResolvedManifest,
        bundle: &ArtifactRef,
        control: &DownloadControl,
    ) -> Result<(Option<FetchReport>, Vec<ArtifactRef>), FetchOutcome> {
        let Some(index) = manifest.runtime_metadata.asset_index.as_ref() else {
            warn!("Asset bundle {:?} has no index metadata", bundle.target_path);
            return Ok((None, Vec::new()));
        };

        // The bundle's size covers every object; the index document has its own.
        let index_artifact = ArtifactRef {
            url: index.url.clone(),
            target_path: bundle.target_path.clone(),
            size_bytes: index.size,
            integrity_hash: index.sha1.clone(),
            kind: ArtifactKind::AssetBundle,
        };
        let path = self.layout.resolve(&index_artifact.target_path);

        let mut fetched = None;
        if !self.is_intact(&index_artifact).await {
            let outcome = self
                .fetch_artifacts(
                    std::slice::from_ref(&index_artifact),
                    1,
                    ignore_progress(),
                    control,
                )
                .await;
            match outcome {
                FetchOutcome::Completed(report) => fetched = Some(report),
                other => {
                    warn!("Asset index {} could not be fetched", index.id);
                    return Err(other);
                }
            }
        }

        let listed = AssetIndex::load(&path)
            .await
            .and_then(|asset_index| asset_index.object_artifacts(&self.settings.resources_url));
        match listed {
            Ok(objects) => Ok((fetched, objects)),
            Err(e) => {
                // Drop it so the next fetch starts from a fresh copy.
                warn!("Asset index {:?} is unusable, removing it: {}", path, e);
                let _ = tokio::fs::remove_file(&path).await;
                let report = fetched.unwrap_or_default();
                let attempts = report.tasks.first().map_or(0, |t| t.attempts);
                Err(FetchOutcome::PartialFailure {
                    failed: vec![FailedArtifact {
                        artifact: bundle.clone(),
                        kind: Some(e.failure_kind().unwrap_or(FailureKind::IntegrityMismatch)),
                        error: e.to_string(),
                        attempts,
                    }],
                    report,
                })
            }
        }
    }

    /// Present means the file exists with exactly the expected size.
    async fn is_present(&self, artifact: &ArtifactRef) -> bool {
        let path = self.layout.resolve(&artifact.target_path);
        matches!(tokio::fs::metadata(&path).await, Ok(meta) if meta.is_file() && meta.len() == artifact.size_bytes)
    }

    /// Present, and matching the expected hash when one is known.
    async fn is_intact(&self, artifact: &ArtifactRef) -> bool {
        if !self.is_present(artifact).await {
            return false;
        }
        let Some(raw) = artifact.integrity_hash.as_deref() else {
            return true;
        };
        let Ok(expected) = IntegrityHash::parse(raw) else {
            return false;
        };
        let path = self.layout.resolve(&artifact.target_path);
        integrity::file_matches(&path, &expected).await.unwrap_or(false)
    }

    /// Fetch `artifacts` with at most `concurrency_limit` transfers in flight.
    /// Slots are handed out in slice order.
    pub async fn fetch_artifacts(
        &self,
        artifacts: &[ArtifactRef],
        concurrency_limit: usize,
        on_progress: ProgressCallback,
        control: &DownloadControl,
    ) -> FetchOutcome {
        let started = Instant::now();
        let limit = concurrency_limit.max(1);
        let batch = BatchProgress::new(artifacts, &self.settings, on_progress);

        info!(
            "Fetching {} artifacts ({} bytes), concurrency={}",
            artifacts.len(),
            artifacts.iter().map(|a| a.size_bytes).sum::<u64>(),
            limit
        );

        let batch_ref = &batch;
        let mut results: Vec<(usize, TaskReport)> = stream::iter(artifacts.iter().cloned().enumerate())
            .map(|(index, artifact)| async move {
                let report = self.run_task(index, artifact, batch_ref, control).await;
                (index, report)
            })
            .buffer_unordered(limit)
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);

        let report = FetchReport {
            tasks: results.into_iter().map(|(_, report)| report).collect(),
            bytes_transferred: batch.finish(Instant::now()),
            elapsed: started.elapsed(),
            already_present: 0,
            asset_objects: 0,
        };

        if control.is_cancelled() {
            info!(
                "Batch cancelled: {} of {} artifacts completed",
                report.count(TaskStatus::Completed),
                report.tasks.len()
            );
            return FetchOutcome::Cancelled(report);
        }

        let failed: Vec<FailedArtifact> = report
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .map(|t| FailedArtifact {
                artifact: t.artifact.clone(),
                kind: t.failure,
                error: t.error.clone().unwrap_or_default(),
                attempts: t.attempts,
            })
            .collect();

        if failed.is_empty() {
            info!(
                "Fetched {} artifacts in {:.1}s",
                report.tasks.len(),
                report.elapsed.as_secs_f64()
            );
            FetchOutcome::Completed(report)
        } else {
            warn!(
                "{} of {} artifacts failed after retries",
                failed.len(),
                report.tasks.len()
            );
            FetchOutcome::PartialFailure { failed, report }
        }
    }

    async fn run_task(
        &self,
        index: usize,
        artifact: ArtifactRef,
        batch: &BatchProgress,
        control: &DownloadControl,
    ) -> TaskReport {
        let mut task = DownloadTask::new(artifact);
        match self.drive(index, &mut task, batch, control).await {
            Ok(()) => TaskReport::from_task(&task),
            Err(e) => {
                warn!("Task for {} aborted: {}", task.artifact.url, e);
                let mut report = TaskReport::from_task(&task);
                report.status = TaskStatus::Failed;
                report.error = Some(e.to_string());
                report
            }
        }
    }

    /// Attempt loop for one task. Only bookkeeping errors escape; transfer
    /// failures end up in the task's status.
    async fn drive(
        &self,
        index: usize,
        task: &mut DownloadTask,
        batch: &BatchProgress,
        control: &DownloadControl,
    ) -> LauncherResult<()> {
        let policy = self.settings.retry;

        loop {
            control.wait_resumed().await;
            if control.is_cancelled() {
                return task.transition(TaskStatus::Cancelled);
            }

            task.begin_attempt(Instant::now())?;
            let result = tokio::select! {
                biased;
                _ = control.cancelled() => Err(LauncherError::Cancelled),
                result = self.attempt(index, task, batch, control) => result,
            };

            match result {
                Ok(()) => {
                    task.transition(TaskStatus::Completed)?;
                    batch.complete(index, task.artifact.size_bytes, Instant::now());
                    debug!(
                        "Downloaded {:?} ({} attempt(s))",
                        task.artifact.target_path,
                        task.attempts()
                    );
                    return Ok(());
                }
                Err(LauncherError::Cancelled) => {
                    debug!("Cancelled {:?}", task.artifact.target_path);
                    return task.transition(TaskStatus::Cancelled);
                }
                Err(e) => {
                    task.record_failure(&e)?;
                    if !e.is_retryable() || task.attempts() >= policy.max_attempts {
                        warn!(
                            "Giving up on {} after {} attempt(s): {}",
                            task.artifact.url,
                            task.attempts(),
                            e
                        );
                        return Ok(());
                    }

                    let delay = policy.delay_for(task.attempts());
                    warn!(
                        "Attempt {} for {} failed: {}. Retrying in {:?}",
                        task.attempts(),
                        task.artifact.url,
                        e,
                        delay
                    );
                    tokio::select! {
                        biased;
                        _ = control.cancelled() => return task.transition(TaskStatus::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn attempt(
        &self,
        index: usize,
        task: &mut DownloadTask,
        batch: &BatchProgress,
        control: &DownloadControl,
    ) -> LauncherResult<()> {
        let target = self.layout.resolve(&task.artifact.target_path);
        let part = part_path(&target);

        let result = self.transfer(index, task, &target, &part, batch, control).await;
        if let Err(e) = &result {
            if e.failure_kind() == Some(FailureKind::IntegrityMismatch) {
                // Bad bytes must not be resumed from.
                let _ = tokio::fs::remove_file(&part).await;
            }
        }
        result
    }

    async fn transfer(
        &self,
        index: usize,
        task: &mut DownloadTask,
        target: &Path,
        part: &Path,
        batch: &BatchProgress,
        control: &DownloadControl,
    ) -> LauncherResult<()> {
        let url = task.artifact.url.clone();
        let size = task.artifact.size_bytes;
        let expected = task
            .artifact
            .integrity_hash
            .as_deref()
            .map(IntegrityHash::parse)
            .transpose()?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let mut on_disk = tokio::fs::metadata(part).await.map(|m| m.len()).unwrap_or(0);
        if on_disk > size {
            tokio::fs::remove_file(part)
                .await
                .map_err(|e| LauncherError::io(part, e))?;
            on_disk = 0;
        }

        let transfer = self
            .transport
            .fetch(&url, (on_disk > 0).then_some(on_disk))
            .await?;

        if let Some(len) = transfer.total_len.filter(|len| *len != size) {
            return Err(LauncherError::SizeMismatch {
                path: target.to_path_buf(),
                expected: size,
                actual: len,
            });
        }

        let start = transfer.start_offset;
        if start != 0 && start != on_disk {
            return Err(LauncherError::Transport {
                url,
                message: format!("resumed at byte {} but {} bytes are on disk", start, on_disk),
            });
        }

        let mut hasher = expected.as_ref().map(IntegrityHash::hasher);
        let opened = if start > 0 {
            if let Some(hasher) = hasher.as_mut() {
                let prefix = tokio::fs::read(part)
                    .await
                    .map_err(|e| LauncherError::io(part, e))?;
                hasher.update(&prefix);
            }
            debug!("Resuming {} at byte {}", url, start);
            tokio::fs::OpenOptions::new().append(true).open(part).await
        } else {
            tokio::fs::File::create(part).await
        };
        let mut file = opened.map_err(|e| LauncherError::io(part, e))?;

        task.restart_at(start);
        batch.restart(index, start);

        let stall = self.settings.stall_timeout;
        let mut chunks = transfer.chunks;
        let streamed = async {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = control.pause_requested() => {
                        task.transition(TaskStatus::Paused)?;
                        debug!("Paused {}", url);
                        control.wait_resumed().await;
                        if control.is_cancelled() {
                            return Err(LauncherError::Cancelled);
                        }
                        task.transition(TaskStatus::Downloading)?;
                        continue;
                    }
                    next = tokio::time::timeout(stall, chunks.next()) => next,
                };

                let chunk = match next {
                    Err(_) => {
                        return Err(LauncherError::StallTimeout {
                            url: url.clone(),
                            after_ms: stall.as_millis() as u64,
                        })
                    }
                    Ok(None) => break,
                    Ok(Some(chunk)) => chunk?,
                };

                let now = Instant::now();
                task.advance(chunk.len() as u64, now)?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(part, e))?;
                if let Some(hasher) = hasher.as_mut() {
                    hasher.update(&chunk);
                }
                batch.advance(index, task.bytes_downloaded(), chunk.len() as u64, now);
            }
            Ok::<(), LauncherError>(())
        }
        .await;

        // Flush on failure too so a retry sees every byte on disk, and close
        // the handle before the rename below.
        let flushed = file.flush().await;
        drop(file);
        streamed?;
        flushed.map_err(|e| LauncherError::io(part, e))?;

        if task.bytes_downloaded() != size {
            return Err(LauncherError::Transport {
                url,
                message: format!("stream ended at {} of {} bytes", task.bytes_downloaded(), size),
            });
        }

        if let (Some(expected), Some(hasher)) = (expected.as_ref(), hasher) {
            let actual = hasher.finalize_hex();
            if !expected.matches(&actual) {
                return Err(LauncherError::IntegrityMismatch {
                    path: target.to_path_buf(),
                    expected: expected.expected_hex().to_string(),
                    actual,
                });
            }
        }

        tokio::fs::rename(part, target)
            .await
            .map_err(|e| LauncherError::io(target, e))
    }
}
