// ─── Install/Launch Coordinator ───
// Sequences resolve -> fetch missing -> build -> spawn. Every collaborator is
// injected at construction; nothing is looked up globally.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::core::auth::IdentityProvider;
use crate::core::catalog::ArtifactCatalog;
use crate::core::config::{InstallLayout, LauncherConfig};
use crate::core::downloader::{
    ArtifactTransport, DownloadControl, DownloadOrchestrator, FailedArtifact, FetchOutcome,
    OrchestratorSettings, ProgressCallback, TaskStatus,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::{extract_natives, LaunchBuilder, ProcessHandle, ProcessSink};
use crate::core::resolver::{ArtifactKind, DependencyResolver, ResolvedManifest};
use crate::core::state::{DownloadRecord, DownloadResult, LaunchRecord, SettingsStore};

/// Result of one `prepare` or `retry_failed` call.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub manifest: ResolvedManifest,
    /// Artifacts that were already on disk and skipped.
    pub already_present: usize,
    /// Asset objects listed by the index.
    pub asset_objects: usize,
    pub outcome: FetchOutcome,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete()
    }

    pub fn failed(&self) -> &[FailedArtifact] {
        self.outcome.failed()
    }
}

pub struct LaunchCoordinator {
    resolver: DependencyResolver,
    orchestrator: DownloadOrchestrator,
    builder: LaunchBuilder,
    identity: Arc<dyn IdentityProvider>,
    settings: Arc<dyn SettingsStore>,
    sink: Arc<dyn ProcessSink>,
    concurrency: usize,
    /// One install at a time per install root.
    install_lock: tokio::sync::Mutex<()>,
    /// Guards load-modify-save of the settings record.
    settings_lock: parking_lot::Mutex<()>,
}

impl LaunchCoordinator {
    pub fn new(
        resolver: DependencyResolver,
        orchestrator: DownloadOrchestrator,
        builder: LaunchBuilder,
        identity: Arc<dyn IdentityProvider>,
        settings: Arc<dyn SettingsStore>,
        sink: Arc<dyn ProcessSink>,
    ) -> Self {
        Self {
            resolver,
            orchestrator,
            builder,
            identity,
            settings,
            sink,
            concurrency: 3,
            install_lock: tokio::sync::Mutex::new(()),
            settings_lock: parking_lot::Mutex::new(()),
        }
    }

    /// Wire every component from `config`.
    pub fn from_config(
        config: &LauncherConfig,
        catalog: Arc<ArtifactCatalog>,
        transport: Arc<dyn ArtifactTransport>,
        identity: Arc<dyn IdentityProvider>,
        settings: Arc<dyn SettingsStore>,
        sink: Arc<dyn ProcessSink>,
    ) -> Self {
        let orchestrator = DownloadOrchestrator::new(
            transport,
            config.layout(),
            OrchestratorSettings::from_config(config),
        );
        Self::new(
            DependencyResolver::new(catalog),
            orchestrator,
            LaunchBuilder::from_config(config),
            identity,
            settings,
            sink,
        )
        .with_concurrency(config.concurrency)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    pub fn layout(&self) -> &InstallLayout {
        self.orchestrator.layout()
    }

    /// Resolve `version` (+ `loader`) and download whatever is missing.
    pub async fn prepare(
        &self,
        version: &str,
        loader: Option<&str>,
        on_progress: ProgressCallback,
        control: &DownloadControl,
    ) -> LauncherResult<InstallReport> {
        let manifest = self.resolver.resolve(version, loader)?;
        self.install(manifest, on_progress, control).await
    }

    /// Fetch again whatever `report` left missing.
    pub async fn retry_failed(
        &self,
        report: &InstallReport,
        on_progress: ProgressCallback,
        control: &DownloadControl,
    ) -> LauncherResult<InstallReport> {
        info!(
            "Retrying {} failed artifact(s) for {}",
            report.failed().len(),
            report.manifest.runtime_metadata.version_name
        );
        self.install(report.manifest.clone(), on_progress, control).await
    }

    /// Install if needed, then start the game as the current identity.
    pub async fn launch(
        &self,
        version: &str,
        loader: Option<&str>,
        on_progress: ProgressCallback,
        control: &DownloadControl,
    ) -> LauncherResult<Box<dyn ProcessHandle>> {
        let identity = self
            .identity
            .get_current_identity()
            .ok_or(LauncherError::NoActiveIdentity)?
            .sanitized();

        let report = self.prepare(version, loader, on_progress, control).await?;
        let version_name = report.manifest.runtime_metadata.version_name.clone();
        match &report.outcome {
            FetchOutcome::Completed(_) => {}
            FetchOutcome::Cancelled(_) => return Err(LauncherError::Cancelled),
            FetchOutcome::PartialFailure { failed, .. } => {
                return Err(LauncherError::IncompleteInstall {
                    version: version_name,
                    failed: failed.iter().map(|f| f.artifact.target_path.clone()).collect(),
                })
            }
        }

        let launch_settings = self.settings.load()?.launch;
        let invocation = self.builder.build(&report.manifest, &identity, &launch_settings)?;

        let natives_dir = self.layout().natives_dir(&version_name);
        let archives = report
            .manifest
            .artifacts_of_kind(ArtifactKind::Natives)
            .map(|a| self.layout().resolve(&a.target_path))
            .collect();
        extract_natives(archives, natives_dir).await?;

        info!("Launching {} as {}", version_name, identity.display_name);
        let handle = self.sink.launch(&invocation)?;

        let record = LaunchRecord {
            version_id: report.manifest.version_id.clone(),
            loader_id: report.manifest.loader_id.clone(),
            version_name,
            player: identity.display_name.clone(),
            launched_at: Utc::now(),
            pid: handle.id(),
        };
        self.update_settings(|s| s.record_launch(record))?;

        Ok(handle)
    }

    async fn install(
        &self,
        manifest: ResolvedManifest,
        on_progress: ProgressCallback,
        control: &DownloadControl,
    ) -> LauncherResult<InstallReport> {
        let _guard = self.install_lock.lock().await;
        let version_name = manifest.runtime_metadata.version_name.clone();
        info!(
            "Installing {} ({} artifacts, {} bytes)",
            version_name,
            manifest.artifacts.len(),
            manifest.total_bytes
        );

        let outcome = self
            .orchestrator
            .fetch_all(&manifest, self.concurrency, on_progress, control)
            .await;
        self.finish(manifest, outcome)
    }

    /// Persist stats/history for the batch and build the report.
    fn finish(&self, manifest: ResolvedManifest, outcome: FetchOutcome) -> LauncherResult<InstallReport> {
        let report = outcome.report();
        let (already_present, asset_objects) = (report.already_present, report.asset_objects);
        let result = match &outcome {
            FetchOutcome::Completed(_) => DownloadResult::Completed,
            FetchOutcome::PartialFailure { .. } => DownloadResult::PartialFailure,
            FetchOutcome::Cancelled(_) => DownloadResult::Cancelled,
        };
        let record = DownloadRecord {
            version_id: manifest.version_id.clone(),
            loader_id: manifest.loader_id.clone(),
            result,
            files: report.count(TaskStatus::Completed) as u64,
            bytes: report.bytes_transferred,
            failed: outcome.failed().len() as u64,
            finished_at: Utc::now(),
        };
        let version_name = manifest.runtime_metadata.version_name.clone();
        let complete = outcome.is_complete();

        self.update_settings(|s| {
            s.record_download(record);
            if complete {
                s.mark_installed(&version_name);
            }
        })?;

        if complete {
            info!("{} is installed", version_name);
        }
        Ok(InstallReport {
            manifest,
            already_present,
            asset_objects,
            outcome,
        })
    }

    fn update_settings<F>(&self, apply: F) -> LauncherResult<()>
    where
        F: FnOnce(&mut crate::core::state::SettingsRecord),
    {
        let _guard = self.settings_lock.lock();
        let mut record = self.settings.load()?;
        apply(&mut record);
        self.settings.save(&record)
    }
}
