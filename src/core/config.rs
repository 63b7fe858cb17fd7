// ─── Launcher Config ───
// Data directory layout plus download/retry tuning, loaded from JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

pub const APP_DIR_NAME: &str = "InterfaceOficial";
pub const LAUNCHER_NAME: &str = "InterfaceOficial";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub data_dir: PathBuf,
    /// Number of concurrent transfers.
    pub concurrency: usize,
    /// Attempts per artifact, including the first one.
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub stall_timeout_secs: u64,
    pub progress_interval_ms: u64,
    pub speed_window_ms: u64,
    /// Base URL asset objects are fetched from.
    pub resources_url: String,
    pub launcher_name: String,
    pub launcher_version: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            concurrency: 3,
            max_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
            stall_timeout_secs: 30,
            progress_interval_ms: 100,
            speed_window_ms: 3_000,
            resources_url: RESOURCES_URL.into(),
            launcher_name: LAUNCHER_NAME.into(),
            launcher_version: LAUNCHER_VERSION.into(),
        }
    }
}

impl LauncherConfig {
    /// Load config from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> LauncherResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => Err(LauncherError::io(path, e)),
        }
    }

    pub fn save(&self, path: &Path) -> LauncherResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| LauncherError::io(path, e))
    }

    pub fn layout(&self) -> InstallLayout {
        InstallLayout::new(self.data_dir.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    /// At least one second; a zero timeout would fail every transfer.
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs.max(1))
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn speed_window(&self) -> Duration {
        Duration::from_millis(self.speed_window_ms)
    }
}

/// Bounded exponential backoff between download attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// On-disk layout rooted at the data directory.
///
/// - `libraries/`          — library and loader jars (Maven layout)
/// - `versions/<id>/`      — client binaries and loader profiles
/// - `assets/`             — asset indexes and objects
/// - `natives/<version>/`  — native libraries per version
/// - `minecraft/`          — default game working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a manifest-relative target path.
    pub fn resolve(&self, target_path: &Path) -> PathBuf {
        self.root.join(target_path)
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn natives_dir(&self, version_name: &str) -> PathBuf {
        self.root.join("natives").join(version_name)
    }

    pub fn game_dir(&self) -> PathBuf {
        self.root.join("minecraft")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::OrchestratorSettings;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LauncherConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.launcher_name, "InterfaceOficial");
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"concurrency": 5, "data_dir": "/tmp/iface"}"#).unwrap();

        let config = LauncherConfig::load(&path).unwrap();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.stall_timeout_secs, 30);
        assert_eq!(config.layout().libraries_dir(), PathBuf::from("/tmp/iface/libraries"));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let config = LauncherConfig {
            max_attempts: 0,
            ..LauncherConfig::default()
        };
        assert_eq!(config.retry_policy().max_attempts, 1);
    }

    #[test]
    fn zero_stall_timeout_is_clamped_to_one_second() {
        let config = LauncherConfig {
            stall_timeout_secs: 0,
            ..LauncherConfig::default()
        };
        assert_eq!(config.stall_timeout(), Duration::from_secs(1));
        assert_eq!(OrchestratorSettings::from_config(&config).stall_timeout, Duration::from_secs(1));
        assert_eq!(LauncherConfig::default().stall_timeout(), Duration::from_secs(30));
    }
}
