use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most recent entries kept per history list.
pub const HISTORY_LIMIT: usize = 50;

/// Per-user runtime settings consumed by the launch builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSettings {
    pub memory_mb: u32,
    pub display_width: u32,
    pub display_height: u32,
    /// Free-form JVM flags, split on whitespace at build time.
    pub extra_jvm_flags: String,
    /// `host` or `host:port`.
    pub direct_connect: Option<String>,
    pub java_path: Option<PathBuf>,
    /// Overrides the layout's default game directory.
    pub game_directory: Option<PathBuf>,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            memory_mb: 2048,
            display_width: 854,
            display_height: 480,
            extra_jvm_flags: String::new(),
            direct_connect: None,
            java_path: None,
            game_directory: None,
        }
    }
}

/// FIFO list that drops its oldest entry once `HISTORY_LIMIT` is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<T>", into = "Vec<T>")]
#[serde(bound(serialize = "T: Serialize + Clone", deserialize = "T: Deserialize<'de>"))]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
}

impl<T> Default for BoundedHistory<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<T> BoundedHistory<T> {
    pub fn push(&mut self, entry: T) {
        while self.entries.len() >= HISTORY_LIMIT {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }
}

impl<T> From<Vec<T>> for BoundedHistory<T> {
    fn from(entries: Vec<T>) -> Self {
        let mut history = Self::default();
        for entry in entries {
            history.push(entry);
        }
        history
    }
}

impl<T> From<BoundedHistory<T>> for Vec<T> {
    fn from(history: BoundedHistory<T>) -> Self {
        history.entries.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRecord {
    pub version_id: String,
    pub loader_id: Option<String>,
    pub version_name: String,
    pub player: String,
    pub launched_at: DateTime<Utc>,
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadResult {
    Completed,
    PartialFailure,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub version_id: String,
    pub loader_id: Option<String>,
    pub result: DownloadResult,
    pub files: u64,
    pub bytes: u64,
    pub failed: u64,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    pub total_bytes_ever: u64,
    pub total_files_ever: u64,
}

impl DownloadStats {
    pub fn record(&mut self, files: u64, bytes: u64) {
        self.total_files_ever = self.total_files_ever.saturating_add(files);
        self.total_bytes_ever = self.total_bytes_ever.saturating_add(bytes);
    }
}

/// Everything the launcher persists between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsRecord {
    pub launch: LaunchSettings,
    /// Keyed by version name (`1.20.4`, `1.20.4-fabric-0.15.6`).
    pub installed_versions: BTreeSet<String>,
    pub launch_history: BoundedHistory<LaunchRecord>,
    pub download_history: BoundedHistory<DownloadRecord>,
    pub download_stats: DownloadStats,
}

impl SettingsRecord {
    pub fn mark_installed(&mut self, version_name: &str) {
        self.installed_versions.insert(version_name.to_string());
    }

    pub fn is_installed(&self, version_name: &str) -> bool {
        self.installed_versions.contains(version_name)
    }

    pub fn record_launch(&mut self, record: LaunchRecord) {
        self.launch_history.push(record);
    }

    /// Append to the download history and fold the totals into the stats.
    pub fn record_download(&mut self, record: DownloadRecord) {
        self.download_stats.record(record.files, record.bytes);
        self.download_history.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download(n: u64) -> DownloadRecord {
        DownloadRecord {
            version_id: format!("1.{}", n),
            loader_id: None,
            result: DownloadResult::Completed,
            files: 2,
            bytes: 100,
            failed: 0,
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn history_evicts_oldest_beyond_limit() {
        let mut history = BoundedHistory::default();
        for i in 0..(HISTORY_LIMIT + 5) {
            history.push(i);
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.iter().next(), Some(&5));
        assert_eq!(history.latest(), Some(&(HISTORY_LIMIT + 4)));
    }

    #[test]
    fn oversized_history_on_disk_is_trimmed_on_load() {
        let raw: Vec<usize> = (0..70).collect();
        let json = serde_json::to_string(&raw).unwrap();
        let history: BoundedHistory<usize> = serde_json::from_str(&json).unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.iter().next(), Some(&20));
    }

    #[test]
    fn download_records_feed_the_stats() {
        let mut record = SettingsRecord::default();
        record.record_download(download(1));
        record.record_download(download(2));
        assert_eq!(record.download_stats.total_files_ever, 4);
        assert_eq!(record.download_stats.total_bytes_ever, 200);
        assert_eq!(record.download_history.len(), 2);
    }

    #[test]
    fn record_round_trips_with_missing_fields_defaulted() {
        let record: SettingsRecord =
            serde_json::from_str(r#"{"installed_versions": ["1.20.4"]}"#).unwrap();
        assert!(record.is_installed("1.20.4"));
        assert_eq!(record.launch.memory_mb, 2048);
        assert!(record.launch_history.is_empty());
    }
}
