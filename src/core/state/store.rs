use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::settings::SettingsRecord;
use crate::core::error::{LauncherError, LauncherResult};

pub const SETTINGS_FILE: &str = "launcher_settings.json";

/// Persistent storage for the settings record.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> LauncherResult<SettingsRecord>;
    fn save(&self, record: &SettingsRecord) -> LauncherResult<()>;
}

/// Pretty-printed JSON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<data_dir>/launcher_settings.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self) -> LauncherResult<SettingsRecord> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {:?}, starting fresh", self.path);
                Ok(SettingsRecord::default())
            }
            Err(e) => Err(LauncherError::io(&self.path, e)),
        }
    }

    fn save(&self, record: &SettingsRecord) -> LauncherResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(record)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| LauncherError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| LauncherError::io(&self.path, e))
    }
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    record: Mutex<SettingsRecord>,
}

impl MemorySettingsStore {
    pub fn new(record: SettingsRecord) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }

    pub fn snapshot(&self) -> SettingsRecord {
        self.record.lock().clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> LauncherResult<SettingsRecord> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, record: &SettingsRecord) -> LauncherResult<()> {
        *self.record.lock() = record.clone();
        Ok(())
    }
}
