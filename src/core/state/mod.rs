mod settings;
mod store;

pub use settings::{
    BoundedHistory, DownloadRecord, DownloadResult, DownloadStats, LaunchRecord, LaunchSettings,
    SettingsRecord, HISTORY_LIMIT,
};
pub use store::{JsonFileSettingsStore, MemorySettingsStore, SettingsStore, SETTINGS_FILE};
