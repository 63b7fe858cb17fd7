use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the install/launch core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── Resolution ──────────────────────────────────────
    #[error("Unknown version: {0}")]
    UnknownVersion(String),

    #[error("Loader {loader} is not available for version {version}")]
    UnknownLoader { version: String, loader: String },

    // ── Download ────────────────────────────────────────
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Integrity mismatch for {path:?}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Size mismatch for {path:?}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("No progress on {url} for {after_ms}ms")]
    StallTimeout { url: String, after_ms: u64 },

    #[error("Transfer cancelled")]
    Cancelled,

    #[error("Illegal task transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid integrity hash: {0}")]
    InvalidIntegrityHash(String),

    // ── Build ───────────────────────────────────────────
    #[error("Entry point missing for {0}")]
    MissingEntryPoint(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("No active identity")]
    NoActiveIdentity,

    // ── Coordinator ─────────────────────────────────────
    #[error("Install of {version} incomplete: {} artifact(s) failed", failed.len())]
    IncompleteInstall {
        version: String,
        failed: Vec<PathBuf>,
    },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Process launch failed: {0}")]
    ProcessLaunch(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Download-time failure classes. Everything else aborts synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    IntegrityMismatch,
    StallTimeout,
}

impl LauncherError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify a download-time error. Resolution and build errors return `None`.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            LauncherError::Transport { .. }
            | LauncherError::DownloadFailed { .. }
            | LauncherError::Http(_)
            | LauncherError::Io { .. } => Some(FailureKind::Transport),
            LauncherError::IntegrityMismatch { .. }
            | LauncherError::SizeMismatch { .. }
            | LauncherError::InvalidIntegrityHash(_) => Some(FailureKind::IntegrityMismatch),
            LauncherError::StallTimeout { .. } => Some(FailureKind::StallTimeout),
            _ => None,
        }
    }

    /// A malformed expected hash fails every attempt, so it is not retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LauncherError::InvalidIntegrityHash(_)) && self.failure_kind().is_some()
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
