use std::path::Path;

use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::core::error::{LauncherError, LauncherResult};

/// Expected digest of an artifact, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityHash {
    Sha1(String),
    Sha256(String),
}

impl IntegrityHash {
    /// Accepts `sha1:<hex>`, `sha256:<hex>`, or bare hex (algorithm by length).
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        let trimmed = raw.trim().to_ascii_lowercase();
        let invalid = || LauncherError::InvalidIntegrityHash(raw.to_string());

        let (algorithm, hex_part) = match trimmed.split_once(':') {
            Some((algo, rest)) => (Some(algo.to_string()), rest.to_string()),
            None => (None, trimmed),
        };

        if hex::decode(&hex_part).is_err() {
            return Err(invalid());
        }

        match (algorithm.as_deref(), hex_part.len()) {
            (None | Some("sha1"), 40) => Ok(IntegrityHash::Sha1(hex_part)),
            (None | Some("sha256"), 64) => Ok(IntegrityHash::Sha256(hex_part)),
            _ => Err(invalid()),
        }
    }

    pub fn expected_hex(&self) -> &str {
        match self {
            IntegrityHash::Sha1(h) | IntegrityHash::Sha256(h) => h,
        }
    }

    pub fn hasher(&self) -> IntegrityHasher {
        match self {
            IntegrityHash::Sha1(_) => IntegrityHasher::Sha1(Sha1::new()),
            IntegrityHash::Sha256(_) => IntegrityHasher::Sha256(Sha256::new()),
        }
    }

    pub fn matches(&self, actual_hex: &str) -> bool {
        self.expected_hex() == actual_hex
    }
}

/// Incremental digest fed chunk by chunk during a transfer.
pub enum IntegrityHasher {
    Sha1(Sha1),
    Sha256(Sha256),
}

impl IntegrityHasher {
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            IntegrityHasher::Sha1(h) => h.update(bytes),
            IntegrityHasher::Sha256(h) => h.update(bytes),
        }
    }

    pub fn finalize_hex(self) -> String {
        match self {
            IntegrityHasher::Sha1(h) => hex::encode(h.finalize()),
            IntegrityHasher::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

/// Hash an existing file and compare against `expected`.
pub async fn file_matches(path: &Path, expected: &IntegrityHash) -> LauncherResult<bool> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    let mut hasher = expected.hasher();
    hasher.update(&bytes);
    Ok(expected.matches(&hasher.finalize_hex()))
}
