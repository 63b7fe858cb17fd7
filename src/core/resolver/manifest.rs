use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::catalog::{ArgumentToken, VersionKind};

/// What an artifact is used for once installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// The version's client binary.
    Binary,
    /// A jar that joins the runtime search path.
    Library,
    /// An asset index. `size_bytes` is the aggregate size of every object
    /// it references; the orchestrator expands it into per-object artifacts.
    AssetBundle,
    /// Loader files that are installed but not put on the search path.
    LoaderComponent,
    /// Native archive unpacked into the natives directory before launch.
    Natives,
}

/// One downloadable unit. Target paths are relative to the install root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub url: String,
    pub target_path: PathBuf,
    pub size_bytes: u64,
    /// `<hex>` (SHA-1 or SHA-256 by length) or `sha1:<hex>` / `sha256:<hex>`.
    pub integrity_hash: Option<String>,
    pub kind: ArtifactKind,
}

impl ArtifactRef {
    pub fn on_search_path(&self) -> bool {
        matches!(self.kind, ArtifactKind::Binary | ArtifactKind::Library)
    }

    pub fn file_name(&self) -> String {
        self.target_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Asset index details kept for expansion and for `${assets_index_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    pub sha1: Option<String>,
    /// Size of the index document.
    pub size: u64,
    pub total_size: u64,
}

/// Launch-relevant metadata carried alongside the artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMetadata {
    /// Main class; the loader's when a loader is selected.
    pub entry_point: Option<String>,
    /// `<version>` or `<version>-<loader>-<loaderVersion>`.
    pub version_name: String,
    pub version_kind: VersionKind,
    pub jvm_template: Vec<ArgumentToken>,
    pub game_template: Vec<ArgumentToken>,
    pub asset_index: Option<AssetIndexRef>,
    pub java_major: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedManifest {
    pub version_id: String,
    pub loader_id: Option<String>,
    pub artifacts: Vec<ArtifactRef>,
    pub total_bytes: u64,
    pub runtime_metadata: RuntimeMetadata,
}

impl ResolvedManifest {
    pub fn artifacts_of_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &ArtifactRef> {
        self.artifacts.iter().filter(move |a| a.kind == kind)
    }

    pub fn search_path_artifacts(&self) -> impl Iterator<Item = &ArtifactRef> {
        self.artifacts.iter().filter(|a| a.on_search_path())
    }

    pub fn asset_bundle(&self) -> Option<&ArtifactRef> {
        self.artifacts_of_kind(ArtifactKind::AssetBundle).next()
    }
}
