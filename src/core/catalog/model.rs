// ─── Catalog Model ───
// Mojang-shaped version entries and loader profiles as ingested from JSON.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Release,
    Snapshot,
    #[serde(alias = "old_beta")]
    Beta,
    #[serde(alias = "old_alpha")]
    Alpha,
}

impl std::fmt::Display for VersionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionKind::Release => write!(f, "release"),
            VersionKind::Snapshot => write!(f, "snapshot"),
            VersionKind::Beta => write!(f, "beta"),
            VersionKind::Alpha => write!(f, "alpha"),
        }
    }
}

/// Immutable identity of a known version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub id: String,
    pub kind: VersionKind,
    pub release_time: DateTime<Utc>,
    pub integrity_hash: Option<String>,
}

/// Whole catalog document: versions plus the loaders they may reference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
    #[serde(default)]
    pub loaders: Vec<LoaderProfile>,
}

/// A single version with everything needed to install and launch it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VersionKind,
    pub release_time: DateTime<Utc>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
    /// Ids of loaders compatible with this version.
    #[serde(default)]
    pub loaders: Vec<String>,
}

impl VersionEntry {
    pub fn descriptor(&self) -> VersionDescriptor {
        VersionDescriptor {
            id: self.id.clone(),
            kind: self.kind,
            release_time: self.release_time,
            integrity_hash: self.sha1.clone(),
        }
    }

    pub fn supports_loader(&self, loader_id: &str) -> bool {
        self.loaders.iter().any(|l| l == loader_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub sha1: Option<String>,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    /// Size of the index document itself.
    #[serde(default)]
    pub size: u64,
    /// Aggregate size of every object the index references.
    #[serde(default)]
    pub total_size: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<serde_json::Value>,
    #[serde(default)]
    pub jvm: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// OS name -> classifier of the native archive, e.g.
    /// `"windows": "natives-windows-${arch}"`.
    #[serde(default)]
    pub natives: HashMap<String, String>,
}

impl LibraryEntry {
    /// Native archive for `os`/`arch`, if the library ships one.
    pub fn native_download(&self, os: &str, arch: &str) -> Option<(String, &LibDownloadArtifact)> {
        let classifier = self
            .natives
            .get(os)?
            .replace("${arch}", if arch == "x86" { "32" } else { "64" });
        let artifact = self.downloads.as_ref()?.classifiers.get(&classifier)?;
        Some((classifier, artifact))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibDownloadArtifact>,
    /// Native archives keyed by classifier (pre-1.19 LWJGL style).
    #[serde(default)]
    pub classifiers: HashMap<String, LibDownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    pub path: String,
    #[serde(default)]
    pub sha1: Option<String>,
    pub size: u64,
    pub url: String,
}

/// An add-on loader (Fabric, Quilt, ...) and the files it layers on top of a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderProfile {
    pub id: String,
    pub version: String,
    /// Game version this profile was built for. Profiles without one apply
    /// to every version that lists the loader.
    #[serde(default)]
    pub game_version: Option<String>,
    pub main_class: String,
    #[serde(default)]
    pub libraries: Vec<LoaderLibrary>,
    /// The loader's own profile document, stored next to the version.
    #[serde(default)]
    pub profile: Option<DownloadArtifact>,
    #[serde(default)]
    pub arguments: Option<LoaderArguments>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderLibrary {
    /// Maven coordinate.
    pub name: String,
    /// Repository base; defaults to the loader's own Maven.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    pub size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderArguments {
    #[serde(default)]
    pub jvm: Vec<String>,
    #[serde(default)]
    pub game: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_version_entry() {
        let json = r#"{
            "id": "1.20.4",
            "type": "release",
            "releaseTime": "2023-12-07T12:56:20+00:00",
            "sha1": "c98adde5094a3041f486b4d42d0386cf87310559",
            "mainClass": "net.minecraft.client.main.Main",
            "loaders": ["fabric"]
        }"#;
        let entry: VersionEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, "1.20.4");
        assert_eq!(entry.kind, VersionKind::Release);
        assert!(entry.supports_loader("fabric"));
        assert!(!entry.supports_loader("forge"));
        assert!(entry.libraries.is_empty());
    }

    #[test]
    fn legacy_kinds_map_to_beta_and_alpha() {
        let beta: VersionKind = serde_json::from_str("\"old_beta\"").unwrap();
        let alpha: VersionKind = serde_json::from_str("\"old_alpha\"").unwrap();
        assert_eq!(beta, VersionKind::Beta);
        assert_eq!(alpha, VersionKind::Alpha);
        assert_eq!(alpha.to_string(), "alpha");
    }

    #[test]
    fn native_classifier_follows_os_and_arch() {
        let lib: LibraryEntry = serde_json::from_value(serde_json::json!({
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
            "natives": { "linux": "natives-linux", "windows": "natives-windows-${arch}" },
            "downloads": {
                "classifiers": {
                    "natives-linux": { "path": "l.jar", "size": 1, "url": "https://x/l.jar" },
                    "natives-windows-64": { "path": "w64.jar", "size": 2, "url": "https://x/w64.jar" },
                    "natives-windows-32": { "path": "w32.jar", "size": 3, "url": "https://x/w32.jar" }
                }
            }
        }))
        .unwrap();

        let (classifier, linux) = lib.native_download("linux", "x86_64").unwrap();
        assert_eq!(classifier, "natives-linux");
        assert_eq!(linux.path, "l.jar");
        assert_eq!(lib.native_download("windows", "x86_64").unwrap().1.path, "w64.jar");
        assert_eq!(lib.native_download("windows", "x86").unwrap().1.path, "w32.jar");
        assert!(lib.native_download("osx", "arm64").is_none());
    }

    #[test]
    fn descriptor_mirrors_entry() {
        let entry: VersionEntry = serde_json::from_value(serde_json::json!({
            "id": "24w10a",
            "type": "snapshot",
            "releaseTime": "2024-03-06T14:43:52+00:00"
        }))
        .unwrap();
        let descriptor = entry.descriptor();
        assert_eq!(descriptor.id, "24w10a");
        assert_eq!(descriptor.kind, VersionKind::Snapshot);
        assert_eq!(descriptor.integrity_hash, None);
    }
}
