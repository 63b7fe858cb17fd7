// ─── Dependency Resolver ───
// Expands a catalog entry (plus optional loader) into a flat artifact manifest.

mod manifest;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::catalog::{
    parse_legacy, parse_strings, parse_template, rules_allow, ArgumentToken, ArtifactCatalog,
    LoaderProfile, Platform, VersionEntry,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{self, MavenArtifact};

pub use manifest::{ArtifactKind, ArtifactRef, AssetIndexRef, ResolvedManifest, RuntimeMetadata};

/// Pure resolver over an immutable catalog. Safe to share across threads.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    catalog: Arc<ArtifactCatalog>,
    platform: Platform,
}

impl DependencyResolver {
    pub fn new(catalog: Arc<ArtifactCatalog>) -> Self {
        Self {
            catalog,
            platform: Platform::current(),
        }
    }

    /// Evaluate OS rules against `platform` instead of the host.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn catalog(&self) -> &ArtifactCatalog {
        &self.catalog
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn resolve(
        &self,
        version_id: &str,
        loader_id: Option<&str>,
    ) -> LauncherResult<ResolvedManifest> {
        let entry = self
            .catalog
            .find_version(version_id)
            .ok_or_else(|| LauncherError::UnknownVersion(version_id.to_string()))?;

        let loader = match loader_id {
            Some(id) => Some(self.compatible_loader(entry, id)?),
            None => None,
        };

        let version_name = match loader {
            Some(l) => format!("{}-{}-{}", entry.id, l.id, l.version),
            None => entry.id.clone(),
        };

        let mut candidates = self.version_artifacts(entry);
        if let Some(loader) = loader {
            candidates.extend(loader_artifacts(loader, &version_name)?);
        }

        // Version-declared artifacts come first, so they win path collisions.
        let mut seen = HashSet::new();
        let artifacts: Vec<ArtifactRef> = candidates
            .into_iter()
            .filter(|a| {
                let fresh = seen.insert(a.target_path.clone());
                if !fresh {
                    debug!("Dropping duplicate artifact {:?}", a.target_path);
                }
                fresh
            })
            .collect();
        let total_bytes = artifacts.iter().map(|a| a.size_bytes).sum();

        let runtime_metadata = self.runtime_metadata(entry, loader, version_name);

        Ok(ResolvedManifest {
            version_id: entry.id.clone(),
            loader_id: loader.map(|l| l.id.clone()),
            artifacts,
            total_bytes,
            runtime_metadata,
        })
    }

    fn compatible_loader(&self, entry: &VersionEntry, loader_id: &str) -> LauncherResult<&LoaderProfile> {
        let unknown = || LauncherError::UnknownLoader {
            version: entry.id.clone(),
            loader: loader_id.to_string(),
        };
        if !entry.supports_loader(loader_id) {
            return Err(unknown());
        }
        self.catalog.loader(loader_id, &entry.id).ok_or_else(unknown)
    }

    fn version_artifacts(&self, entry: &VersionEntry) -> Vec<ArtifactRef> {
        let mut artifacts = Vec::new();

        if let Some(client) = entry.downloads.as_ref().and_then(|d| d.client.as_ref()) {
            artifacts.push(ArtifactRef {
                url: client.url.clone(),
                target_path: PathBuf::from("versions")
                    .join(&entry.id)
                    .join(format!("{}.jar", entry.id)),
                size_bytes: client.size,
                integrity_hash: client.sha1.clone(),
                kind: ArtifactKind::Binary,
            });
        }

        for lib in &entry.libraries {
            if !rules_allow(&lib.rules, &self.platform) {
                debug!("Skipping library (OS rule): {}", lib.name);
                continue;
            }
            let jar = lib.downloads.as_ref().and_then(|d| d.artifact.as_ref());
            let native = lib.native_download(&self.platform.os, &self.platform.arch);
            if jar.is_none() && native.is_none() {
                warn!("Library {} has no downloadable artifact", lib.name);
                continue;
            }

            if let Some(artifact) = jar {
                artifacts.push(ArtifactRef {
                    url: artifact.url.clone(),
                    target_path: PathBuf::from("libraries").join(&artifact.path),
                    size_bytes: artifact.size,
                    integrity_hash: artifact.sha1.clone(),
                    kind: ArtifactKind::Library,
                });
            }

            if let Some((classifier, artifact)) = native {
                debug!("Native {} for {}", classifier, lib.name);
                artifacts.push(ArtifactRef {
                    url: artifact.url.clone(),
                    target_path: PathBuf::from("libraries").join(&artifact.path),
                    size_bytes: artifact.size,
                    integrity_hash: artifact.sha1.clone(),
                    kind: ArtifactKind::Natives,
                });
            }
        }

        if let Some(index) = &entry.asset_index {
            artifacts.push(ArtifactRef {
                url: index.url.clone(),
                target_path: asset_index_path(&index.id),
                size_bytes: index.total_size,
                integrity_hash: index.sha1.clone(),
                kind: ArtifactKind::AssetBundle,
            });
        }

        artifacts
    }

    fn runtime_metadata(
        &self,
        entry: &VersionEntry,
        loader: Option<&LoaderProfile>,
        version_name: String,
    ) -> RuntimeMetadata {
        let (mut jvm_template, mut game_template) = match (&entry.arguments, &entry.minecraft_arguments) {
            (Some(args), _) => (
                parse_template(&args.jvm, &self.platform),
                parse_template(&args.game, &self.platform),
            ),
            (None, Some(legacy)) => (legacy_jvm_template(), parse_legacy(legacy)),
            (None, None) => (legacy_jvm_template(), Vec::new()),
        };

        if let Some(args) = loader.and_then(|l| l.arguments.as_ref()) {
            jvm_template.extend(parse_strings(&args.jvm));
            game_template.extend(parse_strings(&args.game));
        }

        let entry_point = match loader {
            Some(l) => Some(l.main_class.clone()),
            None => entry.main_class.clone(),
        };

        RuntimeMetadata {
            entry_point,
            version_name,
            version_kind: entry.kind,
            jvm_template,
            game_template,
            asset_index: entry.asset_index.as_ref().map(|index| AssetIndexRef {
                id: index.id.clone(),
                url: index.url.clone(),
                sha1: index.sha1.clone(),
                size: index.size,
                total_size: index.total_size,
            }),
            java_major: entry.java_version.as_ref().map(|j| j.major_version),
        }
    }
}

pub fn asset_index_path(index_id: &str) -> PathBuf {
    PathBuf::from("assets")
        .join("indexes")
        .join(format!("{}.json", index_id))
}

fn loader_artifacts(loader: &LoaderProfile, version_name: &str) -> LauncherResult<Vec<ArtifactRef>> {
    let mut artifacts = Vec::with_capacity(loader.libraries.len() + 1);

    for lib in &loader.libraries {
        let artifact = MavenArtifact::parse(&lib.name)?;
        let repo = lib
            .url
            .as_deref()
            .unwrap_or_else(|| maven::default_repository(&loader.id));
        artifacts.push(ArtifactRef {
            url: artifact.url(repo),
            target_path: PathBuf::from("libraries").join(artifact.local_path()),
            size_bytes: lib.size,
            integrity_hash: lib.sha1.clone(),
            kind: ArtifactKind::Library,
        });
    }

    if let Some(profile) = &loader.profile {
        artifacts.push(ArtifactRef {
            url: profile.url.clone(),
            target_path: PathBuf::from("versions")
                .join(version_name)
                .join(format!("{}.json", version_name)),
            size_bytes: profile.size,
            integrity_hash: profile.sha1.clone(),
            kind: ArtifactKind::LoaderComponent,
        });
    }

    Ok(artifacts)
}

/// Runtime template used by versions that predate `arguments.jvm`.
fn legacy_jvm_template() -> Vec<ArgumentToken> {
    vec![ArgumentToken::parse("-Djava.library.path=${natives_directory}")]
}
