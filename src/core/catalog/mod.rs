// ─── Artifact Catalog ───
// Known versions and loaders, ingested once and queried by the resolver.

mod model;
mod rules;
mod template;

use std::collections::HashMap;

use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};

pub use model::{
    Arguments, AssetIndexInfo, CatalogDocument, DownloadArtifact, JavaVersionInfo,
    LibDownloadArtifact, LibraryDownloads, LibraryEntry, LoaderArguments, LoaderLibrary,
    LoaderProfile, VersionDescriptor, VersionDownloads, VersionEntry, VersionKind,
};
pub use rules::{rules_allow, OsRule, Platform, Rule, RuleAction};
pub use template::{parse_legacy, parse_strings, parse_template, ArgumentToken, TemplatePart};

/// Immutable index over a catalog document.
#[derive(Debug, Clone, Default)]
pub struct ArtifactCatalog {
    versions: Vec<VersionEntry>,
    by_id: HashMap<String, usize>,
    /// Keyed by (loader id, game version); `None` matches any version.
    loaders: HashMap<(String, Option<String>), LoaderProfile>,
}

impl ArtifactCatalog {
    pub fn from_document(document: CatalogDocument) -> Self {
        let mut versions = Vec::with_capacity(document.versions.len());
        let mut by_id = HashMap::new();

        for entry in document.versions {
            if by_id.contains_key(&entry.id) {
                warn!("Duplicate catalog version {} ignored", entry.id);
                continue;
            }
            by_id.insert(entry.id.clone(), versions.len());
            versions.push(entry);
        }

        let mut loaders = HashMap::new();
        for loader in document.loaders {
            let key = (loader.id.clone(), loader.game_version.clone());
            if loaders.contains_key(&key) {
                warn!(
                    "Duplicate catalog loader {} ({}) ignored",
                    loader.id,
                    loader.game_version.as_deref().unwrap_or("any version")
                );
                continue;
            }
            loaders.insert(key, loader);
        }

        Self {
            versions,
            by_id,
            loaders,
        }
    }

    pub fn from_json(raw: &str) -> LauncherResult<Self> {
        let document: CatalogDocument = serde_json::from_str(raw)?;
        Ok(Self::from_document(document))
    }

    /// Fetch and ingest a catalog document using a shared client.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<Self> {
        info!("Fetching artifact catalog from {}", url);

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let catalog = Self::from_json(&response.text().await?)?;
        info!(
            "Loaded {} versions and {} loaders",
            catalog.versions.len(),
            catalog.loaders.len()
        );
        Ok(catalog)
    }

    /// Find a specific version entry by id (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.by_id.get(id).map(|&idx| &self.versions[idx])
    }

    /// Profile of loader `id` for `game_version`, falling back to the
    /// version-independent profile.
    pub fn loader(&self, id: &str, game_version: &str) -> Option<&LoaderProfile> {
        self.loaders
            .get(&(id.to_string(), Some(game_version.to_string())))
            .or_else(|| self.loaders.get(&(id.to_string(), None)))
    }

    /// Descriptors in catalog order.
    pub fn versions(&self) -> Vec<VersionDescriptor> {
        self.versions.iter().map(VersionEntry::descriptor).collect()
    }

    pub fn releases(&self) -> Vec<VersionDescriptor> {
        self.versions
            .iter()
            .filter(|v| v.kind == VersionKind::Release)
            .map(VersionEntry::descriptor)
            .collect()
    }

    pub fn latest_release(&self) -> Option<VersionDescriptor> {
        self.versions
            .iter()
            .filter(|v| v.kind == VersionKind::Release)
            .max_by_key(|v| v.release_time)
            .map(VersionEntry::descriptor)
    }

    /// Loaders listed by the version that the catalog also knows about.
    pub fn compatible_loaders(&self, version_id: &str) -> Vec<&LoaderProfile> {
        self.find_version(version_id)
            .map(|entry| {
                entry
                    .loaders
                    .iter()
                    .filter_map(|id| self.loader(id, version_id))
                    .collect()
            })
            .unwrap_or_default()
    }
}
