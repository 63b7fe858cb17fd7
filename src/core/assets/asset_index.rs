use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::resolver::{ArtifactKind, ArtifactRef};

/// Top-level asset index JSON structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetIndex {
    /// Keyed by logical name. Ordered so expansion is deterministic.
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetIndex {
    pub fn from_json(raw: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub async fn load(path: &std::path::Path) -> LauncherResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        Self::from_json(&raw)
    }

    /// Sum of every distinct object's size.
    pub fn total_size(&self) -> u64 {
        self.unique_objects().map(|o| o.size).sum()
    }

    /// One `AssetBundle` artifact per distinct object hash, stored at
    /// `assets/objects/<hh>/<hash>` and fetched from `<base_url>/<hh>/<hash>`.
    pub fn object_artifacts(&self, base_url: &str) -> LauncherResult<Vec<ArtifactRef>> {
        let base = base_url.trim_end_matches('/');
        self.unique_objects()
            .map(|obj| {
                let prefix = obj
                    .hash
                    .get(..2)
                    .ok_or_else(|| LauncherError::InvalidIntegrityHash(obj.hash.clone()))?;
                Ok(ArtifactRef {
                    url: format!("{}/{}/{}", base, prefix, obj.hash),
                    target_path: PathBuf::from("assets")
                        .join("objects")
                        .join(prefix)
                        .join(&obj.hash),
                    size_bytes: obj.size,
                    integrity_hash: Some(obj.hash.clone()),
                    kind: ArtifactKind::AssetBundle,
                })
            })
            .collect()
    }

    // Several names may point at the same blob.
    fn unique_objects(&self) -> impl Iterator<Item = &AssetObject> {
        let mut seen = HashSet::new();
        self.objects
            .values()
            .filter(move |obj| seen.insert(obj.hash.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "objects": {
            "minecraft/sounds/ambient/cave/cave1.ogg": {"hash": "ab12000000000000000000000000000000000001", "size": 100},
            "icons/icon_16x16.png": {"hash": "cd34000000000000000000000000000000000002", "size": 20},
            "icons/copy_of_icon.png": {"hash": "cd34000000000000000000000000000000000002", "size": 20}
        }
    }"#;

    #[test]
    fn expands_objects_into_hash_addressed_artifacts() {
        let index = AssetIndex::from_json(INDEX).unwrap();
        let artifacts = index.object_artifacts("https://resources.example/").unwrap();

        assert_eq!(artifacts.len(), 2);
        // BTreeMap order: "icons/..." before "minecraft/..."
        assert_eq!(
            artifacts[0].url,
            "https://resources.example/cd/cd34000000000000000000000000000000000002"
        );
        assert_eq!(
            artifacts[0].target_path,
            PathBuf::from("assets/objects/cd/cd34000000000000000000000000000000000002")
        );
        assert_eq!(artifacts[1].size_bytes, 100);
        assert!(artifacts.iter().all(|a| a.kind == ArtifactKind::AssetBundle));
        assert_eq!(index.total_size(), 120);
    }

    #[test]
    fn short_hash_is_rejected() {
        let index = AssetIndex::from_json(r#"{"objects": {"x": {"hash": "a", "size": 1}}}"#).unwrap();
        assert!(index.object_artifacts("https://r").is_err());
    }
}
