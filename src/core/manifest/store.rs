// ─── Install manifest ───
// The per-directory record of what the previous successful run installed.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{InstallError, InstallResult};

pub const MANIFEST_ID: &str = "modrinth-modpack";

/// Persisted install record. Sets and maps are ordered so the serialized form
/// of an unchanged install is byte-for-byte identical.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallManifest {
    #[serde(rename = "@type")]
    pub kind: String,
    pub project_slug: Option<String>,
    pub version_id: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub files: BTreeSet<String>,
}

impl InstallManifest {
    /// Baseline for a directory nothing has been installed into yet.
    pub fn empty() -> Self {
        Self::new(None, None, BTreeMap::new(), BTreeSet::new())
    }

    pub fn new(
        project_slug: Option<String>,
        version_id: Option<String>,
        dependencies: BTreeMap<String, String>,
        files: BTreeSet<String>,
    ) -> Self {
        Self {
            kind: MANIFEST_ID.to_string(),
            project_slug,
            version_id,
            dependencies,
            files,
        }
    }
}

/// Reads and atomically replaces the manifest of one output directory.
pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!(".{MANIFEST_ID}-manifest.json"))
    }

    /// Load the manifest, or [`InstallManifest::empty`] when there is none.
    pub fn load(&self) -> InstallResult<InstallManifest> {
        let path = self.path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No manifest at {:?}", path);
                return Ok(InstallManifest::empty());
            }
            Err(e) => return Err(manifest_error(&path, e)),
        };

        let manifest: InstallManifest =
            serde_json::from_str(&raw).map_err(|e| manifest_error(&path, e))?;
        if manifest.kind != MANIFEST_ID {
            return Err(manifest_error(
                &path,
                format!("unexpected manifest type {:?}", manifest.kind),
            ));
        }
        Ok(manifest)
    }

    /// Replace the manifest via write-to-temp-then-rename.
    pub fn save(&self, manifest: &InstallManifest) -> InstallResult<()> {
        let path = self.path();
        std::fs::create_dir_all(&self.dir).map_err(|e| manifest_error(&self.dir, e))?;

        let mut json = serde_json::to_string_pretty(manifest)?;
        json.push('\n');

        let mut temp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| manifest_error(&path, e))?;
        temp.write_all(json.as_bytes())
            .map_err(|e| manifest_error(&path, e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| manifest_error(&path, e))?;
        temp.persist(&path)
            .map_err(|e| manifest_error(&path, e.error))?;

        debug!("Wrote manifest {:?} ({} files)", path, manifest.files.len());
        Ok(())
    }
}

fn manifest_error(path: &Path, reason: impl ToString) -> InstallError {
    InstallError::ManifestIo {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
