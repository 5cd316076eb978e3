use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info};

use super::store::{InstallManifest, ManifestStore};
use crate::core::error::{InstallError, InstallResult};
use crate::core::paths::{resolve, safe_relative_path};

/// Paths removed while reconciling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<String>,
}

/// Removes files the previous install managed but the new one does not, then
/// records the new manifest.
pub struct Reconciler<'a> {
    output_dir: &'a Path,
    store: &'a ManifestStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(output_dir: &'a Path, store: &'a ManifestStore) -> Self {
        Self { output_dir, store }
    }

    /// Remove previously managed files that sit where an incoming path needs
    /// a directory, e.g. an old `config` file when `config/a.toml` arrives.
    ///
    /// `incoming` must already be normalized.
    pub fn clear_blocking_files(
        &self,
        prior: &InstallManifest,
        incoming: &BTreeSet<String>,
    ) -> InstallResult<Vec<String>> {
        let mut cleared = Vec::new();
        for path in incoming {
            let ancestors = path.match_indices('/').map(|(i, _)| &path[..i]);
            for ancestor in ancestors {
                if !prior.files.contains(ancestor) || incoming.contains(ancestor) {
                    continue;
                }
                let dest = resolve(self.output_dir, ancestor);
                if !dest.is_file() {
                    continue;
                }
                std::fs::remove_file(&dest).map_err(|e| InstallError::io(&dest, e))?;
                debug!("Removed {} to make room for {}", ancestor, path);
                cleared.push(ancestor.to_string());
            }
        }
        Ok(cleared)
    }

    pub fn reconcile(
        &self,
        prior: &InstallManifest,
        next: &InstallManifest,
    ) -> InstallResult<ReconcileReport> {
        let stale: Vec<&String> = prior.files.difference(&next.files).collect();

        // A hand-edited manifest must not steer deletions outside the tree.
        let targets = stale
            .iter()
            .map(|path| safe_relative_path(path))
            .collect::<InstallResult<Vec<_>>>()?;

        let mut report = ReconcileReport::default();
        for relative in targets {
            let dest = resolve(self.output_dir, &relative);
            if dest.is_dir() {
                debug!("Stale file {} was replaced by a directory", relative);
                report.removed.push(relative);
                continue;
            }
            match std::fs::remove_file(&dest) {
                Ok(()) => debug!("Removed stale file {}", relative),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Stale file {} already gone", relative)
                }
                Err(e) => return Err(InstallError::io(dest, e)),
            }
            report.removed.push(relative);
        }

        self.store.save(next)?;

        info!(
            "Reconciled {:?}: {} managed, {} removed",
            self.output_dir,
            next.files.len(),
            report.removed.len()
        );
        Ok(report)
    }
}
