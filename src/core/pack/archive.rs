use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::path::Path;

use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

use super::index::{Environment, ModpackIndex, INDEX_FILE_NAME, SUPPORTED_FORMAT_VERSION};
use crate::core::error::{InstallError, InstallResult};
use crate::core::paths::{resolve, safe_relative_path};

const COMMON_OVERRIDES_PREFIX: &str = "overrides/";

/// An override entry scheduled for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedOverride {
    entry: usize,
    relative: String,
}

/// An opened `.mrpack` archive held in memory.
pub struct ModpackArchive {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl ModpackArchive {
    pub fn open(bytes: Vec<u8>) -> InstallResult<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| InstallError::MalformedArchive(format!("not a zip archive: {e}")))?;
        Ok(Self { archive })
    }

    /// Parse the top-level index entry.
    pub fn read_index(&mut self) -> InstallResult<ModpackIndex> {
        let mut raw = String::new();
        {
            let mut file = self.archive.by_name(INDEX_FILE_NAME).map_err(|e| match e {
                ZipError::FileNotFound => {
                    InstallError::MalformedArchive(format!("missing {INDEX_FILE_NAME}"))
                }
                other => InstallError::Zip(other),
            })?;
            file.read_to_string(&mut raw).map_err(|e| {
                InstallError::MalformedArchive(format!("unreadable {INDEX_FILE_NAME}: {e}"))
            })?;
        }

        let index: ModpackIndex = serde_json::from_str(&raw).map_err(|e| {
            InstallError::MalformedArchive(format!("invalid {INDEX_FILE_NAME}: {e}"))
        })?;

        if index.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(InstallError::MalformedArchive(format!(
                "unsupported formatVersion {}",
                index.format_version
            )));
        }

        Ok(index)
    }

    /// Extract `overrides/` and the environment's own override tree into
    /// `output_dir`, returning the relative paths written.
    ///
    /// Every entry is validated before the first byte hits the disk, so an
    /// unsafe path aborts with nothing extracted.
    pub fn extract_overrides(
        &mut self,
        output_dir: &Path,
        env: Environment,
    ) -> InstallResult<BTreeSet<String>> {
        let plan = self.plan_overrides(env)?;
        let mut written = BTreeSet::new();

        for planned in plan {
            let mut zipped = self.archive.by_index(planned.entry)?;
            let dest = resolve(output_dir, &planned.relative);

            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|e| InstallError::io(parent, e))?;
            }
            let mut out = std::fs::File::create(&dest).map_err(|e| InstallError::io(&dest, e))?;
            std::io::copy(&mut zipped, &mut out).map_err(|e| InstallError::io(&dest, e))?;

            debug!("Extracted override {}", planned.relative);
            written.insert(planned.relative);
        }

        info!("Extracted {} override files", written.len());
        Ok(written)
    }

    /// Relative paths `extract_overrides` would write, validated.
    pub fn override_paths(&mut self, env: Environment) -> InstallResult<BTreeSet<String>> {
        Ok(self
            .plan_overrides(env)?
            .into_iter()
            .map(|planned| planned.relative)
            .collect())
    }

    // Common overrides first so environment-specific files overwrite them.
    fn plan_overrides(&mut self, env: Environment) -> InstallResult<Vec<PlannedOverride>> {
        let mut plan = Vec::new();
        for prefix in [COMMON_OVERRIDES_PREFIX, env.overrides_prefix()] {
            for entry in 0..self.archive.len() {
                let file = self.archive.by_index_raw(entry)?;
                if file.is_dir() {
                    continue;
                }
                let Some(rest) = file.name().strip_prefix(prefix) else {
                    continue;
                };
                if rest.is_empty() {
                    continue;
                }
                let relative = safe_relative_path(rest)?;
                plan.push(PlannedOverride { entry, relative });
            }
        }
        Ok(plan)
    }
}
