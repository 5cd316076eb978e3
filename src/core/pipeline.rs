// ─── Install pipeline ───
// resolve → fetch → extract → install → reconcile, for one output directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::downloader::Transport;
use crate::core::error::{InstallError, InstallResult, Stage, StageError};
use crate::core::fetcher::PackFetcher;
use crate::core::installer::{FileFilter, FileInstaller, DEFAULT_CONCURRENCY};
use crate::core::manifest::{InstallManifest, ManifestStore, Reconciler};
use crate::core::pack::{Environment, ModpackArchive, ModpackIndex};
use crate::core::paths::safe_relative_path;
use crate::core::registry::{Loader, Registry, VersionType};
use crate::core::resolver::{Resolution, VersionRequest, VersionResolver};

/// Fully resolved configuration of one install run.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub output_dir: PathBuf,
    /// Project slug or id, or a direct archive URL.
    pub project: String,
    pub version: Option<String>,
    pub loader: Loader,
    pub min_version_type: Option<VersionType>,
    pub environment: Environment,
    pub exclude_optional: bool,
    pub exclude_files: Vec<String>,
    pub force_synchronize: bool,
    pub concurrency: usize,
    /// Optional `KEY=value` summary for later build steps.
    pub results_file: Option<PathBuf>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            project: String::new(),
            version: None,
            loader: Loader::Any,
            min_version_type: None,
            environment: Environment::Server,
            exclude_optional: false,
            exclude_files: Vec::new(),
            force_synchronize: false,
            concurrency: DEFAULT_CONCURRENCY,
            results_file: None,
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub manifest: InstallManifest,
    pub removed: Vec<String>,
    pub overrides: usize,
    pub downloaded: usize,
    pub reused: usize,
    pub skipped: usize,
}

/// Run the whole pipeline. The manifest only advances when every stage
/// before reconciliation succeeded.
pub async fn install(
    options: &InstallOptions,
    registry: &dyn Registry,
    transport: &dyn Transport,
) -> Result<InstallOutcome, StageError> {
    let output_dir = options.output_dir.as_path();
    let store = ManifestStore::new(output_dir);
    let prior = store.load().map_err(Stage::Reconcile.tag())?;

    let filter = FileFilter {
        environment: options.environment,
        exclude_optional: options.exclude_optional,
        excludes: Vec::new(),
    }
    .with_exclude_patterns(&options.exclude_files)
    .map_err(Stage::Install.tag())?;

    // 1. Resolve
    let request = VersionRequest {
        project: &options.project,
        version: options.version.as_deref(),
        loader: options.loader,
        min_version_type: options.min_version_type,
    };
    let resolution = VersionResolver::new(registry)
        .resolve(&request)
        .await
        .map_err(Stage::Resolve.tag())?;

    // 2. Fetch
    let archive_bytes = PackFetcher::new(transport)
        .fetch(&resolution)
        .await
        .map_err(Stage::Fetch.tag())?;

    // 3. Extract index and overrides
    let (index, overrides) = extract(archive_bytes, options, &store, &prior)
        .map_err(Stage::Extract.tag())?;
    info!(
        "Modpack {} {} with {} files",
        index.name,
        index.version_id,
        index.files.len()
    );

    // 4. Install indexed files
    let installed = FileInstaller::new(transport, output_dir, &filter)
        .with_concurrency(options.concurrency)
        .force_synchronize(options.force_synchronize)
        .install(&index.files)
        .await
        .map_err(Stage::Install.tag())?;

    // 5. Reconcile
    let mut managed = overrides;
    let override_count = managed.len();
    managed.extend(installed.managed);

    let (project_slug, version_id) = match &resolution {
        Resolution::Registry { project, version } => {
            (Some(project.slug.clone()), Some(version.id.clone()))
        }
        Resolution::DirectUrl(_) => (None, None),
    };
    let next = InstallManifest::new(project_slug, version_id, index.dependencies, managed);

    // Written first so a failure here leaves the prior manifest in charge.
    if let Some(results_file) = &options.results_file {
        write_results(results_file, &next).map_err(Stage::Reconcile.tag())?;
    }

    let report = Reconciler::new(output_dir, &store)
        .reconcile(&prior, &next)
        .map_err(Stage::Reconcile.tag())?;

    Ok(InstallOutcome {
        manifest: next,
        removed: report.removed,
        overrides: override_count,
        downloaded: installed.downloaded,
        reused: installed.reused,
        skipped: installed.skipped,
    })
}

fn extract(
    archive_bytes: Vec<u8>,
    options: &InstallOptions,
    store: &ManifestStore,
    prior: &InstallManifest,
) -> InstallResult<(ModpackIndex, BTreeSet<String>)> {
    let output_dir = options.output_dir.as_path();
    let mut archive = ModpackArchive::open(archive_bytes)?;
    let index = archive.read_index()?;
    check_index_loader(&index, options.loader)?;

    // Every destination, indexed or override, is checked before the first write.
    let mut incoming = index
        .files
        .iter()
        .map(|file| safe_relative_path(&file.path))
        .collect::<InstallResult<BTreeSet<_>>>()?;
    incoming.extend(archive.override_paths(options.environment)?);

    std::fs::create_dir_all(output_dir).map_err(|e| InstallError::io(output_dir, e))?;
    Reconciler::new(output_dir, store).clear_blocking_files(prior, &incoming)?;

    let overrides = archive.extract_overrides(output_dir, options.environment)?;
    Ok((index, overrides))
}

/// A requested loader must be among the loaders the pack itself depends on.
fn check_index_loader(index: &ModpackIndex, loader: Loader) -> InstallResult<()> {
    let declared = index.loaders();
    if loader == Loader::Any || declared.is_empty() {
        return Ok(());
    }
    if declared.iter().any(|(l, _)| *l == loader) {
        return Ok(());
    }
    Err(InstallError::IncompatibleLoader {
        version: index.version_id.clone(),
        loader,
        available: declared
            .iter()
            .map(|(l, _)| l.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Write `KEY=value` lines describing what was installed.
fn write_results(path: &Path, manifest: &InstallManifest) -> InstallResult<()> {
    let mut lines = Vec::new();
    if let Some(slug) = &manifest.project_slug {
        lines.push(format!("MODPACK_PROJECT={slug}"));
    }
    if let Some(version_id) = &manifest.version_id {
        lines.push(format!("MODPACK_VERSION_ID={version_id}"));
    }
    if let Some(minecraft) = manifest.dependencies.get("minecraft") {
        lines.push(format!("MINECRAFT_VERSION={minecraft}"));
    }
    let loader = Loader::CONCRETE.iter().find_map(|loader| {
        let key = loader.dependency_key()?;
        manifest.dependencies.get(key).map(|v| (loader, v))
    });
    if let Some((loader, version)) = loader {
        lines.push(format!("LOADER={loader}"));
        lines.push(format!("LOADER_VERSION={version}"));
    }

    let mut body = lines.join("\n");
    body.push('\n');
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| InstallError::io(parent, e))?;
    }
    std::fs::write(path, body).map_err(|e| InstallError::io(path, e))
}
