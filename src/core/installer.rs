use std::collections::BTreeSet;
use std::path::Path;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use glob::Pattern;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::downloader::{integrity, Transport};
use crate::core::error::{FetchAttempt, InstallError, InstallResult};
use crate::core::pack::{Environment, ModpackFile, Requirement};
use crate::core::paths::{resolve, safe_relative_path};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Decides which index entries this install manages.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub environment: Environment,
    pub exclude_optional: bool,
    pub excludes: Vec<Pattern>,
}

impl FileFilter {
    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> InstallResult<Self> {
        for pattern in patterns {
            let compiled = Pattern::new(pattern).map_err(|source| InstallError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            self.excludes.push(compiled);
        }
        Ok(self)
    }

    /// `relative` must already be normalized.
    pub fn wants(&self, relative: &str, file: &ModpackFile) -> bool {
        match file.requirement(self.environment) {
            Requirement::Unsupported => return false,
            Requirement::Optional if self.exclude_optional => return false,
            _ => {}
        }

        let file_name = relative.rsplit('/').next().unwrap_or(relative);
        !self
            .excludes
            .iter()
            .any(|p| p.matches(relative) || p.matches(file_name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FileOutcome {
    Downloaded(String),
    Reused(String),
    Skipped,
}

/// What the installer did, and the set of paths it now manages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledFiles {
    pub managed: BTreeSet<String>,
    pub downloaded: usize,
    pub reused: usize,
    pub skipped: usize,
}

impl InstalledFiles {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Downloaded(path) => {
                self.downloaded += 1;
                self.managed.insert(path);
            }
            FileOutcome::Reused(path) => {
                self.reused += 1;
                self.managed.insert(path);
            }
            FileOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Concurrent, hash-verified installer for indexed pack files.
pub struct FileInstaller<'a> {
    transport: &'a dyn Transport,
    output_dir: &'a Path,
    filter: &'a FileFilter,
    /// Maximum number of parallel downloads.
    concurrency: usize,
    force_synchronize: bool,
}

impl<'a> FileInstaller<'a> {
    pub fn new(transport: &'a dyn Transport, output_dir: &'a Path, filter: &'a FileFilter) -> Self {
        Self {
            transport,
            output_dir,
            filter,
            concurrency: DEFAULT_CONCURRENCY,
            force_synchronize: false,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Re-download even when the file on disk already matches its hashes.
    pub fn force_synchronize(mut self, force: bool) -> Self {
        self.force_synchronize = force;
        self
    }

    /// Install every applicable file. The first failure aborts the batch.
    pub async fn install(&self, files: &[ModpackFile]) -> InstallResult<InstalledFiles> {
        // Validate every destination before any download starts.
        let planned = files
            .iter()
            .map(|file| Ok::<_, InstallError>((safe_relative_path(&file.path)?, file)))
            .collect::<InstallResult<Vec<_>>>()?;

        info!(
            "Installing {} pack files, concurrency={}",
            planned.len(),
            self.concurrency
        );

        let outcomes: Vec<FileOutcome> = stream::iter(planned)
            .map(|(relative, file)| self.install_one(relative, file))
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let mut installed = InstalledFiles::default();
        for outcome in outcomes {
            installed.record(outcome);
        }

        info!(
            "Pack files: {} downloaded, {} already current, {} skipped",
            installed.downloaded, installed.reused, installed.skipped
        );
        Ok(installed)
    }

    async fn install_one(&self, relative: String, file: &ModpackFile) -> InstallResult<FileOutcome> {
        if !self.filter.wants(&relative, file) {
            debug!("Skipping {}", relative);
            return Ok(FileOutcome::Skipped);
        }

        let dest = resolve(self.output_dir, &relative);
        if !self.force_synchronize && is_current(&dest, file).await {
            debug!("Up to date: {}", relative);
            return Ok(FileOutcome::Reused(relative));
        }

        let bytes = self.download_first(&relative, &file.downloads).await?;
        integrity::verify(&relative, &bytes, &file.hashes)?;
        write_file(&dest, &bytes).await?;

        debug!("Installed {} ({} bytes)", relative, bytes.len());
        Ok(FileOutcome::Downloaded(relative))
    }

    /// Try each location in order; the first success wins.
    async fn download_first(&self, relative: &str, downloads: &[String]) -> InstallResult<Vec<u8>> {
        let mut attempts = Vec::new();
        for url in downloads {
            match self.transport.get(url).await {
                Ok(fetched) => return Ok(fetched.bytes),
                Err(e) => {
                    warn!("Download of {} from {} failed: {}", relative, url, e);
                    attempts.push(FetchAttempt {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Err(InstallError::AllSourcesFailed {
            path: relative.to_string(),
            attempts,
        })
    }
}

async fn is_current(dest: &Path, file: &ModpackFile) -> bool {
    match tokio::fs::read(dest).await {
        Ok(existing) => integrity::matches(&existing, &file.hashes),
        Err(_) => false,
    }
}

async fn write_file(dest: &Path, bytes: &[u8]) -> InstallResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InstallError::io(parent, e))?;
    }

    // Scoped so the handle is closed before the next stage touches the file.
    {
        let mut out = tokio::fs::File::create(dest)
            .await
            .map_err(|e| InstallError::io(dest, e))?;
        out.write_all(bytes)
            .await
            .map_err(|e| InstallError::io(dest, e))?;
        out.flush().await.map_err(|e| InstallError::io(dest, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::core::downloader::Fetched;
    use crate::core::pack::FileEnv;

    /// Serves fixed bodies; unknown URLs answer 404. Records every request.
    #[derive(Default)]
    struct StaticTransport {
        bodies: HashMap<String, Vec<u8>>,
        requests: Mutex<Vec<String>>,
    }

    impl StaticTransport {
        fn serving(pairs: &[(&str, &str)]) -> Self {
            Self {
                bodies: pairs
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.as_bytes().to_vec()))
                    .collect(),
                requests: Mutex::default(),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn get(&self, url: &str) -> InstallResult<Fetched> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.bodies.get(url) {
                Some(bytes) => Ok(Fetched {
                    bytes: bytes.clone(),
                    content_type: None,
                }),
                None => Err(InstallError::DownloadFailed {
                    url: url.to_string(),
                    reason: "HTTP 404".into(),
                }),
            }
        }
    }

    fn pack_file(path: &str, body: &str, downloads: &[&str]) -> ModpackFile {
        ModpackFile {
            path: path.into(),
            hashes: BTreeMap::from([(
                "sha512".to_string(),
                integrity::digest_hex("sha512", body.as_bytes()).unwrap(),
            )]),
            env: None,
            downloads: downloads.iter().map(|d| d.to_string()).collect(),
            file_size: Some(body.len() as u64),
        }
    }

    #[tokio::test]
    async fn falls_back_to_later_download_locations() {
        let transport = StaticTransport::serving(&[("https://mirror.example/a.jar", "jar a")]);
        let dir = tempfile::tempdir().unwrap();
        let filter = FileFilter::default();
        let files = vec![pack_file(
            "mods/a.jar",
            "jar a",
            &["https://cdn.example/a.jar", "https://mirror.example/a.jar"],
        )];

        let installed = FileInstaller::new(&transport, dir.path(), &filter)
            .install(&files)
            .await
            .unwrap();

        assert_eq!(installed.managed, BTreeSet::from(["mods/a.jar".to_string()]));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("mods/a.jar")).unwrap(),
            "jar a"
        );
    }

    #[tokio::test]
    async fn every_failed_location_is_reported() {
        let transport = StaticTransport::default();
        let dir = tempfile::tempdir().unwrap();
        let filter = FileFilter::default();
        let files = vec![pack_file(
            "mods/a.jar",
            "jar a",
            &["https://cdn.example/a.jar", "https://mirror.example/a.jar"],
        )];

        let err = FileInstaller::new(&transport, dir.path(), &filter)
            .install(&files)
            .await
            .unwrap_err();

        match err {
            InstallError::AllSourcesFailed { path, attempts } => {
                assert_eq!(path, "mods/a.jar");
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[1].url, "https://mirror.example/a.jar");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn hash_mismatch_aborts() {
        let transport = StaticTransport::serving(&[("https://cdn.example/a.jar", "tampered")]);
        let dir = tempfile::tempdir().unwrap();
        let filter = FileFilter::default();
        let files = vec![pack_file("mods/a.jar", "jar a", &["https://cdn.example/a.jar"])];

        let err = FileInstaller::new(&transport, dir.path(), &filter)
            .install(&files)
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::IntegrityCheckFailed { .. }));
        assert!(!dir.path().join("mods/a.jar").exists());
    }

    #[tokio::test]
    async fn unsupported_optional_and_excluded_files_are_not_managed() {
        let transport = StaticTransport::serving(&[
            ("https://cdn.example/client.jar", "client"),
            ("https://cdn.example/optional.jar", "optional"),
            ("https://cdn.example/shaders.jar", "shaders"),
            ("https://cdn.example/core.jar", "core"),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let filter = FileFilter {
            exclude_optional: true,
            ..FileFilter::default()
        }
        .with_exclude_patterns(&["shader*".to_string()])
        .unwrap();

        let mut client_only = pack_file("mods/client.jar", "client", &["https://cdn.example/client.jar"]);
        client_only.env = Some(FileEnv {
            client: Requirement::Required,
            server: Requirement::Unsupported,
        });
        let mut optional = pack_file(
            "mods/optional.jar",
            "optional",
            &["https://cdn.example/optional.jar"],
        );
        optional.env = Some(FileEnv {
            client: Requirement::Optional,
            server: Requirement::Optional,
        });
        let files = vec![
            client_only,
            optional,
            pack_file("mods/shaders.jar", "shaders", &["https://cdn.example/shaders.jar"]),
            pack_file("mods/core.jar", "core", &["https://cdn.example/core.jar"]),
        ];

        let installed = FileInstaller::new(&transport, dir.path(), &filter)
            .install(&files)
            .await
            .unwrap();

        assert_eq!(installed.managed, BTreeSet::from(["mods/core.jar".to_string()]));
        assert_eq!(installed.skipped, 3);
        assert_eq!(transport.requests(), vec!["https://cdn.example/core.jar"]);
    }

    #[tokio::test]
    async fn matching_files_on_disk_are_reused() {
        let transport = StaticTransport::serving(&[("https://cdn.example/a.jar", "jar a")]);
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("mods")).unwrap();
        std::fs::write(dir.path().join("mods/a.jar"), "jar a").unwrap();
        let filter = FileFilter::default();
        let files = vec![pack_file("mods/a.jar", "jar a", &["https://cdn.example/a.jar"])];

        let installer = FileInstaller::new(&transport, dir.path(), &filter);
        let installed = installer.install(&files).await.unwrap();
        assert_eq!(installed.reused, 1);
        assert!(transport.requests().is_empty());

        let forced = FileInstaller::new(&transport, dir.path(), &filter)
            .force_synchronize(true)
            .install(&files)
            .await
            .unwrap();
        assert_eq!(forced.downloaded, 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn unsafe_index_path_stops_before_downloading() {
        let transport = StaticTransport::serving(&[("https://cdn.example/a.jar", "jar a")]);
        let dir = tempfile::tempdir().unwrap();
        let filter = FileFilter::default();
        let files = vec![
            pack_file("mods/a.jar", "jar a", &["https://cdn.example/a.jar"]),
            pack_file("../../evil.jar", "jar a", &["https://cdn.example/a.jar"]),
        ];

        let err = FileInstaller::new(&transport, dir.path(), &filter)
            .install(&files)
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::UnsafePath(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn invalid_exclude_pattern_is_reported() {
        let err = FileFilter::default()
            .with_exclude_patterns(&["[".to_string()])
            .unwrap_err();
        assert!(matches!(err, InstallError::InvalidPattern { .. }));
    }
}
