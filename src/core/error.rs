use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::registry::Loader;

/// One download location that was tried and why it did not work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub url: String,
    pub reason: String,
}

/// Central error type for the installer.
/// Every module returns `Result<T, InstallError>`.
#[derive(Debug, Error)]
pub enum InstallError {
    // ── Resolution ──────────────────────────────────────
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Version {version} not found for project {project}")]
    VersionNotFound { project: String, version: String },

    #[error("Version {version} is not available for loader {loader} (offers: {available})")]
    IncompatibleLoader {
        version: String,
        loader: Loader,
        available: String,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("No download source worked for {path}: {}", AttemptList(.attempts))]
    AllSourcesFailed {
        path: String,
        attempts: Vec<FetchAttempt>,
    },

    #[error("Unsupported content type {content_type:?} from {url}")]
    UnsupportedContentType {
        url: String,
        content_type: Option<String>,
    },

    #[error("Version {0} has no modpack archive to download")]
    MissingArchive(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Malformed modpack archive: {0}")]
    MalformedArchive(String),

    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Refusing path outside the output directory: {0}")]
    UnsafePath(String),

    // ── Integrity ───────────────────────────────────────
    #[error("{algorithm} mismatch for {path}: expected {expected}, got {actual}")]
    IntegrityCheckFailed {
        path: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    // ── Manifest ────────────────────────────────────────
    #[error("Manifest error at {path:?}: {reason}")]
    ManifestIo { path: PathBuf, reason: String },

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Convenience alias used throughout the crate.
pub type InstallResult<T> = Result<T, InstallError>;

impl InstallError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Io {
            path: path.into(),
            source,
        }
    }
}

struct AttemptList<'a>(&'a [FetchAttempt]);

impl fmt::Display for AttemptList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no download locations listed");
        }
        for (i, attempt) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} ({})", attempt.url, attempt.reason)?;
        }
        Ok(())
    }
}

// ── Stage tagging ───────────────────────────────────────

/// Pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Fetch,
    Extract,
    Install,
    Reconcile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve => write!(f, "resolve"),
            Stage::Fetch => write!(f, "fetch"),
            Stage::Extract => write!(f, "extract"),
            Stage::Install => write!(f, "install"),
            Stage::Reconcile => write!(f, "reconcile"),
        }
    }
}

/// An [`InstallError`] tagged with the stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: InstallError,
}

impl Stage {
    pub(crate) fn tag(self) -> impl FnOnce(InstallError) -> StageError {
        move |source| StageError {
            stage: self,
            source,
        }
    }
}
