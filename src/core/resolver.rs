// ─── Version resolution ───
// Turns a project reference plus an optional version identifier into exactly
// one concrete version, or a direct archive URL that skips the registry.

use std::cmp::Ordering;

use reqwest::Url;
use tracing::{debug, info};

use crate::core::error::{InstallError, InstallResult};
use crate::core::registry::{Loader, Project, Registry, VersionDescriptor, VersionType};

/// Outcome of resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Registry {
        project: Project,
        version: VersionDescriptor,
    },
    DirectUrl(Url),
}

/// What the caller asked for.
#[derive(Debug, Clone)]
pub struct VersionRequest<'a> {
    /// Project slug or id, or a direct archive URL.
    pub project: &'a str,
    /// Version id, version number, `latest`, or absent.
    pub version: Option<&'a str>,
    pub loader: Loader,
    /// Least stable channel considered when picking the latest version.
    pub min_version_type: Option<VersionType>,
}

pub struct VersionResolver<'a> {
    registry: &'a dyn Registry,
}

impl<'a> VersionResolver<'a> {
    pub fn new(registry: &'a dyn Registry) -> Self {
        Self { registry }
    }

    pub async fn resolve(&self, request: &VersionRequest<'_>) -> InstallResult<Resolution> {
        if let Some(url) = direct_url(request.project)
            .or_else(|| request.version.and_then(direct_url))
        {
            info!("Using modpack archive URL {}", url);
            return Ok(Resolution::DirectUrl(url));
        }

        let project = self
            .registry
            .project(request.project)
            .await?
            .ok_or_else(|| InstallError::ProjectNotFound(request.project.to_string()))?;

        let version = match request.version.map(str::trim) {
            None | Some("") => self.latest(&project, request).await?,
            Some(v) if v.eq_ignore_ascii_case("latest") => self.latest(&project, request).await?,
            Some(v) => self.specific(&project, v, request.loader).await?,
        };

        info!(
            "Resolved {} version {} ({})",
            project.slug, version.version_number, version.id
        );
        Ok(Resolution::Registry { project, version })
    }

    async fn latest(
        &self,
        project: &Project,
        request: &VersionRequest<'_>,
    ) -> InstallResult<VersionDescriptor> {
        let versions = self
            .registry
            .project_versions(&project.id, request.loader)
            .await?;

        versions
            .into_iter()
            .filter(|v| request.loader.accepts(&v.loaders))
            .filter(|v| {
                request
                    .min_version_type
                    .map_or(true, |min| v.version_type >= min)
            })
            .min_by(newest_first)
            .ok_or_else(|| InstallError::VersionNotFound {
                project: project.slug.clone(),
                version: "latest".into(),
            })
    }

    async fn specific(
        &self,
        project: &Project,
        requested: &str,
        loader: Loader,
    ) -> InstallResult<VersionDescriptor> {
        if looks_like_version_id(requested) {
            if let Some(version) = self.registry.version(requested).await? {
                if version.project_id == project.id {
                    return check_loader(version, loader);
                }
                debug!(
                    "Version {} belongs to project {}, not {}",
                    requested, version.project_id, project.id
                );
            }
        }

        // Fetch unfiltered so a loader mismatch can be told apart from a typo.
        let matching: Vec<_> = self
            .registry
            .project_versions(&project.id, Loader::Any)
            .await?
            .into_iter()
            .filter(|v| v.version_number == requested)
            .collect();

        if matching.is_empty() {
            return Err(InstallError::VersionNotFound {
                project: project.slug.clone(),
                version: requested.to_string(),
            });
        }

        let available = loader_union(&matching);
        matching
            .into_iter()
            .filter(|v| loader.accepts(&v.loaders))
            .min_by(newest_first)
            .ok_or_else(|| InstallError::IncompatibleLoader {
                version: requested.to_string(),
                loader,
                available,
            })
    }
}

fn check_loader(version: VersionDescriptor, loader: Loader) -> InstallResult<VersionDescriptor> {
    if loader.accepts(&version.loaders) {
        Ok(version)
    } else {
        Err(InstallError::IncompatibleLoader {
            available: version.loader_list(),
            version: version.id,
            loader,
        })
    }
}

/// Most recently published first; equal timestamps by ascending id.
fn newest_first(a: &VersionDescriptor, b: &VersionDescriptor) -> Ordering {
    b.date_published
        .cmp(&a.date_published)
        .then_with(|| a.id.cmp(&b.id))
}

fn loader_union(versions: &[VersionDescriptor]) -> String {
    let all: std::collections::BTreeSet<Loader> = versions
        .iter()
        .flat_map(|v| v.loaders.iter().copied())
        .collect();
    if all.is_empty() {
        return "none".into();
    }
    all.iter().map(Loader::to_string).collect::<Vec<_>>().join(", ")
}

/// Registry version ids are eight base62 characters.
pub fn looks_like_version_id(s: &str) -> bool {
    s.len() == 8 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn direct_url(s: &str) -> Option<Url> {
    let url = Url::parse(s).ok()?;
    match url.scheme() {
        "http" | "https" => url.host_str().map(|_| url.clone()),
        "file" => Some(url),
        _ => None,
    }
}
