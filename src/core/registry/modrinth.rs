// ─── Modrinth registry ───
// Project and version lookups against the Modrinth v2 API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::model::{Loader, Project, VersionDescriptor};
use crate::core::error::{InstallError, InstallResult};

pub const DEFAULT_BASE_URL: &str = "https://api.modrinth.com";

/// Lookup service the version resolver talks to.
///
/// `Ok(None)` means the registry answered and has no such entry.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn project(&self, id_or_slug: &str) -> InstallResult<Option<Project>>;

    /// All versions of a project, optionally narrowed server-side to a loader.
    async fn project_versions(
        &self,
        project_id: &str,
        loader: Loader,
    ) -> InstallResult<Vec<VersionDescriptor>>;

    async fn version(&self, version_id: &str) -> InstallResult<Option<VersionDescriptor>>;
}

pub struct ModrinthRegistry {
    client: Client,
    base_url: String,
}

impl ModrinthRegistry {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> InstallResult<Option<T>> {
        debug!("GET {}", url);
        let resp = self.client.get(url).query(query).send().await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(InstallError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        Ok(Some(resp.json::<T>().await?))
    }
}

#[async_trait]
impl Registry for ModrinthRegistry {
    async fn project(&self, id_or_slug: &str) -> InstallResult<Option<Project>> {
        self.get_json(&self.url(&format!("project/{id_or_slug}")), &[])
            .await
    }

    async fn project_versions(
        &self,
        project_id: &str,
        loader: Loader,
    ) -> InstallResult<Vec<VersionDescriptor>> {
        let url = self.url(&format!("project/{project_id}/version"));
        let query = match loader {
            Loader::Any => vec![],
            concrete => vec![("loaders", format!("[\"{concrete}\"]"))],
        };
        let versions = self.get_json::<Vec<VersionDescriptor>>(&url, &query).await?;
        Ok(versions.unwrap_or_default())
    }

    async fn version(&self, version_id: &str) -> InstallResult<Option<VersionDescriptor>> {
        self.get_json(&self.url(&format!("version/{version_id}")), &[])
            .await
    }
}
