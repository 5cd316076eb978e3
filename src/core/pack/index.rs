// ─── Modpack index ───
// `modrinth.index.json`: the file list and dependency map of a pack.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::registry::Loader;

pub const INDEX_FILE_NAME: &str = "modrinth.index.json";
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// Side of the game a pack is being installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Environment {
    Client,
    #[default]
    Server,
}

impl Environment {
    /// Override prefix that only applies to this environment.
    pub fn overrides_prefix(&self) -> &'static str {
        match self {
            Environment::Client => "client-overrides/",
            Environment::Server => "server-overrides/",
        }
    }
}

/// How much a file is wanted on one side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Required,
    Optional,
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEnv {
    pub client: Requirement,
    pub server: Requirement,
}

impl FileEnv {
    pub fn for_environment(&self, env: Environment) -> Requirement {
        match env {
            Environment::Client => self.client,
            Environment::Server => self.server,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModpackFile {
    pub path: String,
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<FileEnv>,
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl ModpackFile {
    /// Requirement for `env`; files without an `env` block are required everywhere.
    pub fn requirement(&self, env: Environment) -> Requirement {
        self.env
            .as_ref()
            .map(|e| e.for_environment(env))
            .unwrap_or(Requirement::Required)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModpackIndex {
    pub format_version: u32,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub version_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub files: Vec<ModpackFile>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl ModpackIndex {
    /// Loaders named in the dependency map, with their versions.
    pub fn loaders(&self) -> Vec<(Loader, &str)> {
        Loader::CONCRETE
            .iter()
            .filter_map(|loader| {
                let key = loader.dependency_key()?;
                self.dependencies
                    .get(key)
                    .map(|version| (*loader, version.as_str()))
            })
            .collect()
    }
}
