use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Mod loaders a modpack version can target.
///
/// `Any` is the wildcard used when no loader constraint is requested; the
/// registry never reports it for a version.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    #[default]
    Any,
    Fabric,
    Forge,
    #[value(name = "neoforge")]
    NeoForge,
    Quilt,
}

impl Loader {
    /// True when a version offering `loaders` satisfies this constraint.
    pub fn accepts(&self, loaders: &BTreeSet<Loader>) -> bool {
        match self {
            Loader::Any => true,
            other => loaders.contains(other),
        }
    }

    /// Key used for this loader in a modpack index's `dependencies` map.
    pub fn dependency_key(&self) -> Option<&'static str> {
        match self {
            Loader::Any => None,
            Loader::Fabric => Some("fabric-loader"),
            Loader::Forge => Some("forge"),
            Loader::NeoForge => Some("neoforge"),
            Loader::Quilt => Some("quilt-loader"),
        }
    }

    /// Concrete loaders, in the order they are looked up in an index.
    pub const CONCRETE: [Loader; 4] = [
        Loader::Forge,
        Loader::NeoForge,
        Loader::Fabric,
        Loader::Quilt,
    ];
}

impl std::fmt::Display for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Loader::Any => write!(f, "any"),
            Loader::Fabric => write!(f, "fabric"),
            Loader::Forge => write!(f, "forge"),
            Loader::NeoForge => write!(f, "neoforge"),
            Loader::Quilt => write!(f, "quilt"),
        }
    }
}

impl FromStr for Loader {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(Loader::Any),
            "fabric" => Ok(Loader::Fabric),
            "forge" => Ok(Loader::Forge),
            "neoforge" => Ok(Loader::NeoForge),
            "quilt" => Ok(Loader::Quilt),
            other => Err(format!("unknown loader: {other}")),
        }
    }
}

/// Release channel of a version, ordered from least to most stable.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum VersionType {
    Alpha,
    Beta,
    #[default]
    Release,
}

/// Project metadata as returned by the registry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// A file attached to a published version.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VersionFile {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
}

/// One concrete, published version of a project.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VersionDescriptor {
    pub id: String,
    pub project_id: String,
    pub version_number: String,
    #[serde(default)]
    pub version_type: VersionType,
    #[serde(deserialize_with = "known_loaders")]
    pub loaders: BTreeSet<Loader>,
    pub date_published: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<VersionFile>,
}

impl VersionDescriptor {
    /// The modpack archive of this version: the primary file, otherwise the
    /// first `.mrpack`, otherwise the first file.
    pub fn archive(&self) -> Option<&VersionFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.iter().find(|f| f.filename.ends_with(".mrpack")))
            .or_else(|| self.files.first())
    }

    /// Loader tags joined for diagnostics.
    pub fn loader_list(&self) -> String {
        if self.loaders.is_empty() {
            return "none".into();
        }
        self.loaders
            .iter()
            .map(Loader::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// Registry loader tags include non-loader platforms ("minecraft", "datapack").
fn known_loaders<'de, D>(deserializer: D) -> Result<BTreeSet<Loader>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .filter_map(|tag| tag.parse::<Loader>().ok())
        .filter(|loader| *loader != Loader::Any)
        .collect())
}
