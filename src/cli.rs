use std::path::PathBuf;

use clap::Parser;

use crate::core::installer::DEFAULT_CONCURRENCY;
use crate::core::pack::Environment;
use crate::core::pipeline::InstallOptions;
use crate::core::registry::{Loader, VersionType, DEFAULT_BASE_URL};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mrpack-install",
    about = "Install or update a Modrinth modpack into a directory"
)]
pub struct Cli {
    /// Modrinth API base URL
    #[arg(long, env = "MODRINTH_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Directory the pack is installed into
    #[arg(long = "output-directory", env = "MODPACK_OUTPUT_DIRECTORY", default_value = ".")]
    pub output_dir: PathBuf,

    /// Project slug or id, or a URL of an .mrpack archive
    #[arg(long, env = "MODRINTH_MODPACK")]
    pub project: String,

    /// Version id, version number, or "latest" (default)
    #[arg(long, env = "MODRINTH_VERSION")]
    pub version: Option<String>,

    /// Only accept versions built for this loader
    #[arg(long, env = "MODRINTH_LOADER", value_enum, default_value_t = Loader::Any)]
    pub loader: Loader,

    /// Least stable version type considered when picking the latest version
    #[arg(long, env = "MODRINTH_VERSION_TYPE", value_enum)]
    pub version_type: Option<VersionType>,

    /// Side the pack is installed for
    #[arg(long, env = "MODPACK_ENVIRONMENT", value_enum, default_value_t = Environment::Server)]
    pub environment: Environment,

    /// Skip files the pack marks as optional
    #[arg(long, env = "MODRINTH_EXCLUDE_OPTIONAL")]
    pub exclude_optional: bool,

    /// Glob of pack files to leave out (matched on path and file name)
    #[arg(long = "exclude-file", env = "MODRINTH_EXCLUDE_FILES", value_delimiter = ',')]
    pub exclude_files: Vec<String>,

    /// Re-download files even when the copy on disk matches
    #[arg(long, env = "MODRINTH_FORCE_SYNCHRONIZE")]
    pub force_synchronize: bool,

    /// Parallel file downloads
    #[arg(long, env = "MODRINTH_DOWNLOAD_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Write KEY=value results (project, version, loader) to this file
    #[arg(long, env = "MODRINTH_RESULTS_FILE")]
    pub results_file: Option<PathBuf>,
}

impl Cli {
    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            output_dir: self.output_dir.clone(),
            project: self.project.clone(),
            version: self.version.clone(),
            loader: self.loader,
            min_version_type: self.version_type,
            environment: self.environment,
            exclude_optional: self.exclude_optional,
            exclude_files: self.exclude_files.clone(),
            force_synchronize: self.force_synchronize,
            concurrency: self.concurrency,
            results_file: self.results_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_target_any_loader_on_the_server() {
        let cli = Cli::try_parse_from(["mrpack-install", "--project", "test_project1"]).unwrap();
        let options = cli.install_options();

        assert_eq!(cli.base_url, DEFAULT_BASE_URL);
        assert_eq!(options.loader, Loader::Any);
        assert_eq!(options.environment, Environment::Server);
        assert_eq!(options.version, None);
        assert_eq!(options.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn parses_loader_and_exclusions() {
        let cli = Cli::try_parse_from([
            "mrpack-install",
            "--project",
            "test_project1",
            "--version",
            "1.6.1",
            "--loader",
            "neoforge",
            "--exclude-file",
            "*shader*,optifine*",
            "--output-directory",
            "/data",
        ])
        .unwrap();
        let options = cli.install_options();

        assert_eq!(options.loader, Loader::NeoForge);
        assert_eq!(options.version.as_deref(), Some("1.6.1"));
        assert_eq!(options.exclude_files, vec!["*shader*", "optifine*"]);
        assert_eq!(options.output_dir, PathBuf::from("/data"));
    }
}
