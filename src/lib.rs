pub mod cli;
pub mod core;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::core::downloader::HttpTransport;
use crate::core::http::build_http_client;
use crate::core::registry::ModrinthRegistry;

pub use crate::core::error::{InstallError, InstallResult, Stage, StageError};
pub use crate::core::pipeline::{install, InstallOptions, InstallOutcome};

pub async fn run(cli: cli::Cli) -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mrpack_installer=debug")),
        )
        .init();

    tracing::info!("Installing modpack {} into {:?}", cli.project, cli.output_dir);

    let client = match build_http_client() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Cannot build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let registry = ModrinthRegistry::new(client.clone(), &cli.base_url);
    let transport = HttpTransport::new(client);

    match install(&cli.install_options(), &registry, &transport).await {
        Ok(outcome) => {
            tracing::info!(
                "Modpack installed: {} files managed, {} removed",
                outcome.manifest.files.len(),
                outcome.removed.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(stage = %e.stage, "Modpack install failed: {}", e.source);
            ExitCode::FAILURE
        }
    }
}
