use std::process::ExitCode;

use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = mrpack_installer::cli::Cli::parse();
    mrpack_installer::run(cli).await
}
