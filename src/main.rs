//! hostpulse HTTP server
//!
//! Starts the application listener and the host metrics listener and runs
//! until one of them fails.

use clap::Parser;
use hostpulse::{
    cli::{self, Cli, Command},
    config::Config,
    server, telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = cli::generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(&path, template)?;
                eprintln!("Wrote configuration template to {}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    // Load configuration; built-in defaults when no file is given
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        "Starting hostpulse on {} (app port {}, metrics port {})",
        config.server.host,
        config.server.app_port,
        config.server.metrics_port
    );

    // Only returns when start-up or a listener fails; the error exits with code 1
    server::run(config).await?;

    Ok(())
}
