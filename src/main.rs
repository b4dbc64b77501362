use anyhow::Context;
use clap::Parser;
use practicefusion_bridge::utils::{logger, validation::Validate};
use practicefusion_bridge::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();
    logger::init_logger(cli.verbose, cli.json_logs);

    tracing::info!("Starting practicefusion-bridge");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = cli.resolve().context("failed to load configuration")?;
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(e).context("invalid configuration");
    }

    practicefusion_bridge::serve(&config)
        .await
        .context("server stopped with an error")?;

    Ok(())
}
