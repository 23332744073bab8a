use clap::Parser;
use tracing::error;

use netrecon::{cli::Cli, config::AppConfig, core::Application, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.validate()?;

    let mut config = AppConfig::load(&cli.config_path)?;
    if cli.quiet {
        config.logging.level = "error".to_string();
    }
    logging::init(&config.logging, cli.verbose)?;

    let app = Application::new(config);
    if let Err(e) = app.run(&cli).await {
        error!(error = %e, "scan failed");
        return Err(e.into());
    }
    Ok(())
}
