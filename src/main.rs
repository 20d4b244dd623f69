use anyhow::Result;
use clap::Parser;
use routewatch::cli::{Cli, CommandHandler};
use routewatch::{AppConfig, Runtime};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let runtime = Runtime::from_config(config)?;

    CommandHandler::new(runtime).handle(cli.command).await
}
