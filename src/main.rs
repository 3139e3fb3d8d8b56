use std::env;
use std::error::Error;
use std::sync::Arc;

use clap::Parser;

use tabletdriver::cli::{self, Args};
use tabletdriver::config::{path::get_config_path, DaemonConfig};
use tabletdriver::input::manager::{Command, Manager};
use tabletdriver::input::target::UinputFactory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();

    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();

    let context = rusb::Context::new()?;
    if args.list {
        return cli::list_devices(&context);
    }

    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::info!("Starting tabletdriver v{}", VERSION);

    // Load the settings file
    let path = args.config.unwrap_or_else(get_config_path);
    let config = DaemonConfig::load_or_backup(&path);

    let mut manager = Manager::new(context, config, Arc::new(UinputFactory));

    // Setup CTRL+C handler
    let tx = manager.tx();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Unable to listen for shutdown signal: {e}");
            return;
        }
        log::info!("Shutting down");
        if let Err(e) = tx.send(Command::Stop).await {
            log::error!("Unable to send stop command: {e}");
        }
    });

    manager.run().await?;
    log::info!("tabletdriver stopped");

    Ok(())
}
