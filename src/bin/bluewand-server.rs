use clap::Parser;
use log::{error, info};
use bluewand::{init_logging, run_server};
use bluewand::config::types::ServerConfig;
use bluewand::error::AppRunError;

#[tokio::main]
async fn main() -> Result<(), AppRunError> {
    let config = ServerConfig::parse();
    init_logging(&config.logging);
    info!(concat!("BlueWand server ", env!("CARGO_PKG_VERSION")));

    match run_server(config).await {
        Err(err) => {
            error!("Unexpected error: {}", err);
            Err(err)
        },
        Ok(_) => {
            info!("Stopped");
            Ok(())
        },
    }
}
