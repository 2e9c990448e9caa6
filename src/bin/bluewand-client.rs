use clap::Parser;
use log::{error, info};
use bluewand::{init_logging, run_client};
use bluewand::config::types::ClientConfig;
use bluewand::error::AppRunError;

#[tokio::main]
async fn main() -> Result<(), AppRunError> {
    let config = ClientConfig::parse();
    init_logging(&config.logging);
    info!(concat!("BlueWand client ", env!("CARGO_PKG_VERSION")));

    if let Err(err) = run_client(config).await {
        error!("{}", err);
        return Err(err);
    }
    Ok(())
}
