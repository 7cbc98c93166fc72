use anyhow::Result;
use push_relay::{
    axum_http::http_serve,
    config::config_loader,
    infra::ftp::ftp_client::{self, FtpConnector},
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("push-relay exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = match config_loader::load() {
        Ok(config) => config,
        Err(err) => {
            // Logging is configured from these flags, so nothing is listening yet.
            eprintln!("push-relay: invalid configuration: {:#}", err);
            std::process::exit(2);
        }
    };
    push_relay::observability::init_observability("push-relay", config.log_level)?;
    info!("Config has been loaded");

    let connector = FtpConnector::new(config.ftp.clone());
    let base_directory = config.push.base_directory.clone();
    let startup_connector = connector.clone();
    tokio::task::spawn_blocking(move || {
        ftp_client::verify(&startup_connector, &base_directory)
    })
    .await??;
    info!(host = %config.ftp.host, "FTP connection has been verified");

    http_serve::start(Arc::new(config), Arc::new(connector)).await?;

    Ok(())
}
