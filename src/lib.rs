use std::env;
use std::sync::Arc;
use log::{info, warn};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use crate::config::types::{ClientConfig, LogFormat, LoggingConfig, ServerConfig, StreamKind};
use crate::device::connection::BtleplugAdapter;
use crate::device::session::{ActiveSession, DeviceSession};
use crate::error::{AppRunError, SessionError};
use crate::rpc::bridge::BlueWandService;
use crate::rpc::client;
use crate::rpc::proto::blue_wand_server::BlueWandServer;
use crate::shutdown::{shutdown_on, termination_signal};

pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod rpc;
pub mod shutdown;

#[derive(Serialize)]
struct JsonLogLine<'a> {
    time: String,
    level: &'a str,
    target: &'a str,
    msg: String,
    app: &'static str,
    version: &'static str,
}

pub fn init_logging(logging: &LoggingConfig) {
    let dispatch = match logging.log_format {
        LogFormat::Text => fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{} {} {}] {}",
                    humantime::format_rfc3339(std::time::SystemTime::now()),
                    record.level(),
                    record.target(),
                    message
                ))
            }),
        LogFormat::Json => fern::Dispatch::new()
            .format(|out, message, record| {
                let line = JsonLogLine {
                    time: humantime::format_rfc3339(std::time::SystemTime::now()).to_string(),
                    level: record.level().as_str(),
                    target: record.target(),
                    msg: message.to_string(),
                    app: env!("CARGO_PKG_NAME"),
                    version: env!("CARGO_PKG_VERSION"),
                };
                match serde_json::to_string(&line) {
                    Ok(json) => out.finish(format_args!("{}", json)),
                    Err(_) => out.finish(format_args!("{}", message)),
                }
            }),
    };

    let mut dispatch = dispatch
        .level(logging.log_level.level_filter())
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

async fn connect_session(config: &ServerConfig) -> Result<DeviceSession, SessionError> {
    let adapter = BtleplugAdapter::new().await
        .map_err(|source| SessionError::Scan { source })?;

    match DeviceSession::connect(&adapter, &config.name_prefix, config.timeout).await {
        Err(SessionError::ProfileDiscoveryFailed { source, connection }) => {
            // no retry loop: give the link back before failing startup
            if let Err(err) = connection.disconnect().await {
                warn!("Can't disconnect after failed profile discovery: {}", err);
            }
            Err(SessionError::ProfileDiscoveryFailed { source, connection })
        },
        result => result,
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), AppRunError> {
    let tls = config.tls_config()?;

    // bind before the slow bluetooth scan so that a bad address fails fast
    let listener = TcpListener::bind(config.listen).await
        .map_err(|source| AppRunError::Listen { addr: config.listen.to_string(), source })?;

    let active = Arc::new(ActiveSession::new());
    let session = active.install(connect_session(&config).await?).await;
    info!("Device session {} ready", session.identifier());

    let signal = termination_signal().map_err(|source| AppRunError::Signal { source })?;
    let (stopped, _) = shutdown_on(active.clone(), signal);

    let mut server = Server::builder();
    if let Some(tls) = tls {
        server = server.tls_config(tls)?;
    }

    info!("Serving on {}", config.listen);
    server
        .add_service(BlueWandServer::new(BlueWandService::new(active.clone())))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), stopped.cancelled())
        .await?;

    // the server may also stop on its own, make sure the device is released either way
    active.shutdown().await;
    Ok(())
}

pub async fn run_client(config: ClientConfig) -> Result<(), AppRunError> {
    let mut client = client::connect(&config).await?;
    let identifier = client::handshake(&mut client, config.timeout).await?;

    match config.stream {
        StreamKind::Button => client::stream_buttons(client, identifier).await?,
        StreamKind::Motion => client::stream_motion(client, identifier).await?,
        StreamKind::Both => {
            let (buttons, motion) = tokio::join!(
                client::stream_buttons(client.clone(), identifier.clone()),
                client::stream_motion(client, identifier),
            );
            buttons?;
            motion?;
        },
    }

    Ok(())
}
