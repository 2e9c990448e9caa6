use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use clap::{Args, Parser, ValueEnum};

use crate::device::constants::WAND_NAME_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingConfig {
    /// Log verbosity
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Plain text lines or one JSON object per line
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version)]
#[command(about = "Connects to a Kano wand over Bluetooth LE and streams its button and motion events over gRPC", long_about = None)]
pub struct ServerConfig {
    /// Address the gRPC server listens on
    #[arg(long, default_value = "127.0.0.1:55555")]
    pub listen: SocketAddr,

    /// Serve over TLS instead of plain TCP
    #[arg(long)]
    pub tls: bool,

    /// TLS certificate (PEM) if --tls is used
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// TLS private key (PEM) if --tls is used
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Connect to the first peripheral whose advertised name starts with this (case-insensitive)
    #[arg(long, default_value = WAND_NAME_PREFIX)]
    pub name_prefix: String,

    /// Scan and connect timeout, e.g. "10s" or "1m 30s"
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    #[command(flatten)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StreamKind {
    Button,
    Motion,
    Both,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version)]
#[command(about = "Prints the button and motion events of a wand served by bluewand-server", long_about = None)]
pub struct ClientConfig {
    /// The server address in the format of host:port
    #[arg(long, default_value = "127.0.0.1:55555")]
    pub server_addr: String,

    /// Connect over TLS instead of plain TCP
    #[arg(long)]
    pub tls: bool,

    /// CA certificate (PEM) used to verify the server if --tls is used
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// The server name used to verify the hostname returned by the TLS handshake
    #[arg(long, default_value = "me.kano.grpc.bluewand")]
    pub server_host_override: String,

    /// Deadline for the handshake call
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Which events to stream after the handshake
    #[arg(long, value_enum, default_value_t = StreamKind::Button)]
    pub stream: StreamKind,

    #[command(flatten)]
    pub logging: LoggingConfig,
}
