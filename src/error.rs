use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tonic::Status;
use uuid::Uuid;

use crate::device::transport::Connection;

fn readable(duration: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*duration)
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Error communicating with device (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("No bluetooth adapter is available")]
    NoAdapter,

    #[error("The peripheral is not connected")]
    NotConnected,

    #[error("The peripheral does not expose characteristic {uuid}")]
    UnknownCharacteristic { uuid: Uuid },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No peripheral named {prefix}* was found within {}", readable(.timeout))]
    ScanTimeout { prefix: String, timeout: Duration },

    #[error("Failed to scan for peripherals: {source}")]
    Scan { source: TransportError },

    #[error("Connecting to the peripheral took longer than {}", readable(.timeout))]
    ConnectTimeout { timeout: Duration },

    #[error("Failed to connect to the peripheral: {source}")]
    Connect { source: TransportError },

    /// The connection is still open; the caller decides whether to retry or disconnect.
    #[error("Failed to discover the peripheral profile: {source}")]
    ProfileDiscoveryFailed { source: TransportError, connection: Arc<dyn Connection> },
}

#[derive(Error, Debug)]
pub enum SubscribeError {
    #[error("No notifiable characteristic {uuid} was discovered")]
    CharacteristicNotFound { uuid: Uuid },

    #[error("The transport rejected the subscription to {uuid}: {source}")]
    SubscribeTransportError { uuid: Uuid, source: TransportError },

    #[error("The device session is shut down, can't subscribe to {uuid}")]
    SessionClosed { uuid: Uuid },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Motion payload must be at least 8 bytes, got {len}")]
    MalformedMotionPayload { len: usize },
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("mis-matched device identifier")]
    IdentifierMismatch,

    #[error("No device session is active")]
    NoActiveSession,

    #[error("{source}")]
    Subscribe { #[from] source: SubscribeError },

    #[error("{source}")]
    Translate { #[from] source: TranslateError },

    #[error("Failed to send event to the stream consumer")]
    StreamEmitFailed,
}

impl From<BridgeError> for Status {
    fn from(err: BridgeError) -> Self {
        let message = err.to_string();
        match err {
            BridgeError::IdentifierMismatch => Status::permission_denied(message),
            BridgeError::NoActiveSession => Status::unavailable(message),
            BridgeError::Subscribe { source: SubscribeError::CharacteristicNotFound { .. } } => Status::not_found(message),
            BridgeError::Subscribe { source: SubscribeError::SubscribeTransportError { .. } } => Status::unavailable(message),
            BridgeError::Subscribe { source: SubscribeError::SessionClosed { .. } } => Status::unavailable(message),
            BridgeError::Translate { .. } => Status::data_loss(message),
            BridgeError::StreamEmitFailed => Status::cancelled(message),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("--tls requires --{flag}")]
    MissingTlsFile { flag: &'static str },

    #[error("Failed to read {}: {source}", .path.display())]
    ReadFile { path: PathBuf, source: io::Error },

    #[error("{} does not contain a PEM encoded certificate", .path.display())]
    NoCertificate { path: PathBuf },

    #[error("Failed to decode certificate in {}: {reason}", .path.display())]
    InvalidCertificate { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Invalid configuration: {source}")]
    Config { #[from] source: ConfigError },

    #[error("Failed to set up the device session: {source}")]
    Session { #[from] source: SessionError },

    #[error("Failed to listen on {addr}: {source}")]
    Listen { addr: String, source: io::Error },

    #[error("RPC transport error: {source}")]
    Rpc { #[from] source: tonic::transport::Error },

    #[error("RPC call failed: {source}")]
    Call { #[from] source: Status },

    #[error("Failed to set up the signal handler: {source}")]
    Signal { source: io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn bridge_errors_map_to_rpc_status_codes() {
        assert_eq!(Status::from(BridgeError::IdentifierMismatch).code(), Code::PermissionDenied);
        assert_eq!(Status::from(BridgeError::NoActiveSession).code(), Code::Unavailable);

        let not_found = BridgeError::from(SubscribeError::CharacteristicNotFound { uuid: Uuid::nil() });
        assert_eq!(Status::from(not_found).code(), Code::NotFound);

        let malformed = BridgeError::from(TranslateError::MalformedMotionPayload { len: 3 });
        let status = Status::from(malformed);
        assert_eq!(status.code(), Code::DataLoss);
        assert!(status.message().contains("got 3"));
    }
}
