use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use log::{debug, info, warn};
use tokio::sync::RwLock;
use tokio::time::timeout;
use uuid::Uuid;

use crate::device::subscription::SubscriptionManager;
use crate::device::transport::{Adapter, Connection, NotificationSink};
use crate::device::types::{Identifier, Profile};
use crate::error::{SessionError, SubscribeError};

pub fn name_matches_prefix(name: &str, prefix: &str) -> bool {
    name.to_uppercase().starts_with(&prefix.to_uppercase())
}

/**
 * One live connection to one peripheral, from a successful scan + connect + discover
 * until shutdown.
 */
#[derive(Debug)]
pub struct DeviceSession {
    identifier: Identifier,
    connection: Arc<dyn Connection>,
    profile: Arc<Profile>,
    timeout: Duration,
    subscriptions: SubscriptionManager,
    shut_down: AtomicBool,
}

impl DeviceSession {
    pub async fn connect(adapter: &dyn Adapter, name_prefix: &str, scan_timeout: Duration) -> Result<DeviceSession, SessionError> {
        info!("Scanning for {} for {}", name_prefix, humantime::format_duration(scan_timeout));

        let prefix = name_prefix.to_string();
        let filter = move |name: &str| {
            debug!("Scanned device name: {}", name);
            name_matches_prefix(name, &prefix)
        };

        let peripheral = adapter.scan(&filter, scan_timeout).await
            .map_err(|source| SessionError::Scan { source })?
            .ok_or_else(|| SessionError::ScanTimeout { prefix: name_prefix.to_string(), timeout: scan_timeout })?;

        info!("Connecting to {}...", peripheral.local_name().unwrap_or(String::from("NONE")));
        let connection = match timeout(scan_timeout, peripheral.connect()).await {
            Err(_) => return Err(SessionError::ConnectTimeout { timeout: scan_timeout }),
            Ok(Err(source)) => return Err(SessionError::Connect { source }),
            Ok(Ok(connection)) => connection,
        };

        info!("Connected; Discovering profile...");
        let profile = match connection.discover_profile().await {
            Ok(profile) => profile,
            Err(source) => return Err(SessionError::ProfileDiscoveryFailed { source, connection }),
        };
        info!(
            "Profile discovered: {} services, {} characteristics",
            profile.services.len(),
            profile.characteristics().count(),
        );

        Ok(DeviceSession::new(connection, profile, scan_timeout))
    }

    pub fn new(connection: Arc<dyn Connection>, profile: Profile, timeout: Duration) -> DeviceSession {
        let identifier = Identifier::from_address(&connection.address());
        let profile = Arc::new(profile);

        DeviceSession {
            identifier,
            subscriptions: SubscriptionManager::new(connection.clone(), profile.clone(), timeout),
            connection,
            profile,
            timeout,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub async fn subscribe(&self, uuid: Uuid, sink: NotificationSink) -> Result<(), SubscribeError> {
        self.subscriptions.subscribe(uuid, sink).await
    }

    pub async fn unsubscribe(&self, uuid: &Uuid) {
        self.subscriptions.unsubscribe(uuid).await
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Unsubscribe everything (best effort) and disconnect. Only the first call does anything.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("Session {} already shut down", self.identifier);
            return;
        }

        info!("Shutting down session {}", self.identifier);
        self.subscriptions.unsubscribe_all().await;

        match timeout(self.timeout, self.connection.disconnect()).await {
            Err(_) => warn!("Disconnecting took too long"),
            Ok(Err(err)) => warn!("Can't disconnect: {}", err),
            Ok(Ok(())) => info!("Disconnected"),
        }
    }
}

/**
 * The single device session of this process, shared by the RPC handlers and the
 * signal driven shutdown.
 */
#[derive(Debug, Default)]
pub struct ActiveSession {
    session: RwLock<Option<Arc<DeviceSession>>>,
}

impl ActiveSession {
    pub fn new() -> Self {
        ActiveSession::default()
    }

    pub async fn install(&self, session: DeviceSession) -> Arc<DeviceSession> {
        let session = Arc::new(session);
        let previous = self.session.write().await.replace(session.clone());

        if let Some(previous) = previous {
            warn!("Replacing active session {}", previous.identifier());
            previous.shutdown().await;
        }

        session
    }

    pub async fn current(&self) -> Option<Arc<DeviceSession>> {
        self.session.read().await.clone()
    }

    /// Takes the session out and shuts it down. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        let session = self.session.write().await.take();

        if let Some(session) = session {
            session.shutdown().await;
        }
    }
}
