use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

use crate::device::constants::{is_denylisted, uuid_name};
use crate::device::transport::{Connection, NotificationSink};
use crate::device::types::{Characteristic, Profile};
use crate::error::SubscribeError;

#[derive(Debug)]
struct Subscription {
    characteristic: Characteristic,
    sink: NotificationSink,
}

#[derive(Debug, Default)]
struct ActiveSet {
    subscriptions: HashMap<Uuid, Subscription>,
    /// Set by `unsubscribe_all`, nothing can be subscribed afterwards.
    closed: bool,
}

/**
 * Binds notifying characteristics to delivery channels, at most one per characteristic.
 * All changes to the active set are serialized by one lock.
 *
 * Transport calls made while holding that lock are bounded by `timeout`, a peripheral that
 * stopped answering must not wedge the bookkeeping.
 */
#[derive(Debug)]
pub struct SubscriptionManager {
    connection: Arc<dyn Connection>,
    profile: Arc<Profile>,
    timeout: Duration,
    active: Mutex<ActiveSet>,
}

impl SubscriptionManager {
    pub fn new(connection: Arc<dyn Connection>, profile: Arc<Profile>, timeout: Duration) -> Self {
        SubscriptionManager {
            connection,
            profile,
            timeout,
            active: Mutex::new(ActiveSet::default()),
        }
    }

    fn find_notifiable(&self, uuid: &Uuid) -> Option<&Characteristic> {
        for (service, characteristic) in self.profile.characteristics() {
            debug!(
                "Characteristic {} {:?} [{}] in service {} {:?}",
                characteristic.uuid,
                uuid_name(&characteristic.uuid),
                characteristic.properties,
                service.uuid,
                uuid_name(&service.uuid),
            );

            if characteristic.uuid != *uuid {
                continue;
            }

            if is_denylisted(&characteristic.uuid) {
                debug!("Not subscribing to denylisted characteristic {}", characteristic.uuid);
                continue;
            }

            if characteristic.can_notify() {
                return Some(characteristic);
            }
        }

        None
    }

    /// Subscribe `uuid` and deliver its notifications into `sink`.
    /// If the characteristic is already subscribed this is a no-op and `sink` is dropped.
    /// A subscription whose sink was closed by the transport (notification source ended)
    /// is replaced.
    pub async fn subscribe(&self, uuid: Uuid, sink: NotificationSink) -> Result<(), SubscribeError> {
        let mut active = self.active.lock().await;

        if active.closed {
            sink.close();
            return Err(SubscribeError::SessionClosed { uuid });
        }

        if let Some(existing) = active.subscriptions.get(&uuid) {
            if !existing.sink.is_closed() {
                debug!("Characteristic {} is already subscribed, ignoring duplicate", uuid);
                return Ok(());
            }

            warn!("Notification source of {} ended, subscribing again", uuid);
            if let Some(stale) = active.subscriptions.remove(&uuid) {
                self.release(stale).await;
            }
        }

        let characteristic = self.find_notifiable(&uuid)
            .ok_or(SubscribeError::CharacteristicNotFound { uuid })?
            .clone();

        info!("Subscribing to characteristic {} {:?}", uuid, uuid_name(&uuid));
        if let Err(source) = self.connection.subscribe(&characteristic, sink.clone()).await {
            sink.close();
            return Err(SubscribeError::SubscribeTransportError { uuid, source });
        }

        self.log_descriptors(&characteristic).await;

        active.subscriptions.insert(uuid, Subscription { characteristic, sink });
        Ok(())
    }

    async fn log_descriptors(&self, characteristic: &Characteristic) {
        for descriptor in &characteristic.descriptors {
            match timeout(self.timeout, self.connection.read_descriptor(descriptor)).await {
                Err(_) => warn!("Reading descriptor {} of {} timed out", descriptor.uuid, characteristic.uuid),
                Ok(Err(err)) => warn!("Failed to read descriptor {} of {}: {}", descriptor.uuid, characteristic.uuid, err),
                Ok(Ok(value)) => info!(
                    "Descriptor {} of {}: {:02x?} | {:?}",
                    descriptor.uuid,
                    characteristic.uuid,
                    value,
                    String::from_utf8_lossy(&value),
                ),
            }
        }
    }

    /// Stop delivery for `uuid`. Local bookkeeping is cleared even if the transport fails.
    pub async fn unsubscribe(&self, uuid: &Uuid) {
        let mut active = self.active.lock().await;

        if let Some(subscription) = active.subscriptions.remove(uuid) {
            self.release(subscription).await;
        }
    }

    /// Drops the subscription of `uuid` if its notification source has ended.
    pub async fn prune(&self, uuid: &Uuid) {
        let mut active = self.active.lock().await;

        let ended = active.subscriptions.get(uuid).is_some_and(|s| s.sink.is_closed());
        if !ended {
            return;
        }

        if let Some(subscription) = active.subscriptions.remove(uuid) {
            self.release(subscription).await;
        }
    }

    /// Releases every subscription and refuses new ones from now on.
    pub async fn unsubscribe_all(&self) {
        let mut active = self.active.lock().await;
        active.closed = true;

        let subscriptions: Vec<Subscription> = active.subscriptions.drain().map(|(_, s)| s).collect();
        for subscription in subscriptions {
            self.release(subscription).await;
        }
    }

    async fn release(&self, subscription: Subscription) {
        let uuid = subscription.characteristic.uuid;
        subscription.sink.close();

        match timeout(self.timeout, self.connection.unsubscribe(&subscription.characteristic)).await {
            Err(_) => warn!("Unsubscribing characteristic {} timed out", uuid),
            Ok(Err(err)) => warn!("Failed to unsubscribe characteristic {}: {}", uuid, err),
            Ok(Ok(())) => info!("Characteristic {} {:?} unsubscribed", uuid, uuid_name(&uuid)),
        }
    }

    pub async fn is_subscribed(&self, uuid: &Uuid) -> bool {
        self.active.lock().await.subscriptions.contains_key(uuid)
    }

    pub async fn active_count(&self) -> usize {
        self.active.lock().await.subscriptions.len()
    }
}
