//! Capability interface over the platform BLE stack.
//!
//! The transport delivers notifications from its own execution context. Those payloads are
//! never handed to stream logic directly: they go through a [`NotificationSink`], a bounded
//! channel that the subscription manager can close at any time.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio_util::sync::CancellationToken;

use crate::device::constants::DELIVERY_CHANNEL_CAPACITY;
use crate::device::types::{Characteristic, Descriptor, Profile};
use crate::error::TransportError;

pub type NameFilter = dyn Fn(&str) -> bool + Send + Sync;

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Scan until a peripheral with a matching advertised name shows up.
    /// Returns `Ok(None)` when nothing matched before `timeout` elapsed.
    async fn scan(&self, filter: &NameFilter, timeout: Duration) -> Result<Option<Box<dyn Peripheral>>, TransportError>;
}

#[async_trait]
pub trait Peripheral: Send + Sync + Debug {
    fn local_name(&self) -> Option<String>;

    async fn connect(&self) -> Result<Arc<dyn Connection>, TransportError>;
}

#[async_trait]
pub trait Connection: Send + Sync + Debug {
    /// The physical (link-layer) address of the connected peripheral.
    fn address(&self) -> String;

    async fn discover_profile(&self) -> Result<Profile, TransportError>;

    /// Enable notifications and push every payload for `characteristic` into `sink`
    /// until the sink is closed.
    async fn subscribe(&self, characteristic: &Characteristic, sink: NotificationSink) -> Result<(), TransportError>;

    async fn unsubscribe(&self, characteristic: &Characteristic) -> Result<(), TransportError>;

    async fn read_descriptor(&self, descriptor: &Descriptor) -> Result<Vec<u8>, TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;
}

/**
 * Write end of a delivery channel, handed to the transport on subscribe.
 *
 * Once [`NotificationSink::close`] returns, no payload is written to the channel anymore,
 * even by a `deliver` call that was already waiting for capacity. Payloads that were
 * already buffered stay readable, the receiver observes the end of the channel after them.
 */
#[derive(Debug, Clone)]
pub struct NotificationSink {
    sender: Arc<Mutex<Option<Sender<Vec<u8>>>>>,
    closed: CancellationToken,
}

impl NotificationSink {
    pub fn new(sender: Sender<Vec<u8>>) -> Self {
        NotificationSink {
            sender: Arc::new(Mutex::new(Some(sender))),
            closed: CancellationToken::new(),
        }
    }

    /// A sink and the receiving end of a fresh delivery channel.
    pub fn channel() -> (NotificationSink, Receiver<Vec<u8>>) {
        let (tx, rx) = channel(DELIVERY_CHANNEL_CAPACITY);
        (NotificationSink::new(tx), rx)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Sender<Vec<u8>>>> {
        // the guarded section never panics, but do not let a poisoned lock wedge delivery
        self.sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits for room in the channel and delivers `payload`.
    /// Returns false if the sink was closed or the receiver went away; the payload is dropped.
    pub async fn deliver(&self, payload: Vec<u8>) -> bool {
        let sender = match self.slot().clone() {
            Some(sender) => sender,
            None => return false,
        };

        let permit = tokio::select! {
            _ = self.closed.cancelled() => return false,
            permit = sender.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => return false,
            },
        };

        let slot = self.slot();
        if slot.is_none() {
            return false;
        }
        permit.send(payload);
        true
    }

    pub fn close(&self) {
        let mut slot = self.slot();
        slot.take();
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the sink has been closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn delivers_in_order() {
        let (sink, mut rx) = NotificationSink::channel();
        let producer = tokio::spawn({
            let sink = sink.clone();
            async move {
                for i in 0..5u8 {
                    assert!(sink.deliver(vec![i]).await);
                }
            }
        });

        for i in 0..5u8 {
            assert_eq!(rx.recv().await, Some(vec![i]));
        }
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn close_unblocks_a_waiting_delivery_and_ends_the_channel() {
        let (sink, mut rx) = NotificationSink::channel();
        assert!(sink.deliver(vec![1]).await);

        // channel is full, this one waits for capacity
        let blocked = tokio::spawn({
            let sink = sink.clone();
            async move { sink.deliver(vec![2]).await }
        });
        tokio::task::yield_now().await;

        sink.close();
        assert!(!timeout(Duration::from_secs(1), blocked).await.unwrap().unwrap());

        // the buffered payload is drained before the end of the channel
        assert_eq!(rx.recv().await, Some(vec![1]));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn deliver_after_close_is_dropped() {
        let (sink, mut rx) = NotificationSink::channel();
        sink.close();
        assert!(sink.is_closed());
        assert!(!sink.deliver(vec![9]).await);
        assert_eq!(rx.recv().await, None);
    }
}
