use std::sync::Arc;
use log::{debug, info, warn};
use tokio::spawn;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::device::constants::{DELIVERY_CHANNEL_CAPACITY, IO_USER_BUTTON_CHARACTERISTIC, SENSOR_QUATERNIONS_CHARACTERISTIC};
use crate::device::session::{ActiveSession, DeviceSession};
use crate::device::transport::NotificationSink;
use crate::error::{BridgeError, TranslateError};
use crate::events::{translate_button, translate_motion};
use crate::rpc::proto::blue_wand_server::BlueWand;
use crate::rpc::proto::{ButtonMessage, EmptyMessage, Identifier, MotionMessage};

pub type EventStream<M> = ReceiverStream<Result<M, Status>>;

/**
 * gRPC face of the active device session.
 */
#[derive(Debug, Clone)]
pub struct BlueWandService {
    active: Arc<ActiveSession>,
}

impl BlueWandService {
    pub fn new(active: Arc<ActiveSession>) -> Self {
        BlueWandService { active }
    }
}

async fn authorize(active: &ActiveSession, uid: &str) -> Result<Arc<DeviceSession>, BridgeError> {
    let session = active.current().await.ok_or(BridgeError::NoActiveSession)?;

    if !session.identifier().matches(uid) {
        warn!("Rejecting stream for identifier {:?}, active session is {}", uid, session.identifier());
        return Err(BridgeError::IdentifierMismatch);
    }

    Ok(session)
}

/// Validates `uid`, subscribes `characteristic` and spawns the loop that forwards its
/// notifications, translated, to the returned stream.
pub async fn open_stream<E, M, F>(
    active: &ActiveSession,
    uid: &str,
    characteristic: Uuid,
    translate: F,
) -> Result<EventStream<M>, BridgeError>
where
    F: Fn(&[u8]) -> Result<E, TranslateError> + Send + 'static,
    E: Send + 'static,
    M: From<E> + Send + 'static,
{
    let session = authorize(active, uid).await?;

    let (sink, payloads) = NotificationSink::channel();
    session.subscribe(characteristic, sink).await?;

    let (events, stream) = channel(DELIVERY_CHANNEL_CAPACITY);
    spawn(async move {
        match forward(&session, characteristic, payloads, translate, events).await {
            Ok(()) => info!("Stream for {} closed", characteristic),
            Err(err) => info!("Stream for {} failed: {}", characteristic, err),
        }
    });

    Ok(ReceiverStream::new(stream))
}

/// Runs until the delivery channel closes (clean end) or an event can not be emitted.
/// Every payload is translated and sent in arrival order.
pub async fn forward<E, M, F>(
    session: &DeviceSession,
    characteristic: Uuid,
    mut payloads: Receiver<Vec<u8>>,
    translate: F,
    events: Sender<Result<M, Status>>,
) -> Result<(), BridgeError>
where
    F: Fn(&[u8]) -> Result<E, TranslateError>,
    M: From<E>,
{
    loop {
        let payload = tokio::select! {
            biased;
            payload = payloads.recv() => payload,
            _ = events.closed() => {
                debug!("Consumer of {} went away", characteristic);
                session.unsubscribe(&characteristic).await;
                return Err(BridgeError::StreamEmitFailed);
            },
        };

        // the sink was closed (unsubscribe or the transport's notification source ended)
        // and everything buffered has been drained
        let Some(payload) = payload else {
            session.subscriptions().prune(&characteristic).await;
            return Ok(());
        };

        let message = match translate(&payload) {
            Ok(event) => M::from(event),
            Err(err) => {
                warn!("Dropping stream for {}: {}", characteristic, err);
                session.unsubscribe(&characteristic).await;
                let _ = events.send(Err(Status::from(BridgeError::from(err.clone())))).await;
                return Err(err.into());
            },
        };

        if events.send(Ok(message)).await.is_err() {
            session.unsubscribe(&characteristic).await;
            return Err(BridgeError::StreamEmitFailed);
        }
    }
}

#[tonic::async_trait]
impl BlueWand for BlueWandService {
    async fn on_connect(&self, _request: Request<EmptyMessage>) -> Result<Response<Identifier>, Status> {
        let session = self.active.current().await.ok_or(BridgeError::NoActiveSession)?;
        debug!("Handshake, active session is {}", session.identifier());

        Ok(Response::new(Identifier { uid: session.identifier().to_string() }))
    }

    type OnButtonStream = EventStream<ButtonMessage>;

    async fn on_button(&self, request: Request<Identifier>) -> Result<Response<Self::OnButtonStream>, Status> {
        let identifier = request.into_inner();
        let stream = open_stream(
            &self.active,
            &identifier.uid,
            IO_USER_BUTTON_CHARACTERISTIC,
            |payload: &[u8]| Ok(translate_button(payload)),
        ).await?;

        Ok(Response::new(stream))
    }

    type OnMotionStream = EventStream<MotionMessage>;

    async fn on_motion(&self, request: Request<Identifier>) -> Result<Response<Self::OnMotionStream>, Status> {
        let identifier = request.into_inner();
        let stream = open_stream(
            &self.active,
            &identifier.uid,
            SENSOR_QUATERNIONS_CHARACTERISTIC,
            translate_motion,
        ).await?;

        Ok(Response::new(stream))
    }
}
