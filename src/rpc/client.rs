use std::time::Duration;
use log::info;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status, Streaming};

use crate::config::types::ClientConfig;
use crate::error::AppRunError;
use crate::events::DomainEvent;
use crate::rpc::proto::blue_wand_client::BlueWandClient;
use crate::rpc::proto::{ButtonMessage, EmptyMessage, Identifier, MotionMessage};

pub type Client = BlueWandClient<Channel>;

pub async fn connect(config: &ClientConfig) -> Result<Client, AppRunError> {
    let tls = config.tls_config()?;
    let scheme = if tls.is_some() { "https" } else { "http" };

    let mut endpoint = Endpoint::from_shared(format!("{}://{}", scheme, config.server_addr))?;
    if let Some(tls) = tls {
        endpoint = endpoint.tls_config(tls)?;
    }

    info!("Connecting to {}", config.server_addr);
    let channel = endpoint.connect().await?;
    Ok(BlueWandClient::new(channel))
}

/// Asks the server for the identifier of its device session.
pub async fn handshake(client: &mut Client, deadline: Duration) -> Result<Identifier, Status> {
    let mut request = Request::new(EmptyMessage {});
    request.set_timeout(deadline);

    let identifier = client.on_connect(request).await?.into_inner();
    info!("Identifier: {}", identifier.uid);
    Ok(identifier)
}

/// Hands every message of `stream` to `on_event` until the server ends the stream.
pub async fn consume<M, F>(mut stream: Streaming<M>, mut on_event: F) -> Result<(), Status>
where
    M: Into<DomainEvent>,
    F: FnMut(DomainEvent),
{
    while let Some(message) = stream.message().await? {
        on_event(message.into());
    }
    Ok(())
}

pub fn log_event(event: DomainEvent) {
    match event {
        DomainEvent::Button(button) => info!("OnButton: {}", button.pressed),
        DomainEvent::Motion(motion) => info!("OnMotion: [{}, {}, {}, {}]", motion.w, motion.x, motion.y, motion.z),
    }
}

pub async fn stream_buttons(mut client: Client, identifier: Identifier) -> Result<(), Status> {
    let stream: Streaming<ButtonMessage> = client.on_button(identifier).await?.into_inner();
    consume(stream, log_event).await?;
    info!("OnButton stream ended");
    Ok(())
}

pub async fn stream_motion(mut client: Client, identifier: Identifier) -> Result<(), Status> {
    let stream: Streaming<MotionMessage> = client.on_motion(identifier).await?.into_inner();
    consume(stream, log_event).await?;
    info!("OnMotion stream ended");
    Ok(())
}
