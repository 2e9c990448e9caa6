use std::future::Future;
use std::io;
use std::sync::Arc;
use log::info;
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::device::session::ActiveSession;

#[cfg(unix)]
pub fn termination_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Received SIGINT"),
            _ = terminate.recv() => info!("Received SIGTERM"),
        }
    })
}

#[cfg(not(unix))]
pub fn termination_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt");
        }
    })
}

/**
 * Shuts the active session down once `trigger` resolves, then cancels the returned token.
 *
 * Unsubscribing closes the delivery channel of every in-flight stream, so their forwarding
 * loops finish on their own; the token tells the RPC server it can stop.
 */
pub fn shutdown_on<F>(active: Arc<ActiveSession>, trigger: F) -> (CancellationToken, JoinHandle<()>)
where
    F: Future<Output = ()> + Send + 'static,
{
    let done = CancellationToken::new();
    let done_clone = done.clone();

    let handle = spawn(async move {
        trigger.await;
        info!("Shutting down");
        active.shutdown().await;
        done_clone.cancel();
    });

    (done, handle)
}
