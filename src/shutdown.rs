use async_channel::{Receiver, Sender};
use log::{error, info};

/// Creates a connected stop trigger and signal.
///
/// Nothing is ever sent over the channel: firing the trigger closes it, and a
/// closed channel is the stop request. Once fired it stays fired.
pub fn stop_channel() -> (StopTrigger, StopSignal) {
    let (tx, rx) = async_channel::bounded(1);
    (StopTrigger { tx }, StopSignal { rx })
}

#[derive(Clone)]
pub struct StopTrigger {
    tx: Sender<()>,
}

impl StopTrigger {
    /// Requests a stop. Never blocks, and firing twice is harmless.
    pub fn fire(&self) {
        self.tx.close();
    }
}

pub struct StopSignal {
    rx: Receiver<()>,
}

impl StopSignal {
    /// Non-blocking check. Also true once every trigger has been dropped,
    /// since no stop request could reach the worker after that.
    pub fn is_requested(&self) -> bool {
        self.rx.is_closed()
    }

    /// Resolves once a stop has been requested.
    pub async fn requested(&self) {
        while self.rx.recv().await.is_ok() {}
    }
}

/// Fires `trigger` on SIGINT or SIGTERM.
pub async fn listen_for_os_signals(trigger: StopTrigger) {
    wait_for_os_signal().await;
    trigger.fire();
}

#[cfg(unix)]
async fn wait_for_os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(err) => {
            error!("Cannot listen for SIGTERM, stopping: {}", err);
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Received interrupt signal, shutting down"),
            Err(err) => error!("Cannot listen for interrupt signal, stopping: {}", err),
        },
        _ = terminate.recv() => info!("Received terminate signal, shutting down"),
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received interrupt signal, shutting down"),
        Err(err) => error!("Cannot listen for interrupt signal, stopping: {}", err),
    }
}
