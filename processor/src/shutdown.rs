//! Graceful shutdown on SIGINT/SIGTERM.
//!
//! The processing loop and the block reader each hold a receiver and stop
//! at their next await point once a [`ShutdownReason`] is broadcast.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tokio::sync::broadcast;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Asked for by the owning code, e.g. the processor already stopped.
    Requested,
}

impl ShutdownReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ShutdownReason::Interrupt => "interrupt",
            ShutdownReason::Terminate => "terminate",
            ShutdownReason::Requested => "requested",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broadcasts a single shutdown to every subscriber.
///
/// Only the first trigger is sent; later ones are ignored so subscribers
/// see exactly one reason.
pub struct ShutdownController {
    tx: broadcast::Sender<ShutdownReason>,
    triggered: AtomicBool,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    /// Receiver notified when shutdown is triggered. Subscribing after the
    /// trigger yields a receiver that never fires; check
    /// [`is_triggered`](Self::is_triggered) first when that matters.
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.tx.subscribe()
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn trigger(&self, reason: ShutdownReason) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(%reason, "shutdown triggered");
        let _ = self.tx.send(reason);
    }

    /// Trigger with [`ShutdownReason::Requested`].
    pub fn shutdown(&self) {
        self.trigger(ShutdownReason::Requested);
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let reason = tokio::select! {
            _ = signal::ctrl_c() => ShutdownReason::Interrupt,
            _ = terminate => ShutdownReason::Terminate,
        };
        self.trigger(reason);
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
