//! Readiness handshake with the host runtime.
//!
//! The rendering service announces once that its API is usable. Nothing may
//! touch the overlay before that, so the lifecycle shell awaits
//! [`ReadySignal::wait_ready`] before bootstrapping the namespace.

use std::sync::Arc;

use tokio::sync::watch;

/// One-way "the rendering service is ready" flag.
///
/// Cheap to clone; every clone observes the same flag.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadySignal {
    /// Create a signal in the not-ready state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Create a signal that is already ready.
    pub fn ready() -> Self {
        let signal = Self::new();
        signal.mark_ready();
        signal
    }

    /// Announce readiness and wake every waiter. Later calls are no-ops.
    pub fn mark_ready(&self) {
        let changed = self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        });
        if changed {
            tracing::info!("Rendering service ready");
        }
    }

    /// Whether readiness has been announced.
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until readiness has been announced.
    ///
    /// Returns immediately if it already has.
    pub async fn wait_ready(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so the channel cannot close
        // while we wait.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_when_ready() {
        let signal = ReadySignal::ready();
        assert!(signal.is_ready());
        let waited = tokio::time::timeout(Duration::from_millis(100), signal.wait_ready()).await;
        assert!(waited.is_ok());
    }

    #[tokio::test]
    async fn waiter_is_released_by_mark_ready() {
        let signal = ReadySignal::new();
        assert!(!signal.is_ready());

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait_ready().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        signal.mark_ready();
        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn not_ready_signal_keeps_waiting() {
        let signal = ReadySignal::new();
        let waited = tokio::time::timeout(Duration::from_millis(50), signal.wait_ready()).await;
        assert!(waited.is_err());
    }
}
