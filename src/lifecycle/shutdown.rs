//! Shutdown coordination for the proxy.
//!
//! # Design Decisions
//! - The stop flag is sticky: a signal subscribed after `trigger` still fires
//! - Draining is bounded: `drained` resolves a fixed time after the trigger

use std::time::Duration;

use tokio::sync::watch;

/// Owns the stop flag. Dropping it counts as a trigger.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// A handle that resolves once `trigger` is called.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Signal every subscriber, including ones that subscribe later.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber side of [`Shutdown`]. Clone it to hand out more listeners.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown was triggered or the coordinator is gone.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }

    /// Resolve `deadline` after shutdown was triggered.
    pub async fn drained(mut self, deadline: Duration) {
        self.recv().await;
        tokio::time::sleep(deadline).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.subscribe();
        let mut sweeper = server.clone();

        shutdown.trigger();
        server.recv().await;
        sweeper.recv().await;
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut late = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), late.recv())
            .await
            .expect("trigger before subscribe must not be lost");
    }

    #[tokio::test]
    async fn test_dropped_coordinator_releases_listeners() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        drop(shutdown);
        signal.recv().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drained_waits_for_deadline() {
        let shutdown = Shutdown::new();
        let drained = tokio::spawn(shutdown.subscribe().drained(Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!drained.is_finished(), "deadline must not start before the trigger");

        let triggered_at = tokio::time::Instant::now();
        shutdown.trigger();
        drained.await.unwrap();
        assert!(triggered_at.elapsed() >= Duration::from_secs(10));
    }

    #[test]
    fn test_trigger_without_subscribers() {
        Shutdown::default().trigger();
    }
}
