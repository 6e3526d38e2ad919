//! Readiness gate.
//!
//! Opens exactly once, when the proxy listener starts accepting. Callers
//! that need the proxy (browser launchers, integration tests) await it
//! instead of polling the port.

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Readiness {
    tx: watch::Sender<bool>,
}

impl Readiness {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Open the gate. Returns true only for the call that opened it.
    pub fn mark_ready(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the gate is open. Returns immediately if it already is.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn opens_once() {
        let readiness = Readiness::new();
        assert!(!readiness.is_ready());
        assert!(readiness.mark_ready());
        assert!(!readiness.mark_ready());
        assert!(readiness.is_ready());
    }

    #[tokio::test]
    async fn wait_releases_after_mark() {
        let readiness = Readiness::new();
        let waiter = readiness.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        readiness.mark_ready();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn wait_after_ready_returns_immediately() {
        let readiness = Readiness::new();
        readiness.mark_ready();
        tokio::time::timeout(Duration::from_millis(100), readiness.wait())
            .await
            .unwrap();
    }
}
