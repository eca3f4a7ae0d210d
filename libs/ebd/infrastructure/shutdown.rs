//! Graceful shutdown management

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tracing::info;

/// Manages graceful shutdown for the HTTP server
///
/// Triggered by Ctrl+C or SIGTERM (what `docker stop` sends).
#[derive(Clone)]
pub struct ShutdownManager {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownManager {
    /// Create a new shutdown manager with running state
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(true)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Spawn a signal handler that triggers shutdown
    pub fn spawn_signal_handler(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            let reason = wait_for_signal().await;
            info!("");
            info!("Received shutdown signal ({})", reason);
            info!("Shutting down gracefully...");
            manager.trigger();
        });
    }

    /// Request shutdown
    pub fn trigger(&self) {
        self.flag.store(false, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Check if the process should continue running
    pub fn is_running(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    match unix_signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = signal::ctrl_c() => "Ctrl+C",
                _ = terminate.recv() => "SIGTERM",
            }
        }
        Err(_) => {
            let _ = signal::ctrl_c().await;
            "Ctrl+C"
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = signal::ctrl_c().await;
    "Ctrl+C"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_after_trigger() {
        let shutdown = ShutdownManager::new();
        assert!(shutdown.is_running());

        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
        assert!(!shutdown.is_running());
    }

    #[tokio::test]
    async fn test_wait_after_trigger_is_immediate() {
        let shutdown = ShutdownManager::new();
        shutdown.trigger();
        tokio::time::timeout(Duration::from_millis(100), shutdown.wait())
            .await
            .unwrap();
    }
}
