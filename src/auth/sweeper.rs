//! Background worker that evicts expired sessions and login states.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::auth::session::{SessionStore, SweepStats};

/// Periodic sweeper over a [`SessionStore`].
pub struct SessionSweeper {
    store: Arc<SessionStore>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl SessionSweeper {
    /// Create a sweeper running every `interval`.
    #[must_use]
    pub fn new(store: Arc<SessionStore>, interval: Duration) -> Self {
        Self {
            store,
            interval: interval.max(Duration::from_secs(1)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Notifier that stops the worker; call `notify_one` on it.
    #[must_use]
    pub fn shutdown_notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Spawn the worker on the current runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(interval = ?self.interval, "Starting session sweeper");
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {
                    let stats = self.sweep_once();
                    if stats.sessions > 0 || stats.logins > 0 {
                        info!(
                            sessions = stats.sessions,
                            logins = stats.logins,
                            "Evicted expired sessions"
                        );
                    } else {
                        debug!("Session sweep found nothing to evict");
                    }
                }
                () = self.shutdown.notified() => {
                    info!("Session sweeper shutting down");
                    break;
                }
            }
        }
    }

    /// Run one sweep.
    #[must_use]
    pub fn sweep_once(&self) -> SweepStats {
        self.store.cleanup_expired()
    }
}
