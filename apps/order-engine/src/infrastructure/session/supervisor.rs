//! Keepalive supervisor.
//!
//! Pings the session on a fixed interval. A failed check (or a session that
//! never came up) starts a reconnect loop with exponential backoff and
//! jitter; each successful reconnect bumps a watch counter that the
//! reconciliation task listens on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::managed::ManagedSession;
use super::reconnect::ReconnectPolicy;
use super::venue::VenueClient;
use crate::application::ports::BrokerSession;
use crate::config::{ReconnectConfig, SessionConfig};
use crate::observability;

/// Background task keeping the broker session alive.
pub struct SessionSupervisor<C: VenueClient> {
    session: Arc<ManagedSession<C>>,
    reconnect: ReconnectConfig,
    interval: Duration,
    reconnects: watch::Sender<u64>,
    shutdown: CancellationToken,
}

impl<C: VenueClient> SessionSupervisor<C> {
    /// Create a supervisor and the receiver for its reconnect counter.
    #[must_use]
    pub fn new(
        session: Arc<ManagedSession<C>>,
        config: &SessionConfig,
        shutdown: CancellationToken,
    ) -> (Self, watch::Receiver<u64>) {
        let (reconnects, rx) = watch::channel(0);
        let supervisor = Self {
            session,
            reconnect: config.reconnect.clone(),
            interval: config.keepalive_interval(),
            reconnects,
            shutdown,
        };
        (supervisor, rx)
    }

    /// Spawn the supervisor loop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut keepalive = tokio::time::interval(self.interval);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = self.interval.as_secs(), "Session supervisor started");
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                _ = keepalive.tick() => {}
            }

            if self.session.heartbeat().await {
                continue;
            }
            if !self.restore().await {
                break;
            }
        }
        tracing::info!("Session supervisor stopped");
    }

    /// Reconnect until success, exhaustion, or shutdown.
    ///
    /// Returns false only on shutdown.
    async fn restore(&self) -> bool {
        let mut policy = ReconnectPolicy::new(&self.reconnect);
        loop {
            if self.session.connect().await {
                observability::record_reconnect_attempt("success");
                self.reconnects.send_modify(|generation| *generation += 1);
                tracing::info!(
                    attempts = policy.current_attempt() + 1,
                    generation = *self.reconnects.borrow(),
                    "Broker session restored"
                );
                return true;
            }
            observability::record_reconnect_attempt("failure");

            let Some(backoff) = policy.next_backoff() else {
                tracing::error!(
                    attempts = policy.current_attempt(),
                    "Reconnection attempts exhausted, retrying after next keepalive"
                );
                return true;
            };
            tracing::info!(
                backoff_ms = backoff.as_millis(),
                attempt = policy.current_attempt(),
                "Reconnecting broker session"
            );
            tokio::select! {
                () = tokio::time::sleep(backoff) => {}
                () = self.shutdown.cancelled() => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaperVenueConfig;
    use crate::infrastructure::session::paper::PaperVenue;

    fn config() -> SessionConfig {
        SessionConfig {
            keepalive_interval_secs: 1,
            reconnect: ReconnectConfig {
                initial_backoff_ms: 100,
                max_backoff_ms: 1_000,
                multiplier: 2.0,
                max_attempts: 5,
            },
            paper: PaperVenueConfig {
                auto_fill: false,
                ..PaperVenueConfig::default()
            },
            ..SessionConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dead_session_is_restored_and_counted() {
        let config = config();
        let venue = PaperVenue::new(&config.paper, None);
        let control = venue.control();
        let session = Arc::new(ManagedSession::new(venue, &config));
        assert!(session.connect().await);

        let shutdown = CancellationToken::new();
        let (supervisor, mut reconnects) =
            SessionSupervisor::new(Arc::clone(&session), &config, shutdown.clone());
        let handle = supervisor.spawn();

        control.set_reachable(false);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!session.is_connected());
        assert_eq!(*reconnects.borrow(), 0);

        control.set_reachable(true);
        tokio::time::timeout(Duration::from_secs(30), reconnects.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*reconnects.borrow_and_update(), 1);
        assert!(session.is_connected());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn session_that_never_connected_is_brought_up() {
        let config = config();
        let venue = PaperVenue::new(&config.paper, None);
        let session = Arc::new(ManagedSession::new(venue, &config));

        let shutdown = CancellationToken::new();
        let (supervisor, mut reconnects) =
            SessionSupervisor::new(Arc::clone(&session), &config, shutdown.clone());
        let handle = supervisor.spawn();

        tokio::time::timeout(Duration::from_secs(5), reconnects.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(session.is_connected());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
