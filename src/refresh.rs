//! Background refresh timer
//!
//! Ticks on a fixed interval and tells the main loop to reload the dashboard.
//! The reload itself goes through the cached client, so a tick during a
//! cooldown or inside a TTL costs no API calls.

use std::time::Duration;
use tokio::sync::mpsc;

/// Default dashboard refresh interval
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Messages sent from the refresh timer to the main app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshMessage {
    /// The refresh interval elapsed
    RefreshDue,
}

/// Configuration for the refresh timer
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
    /// Whether auto-refresh is enabled
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            enabled: true,
        }
    }
}

/// Handle for controlling the background refresh timer
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Spawns the timer task; must be called inside a tokio runtime
    ///
    /// The first tick fires one full interval after spawning, since the
    /// caller loads once at startup.
    pub fn spawn(config: RefreshConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(4);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            let period = config.interval;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                // Skip the first tick (immediate)
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            tracing::debug!("refresh due");
                            // A full channel means a reload is already pending
                            if let Err(mpsc::error::TrySendError::Closed(_)) =
                                msg_tx.try_send(RefreshMessage::RefreshDue)
                            {
                                break;
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            shutdown_tx,
        }
    }

    /// Stops the timer task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Checks for a pending refresh message without blocking
pub fn try_recv(handle: &mut RefreshHandle) -> Option<RefreshMessage> {
    handle.receiver.try_recv().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_config_default() {
        let config = RefreshConfig::default();
        assert_eq!(config.interval, Duration::from_secs(900));
        assert!(config.enabled);
    }

    #[tokio::test]
    async fn test_refresh_handle_spawn_disabled() {
        let config = RefreshConfig {
            enabled: false,
            ..Default::default()
        };

        let mut handle = RefreshHandle::spawn(config);

        // With refresh disabled, there should be no messages
        assert!(try_recv(&mut handle).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_due_after_interval() {
        let mut handle = RefreshHandle::spawn(RefreshConfig {
            interval: Duration::from_secs(60),
            enabled: true,
        });

        // Nothing right after startup
        tokio::task::yield_now().await;
        assert!(try_recv(&mut handle).is_none());

        let message = handle.receiver.recv().await;
        assert_eq!(message, Some(RefreshMessage::RefreshDue));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_timer() {
        let mut handle = RefreshHandle::spawn(RefreshConfig {
            interval: Duration::from_secs(60),
            enabled: true,
        });
        let RefreshHandle {
            receiver,
            shutdown_tx,
        } = &mut handle;
        shutdown_tx.send(()).await.unwrap();

        // The task exits and drops its sender, closing the channel
        assert_eq!(receiver.recv().await, None);
    }
}
