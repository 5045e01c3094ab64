//! Connection lifecycle management for the chat-network client.
//!
//! Owns connect and disconnect for one lifecycle cycle. There is no
//! automatic reconnect: a lost session requires the host to restart the
//! lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::common::error::Result;
use crate::common::{BridgeError, ConnectionState};
use crate::gateway::ChatGateway;

/// Poll interval while waiting for a clean shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(500);

/// Manages the session of one lifecycle cycle.
pub struct ConnectionManager {
    gateway: Arc<dyn ChatGateway>,
}

impl ConnectionManager {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> Arc<dyn ChatGateway> {
        Arc::clone(&self.gateway)
    }

    pub fn state(&self) -> ConnectionState {
        self.gateway.state()
    }

    /// Connect and block until the session is fully established.
    ///
    /// Credential rejections and transport failures are both fatal for this
    /// start attempt and abort the whole lifecycle init.
    pub async fn connect(&self) -> Result<()> {
        info!("Connecting to the chat network...");
        match self.gateway.connect().await {
            Ok(()) => {
                info!("Chat network session established");
                Ok(())
            }
            Err(e @ BridgeError::CredentialInvalid) => {
                error!("ERROR STARTING THE BRIDGE:\n{}", e);
                Err(e)
            }
            Err(e) => {
                error!("Failed to connect: {}", e);
                Err(e)
            }
        }
    }

    /// Request a clean close and wait up to `grace` for it to complete.
    ///
    /// When the grace window elapses the session is terminated forcibly; the
    /// host's own shutdown sequence must never hang on ours.
    pub async fn disconnect(&self, grace: Duration) {
        info!("Disconnecting from the chat network...");

        let state = self.gateway.state();
        if matches!(state, ConnectionState::Shutdown | ConnectionState::Disconnected) {
            return;
        }

        self.gateway.begin_shutdown().await;

        let deadline = Instant::now() + grace;
        while self.gateway.state() != ConnectionState::Shutdown {
            if Instant::now() >= deadline {
                let timeout = BridgeError::ShutdownTimeout {
                    grace_secs: grace.as_secs(),
                };
                warn!("{}", timeout);
                self.gateway.force_shutdown().await;
                return;
            }
            sleep(SHUTDOWN_POLL).await;
        }

        info!("Chat network session closed cleanly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::FakeGateway;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_connect_reaches_ready() {
        let gateway = Arc::new(FakeGateway::new());
        let manager = ConnectionManager::new(gateway.clone());

        tokio_test::assert_ok!(manager.connect().await);
        assert_eq!(manager.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn test_credential_rejection_is_fatal() {
        let gateway = Arc::new(FakeGateway::rejecting(BridgeError::CredentialInvalid));
        let manager = ConnectionManager::new(gateway);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, BridgeError::CredentialInvalid));
    }

    #[tokio::test]
    async fn test_clean_disconnect() {
        let gateway = Arc::new(FakeGateway::new());
        let manager = ConnectionManager::new(gateway.clone());

        manager.connect().await.unwrap();
        manager.disconnect(Duration::from_secs(5)).await;
        assert_eq!(manager.state(), ConnectionState::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_window_expiry_forces_termination() {
        let mut gateway = FakeGateway::new();
        gateway.hang_on_shutdown = true;
        let gateway = Arc::new(gateway);
        let manager = ConnectionManager::new(gateway.clone());

        manager.connect().await.unwrap();
        manager.disconnect(Duration::from_secs(3)).await;

        // Forced termination still lands in Shutdown.
        assert_eq!(manager.state(), ConnectionState::Shutdown);
    }
}
