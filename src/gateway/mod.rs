//! Chat-network gateway abstraction.
//!
//! The relay core talks to the external chat network exclusively through the
//! [`ChatGateway`] trait so the whole dispatch path can be exercised against
//! a fake in tests. The production implementation lives in
//! [`discord::DiscordGateway`].

pub mod connection;
pub mod discord;

use std::sync::Arc;

use serenity::async_trait;
use tracing::warn;

use crate::common::error::Result;
use crate::common::ConnectionState;

/// Client for the external chat network.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Establish a session and block until it is fully ready.
    ///
    /// Returns `BridgeError::CredentialInvalid` when the handshake is
    /// rejected for a bad token, `BridgeError::Connectivity` for transport
    /// failures. Both are fatal for this lifecycle start; no retry happens
    /// here.
    async fn connect(&self) -> Result<()>;

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Request a clean session close. Returns immediately; completion is
    /// observed through `state()` reaching `Shutdown`.
    async fn begin_shutdown(&self);

    /// Terminate the session without waiting for a clean close.
    async fn force_shutdown(&self);

    /// Send a message to an external channel.
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<()>;

    /// Replace the topic of an external channel.
    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<()>;

    /// Replace the bot's presence status text.
    async fn set_status(&self, status: &str) -> Result<()>;

    /// External channel ids whose display name matches `name`.
    async fn channels_named(&self, name: &str) -> Vec<String>;
}

/// Send a message without awaiting the result.
///
/// The non-blocking contract of the dispatch path: a send failure is logged
/// and the message dropped, the producer is never blocked or failed.
pub fn send_detached(gateway: Arc<dyn ChatGateway>, channel_id: String, content: String) {
    tokio::spawn(async move {
        if let Err(e) = gateway.send_message(&channel_id, &content).await {
            warn!(target: "herald::gateway::send", channel_id, "dropped outbound message: {}", e);
        }
    });
}
