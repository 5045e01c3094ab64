//! Administrative command surface.

use std::sync::Arc;

use crate::common::error::Result;
use crate::common::BridgeError;
use crate::gateway::{send_detached, ChatGateway};

/// Broadcast a free-text message to every external channel matching `name`.
///
/// Requires an elevated permission; resolving it is the host's job and the
/// outcome is passed as `permitted`. Returns a human-readable confirmation
/// on success.
pub async fn broadcast(
    gateway: &Arc<dyn ChatGateway>,
    permitted: bool,
    name: &str,
    message: &str,
) -> Result<String> {
    if !permitted {
        return Err(BridgeError::Command {
            message: "You do not have permission to broadcast".to_string(),
        });
    }

    let channels = gateway.channels_named(name).await;
    if channels.is_empty() {
        return Err(BridgeError::Command {
            message: "Could not send message! Are you sure a channel with this name exists?"
                .to_string(),
        });
    }

    let count = channels.len();
    for channel_id in channels {
        send_detached(Arc::clone(gateway), channel_id, message.to_string());
    }

    Ok(format!("Message sent to {} channel(s)!", count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::FakeGateway;

    #[tokio::test]
    async fn test_broadcast_sends_to_all_matching_channels() {
        let fake = Arc::new(FakeGateway::new());
        let gateway: Arc<dyn ChatGateway> = fake.clone();

        // The fake resolves "general" to two channel ids.
        let confirmation = broadcast(&gateway, true, "general", "hello everyone")
            .await
            .unwrap();
        assert_eq!(confirmation, "Message sent to 2 channel(s)!");

        tokio::task::yield_now().await;
        assert_eq!(fake.sends_to("100"), vec!["hello everyone"]);
        assert_eq!(fake.sends_to("101"), vec!["hello everyone"]);
    }

    #[tokio::test]
    async fn test_broadcast_unknown_channel_is_an_error() {
        let gateway: Arc<dyn ChatGateway> = Arc::new(FakeGateway::new());

        let err = broadcast(&gateway, true, "nowhere", "hello").await.unwrap_err();
        assert!(err.to_string().contains("channel with this name"));
    }

    #[tokio::test]
    async fn test_broadcast_requires_permission() {
        let fake = Arc::new(FakeGateway::new());
        let gateway: Arc<dyn ChatGateway> = fake.clone();

        let err = broadcast(&gateway, false, "general", "hello").await.unwrap_err();
        assert!(err.to_string().contains("permission"));
        assert!(fake.calls().is_empty());
    }
}
