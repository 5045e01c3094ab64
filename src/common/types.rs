//! Shared types used across the relay core.

use std::time::Duration;

/// Which side of the bridge a message originated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced by a game-side event.
    Game,
    /// Produced by an inbound chat-network message.
    Network,
}

/// The unit of bidirectional chat content carried across the bridge.
///
/// Immutable once constructed; consumed by exactly one dispatch path.
/// For `Origin::Game` messages `targets` holds external channel ids, for
/// `Origin::Network` messages it holds the logical game-side channel names
/// the effect applies to.
#[derive(Debug, Clone)]
pub struct RelayMessage {
    pub origin: Origin,
    pub author: String,
    pub body: String,
    pub targets: Vec<String>,
}

/// Connection lifecycle states for the chat-network client.
///
/// Transitions are monotonic forward, except that a reload resets
/// `ShuttingDown`/`Shutdown` back to `Disconnected` for the fresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    ShuttingDown,
    Shutdown,
}

/// The selected in-game chat integration strategy.
///
/// Exactly one is active per lifecycle cycle, selected once at `init()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatSourceMode {
    /// Baseline chat handling with no companion plugin.
    Vanilla,
    /// Staff/help chat suite companion plugin.
    StaffChat,
    /// Named multi-channel chat companion plugin.
    MultiChannel,
}

impl ChatSourceMode {
    /// Capability name of the companion plugin backing this mode, if any.
    pub fn capability(&self) -> Option<&'static str> {
        match self {
            Self::Vanilla => None,
            Self::StaffChat => Some("staffchat"),
            Self::MultiChannel => Some("multichannel"),
        }
    }
}

/// Category of a game-side event, used for table-driven routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Chat,
    Join,
    Leave,
    Broadcast,
    StaffChat,
    StaffAlert,
    HelpRequest,
}

/// An event produced by the game server.
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// Player chat. `channel` carries the in-game channel name when the
    /// multi-channel integration is active, `None` for global chat.
    Chat {
        player: String,
        message: String,
        channel: Option<String>,
    },
    Join { player: String },
    Leave { player: String },
    /// Server-wide broadcast (no player author).
    Broadcast { message: String },
    /// Staff channel chat (staff-chat integration only).
    StaffChat { player: String, message: String },
    /// Internal moderation notice (staff-chat integration only).
    StaffAlert { message: String },
    /// A player asking staff for help (staff-chat integration only).
    HelpRequest { player: String, message: String },
}

impl GameEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            Self::Chat { .. } => EventCategory::Chat,
            Self::Join { .. } => EventCategory::Join,
            Self::Leave { .. } => EventCategory::Leave,
            Self::Broadcast { .. } => EventCategory::Broadcast,
            Self::StaffChat { .. } => EventCategory::StaffChat,
            Self::StaffAlert { .. } => EventCategory::StaffAlert,
            Self::HelpRequest { .. } => EventCategory::HelpRequest,
        }
    }
}

/// An inbound message from the chat network.
#[derive(Debug, Clone)]
pub struct NetworkMessage {
    /// External channel id the message was posted in.
    pub channel_id: String,
    /// Author display name.
    pub author: String,
    /// Message content.
    pub content: String,
}

/// Live server metrics consumed by the presence templates.
#[derive(Debug, Clone, Copy)]
pub struct ServerMetrics {
    /// Online players, hidden players already excluded.
    pub online_players: u32,
    pub max_players: u32,
    /// Current ticks-per-second, rounded by the host.
    pub tps: u32,
    /// Process uptime.
    pub uptime: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_categories() {
        let event = GameEvent::Chat {
            player: "Steve".to_string(),
            message: "hi".to_string(),
            channel: None,
        };
        assert_eq!(event.category(), EventCategory::Chat);

        let event = GameEvent::Broadcast {
            message: "restart soon".to_string(),
        };
        assert_eq!(event.category(), EventCategory::Broadcast);
    }

    #[test]
    fn test_mode_capabilities() {
        assert_eq!(ChatSourceMode::Vanilla.capability(), None);
        assert_eq!(ChatSourceMode::StaffChat.capability(), Some("staffchat"));
        assert_eq!(
            ChatSourceMode::MultiChannel.capability(),
            Some("multichannel")
        );
    }
}
