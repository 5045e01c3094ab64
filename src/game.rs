//! Game-server host interface.
//!
//! The hosting game server implements [`GameHost`] and hands the relay core
//! a handle at construction time. All methods are expected to be fast; the
//! relay calls them from its own tasks, never from the game tick thread.

use crate::common::ServerMetrics;

/// Handle into the hosting game server.
pub trait GameHost: Send + Sync {
    /// Show a line of chat to every online player.
    fn deliver_chat(&self, text: &str);

    /// Show a line of chat to the members of a named in-game channel.
    /// Only called when the multi-channel integration is active.
    fn deliver_channel_chat(&self, channel: &str, text: &str);

    /// Show a line of chat to staff members only.
    fn deliver_staff_chat(&self, text: &str);

    /// Live server metrics for the presence templates. The online player
    /// count must already exclude hidden players.
    fn metrics(&self) -> ServerMetrics;
}
