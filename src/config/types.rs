//! Configuration type definitions.
//!
//! The `Config` is an immutable snapshot: it is loaded once per lifecycle
//! cycle and replaced wholesale on reload, never mutated in place.

use std::collections::HashMap;

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub core: CoreConfig,
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Core connection and feature toggles.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Bot token for the chat network.
    pub token: String,
    /// Whether the presence/topic updater task runs.
    #[serde(default = "default_true")]
    pub enable_presence_updater: bool,
    /// Updater interval in minutes. A floor of 10 minutes is enforced.
    #[serde(default = "default_interval")]
    pub presence_interval_minutes: u64,
    /// Whether qualifying console log lines are forwarded outward.
    #[serde(default)]
    pub enable_console_capture: bool,
    /// Grace window for clean disconnect before forcing termination.
    #[serde(default = "default_grace")]
    pub shutdown_grace_seconds: u64,
}

/// Channel bindings: logical name -> external channel identifier.
///
/// An empty identifier disables that binding; it is never an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub console: String,
    #[serde(default)]
    pub staff_global: String,
    #[serde(default)]
    pub staff_internal: String,
    #[serde(default)]
    pub help_request: String,
    /// Hook into the staff/help chat companion plugin.
    #[serde(default)]
    pub use_staff_chat: bool,
    /// Hook into the named multi-channel chat companion plugin.
    #[serde(default)]
    pub use_multi_channel: bool,
    /// In-game channel name -> external channel id (multi-channel mode).
    #[serde(default)]
    pub multi_channel: HashMap<String, String>,
}

/// Message format strings and templates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub chat_format: String,
    pub join_format: String,
    pub leave_format: String,
    pub broadcast_format: String,
    pub staff_format: String,
    pub staff_alert_format: String,
    pub help_format: String,
    pub network_to_game_format: String,
    pub server_starting: String,
    pub server_stopping: String,
    /// Channel topic template, expanded with live server metrics.
    pub topic_format: String,
    /// Bot status template. Empty disables status updates.
    pub bot_status: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            chat_format: "**%user**: %message".to_string(),
            join_format: "**%user** joined the server".to_string(),
            leave_format: "**%user** left the server".to_string(),
            broadcast_format: "**[Server]** %message".to_string(),
            staff_format: "**[Staff] %user**: %message".to_string(),
            staff_alert_format: "**[Alert]** %message".to_string(),
            help_format: "**[Help] %user**: %message".to_string(),
            network_to_game_format: "[Discord] %user: %message".to_string(),
            server_starting: "Server is starting!".to_string(),
            server_stopping: "Server is stopping!".to_string(),
            topic_format: "%players%/%maxplayers% online | TPS: %tps% | Up %daysonline%d %hoursonline%h %minutesonline%m".to_string(),
            bot_status: "with %players% players".to_string(),
        }
    }
}

/// Console capture filtering.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Minimum log level forwarded: trace, debug, info, warn or error.
    pub min_level: String,
    /// Regex patterns of log origins (module targets) to ignore.
    pub ignore_origins: Vec<String>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            min_level: "info".to_string(),
            ignore_origins: Vec::new(),
        }
    }
}

/// Allowed message direction for a channel binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Network -> game only.
    Inbound,
    /// Game -> network only.
    Outbound,
    /// Bidirectional.
    Both,
}

impl Direction {
    pub fn allows_outbound(&self) -> bool {
        matches!(self, Direction::Outbound | Direction::Both)
    }

    pub fn allows_inbound(&self) -> bool {
        matches!(self, Direction::Inbound | Direction::Both)
    }
}

/// Mapping from a logical channel name to an external channel id.
#[derive(Debug, Clone)]
pub struct ChannelBinding {
    pub name: String,
    pub external_id: String,
    pub direction: Direction,
}

impl ChannelBinding {
    /// A binding with an empty external id is disabled, never an error.
    pub fn is_enabled(&self) -> bool {
        !self.external_id.is_empty()
    }
}

impl Config {
    /// Derive the channel binding list from the configured channels.
    ///
    /// Disabled (empty) bindings are included so lookups can distinguish
    /// "bound but disabled" from "unknown logical name".
    pub fn bindings(&self) -> Vec<ChannelBinding> {
        let ch = &self.channels;
        let mut bindings = vec![
            ChannelBinding {
                name: "main".to_string(),
                external_id: ch.main.clone(),
                direction: Direction::Both,
            },
            ChannelBinding {
                name: "console".to_string(),
                external_id: ch.console.clone(),
                direction: Direction::Outbound,
            },
            ChannelBinding {
                name: "staff-global".to_string(),
                external_id: ch.staff_global.clone(),
                direction: Direction::Both,
            },
            ChannelBinding {
                name: "staff-internal".to_string(),
                external_id: ch.staff_internal.clone(),
                direction: Direction::Outbound,
            },
            ChannelBinding {
                name: "help-request".to_string(),
                external_id: ch.help_request.clone(),
                direction: Direction::Outbound,
            },
        ];

        for (game_channel, external_id) in &ch.multi_channel {
            bindings.push(ChannelBinding {
                name: format!("channel:{}", game_channel.to_lowercase()),
                external_id: external_id.clone(),
                direction: Direction::Both,
            });
        }

        bindings
    }
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    10
}

fn default_grace() -> u64 {
    10
}
