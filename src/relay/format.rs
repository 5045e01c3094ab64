//! Message and template formatting.
//!
//! Relay formats use `%user` / `%message` / `%channel` / `%time` tokens.
//! Presence templates use `%players%` / `%maxplayers%` / `%tps%` and the
//! uptime tokens `%daysonline%` / `%hoursonline%` / `%minutesonline%`.

use chrono::Local;

use crate::common::ServerMetrics;

/// Formatter that substitutes placeholders in a relay format string.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    format: String,
}

impl MessageFormatter {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Substitute `%time`, `%user`, `%message` and `%channel`.
    pub fn format(&self, ctx: &FormatContext) -> String {
        self.format
            .replace("%time", &current_time())
            .replace("%user", &ctx.user)
            .replace("%message", &ctx.message)
            .replace("%channel", &ctx.channel)
    }
}

/// Context for relay message formatting.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    pub user: String,
    pub message: String,
    pub channel: String,
}

impl FormatContext {
    pub fn new(user: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            message: message.into(),
            channel: String::new(),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

fn current_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Expand a presence template with live server metrics.
///
/// Uptime is decomposed into whole days, hours-of-day and minutes-of-hour.
pub fn expand_status_template(template: &str, metrics: &ServerMetrics) -> String {
    let uptime_mins = metrics.uptime.as_secs() / 60;
    let days = uptime_mins / (24 * 60);
    let hours = (uptime_mins / 60) % 24;
    let minutes = uptime_mins % 60;

    template
        .replace("%players%", &metrics.online_players.to_string())
        .replace("%maxplayers%", &metrics.max_players.to_string())
        .replace("%tps%", &metrics.tps.to_string())
        .replace("%daysonline%", &days.to_string())
        .replace("%hoursonline%", &hours.to_string())
        .replace("%minutesonline%", &minutes.to_string())
}
