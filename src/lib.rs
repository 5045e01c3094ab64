//! Herald - chat and presence relay core for game servers
//!
//! Connects a game server to Discord and relays traffic both ways: chat,
//! joins, leaves and broadcasts flow outward, channel messages flow back
//! into the game. A recurring task keeps a channel topic and the bot
//! presence in sync with live server metrics, and qualifying console log
//! lines can be mirrored to a dedicated channel.
//!
//! The host embeds a [`Lifecycle`] and drives it:
//!
//! 1. Construct it with a config loader, a gateway factory, a [`GameHost`]
//!    and a capability probe, then wire [`Lifecycle::console_tap`] into the
//!    tracing subscriber stack (see [`init_tracing`]).
//! 2. Call [`Lifecycle::init`] on server start, push game events through
//!    [`Lifecycle::game_event_sender`], and call [`Lifecycle::stop`] on
//!    server shutdown. [`Lifecycle::reload`] rebuilds everything from a
//!    fresh configuration snapshot.

pub mod commands;
pub mod common;
pub mod config;
pub mod console;
pub mod game;
pub mod gateway;
pub mod lifecycle;
pub mod presence;
pub mod relay;

pub use common::{BridgeError, GameEvent, Result};
pub use config::{load_and_validate, Config};
pub use game::GameHost;
pub use gateway::ChatGateway;
pub use lifecycle::{ConfigLoader, GatewayFactory, Lifecycle, LifecycleState};

/// Install the default tracing subscriber stack with console capture wired
/// in. Call once at process start, before the first [`Lifecycle::init`].
pub fn init_tracing(tap: console::ConsoleTap) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(console::ConsoleLayer::new(tap))
        .init();
}
