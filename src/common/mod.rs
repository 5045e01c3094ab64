//! Common utilities and types shared across the relay core.

pub mod error;
pub mod types;

pub use error::{BridgeError, ConfigError, Result};
pub use types::{
    ChatSourceMode, ConnectionState, EventCategory, GameEvent, NetworkMessage, Origin,
    RelayMessage, ServerMetrics,
};
