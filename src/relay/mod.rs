//! Bidirectional message relay: routing, hook selection, dispatch and
//! formatting.

pub mod events;
pub mod format;
pub mod hooks;
pub mod router;

pub use events::{spawn_relay_pump, EventRelay};
pub use hooks::{CapabilityProbe, ChatHookSelector, ListenerRegistry};
pub use router::RoutingTable;
