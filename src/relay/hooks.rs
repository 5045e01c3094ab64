//! Chat hook selection and listener registration.
//!
//! Exactly one chat-source mode is active per lifecycle cycle, chosen from
//! the configuration flags and the presence of the companion plugins. A
//! requested integration whose companion plugin is absent degrades to
//! vanilla with a warning; it is never fatal.

use std::sync::Arc;

use tracing::{info, warn};

use crate::common::{ChatSourceMode, EventCategory};
use crate::config::types::ChannelsConfig;

/// Answers "is the named capability (companion plugin) present?".
///
/// Injected so tests can substitute a fake probe.
pub type CapabilityProbe = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A named set of game-event listeners.
#[derive(Debug, Clone)]
pub struct ListenerSet {
    pub name: String,
    pub categories: Vec<EventCategory>,
}

/// The always-on minimal listener set: join/leave/broadcast relay works in
/// every mode.
fn baseline_listeners() -> ListenerSet {
    ListenerSet {
        name: "baseline".to_string(),
        categories: vec![
            EventCategory::Join,
            EventCategory::Leave,
            EventCategory::Broadcast,
        ],
    }
}

/// The mode-specific listener set.
fn mode_listeners(mode: ChatSourceMode) -> ListenerSet {
    match mode {
        ChatSourceMode::Vanilla => ListenerSet {
            name: "vanilla".to_string(),
            categories: vec![EventCategory::Chat],
        },
        ChatSourceMode::StaffChat => ListenerSet {
            name: "staff-chat".to_string(),
            categories: vec![
                EventCategory::Chat,
                EventCategory::StaffChat,
                EventCategory::StaffAlert,
                EventCategory::HelpRequest,
            ],
        },
        ChatSourceMode::MultiChannel => ListenerSet {
            name: "multi-channel".to_string(),
            categories: vec![EventCategory::Chat],
        },
    }
}

/// Registered listener sets for one lifecycle cycle.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    sets: Vec<ListenerSet>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, set: ListenerSet) {
        info!("Registering listener set '{}'", set.name);
        self.sets.push(set);
    }

    pub fn unregister_all(&mut self) {
        for set in self.sets.drain(..) {
            info!("Unregistering listener set '{}'", set.name);
        }
    }

    pub fn is_listening(&self, category: EventCategory) -> bool {
        self.sets.iter().any(|s| s.categories.contains(&category))
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }
}

/// Selects the chat-source mode and registers its listeners.
pub struct ChatHookSelector {
    probe: CapabilityProbe,
}

impl ChatHookSelector {
    pub fn new(probe: CapabilityProbe) -> Self {
        Self { probe }
    }

    /// Pick the active mode from configuration flags and plugin presence.
    ///
    /// Priority: staff-chat, then multi-channel, then vanilla. A requested
    /// integration with no companion plugin logs exactly one warning and
    /// falls back to vanilla.
    pub fn select_mode(&self, channels: &ChannelsConfig) -> ChatSourceMode {
        if channels.use_staff_chat {
            if (self.probe)("staffchat") {
                info!("Hooking into the staff-chat plugin");
                return ChatSourceMode::StaffChat;
            }
            warn!(
                "Configured to hook into the staff-chat plugin, but it isn't loaded! \
                 Disable use_staff_chat or load the plugin. Falling back to vanilla chat."
            );
            return ChatSourceMode::Vanilla;
        }

        if channels.use_multi_channel {
            if (self.probe)("multichannel") {
                info!("Hooking into the multi-channel chat plugin");
                return ChatSourceMode::MultiChannel;
            }
            warn!(
                "Configured to hook into the multi-channel chat plugin, but it isn't loaded! \
                 Disable use_multi_channel or load the plugin. Falling back to vanilla chat."
            );
            return ChatSourceMode::Vanilla;
        }

        info!("No chat hook enabled, using the vanilla chat system");
        ChatSourceMode::Vanilla
    }

    /// Register exactly one mode listener set plus the always-on baseline.
    pub fn register_listeners(&self, mode: ChatSourceMode, registry: &mut ListenerRegistry) {
        registry.register(mode_listeners(mode));
        registry.register(baseline_listeners());
    }
}
