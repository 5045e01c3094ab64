//! Table-driven message routing.
//!
//! Maps game event categories to logical channel names, and logical names to
//! external channel bindings. Unmatched categories produce no targets; that
//! is a silent drop, not an error.

use std::collections::HashMap;

use crate::common::{ChatSourceMode, EventCategory};
use crate::config::types::{ChannelBinding, Config};

/// Routing table for one lifecycle cycle.
#[derive(Debug)]
pub struct RoutingTable {
    mode: ChatSourceMode,
    /// Event category -> logical channel names.
    routes: HashMap<EventCategory, Vec<String>>,
    /// Logical channel name -> binding.
    bindings: HashMap<String, ChannelBinding>,
}

impl RoutingTable {
    /// Build the routing table for the active chat-source mode.
    pub fn new(mode: ChatSourceMode, config: &Config) -> Self {
        let mut routes: HashMap<EventCategory, Vec<String>> = HashMap::new();

        // Always-on baseline: join/leave/broadcast and global chat relay
        // work regardless of mode.
        for category in [
            EventCategory::Chat,
            EventCategory::Join,
            EventCategory::Leave,
            EventCategory::Broadcast,
        ] {
            routes.insert(category, vec!["main".to_string()]);
        }

        if mode == ChatSourceMode::StaffChat {
            routes.insert(EventCategory::StaffChat, vec!["staff-global".to_string()]);
            routes.insert(EventCategory::StaffAlert, vec!["staff-internal".to_string()]);
            routes.insert(EventCategory::HelpRequest, vec!["help-request".to_string()]);
        }

        let bindings = config
            .bindings()
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect();

        Self {
            mode,
            routes,
            bindings,
        }
    }

    /// Resolve a logical channel name to its binding.
    pub fn binding(&self, logical: &str) -> Option<&ChannelBinding> {
        self.bindings.get(logical)
    }

    /// External channel ids an event should be delivered to.
    ///
    /// `channel` is the in-game channel name for multi-channel chat events.
    /// Disabled bindings and bindings that do not allow outbound traffic are
    /// skipped silently.
    pub fn outbound_targets(&self, category: EventCategory, channel: Option<&str>) -> Vec<String> {
        // Named in-game channels only route in multi-channel mode, and only
        // through their own mapping.
        if category == EventCategory::Chat && channel.is_some() {
            if self.mode != ChatSourceMode::MultiChannel {
                return Vec::new();
            }
            let logical = format!("channel:{}", channel.unwrap_or_default().to_lowercase());
            return self
                .bindings
                .get(&logical)
                .filter(|b| b.is_enabled() && b.direction.allows_outbound())
                .map(|b| vec![b.external_id.clone()])
                .unwrap_or_default();
        }

        let Some(logicals) = self.routes.get(&category) else {
            return Vec::new();
        };

        logicals
            .iter()
            .filter_map(|name| self.bindings.get(name))
            .filter(|b| b.is_enabled() && b.direction.allows_outbound())
            .map(|b| b.external_id.clone())
            .collect()
    }

    /// Logical channel name an inbound network message maps onto.
    ///
    /// Returns `None` when no binding matches the external channel or the
    /// matching binding does not allow inbound traffic.
    pub fn inbound_logical(&self, external_id: &str) -> Option<&str> {
        self.bindings
            .values()
            .find(|b| b.is_enabled() && b.external_id == external_id)
            .filter(|b| b.direction.allows_inbound())
            .map(|b| b.name.as_str())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::types::{ChannelsConfig, Config, ConsoleConfig, CoreConfig, MessagesConfig};
    use std::collections::HashMap;

    pub(crate) fn make_config() -> Config {
        Config {
            core: CoreConfig {
                token: "token".to_string(),
                enable_presence_updater: true,
                presence_interval_minutes: 10,
                enable_console_capture: false,
                shutdown_grace_seconds: 10,
            },
            channels: ChannelsConfig {
                main: "100".to_string(),
                console: "200".to_string(),
                staff_global: "300".to_string(),
                staff_internal: "301".to_string(),
                help_request: "302".to_string(),
                use_staff_chat: false,
                use_multi_channel: false,
                multi_channel: HashMap::new(),
            },
            messages: MessagesConfig::default(),
            console: ConsoleConfig::default(),
        }
    }

    #[test]
    fn test_baseline_routes_to_main() {
        let table = RoutingTable::new(ChatSourceMode::Vanilla, &make_config());

        for category in [
            EventCategory::Chat,
            EventCategory::Join,
            EventCategory::Leave,
            EventCategory::Broadcast,
        ] {
            assert_eq!(table.outbound_targets(category, None), vec!["100"]);
        }
    }

    #[test]
    fn test_staff_events_unrouted_in_vanilla_mode() {
        let table = RoutingTable::new(ChatSourceMode::Vanilla, &make_config());

        assert!(table.outbound_targets(EventCategory::StaffChat, None).is_empty());
        assert!(table.outbound_targets(EventCategory::HelpRequest, None).is_empty());
    }

    #[test]
    fn test_staff_mode_routes_staff_channels() {
        let table = RoutingTable::new(ChatSourceMode::StaffChat, &make_config());

        assert_eq!(
            table.outbound_targets(EventCategory::StaffChat, None),
            vec!["300"]
        );
        assert_eq!(
            table.outbound_targets(EventCategory::StaffAlert, None),
            vec!["301"]
        );
        assert_eq!(
            table.outbound_targets(EventCategory::HelpRequest, None),
            vec!["302"]
        );
    }

    #[test]
    fn test_disabled_binding_is_skipped() {
        let mut config = make_config();
        config.channels.staff_global = String::new();
        let table = RoutingTable::new(ChatSourceMode::StaffChat, &config);

        assert!(table.outbound_targets(EventCategory::StaffChat, None).is_empty());
    }

    #[test]
    fn test_multi_channel_chat_routing() {
        let mut config = make_config();
        config
            .channels
            .multi_channel
            .insert("Trade".to_string(), "400".to_string());

        let table = RoutingTable::new(ChatSourceMode::MultiChannel, &config);
        assert_eq!(
            table.outbound_targets(EventCategory::Chat, Some("trade")),
            vec!["400"]
        );
        // Unmapped named channel: silent drop.
        assert!(table
            .outbound_targets(EventCategory::Chat, Some("local"))
            .is_empty());
        // Global chat still goes to main.
        assert_eq!(table.outbound_targets(EventCategory::Chat, None), vec!["100"]);
    }

    #[test]
    fn test_inbound_lookup_honors_direction() {
        let table = RoutingTable::new(ChatSourceMode::Vanilla, &make_config());

        assert_eq!(table.inbound_logical("100"), Some("main"));
        // Console is outbound-only.
        assert_eq!(table.inbound_logical("200"), None);
        // Unknown external id.
        assert_eq!(table.inbound_logical("999"), None);
    }
}
