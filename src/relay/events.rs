//! The bidirectional event dispatch path.
//!
//! Game events become outbound relay messages routed through the table in
//! [`super::router`]; inbound network messages become in-game effects.
//! Outbound delivery is fire-and-forget: a send failure is logged and the
//! message dropped, the event producer is never blocked or failed.

use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::common::{
    ChatSourceMode, GameEvent, NetworkMessage, Origin, RelayMessage,
};
use crate::config::types::Config;
use crate::game::GameHost;
use crate::gateway::{send_detached, ChatGateway};
use crate::relay::format::{FormatContext, MessageFormatter};
use crate::relay::hooks::ListenerRegistry;
use crate::relay::router::RoutingTable;

/// Converts events between the game side and the network side.
pub struct EventRelay {
    table: RoutingTable,
    config: Config,
}

impl EventRelay {
    pub fn new(mode: ChatSourceMode, config: &Config) -> Self {
        Self {
            table: RoutingTable::new(mode, config),
            config: config.clone(),
        }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Transform a game event into zero or more outbound relay messages.
    ///
    /// Events whose category has no route, or whose every target binding is
    /// disabled or not outbound, produce nothing.
    pub fn on_game_event(&self, event: &GameEvent) -> Vec<RelayMessage> {
        let messages = &self.config.messages;

        let (author, body, channel) = match event {
            GameEvent::Chat {
                player,
                message,
                channel,
            } => {
                let ctx = FormatContext::new(player, message)
                    .with_channel(channel.clone().unwrap_or_default());
                (
                    player.clone(),
                    MessageFormatter::new(&messages.chat_format).format(&ctx),
                    channel.as_deref(),
                )
            }
            GameEvent::Join { player } => (
                player.clone(),
                MessageFormatter::new(&messages.join_format)
                    .format(&FormatContext::new(player, "")),
                None,
            ),
            GameEvent::Leave { player } => (
                player.clone(),
                MessageFormatter::new(&messages.leave_format)
                    .format(&FormatContext::new(player, "")),
                None,
            ),
            GameEvent::Broadcast { message } => (
                String::new(),
                MessageFormatter::new(&messages.broadcast_format)
                    .format(&FormatContext::new("", message)),
                None,
            ),
            GameEvent::StaffChat { player, message } => (
                player.clone(),
                MessageFormatter::new(&messages.staff_format)
                    .format(&FormatContext::new(player, message)),
                None,
            ),
            GameEvent::StaffAlert { message } => (
                String::new(),
                MessageFormatter::new(&messages.staff_alert_format)
                    .format(&FormatContext::new("", message)),
                None,
            ),
            GameEvent::HelpRequest { player, message } => (
                player.clone(),
                MessageFormatter::new(&messages.help_format)
                    .format(&FormatContext::new(player, message)),
                None,
            ),
        };

        let targets = self.table.outbound_targets(event.category(), channel);
        if targets.is_empty() {
            debug!(category = ?event.category(), "No outbound route for game event");
            return Vec::new();
        }

        vec![RelayMessage {
            origin: Origin::Game,
            author,
            body,
            targets,
        }]
    }

    /// Transform an inbound network message into a game-side relay message.
    ///
    /// Returns `None` when the source channel has no inbound binding, which
    /// includes channels bound outbound-only.
    pub fn on_network_message(&self, msg: &NetworkMessage) -> Option<RelayMessage> {
        let logical = self.table.inbound_logical(&msg.channel_id)?;

        let mut ctx = FormatContext::new(&msg.author, &msg.content);
        if let Some(channel) = logical.strip_prefix("channel:") {
            ctx = ctx.with_channel(channel);
        }
        let formatted =
            MessageFormatter::new(&self.config.messages.network_to_game_format).format(&ctx);

        Some(RelayMessage {
            origin: Origin::Network,
            author: msg.author.clone(),
            body: formatted,
            targets: vec![logical.to_string()],
        })
    }

    /// Apply a network-origin relay message to the game.
    ///
    /// `channel:*` targets go to the named in-game channel so inbound
    /// traffic keeps the channel identity of its outbound mapping.
    pub fn apply_to_game(&self, msg: &RelayMessage, game: &dyn GameHost) {
        for target in &msg.targets {
            match target.as_str() {
                "staff-global" => game.deliver_staff_chat(&msg.body),
                name => match name.strip_prefix("channel:") {
                    Some(channel) => game.deliver_channel_chat(channel, &msg.body),
                    None => game.deliver_chat(&msg.body),
                },
            }
        }
    }
}

/// Spawn the relay pump: the single consumer of game events and inbound
/// network messages for one lifecycle cycle.
///
/// Game events whose category has no registered listener are ignored, which
/// is how unregistering listeners at stop() quiesces the dispatch path.
pub fn spawn_relay_pump(
    relay: Arc<EventRelay>,
    registry: Arc<RwLock<ListenerRegistry>>,
    mut game_rx: mpsc::UnboundedReceiver<GameEvent>,
    mut network_rx: mpsc::UnboundedReceiver<NetworkMessage>,
    gateway: Arc<dyn ChatGateway>,
    game: Arc<dyn GameHost>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = game_rx.recv() => {
                    let Some(event) = event else { break };
                    let listening = registry
                        .read()
                        .map(|r| r.is_listening(event.category()))
                        .unwrap_or(false);
                    if !listening {
                        continue;
                    }
                    for message in relay.on_game_event(&event) {
                        for target in &message.targets {
                            send_detached(
                                Arc::clone(&gateway),
                                target.clone(),
                                message.body.clone(),
                            );
                        }
                    }
                }
                msg = network_rx.recv() => {
                    let Some(msg) = msg else { break };
                    if let Some(message) = relay.on_network_message(&msg) {
                        relay.apply_to_game(&message, game.as_ref());
                    }
                }
            }
        }
        debug!("Relay pump ended");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::router::tests::make_config;

    #[test]
    fn test_chat_event_routes_to_main() {
        let relay = EventRelay::new(ChatSourceMode::Vanilla, &make_config());

        let messages = relay.on_game_event(&GameEvent::Chat {
            player: "Steve".to_string(),
            message: "hello".to_string(),
            channel: None,
        });

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].origin, Origin::Game);
        assert_eq!(messages[0].body, "**Steve**: hello");
        assert_eq!(messages[0].targets, vec!["100"]);
    }

    #[test]
    fn test_join_leave_broadcast_formats() {
        let relay = EventRelay::new(ChatSourceMode::Vanilla, &make_config());

        let join = relay.on_game_event(&GameEvent::Join {
            player: "Alex".to_string(),
        });
        assert_eq!(join[0].body, "**Alex** joined the server");

        let leave = relay.on_game_event(&GameEvent::Leave {
            player: "Alex".to_string(),
        });
        assert_eq!(leave[0].body, "**Alex** left the server");

        let broadcast = relay.on_game_event(&GameEvent::Broadcast {
            message: "restarting".to_string(),
        });
        assert_eq!(broadcast[0].body, "**[Server]** restarting");
    }

    #[test]
    fn test_unrouted_category_produces_nothing() {
        let relay = EventRelay::new(ChatSourceMode::Vanilla, &make_config());

        let messages = relay.on_game_event(&GameEvent::StaffChat {
            player: "Mod".to_string(),
            message: "psst".to_string(),
        });
        assert!(messages.is_empty());
    }

    #[test]
    fn test_disabled_main_binding_produces_nothing() {
        let mut config = make_config();
        config.channels.main = String::new();
        let relay = EventRelay::new(ChatSourceMode::Vanilla, &config);

        let messages = relay.on_game_event(&GameEvent::Chat {
            player: "Steve".to_string(),
            message: "hello".to_string(),
            channel: None,
        });
        assert!(messages.is_empty());
    }

    #[test]
    fn test_inbound_message_maps_to_game_effect() {
        let relay = EventRelay::new(ChatSourceMode::Vanilla, &make_config());

        let message = relay
            .on_network_message(&NetworkMessage {
                channel_id: "100".to_string(),
                author: "RemoteUser".to_string(),
                content: "hi from outside".to_string(),
            })
            .unwrap();

        assert_eq!(message.origin, Origin::Network);
        assert_eq!(message.body, "[Discord] RemoteUser: hi from outside");
        assert_eq!(message.targets, vec!["main"]);
    }

    #[test]
    fn test_inbound_on_outbound_only_channel_produces_nothing() {
        let relay = EventRelay::new(ChatSourceMode::Vanilla, &make_config());

        // "200" is the console channel, bound outbound-only.
        let message = relay.on_network_message(&NetworkMessage {
            channel_id: "200".to_string(),
            author: "RemoteUser".to_string(),
            content: "hello?".to_string(),
        });
        assert!(message.is_none());
    }

    #[test]
    fn test_inbound_named_channel_stays_in_its_channel() {
        use crate::game::testing::FakeHost;

        let mut config = make_config();
        config
            .channels
            .multi_channel
            .insert("Trade".to_string(), "400".to_string());
        let relay = EventRelay::new(ChatSourceMode::MultiChannel, &config);
        let host = FakeHost::new();

        let message = relay
            .on_network_message(&NetworkMessage {
                channel_id: "400".to_string(),
                author: "RemoteUser".to_string(),
                content: "wts dirt".to_string(),
            })
            .unwrap();
        assert_eq!(message.targets, vec!["channel:trade"]);

        relay.apply_to_game(&message, &host);

        // Delivered to the trade channel, not global chat.
        assert_eq!(
            *host.channel_lines.lock().unwrap(),
            vec![(
                "trade".to_string(),
                "[Discord] RemoteUser: wts dirt".to_string()
            )]
        );
        assert!(host.chat_lines.lock().unwrap().is_empty());
    }

    #[test]
    fn test_apply_to_game_picks_delivery_path() {
        use crate::game::testing::FakeHost;

        let relay = EventRelay::new(ChatSourceMode::StaffChat, &make_config());
        let host = FakeHost::new();

        relay.apply_to_game(
            &RelayMessage {
                origin: Origin::Network,
                author: "Mod".to_string(),
                body: "staff only".to_string(),
                targets: vec!["staff-global".to_string()],
            },
            &host,
        );
        relay.apply_to_game(
            &RelayMessage {
                origin: Origin::Network,
                author: "User".to_string(),
                body: "everyone".to_string(),
                targets: vec!["main".to_string()],
            },
            &host,
        );

        assert_eq!(*host.staff_lines.lock().unwrap(), vec!["staff only"]);
        assert_eq!(*host.chat_lines.lock().unwrap(), vec!["everyone"]);
    }

    #[tokio::test]
    async fn test_pump_ignores_unlistened_categories() {
        use crate::game::testing::FakeHost;
        use crate::gateway::testing::FakeGateway;
        use crate::relay::hooks::{ChatHookSelector, ListenerRegistry};

        let config = make_config();
        let relay = Arc::new(EventRelay::new(ChatSourceMode::Vanilla, &config));
        let gateway = Arc::new(FakeGateway::new());
        let game = Arc::new(FakeHost::new());

        let mut registry = ListenerRegistry::new();
        let selector = ChatHookSelector::new(Arc::new(|_: &str| false));
        selector.register_listeners(ChatSourceMode::Vanilla, &mut registry);
        let registry = Arc::new(RwLock::new(registry));

        let (game_tx, game_rx) = mpsc::unbounded_channel();
        let (network_tx, network_rx) = mpsc::unbounded_channel();

        let handle = spawn_relay_pump(
            relay,
            Arc::clone(&registry),
            game_rx,
            network_rx,
            gateway.clone(),
            game,
        );

        // StaffChat has no listener in vanilla mode.
        game_tx
            .send(GameEvent::StaffChat {
                player: "Mod".to_string(),
                message: "psst".to_string(),
            })
            .unwrap();
        game_tx
            .send(GameEvent::Chat {
                player: "Steve".to_string(),
                message: "hello".to_string(),
                channel: None,
            })
            .unwrap();

        drop(game_tx);
        // Closing the network side too can make the unbiased select! exit
        // before the queued game events are drained; the sends are also
        // detached. Wait for the send to land before closing it.
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while gateway.sends_to("100").is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("send did not land");
        drop(network_tx);
        handle.await.unwrap();

        let sends = gateway.sends_to("100");
        assert_eq!(sends, vec!["**Steve**: hello"]);
    }
}
