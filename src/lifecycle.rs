//! Lifecycle orchestration.
//!
//! Sequences the connection manager, chat hook selection, relay pump,
//! presence scheduler and console capture through
//! `Idle -> Initializing -> Running -> Stopping -> Idle`. A reload tears the
//! whole chain down and rebuilds it from a fresh configuration snapshot;
//! nothing from the previous cycle survives into the next one.
//!
//! `init()` and `stop()` block on network I/O and must run on a dedicated
//! executor, never on the game's tick thread.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::commands;
use crate::common::error::{ConfigError, Result};
use crate::common::{ChatSourceMode, ConnectionState, GameEvent, NetworkMessage};
use crate::config::types::Config;
use crate::config::validate_config;
use crate::console::{ConsoleFilter, ConsoleForwarder, ConsoleTap};
use crate::game::GameHost;
use crate::gateway::connection::ConnectionManager;
use crate::gateway::{send_detached, ChatGateway};
use crate::presence::PresenceTask;
use crate::relay::{spawn_relay_pump, CapabilityProbe, ChatHookSelector, EventRelay, ListenerRegistry};

/// Time bound on the best-effort shutdown announcement. Teardown must not
/// stall on network trouble before the disconnect grace window even starts.
const ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Produces a fresh configuration snapshot for each cycle.
pub type ConfigLoader =
    Arc<dyn Fn() -> std::result::Result<Config, ConfigError> + Send + Sync>;

/// Builds a gateway for one cycle. Inbound network messages must be
/// forwarded into the given sender.
pub type GatewayFactory = Arc<
    dyn Fn(&Config, mpsc::UnboundedSender<NetworkMessage>) -> Arc<dyn ChatGateway> + Send + Sync,
>;

/// Orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Initializing,
    Running,
    Stopping,
}

/// Everything owned by one lifecycle cycle.
///
/// Dropped wholesale on stop; a reload constructs a fresh one. No cycle
/// ever observes state from a prior cycle.
struct CycleContext {
    config: Arc<Config>,
    mode: ChatSourceMode,
    connection: ConnectionManager,
    registry: Arc<RwLock<ListenerRegistry>>,
    game_tx: mpsc::UnboundedSender<GameEvent>,
    pump: JoinHandle<()>,
    presence: Option<PresenceTask>,
    console: Option<ConsoleForwarder>,
}

/// The bridge lifecycle orchestrator.
pub struct Lifecycle {
    config_loader: ConfigLoader,
    gateway_factory: GatewayFactory,
    game: Arc<dyn GameHost>,
    probe: CapabilityProbe,
    console_tap: ConsoleTap,
    state: LifecycleState,
    cycle: Option<CycleContext>,
}

impl Lifecycle {
    pub fn new(
        config_loader: ConfigLoader,
        gateway_factory: GatewayFactory,
        game: Arc<dyn GameHost>,
        probe: CapabilityProbe,
    ) -> Self {
        Self {
            config_loader,
            gateway_factory,
            game,
            probe,
            console_tap: ConsoleTap::new(),
            state: LifecycleState::Idle,
            cycle: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The tap to wire into the host's tracing subscriber stack, once, at
    /// process start.
    pub fn console_tap(&self) -> ConsoleTap {
        self.console_tap.clone()
    }

    /// Active chat-source mode, when running.
    pub fn active_mode(&self) -> Option<ChatSourceMode> {
        self.cycle.as_ref().map(|c| c.mode)
    }

    /// Connection state of the current cycle.
    pub fn connection_state(&self) -> ConnectionState {
        self.cycle
            .as_ref()
            .map(|c| c.connection.state())
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Sender the host pushes game events into, when running.
    pub fn game_event_sender(&self) -> Option<mpsc::UnboundedSender<GameEvent>> {
        self.cycle.as_ref().map(|c| c.game_tx.clone())
    }

    /// Start a new lifecycle cycle.
    ///
    /// A credential or connectivity failure aborts the whole start: no
    /// listeners are registered and no background task is created.
    pub async fn init(&mut self) -> Result<()> {
        if self.state != LifecycleState::Idle {
            return Err(crate::common::BridgeError::Lifecycle {
                message: format!("init() called in state {:?}", self.state),
            });
        }
        self.state = LifecycleState::Initializing;

        match self.start_cycle().await {
            Ok(cycle) => {
                info!(mode = ?cycle.mode, "Bridge initialized");
                self.cycle = Some(cycle);
                self.state = LifecycleState::Running;
                Ok(())
            }
            Err(e) => {
                error!("Error starting the bridge: {}", e);
                self.cycle = None;
                self.state = LifecycleState::Idle;
                Err(e)
            }
        }
    }

    async fn start_cycle(&self) -> Result<CycleContext> {
        let config = (self.config_loader)()?;
        validate_config(&config)?;
        let config = Arc::new(config);

        let (network_tx, network_rx) = mpsc::unbounded_channel::<NetworkMessage>();
        let gateway = (self.gateway_factory)(&config, network_tx);
        let connection = ConnectionManager::new(Arc::clone(&gateway));

        // Fatal-abort point: nothing below runs when the handshake fails.
        connection.connect().await?;

        let selector = ChatHookSelector::new(Arc::clone(&self.probe));
        let mode = selector.select_mode(&config.channels);
        let mut registry = ListenerRegistry::new();
        selector.register_listeners(mode, &mut registry);
        let registry = Arc::new(RwLock::new(registry));

        let relay = Arc::new(EventRelay::new(mode, &config));
        let (game_tx, game_rx) = mpsc::unbounded_channel::<GameEvent>();
        let pump = spawn_relay_pump(
            Arc::clone(&relay),
            Arc::clone(&registry),
            game_rx,
            network_rx,
            Arc::clone(&gateway),
            Arc::clone(&self.game),
        );

        let presence = if config.core.enable_presence_updater {
            Some(PresenceTask::spawn(
                Arc::clone(&config),
                Arc::clone(&gateway),
                Arc::clone(&self.game),
            ))
        } else {
            None
        };

        let console = if config.core.enable_console_capture && !config.channels.console.is_empty()
        {
            Some(ConsoleForwarder::install(
                self.console_tap.clone(),
                ConsoleFilter::from_config(&config.console),
                Arc::clone(&gateway),
                config.channels.console.clone(),
            ))
        } else {
            None
        };

        if !config.channels.main.is_empty() {
            send_detached(
                Arc::clone(&gateway),
                config.channels.main.clone(),
                config.messages.server_starting.clone(),
            );
        }

        Ok(CycleContext {
            config,
            mode,
            connection,
            registry,
            game_tx,
            pump,
            presence,
            console,
        })
    }

    /// Tear the current cycle down.
    ///
    /// Ordering matters: the presence task is cancelled and awaited first so
    /// no tick races teardown, then listeners are unregistered and the pump
    /// stopped, then the console tap is removed, and the connection closes
    /// last under its bounded grace window.
    pub async fn stop(&mut self) {
        let Some(cycle) = self.cycle.take() else {
            return;
        };
        self.state = LifecycleState::Stopping;

        if !cycle.config.channels.main.is_empty() {
            let gateway = cycle.connection.gateway();
            let announce = gateway.send_message(
                &cycle.config.channels.main,
                &cycle.config.messages.server_stopping,
            );
            match tokio::time::timeout(ANNOUNCE_TIMEOUT, announce).await {
                Ok(_) => {}
                Err(_) => warn!("Timed out announcing shutdown to the main channel"),
            }
        }

        if let Some(presence) = cycle.presence {
            presence.stop().await;
        }

        if let Ok(mut registry) = cycle.registry.write() {
            registry.unregister_all();
        }
        cycle.pump.abort();

        if let Some(console) = cycle.console {
            console.stop().await;
        }

        let grace = Duration::from_secs(cycle.config.core.shutdown_grace_seconds);
        cycle.connection.disconnect(grace).await;

        self.state = LifecycleState::Idle;
        info!("Bridge stopped");
    }

    /// `stop()` strictly sequenced before a fresh `init()`.
    ///
    /// An init failure is reported to the caller; the previous session is
    /// not restored.
    pub async fn reload(&mut self) -> Result<()> {
        info!("Reloading the bridge...");
        self.stop().await;
        self.init().await?;
        info!("Bridge reloaded successfully");
        Ok(())
    }

    /// Administrative broadcast to every external channel named `name`.
    pub async fn broadcast(
        &self,
        permitted: bool,
        name: &str,
        message: &str,
    ) -> Result<String> {
        let Some(cycle) = self.cycle.as_ref() else {
            return Err(crate::common::BridgeError::Lifecycle {
                message: "bridge is not running".to_string(),
            });
        };
        commands::broadcast(&cycle.connection.gateway(), permitted, name, message).await
    }
}
