//! Discord gateway implementation backed by serenity.
//!
//! Handles the session handshake, inbound message forwarding into the relay
//! and the outbound message/topic/status surface.

use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use std::time::Duration;

use serenity::async_trait;
use serenity::builder::EditChannel;
use serenity::cache::Cache;
use serenity::gateway::{ActivityData, ShardManager};
use serenity::http::{Http, HttpError};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::ChannelId;
use serenity::prelude::*;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::common::error::Result;
use crate::common::{BridgeError, ConnectionState, NetworkMessage};
use crate::gateway::ChatGateway;

/// How long to wait for the gateway session to become ready.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Serenity-backed chat gateway.
pub struct DiscordGateway {
    token: String,
    http: Arc<Http>,
    state: Arc<StdRwLock<ConnectionState>>,
    inbound_tx: mpsc::UnboundedSender<NetworkMessage>,
    cache: StdRwLock<Option<Arc<Cache>>>,
    shards: StdRwLock<Option<Arc<ShardManager>>>,
    run_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl DiscordGateway {
    /// Create a gateway for one lifecycle cycle.
    ///
    /// Inbound guild messages are forwarded into `inbound_tx` for the relay
    /// pump to consume.
    pub fn new(token: String, inbound_tx: mpsc::UnboundedSender<NetworkMessage>) -> Self {
        let http = Arc::new(Http::new(&token));
        Self {
            token,
            http,
            state: Arc::new(StdRwLock::new(ConnectionState::Disconnected)),
            inbound_tx,
            cache: StdRwLock::new(None),
            shards: StdRwLock::new(None),
            run_handle: StdMutex::new(None),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write().expect("state lock poisoned") = state;
    }

    /// Validate the token before opening a gateway session.
    ///
    /// A 401 means the token itself is bad and retrying is pointless; any
    /// other failure is a transport problem.
    async fn preflight(&self) -> Result<()> {
        match self.http.get_current_user().await {
            Ok(user) => {
                debug!("Token accepted, authenticated as {}", user.name);
                Ok(())
            }
            Err(serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)))
                if resp.status_code.as_u16() == 401 =>
            {
                Err(BridgeError::CredentialInvalid)
            }
            Err(e) => Err(BridgeError::Connectivity {
                message: e.to_string(),
            }),
        }
    }

    fn parse_channel_id(channel_id: &str) -> Result<ChannelId> {
        channel_id
            .parse::<u64>()
            .map(ChannelId::new)
            .map_err(|_| BridgeError::ChannelUnresolvable {
                channel: channel_id.to_string(),
            })
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn connect(&self) -> Result<()> {
        self.set_state(ConnectionState::Connecting);

        if let Err(e) = self.preflight().await {
            self.set_state(ConnectionState::Disconnected);
            return Err(e);
        }

        let (ready_tx, ready_rx) = oneshot::channel::<()>();

        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILDS;

        let handler = InboundHandler {
            ready_tx: StdMutex::new(Some(ready_tx)),
            inbound_tx: self.inbound_tx.clone(),
        };

        // The relay never reads message history; drop the message cache.
        let mut cache_settings = serenity::cache::Settings::default();
        cache_settings.max_messages = 0;

        let mut client = Client::builder(&self.token, intents)
            .event_handler(handler)
            .cache_settings(cache_settings)
            .await
            .map_err(|e| BridgeError::Connectivity {
                message: e.to_string(),
            })?;

        *self.cache.write().expect("cache lock poisoned") = Some(client.cache.clone());
        *self.shards.write().expect("shards lock poisoned") = Some(client.shard_manager.clone());

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!("Discord client error: {}", e);
            }
            *state.write().expect("state lock poisoned") = ConnectionState::Shutdown;
        });
        *self.run_handle.lock().expect("handle lock poisoned") = Some(handle);

        match tokio::time::timeout(READY_TIMEOUT, ready_rx).await {
            Ok(Ok(())) => {
                self.set_state(ConnectionState::Ready);
                Ok(())
            }
            Ok(Err(_)) => {
                self.force_shutdown().await;
                Err(BridgeError::Connectivity {
                    message: "gateway session closed before becoming ready".to_string(),
                })
            }
            Err(_) => {
                self.force_shutdown().await;
                Err(BridgeError::Connectivity {
                    message: format!(
                        "timed out after {}s waiting for the gateway session",
                        READY_TIMEOUT.as_secs()
                    ),
                })
            }
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.read().expect("state lock poisoned")
    }

    async fn begin_shutdown(&self) {
        self.set_state(ConnectionState::ShuttingDown);
        let shards = self.shards.read().expect("shards lock poisoned").clone();
        if let Some(shards) = shards {
            // The run task flips the state to Shutdown when start() returns.
            tokio::spawn(async move {
                shards.shutdown_all().await;
            });
        } else {
            self.set_state(ConnectionState::Shutdown);
        }
    }

    async fn force_shutdown(&self) {
        let shards = self.shards.read().expect("shards lock poisoned").clone();
        if let Some(shards) = shards {
            shards.shutdown_all().await;
        }
        if let Some(handle) = self.run_handle.lock().expect("handle lock poisoned").take() {
            handle.abort();
        }
        self.set_state(ConnectionState::Shutdown);
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<()> {
        let id = Self::parse_channel_id(channel_id)?;
        id.say(&self.http, content)
            .await
            .map(|_| ())
            .map_err(|e| BridgeError::SendFailure {
                channel: channel_id.to_string(),
                message: e.to_string(),
            })
    }

    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<()> {
        let id = Self::parse_channel_id(channel_id)?;
        id.edit(&self.http, EditChannel::new().topic(topic))
            .await
            .map(|_| ())
            .map_err(|e| BridgeError::SendFailure {
                channel: channel_id.to_string(),
                message: e.to_string(),
            })
    }

    async fn set_status(&self, status: &str) -> Result<()> {
        let shards = self.shards.read().expect("shards lock poisoned").clone();
        let Some(shards) = shards else {
            return Err(BridgeError::Connectivity {
                message: "not connected".to_string(),
            });
        };

        let activity = ActivityData::playing(status);
        for runner in shards.runners.lock().await.values() {
            runner.runner_tx.set_activity(Some(activity.clone()));
        }
        Ok(())
    }

    async fn channels_named(&self, name: &str) -> Vec<String> {
        let cache = self.cache.read().expect("cache lock poisoned").clone();
        let Some(cache) = cache else {
            return Vec::new();
        };

        let wanted = name.to_lowercase();
        let mut ids = Vec::new();
        for guild_id in cache.guilds() {
            if let Some(guild) = cache.guild(guild_id) {
                for (id, channel) in &guild.channels {
                    if channel.name.to_lowercase() == wanted {
                        ids.push(id.get().to_string());
                    }
                }
            }
        }
        ids
    }
}

/// Serenity event handler forwarding inbound traffic into the relay.
struct InboundHandler {
    ready_tx: StdMutex<Option<oneshot::Sender<()>>>,
    inbound_tx: mpsc::UnboundedSender<NetworkMessage>,
}

#[async_trait]
impl EventHandler for InboundHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Connected to Discord as {}", ready.user.name);
        if let Some(tx) = self.ready_tx.lock().expect("ready lock poisoned").take() {
            let _ = tx.send(());
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore our own messages and other bots.
        if msg.author.bot || msg.author.id == ctx.cache.current_user().id {
            return;
        }
        // Only guild channels participate in routing.
        if msg.guild_id.is_none() {
            return;
        }

        let author = msg
            .member
            .as_ref()
            .and_then(|m| m.nick.clone())
            .unwrap_or_else(|| msg.author.name.clone());

        let inbound = NetworkMessage {
            channel_id: msg.channel_id.get().to_string(),
            author,
            content: msg.content.clone(),
        };

        if self.inbound_tx.send(inbound).is_err() {
            debug!("Inbound channel closed, dropping network message");
        }
    }
}
