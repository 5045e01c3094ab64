//! Periodic presence and topic updates.
//!
//! A recurring task expands the topic and status templates from live server
//! metrics and applies them to the main channel and the bot presence. The
//! topic is written every tick; the status only when it changed, to avoid
//! redundant external writes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::common::BridgeError;
use crate::config::types::{ChannelBinding, Config};
use crate::game::GameHost;
use crate::gateway::ChatGateway;
use crate::relay::format::expand_status_template;

/// Minimum updater interval. Configured values below this are raised.
pub const INTERVAL_FLOOR_MINUTES: u64 = 10;

/// Effective tick interval for a configuration.
pub fn effective_interval(config: &Config) -> Duration {
    let minutes = config
        .core
        .presence_interval_minutes
        .max(INTERVAL_FLOOR_MINUTES);
    Duration::from_secs(minutes * 60)
}

/// Last-applied status string. Updates are skipped when the newly computed
/// string equals the cached one.
#[derive(Debug, Default)]
pub struct StatusCache {
    last: Option<String>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `status` differs from the cached value, and caches
    /// it.
    pub fn should_apply(&mut self, status: &str) -> bool {
        if self.last.as_deref() == Some(status) {
            return false;
        }
        self.last = Some(status.to_string());
        true
    }
}

/// One scheduler tick. Idempotent; no cross-tick state beyond the cache.
///
/// Failures are contained to this tick: an unresolvable main channel or a
/// failed external write is logged and the task keeps running.
pub async fn run_tick(
    gateway: &Arc<dyn ChatGateway>,
    game: &Arc<dyn GameHost>,
    main_binding: Option<&ChannelBinding>,
    config: &Config,
    cache: &mut StatusCache,
) {
    let Some(binding) = main_binding.filter(|b| b.is_enabled()) else {
        let err = BridgeError::ChannelUnresolvable {
            channel: "main".to_string(),
        };
        error!(
            "{} - set channels.main to a valid channel id and reload",
            err
        );
        return;
    };

    let metrics = game.metrics();

    let topic = expand_status_template(&config.messages.topic_format, &metrics);
    if let Err(e) = gateway.set_topic(&binding.external_id, &topic).await {
        warn!("Failed to update channel topic: {}", e);
    }

    let status_template = &config.messages.bot_status;
    if status_template.is_empty() {
        return;
    }

    let status = expand_status_template(status_template, &metrics);
    if !cache.should_apply(&status) {
        debug!("Status unchanged, skipping presence write");
        return;
    }
    if let Err(e) = gateway.set_status(&status).await {
        warn!("Failed to update presence status: {}", e);
    }
}

/// Handle for the running scheduler task of one lifecycle cycle.
pub struct PresenceTask {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PresenceTask {
    /// Spawn the recurring updater. The first tick fires one interval after
    /// start.
    pub fn spawn(
        config: Arc<Config>,
        gateway: Arc<dyn ChatGateway>,
        game: Arc<dyn GameHost>,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = effective_interval(&config);

        let handle = tokio::spawn(async move {
            let main_binding = config
                .bindings()
                .into_iter()
                .find(|b| b.name == "main");
            let mut cache = StatusCache::new();
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        run_tick(&gateway, &game, main_binding.as_ref(), &config, &mut cache)
                            .await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Presence scheduler ended");
        });

        info!(
            "Presence updater started (every {} minutes)",
            period.as_secs() / 60
        );
        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Cancel the task and wait for it to finish. Teardown must not proceed
    /// until this returns, so no tick can race with it.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}
