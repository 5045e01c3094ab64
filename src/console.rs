//! Console log capture and forwarding.
//!
//! A `tracing` layer taps log records synchronously on the logging thread.
//! Qualifying records are enqueued without blocking; a separate forwarder
//! task sends them to the configured console channel in emission order.
//!
//! The layer itself is installed once in the host's subscriber stack; the
//! per-cycle install/uninstall happens on the shared [`ConsoleTap`] handle,
//! and only when the feature flag is set and the console binding is
//! non-empty.

use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Level};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::config::types::ConsoleConfig;
use crate::gateway::ChatGateway;

/// Log targets that must never be captured: forwarding their records would
/// feed the capture loop with its own output.
const EXCLUDED_TARGET_PREFIXES: &[&str] = &["herald::gateway", "herald::console"];

/// One captured console line.
#[derive(Debug, Clone)]
pub struct ConsoleLine {
    pub level: Level,
    pub target: String,
    pub body: String,
}

/// Level/origin filter for captured records.
#[derive(Debug)]
pub struct ConsoleFilter {
    min_level: Level,
    ignore_origins: Vec<fancy_regex::Regex>,
}

impl ConsoleFilter {
    /// Build from config. Invalid patterns are skipped here; validation
    /// reports them to the operator before a cycle ever starts.
    pub fn from_config(config: &ConsoleConfig) -> Self {
        let min_level = match config.min_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        let ignore_origins = config
            .ignore_origins
            .iter()
            .filter_map(|p| fancy_regex::Regex::new(p).ok())
            .collect();

        Self {
            min_level,
            ignore_origins,
        }
    }

    pub fn qualifies(&self, level: &Level, target: &str) -> bool {
        if *level > self.min_level {
            return false;
        }
        if EXCLUDED_TARGET_PREFIXES
            .iter()
            .any(|prefix| target.starts_with(prefix))
        {
            return false;
        }
        !self
            .ignore_origins
            .iter()
            .any(|re| re.is_match(target).unwrap_or(false))
    }
}

/// Shared install point for the console capture.
///
/// Cheap to clone; the tracing layer holds one clone for the process
/// lifetime while lifecycle cycles install and uninstall the active sink.
#[derive(Clone, Default)]
pub struct ConsoleTap {
    sink: Arc<RwLock<Option<Sink>>>,
}

struct Sink {
    tx: mpsc::UnboundedSender<ConsoleLine>,
    filter: ConsoleFilter,
}

impl ConsoleTap {
    pub fn new() -> Self {
        Self::default()
    }

    fn install(&self, tx: mpsc::UnboundedSender<ConsoleLine>, filter: ConsoleFilter) {
        *self.sink.write().expect("tap lock poisoned") = Some(Sink { tx, filter });
    }

    pub fn uninstall(&self) {
        *self.sink.write().expect("tap lock poisoned") = None;
    }

    pub fn is_installed(&self) -> bool {
        self.sink.read().expect("tap lock poisoned").is_some()
    }

    /// Offer a record to the tap. Runs synchronously on the logging thread,
    /// so it must not block: filtering plus an unbounded enqueue only.
    pub fn capture(&self, level: Level, target: &str, body: String) {
        let guard = self.sink.read().expect("tap lock poisoned");
        let Some(sink) = guard.as_ref() else {
            return;
        };
        if !sink.filter.qualifies(&level, target) {
            return;
        }
        let _ = sink.tx.send(ConsoleLine {
            level,
            target: target.to_string(),
            body,
        });
    }
}

/// Tracing layer feeding the tap. Install once in the subscriber stack.
pub struct ConsoleLayer {
    tap: ConsoleTap,
}

impl ConsoleLayer {
    pub fn new(tap: ConsoleTap) -> Self {
        Self { tap }
    }
}

impl<S: tracing::Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        // Skip the visitor entirely when no cycle has a sink installed.
        if !self.tap.is_installed() {
            return;
        }

        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.tap
            .capture(*metadata.level(), metadata.target(), visitor.message);
    }
}

/// Extracts the `message` field of an event.
#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// The per-cycle forwarder half of the console capture.
pub struct ConsoleForwarder {
    tap: ConsoleTap,
    handle: JoinHandle<()>,
}

impl ConsoleForwarder {
    /// Install the capture for this cycle and start forwarding to the given
    /// external channel.
    ///
    /// Lines are sent sequentially from a single worker so they arrive in
    /// emission order regardless of which thread produced them.
    pub fn install(
        tap: ConsoleTap,
        filter: ConsoleFilter,
        gateway: Arc<dyn ChatGateway>,
        channel_id: String,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ConsoleLine>();
        tap.install(tx, filter);

        let handle = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if let Err(e) = gateway.send_message(&channel_id, &line.body).await {
                    warn!(
                        target: "herald::console",
                        "dropped console line: {}", e
                    );
                }
            }
            debug!(target: "herald::console", "Console forwarder ended");
        });

        Self { tap, handle }
    }

    /// Uninstall the tap and wait for queued lines to drain.
    pub async fn stop(self) {
        self.tap.uninstall();
        // Uninstalling dropped the only sender; the worker exits after the
        // queue drains.
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::FakeGateway;

    fn default_filter() -> ConsoleFilter {
        ConsoleFilter::from_config(&ConsoleConfig::default())
    }

    #[test]
    fn test_filter_by_level() {
        let filter = default_filter();

        assert!(filter.qualifies(&Level::INFO, "server::world"));
        assert!(filter.qualifies(&Level::ERROR, "server::world"));
        assert!(!filter.qualifies(&Level::DEBUG, "server::world"));
    }

    #[test]
    fn test_filter_excludes_own_send_path() {
        let filter = default_filter();

        assert!(!filter.qualifies(&Level::WARN, "herald::gateway::send"));
        assert!(!filter.qualifies(&Level::WARN, "herald::console"));
    }

    #[test]
    fn test_filter_by_origin_pattern() {
        let config = ConsoleConfig {
            min_level: "info".to_string(),
            ignore_origins: vec!["^server::auth".to_string()],
        };
        let filter = ConsoleFilter::from_config(&config);

        assert!(!filter.qualifies(&Level::INFO, "server::auth::session"));
        assert!(filter.qualifies(&Level::INFO, "server::world"));
    }

    #[test]
    fn test_uninstalled_tap_drops_records() {
        let tap = ConsoleTap::new();
        assert!(!tap.is_installed());

        // Must be a no-op, not a panic or a queue growing somewhere.
        tap.capture(Level::INFO, "server::world", "hello".to_string());
    }

    #[tokio::test]
    async fn test_forwarding_preserves_emission_order() {
        let tap = ConsoleTap::new();
        let gateway = Arc::new(FakeGateway::new());

        let forwarder = ConsoleForwarder::install(
            tap.clone(),
            default_filter(),
            gateway.clone(),
            "200".to_string(),
        );

        for i in 0..50 {
            tap.capture(Level::INFO, "server::world", format!("line {}", i));
        }

        forwarder.stop().await;

        let sent = gateway.sends_to("200");
        let expected: Vec<String> = (0..50).map(|i| format!("line {}", i)).collect();
        assert_eq!(sent, expected);
    }

    #[tokio::test]
    async fn test_stop_uninstalls_tap() {
        let tap = ConsoleTap::new();
        let gateway = Arc::new(FakeGateway::new());

        let forwarder =
            ConsoleForwarder::install(tap.clone(), default_filter(), gateway, "200".to_string());
        assert!(tap.is_installed());

        forwarder.stop().await;
        assert!(!tap.is_installed());
    }

    #[tokio::test]
    async fn test_unqualified_lines_not_forwarded() {
        let tap = ConsoleTap::new();
        let gateway = Arc::new(FakeGateway::new());

        let forwarder = ConsoleForwarder::install(
            tap.clone(),
            default_filter(),
            gateway.clone(),
            "200".to_string(),
        );

        tap.capture(Level::DEBUG, "server::world", "too quiet".to_string());
        tap.capture(Level::INFO, "server::world", "loud enough".to_string());

        forwarder.stop().await;

        assert_eq!(gateway.sends_to("200"), vec!["loud enough"]);
    }
}
