//! Error types for the relay core.

use thiserror::Error;

/// Top-level bridge error.
///
/// Fatal variants (`CredentialInvalid`, `Connectivity`, `Config`) abort
/// `init()` and surface to the host. All other variants are soft: they are
/// logged by the operation that produced them and never propagate to the
/// game-event or logging call sites.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(
        "the bot token was rejected by the chat network\n\
         The token in the config is invalid!\n\
         You probably didn't set the token yet - edit your config and reload."
    )]
    CredentialInvalid,

    #[error("error connecting to the chat network (this is not a bridge bug): {message}")]
    Connectivity { message: String },

    #[error("companion plugin '{plugin}' is not loaded")]
    DependencyMissing { plugin: String },

    #[error("channel '{channel}' could not be resolved to an external channel")]
    ChannelUnresolvable { channel: String },

    #[error("failed to send to channel '{channel}': {message}")]
    SendFailure { channel: String, message: String },

    #[error("graceful shutdown did not complete within {grace_secs}s, forcing termination")]
    ShutdownTimeout { grace_secs: u64 },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{message}")]
    Command { message: String },

    #[error("lifecycle error: {message}")]
    Lifecycle { message: String },
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {message}")]
    Parse { message: String },

    #[error("config validation failed:\n{message}")]
    Validation { message: String },
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
