//! Configuration file parsing (HOCON format).
//!
//! On first run the config file does not exist yet; [`load_or_init`] writes
//! a commented template and returns an error telling the operator to fill in
//! the token, instead of failing with a bare file-not-found.

use std::path::Path;

use hocon::HoconLoader;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Template written when no config file exists yet.
const DEFAULT_CONFIG: &str = r#"core {
    # Bot token for the chat network. The bridge will not start until this
    # is set.
    token = "YOUR_BOT_TOKEN_HERE"

    enable_presence_updater = true
    # Minutes between presence/topic updates. Values below 10 are raised.
    presence_interval_minutes = 10

    enable_console_capture = false
    shutdown_grace_seconds = 10
}

channels {
    # External channel ids. An empty id disables that binding.
    main = ""
    console = ""
    staff_global = ""
    staff_internal = ""
    help_request = ""

    # At most one chat integration may be enabled.
    use_staff_chat = false
    use_multi_channel = false
    # In-game channel name -> external channel id, for multi-channel mode.
    multi_channel {}
}
"#;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
}

/// Load a config file, writing the commented template first if it is missing.
pub fn load_or_init(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        std::fs::write(path, DEFAULT_CONFIG).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        return Err(ConfigError::Validation {
            message: format!(
                "a default config was written to '{}'; set core.token and the \
                 channel ids, then reload",
                path.display()
            ),
        });
    }

    load_config(path)
}
