//! Configuration validation.
//!
//! Collects every problem in one pass so the operator sees a single
//! aggregated diagnostic instead of fixing errors one at a time.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.core.token.is_empty() {
        errors.push("core.token is required".to_string());
    }
    if config.core.token == "YOUR_BOT_TOKEN_HERE" {
        errors.push("core.token has not been configured (still using placeholder)".to_string());
    }

    if config.core.shutdown_grace_seconds == 0 {
        errors.push("core.shutdown_grace_seconds must be non-zero".to_string());
    }

    if config.channels.use_staff_chat && config.channels.use_multi_channel {
        errors.push(
            "channels.use_staff_chat and channels.use_multi_channel are mutually exclusive"
                .to_string(),
        );
    }

    if config.channels.use_multi_channel && config.channels.multi_channel.is_empty() {
        errors.push(
            "channels.use_multi_channel is set but channels.multi_channel is empty".to_string(),
        );
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.console.min_level.to_lowercase().as_str()) {
        errors.push(format!(
            "console.min_level '{}' is invalid (use: trace, debug, info, warn, error)",
            config.console.min_level
        ));
    }

    for (i, pattern) in config.console.ignore_origins.iter().enumerate() {
        if fancy_regex::Regex::new(pattern).is_err() {
            errors.push(format!(
                "console.ignore_origins[{}] is not a valid regex: '{}'",
                i, pattern
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            message: errors.join("\n"),
        })
    }
}

/// Load a configuration file and validate it in one step.
pub fn load_and_validate(path: &str) -> Result<Config, ConfigError> {
    let config = super::parser::load_config(path)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{ChannelsConfig, Config, ConsoleConfig, CoreConfig, MessagesConfig};
    use std::collections::HashMap;

    fn make_valid_config() -> Config {
        Config {
            core: CoreConfig {
                token: "valid_token_here".to_string(),
                enable_presence_updater: true,
                presence_interval_minutes: 15,
                enable_console_capture: false,
                shutdown_grace_seconds: 10,
            },
            channels: ChannelsConfig {
                main: "111".to_string(),
                console: String::new(),
                staff_global: String::new(),
                staff_internal: String::new(),
                help_request: String::new(),
                use_staff_chat: false,
                use_multi_channel: false,
                multi_channel: HashMap::new(),
            },
            messages: MessagesConfig::default(),
            console: ConsoleConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&make_valid_config()).is_ok());
    }

    #[test]
    fn test_placeholder_token_fails() {
        let mut config = make_valid_config();
        config.core.token = "YOUR_BOT_TOKEN_HERE".to_string();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("placeholder"));
    }

    #[test]
    fn test_mutually_exclusive_hooks_fail() {
        let mut config = make_valid_config();
        config.channels.use_staff_chat = true;
        config.channels.use_multi_channel = true;
        config
            .channels
            .multi_channel
            .insert("trade".to_string(), "1".to_string());

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("mutually exclusive"));
    }

    #[test]
    fn test_invalid_origin_regex_fails() {
        let mut config = make_valid_config();
        config.console.ignore_origins = vec!["[invalid".to_string()];

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a valid regex"));
    }

    #[test]
    fn test_errors_are_aggregated() {
        let mut config = make_valid_config();
        config.core.token = String::new();
        config.core.shutdown_grace_seconds = 0;
        config.console.min_level = "loud".to_string();

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("core.token"));
        assert!(message.contains("shutdown_grace_seconds"));
        assert!(message.contains("min_level"));
    }
}
