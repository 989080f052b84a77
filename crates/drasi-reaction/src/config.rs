//! Configuration for reactions
//!
//! This module contains the runtime settings a reaction serves with and the
//! accessor reactions use for their own platform-supplied settings. Values
//! come from environment variables with platform defaults; builder overrides
//! take precedence.

use std::env;
use std::path::PathBuf;

use tracing::warn;

/// Environment variable naming the pubsub component events arrive on
pub const PUBSUB_NAME_VAR: &str = "PubsubName";

/// Environment variable naming the query configuration directory
pub const QUERY_CONFIG_PATH_VAR: &str = "QueryConfigPath";

/// Environment variable naming the serving port
pub const APP_PORT_VAR: &str = "APP_PORT";

/// Runtime settings for a reaction
#[derive(Debug, Clone)]
pub struct ReactionSettings {
    /// Port to listen on; 0 picks a free port
    pub port: u16,

    /// Pubsub component query results are delivered through
    pub pubsub_name: String,

    /// Directory holding one configuration file per subscribed query
    pub query_config_directory: PathBuf,
}

fn default_port() -> u16 {
    80
}

fn default_pubsub_name() -> String {
    "drasi-pubsub".to_string()
}

fn default_query_config_directory() -> PathBuf {
    PathBuf::from("/etc/queries")
}

impl ReactionSettings {
    /// Load settings from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(port) = env::var(APP_PORT_VAR) {
            if let Ok(port) = port.parse::<u16>() {
                settings.port = port;
            } else {
                warn!("Invalid {} value: {}", APP_PORT_VAR, port);
            }
        }

        if let Ok(pubsub_name) = env::var(PUBSUB_NAME_VAR) {
            settings.pubsub_name = pubsub_name;
        }

        if let Ok(path) = env::var(QUERY_CONFIG_PATH_VAR) {
            settings.query_config_directory = PathBuf::from(path);
        }

        settings
    }
}

impl Default for ReactionSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            pubsub_name: default_pubsub_name(),
            query_config_directory: default_query_config_directory(),
        }
    }
}

/// Read a reaction-level configuration value from the environment.
///
/// The platform passes reaction settings as environment variables; this is
/// the accessor reactions use for values such as `baseUrl` or
/// `QueryContainerId`. Empty values count as absent.
pub fn config_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

/// Read a reaction-level configuration value, with a default
pub fn config_value_or(key: &str, default: &str) -> String {
    config_value(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_platform_conventions() {
        let settings = ReactionSettings::default();
        assert_eq!(settings.port, 80);
        assert_eq!(settings.pubsub_name, "drasi-pubsub");
        assert_eq!(
            settings.query_config_directory,
            PathBuf::from("/etc/queries")
        );
    }

    #[test]
    fn config_values_come_from_the_environment() {
        env::set_var("DRASI_SETTINGS_TEST_KEY", "forty-two");
        assert_eq!(
            config_value("DRASI_SETTINGS_TEST_KEY").as_deref(),
            Some("forty-two")
        );
        env::remove_var("DRASI_SETTINGS_TEST_KEY");

        assert_eq!(config_value("DRASI_SETTINGS_TEST_KEY"), None);
        assert_eq!(
            config_value_or("DRASI_SETTINGS_TEST_KEY", "fallback"),
            "fallback"
        );
    }
}
