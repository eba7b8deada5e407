//! Configuration loading and typed config structures for the marker sync.
//!
//! The configuration lives in `markersync.yaml` in the working directory.
//! Every field has a default, so a missing file or an empty document yields
//! a working setup against `sqlite://players.db`.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use markersync_icons::{DEFAULT_URL_TEMPLATE, ProvisionerConfig};
use markersync_overlay::NamespaceSpec;
use markersync_store::StoreConfig;
use markersync_store::snapshot_reader::is_plain_identifier;
use serde::Deserialize;

use crate::engine::EngineSettings;

/// Smallest tick interval the scheduler accepts, in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Reconciliation cadence and namespace settings.
    #[serde(default)]
    pub sync: ReconcileConfig,

    /// Record-store connection.
    #[serde(default)]
    pub store: RecordStoreConfig,

    /// Icon provisioning.
    #[serde(default)]
    pub icons: IconsConfig,

    /// Observer HTTP API.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// Load `path` if it exists, otherwise start from defaults.
    ///
    /// Environment overrides are applied and the result is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if an existing file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, and
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `DATABASE_URL` overrides `store.database_url`
    /// - `OBSERVER_PORT` overrides `observer.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides and
    /// no validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override connection settings with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `OBSERVER_PORT` is not a port
    /// number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.store.database_url = val;
        }
        if let Ok(val) = std::env::var("OBSERVER_PORT") {
            self.observer.port = val
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("OBSERVER_PORT={val}: {e}")))?;
        }
        Ok(())
    }

    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_owned()));

        if self.sync.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return invalid("sync.tick_interval_ms must be at least 100");
        }
        if self.sync.marker_prefix.is_empty() {
            return invalid("sync.marker_prefix must not be empty");
        }
        if self.sync.namespace_id.trim().is_empty() {
            return invalid("sync.namespace_id must not be empty");
        }
        if self.sync.max_concurrent_creates == 0 {
            return invalid("sync.max_concurrent_creates must be at least 1");
        }
        if self.store.max_connections == 0 {
            return invalid("store.max_connections must be at least 1");
        }
        if !is_plain_identifier(&self.store.table) {
            return invalid("store.table must be a plain SQL identifier");
        }
        if self.icons.timeout_ms == 0 {
            return invalid("icons.timeout_ms must be at least 1");
        }
        if self.icons.max_concurrent_fetches == 0 {
            return invalid("icons.max_concurrent_fetches must be at least 1");
        }
        if self.observer.enabled {
            self.observer.bind_addr()?;
        }
        Ok(())
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconcileConfig {
    /// Milliseconds between tick starts.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Prefix joined to an identity to form its marker ID.
    #[serde(default = "default_marker_prefix")]
    pub marker_prefix: String,

    /// ID of the overlay namespace this process owns.
    #[serde(default = "default_namespace_id")]
    pub namespace_id: String,

    /// Label of the overlay namespace.
    #[serde(default = "default_namespace_label")]
    pub namespace_label: String,

    /// Marker creations (each with its icon lookup) in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_creates: usize,
}

impl ReconcileConfig {
    /// The tick interval as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// The namespace to bootstrap.
    pub fn namespace_spec(&self) -> NamespaceSpec {
        NamespaceSpec::new(&self.namespace_id, &self.namespace_label)
    }

    /// Settings for the reconciliation engine.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            marker_prefix: self.marker_prefix.clone(),
            max_concurrent_creates: self.max_concurrent_creates,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            marker_prefix: default_marker_prefix(),
            namespace_id: default_namespace_id(),
            namespace_label: default_namespace_label(),
            max_concurrent_creates: default_max_concurrent(),
        }
    }
}

/// Record-store connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordStoreConfig {
    /// `SQLite` connection URL.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Connect and acquire timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Table holding the live entities.
    #[serde(default = "default_table")]
    pub table: String,
}

impl RecordStoreConfig {
    /// Pool settings for [`StorePool::connect`](markersync_store::StorePool::connect).
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.database_url)
            .with_max_connections(self.max_connections)
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_table(&self.table)
    }
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            connect_timeout_ms: default_timeout_ms(),
            max_connections: default_max_connections(),
            table: default_table(),
        }
    }
}

/// Icon provisioning settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IconsConfig {
    /// Provision personalised icons at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `minijinja` template for the icon URL; sees `identity` and `name`.
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Connect and total download timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Downloads in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_fetches: usize,

    /// `User-Agent` header for downloads.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl IconsConfig {
    /// Settings for [`IconProvisioner::new`](markersync_icons::IconProvisioner::new).
    pub fn provisioner_config(&self) -> ProvisionerConfig {
        ProvisionerConfig {
            enabled: self.enabled,
            url_template: self.url_template.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            max_concurrent_fetches: self.max_concurrent_fetches,
            user_agent: self.user_agent.clone(),
        }
    }
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url_template: default_url_template(),
            timeout_ms: default_timeout_ms(),
            max_concurrent_fetches: default_max_concurrent(),
            user_agent: default_user_agent(),
        }
    }
}

/// Observer HTTP API settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Serve the observer API at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl ObserverConfig {
    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("observer address: {e}")))
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    5000
}

fn default_marker_prefix() -> String {
    String::from("plr_")
}

fn default_namespace_id() -> String {
    String::from("live_map_players")
}

fn default_namespace_label() -> String {
    String::from("Live Map Players")
}

const fn default_max_concurrent() -> usize {
    4
}

fn default_database_url() -> String {
    String::from("sqlite://players.db")
}

const fn default_timeout_ms() -> u64 {
    5000
}

const fn default_max_connections() -> u32 {
    4
}

fn default_table() -> String {
    String::from("players")
}

fn default_url_template() -> String {
    String::from(DEFAULT_URL_TEMPLATE)
}

fn default_user_agent() -> String {
    String::from("markersync-icon-fetcher")
}

fn default_observer_host() -> String {
    String::from("0.0.0.0")
}

const fn default_observer_port() -> u16 {
    8124
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.tick_interval_ms, 5000);
        assert_eq!(config.sync.marker_prefix, "plr_");
        assert_eq!(config.sync.namespace_id, "live_map_players");
        assert_eq!(config.store.table, "players");
        assert_eq!(config.icons.timeout_ms, 5000);
        assert_eq!(config.observer.port, 8124);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
sync:
  tick_interval_ms: 2000
  marker_prefix: "p_"
  namespace_id: "players"
  namespace_label: "Players"
  max_concurrent_creates: 8

store:
  database_url: "sqlite:///srv/admin/players.db"
  connect_timeout_ms: 1000
  max_connections: 2
  table: "live_players"

icons:
  enabled: false
  url_template: "https://skins.example/{{ identity }}.png"
  timeout_ms: 2500
  max_concurrent_fetches: 2
  user_agent: "test-agent"

observer:
  enabled: false
  host: "127.0.0.1"
  port: 9090

logging:
  level: "debug"
  json: true
"#;

        let config = SyncConfig::parse(yaml).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.sync.tick_interval(), Duration::from_secs(2));
        assert_eq!(config.sync.namespace_spec(), NamespaceSpec::new("players", "Players"));
        assert_eq!(config.sync.engine_settings().max_concurrent_creates, 8);
        assert_eq!(config.store.store_config().table, "live_players");
        assert_eq!(config.store.store_config().max_connections, 2);
        assert!(!config.icons.provisioner_config().enabled);
        assert_eq!(
            config.icons.provisioner_config().timeout,
            Duration::from_millis(2500)
        );
        assert_eq!(
            config.observer.bind_addr().unwrap(),
            "127.0.0.1:9090".parse().unwrap()
        );
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SyncConfig::parse("sync:\n  tick_interval_ms: 1000\n").unwrap();
        assert_eq!(config.sync.tick_interval_ms, 1000);
        // Everything else uses defaults
        assert_eq!(config.sync.marker_prefix, "plr_");
        assert_eq!(config.icons.url_template, DEFAULT_URL_TEMPLATE);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_empty_yaml() {
        assert_eq!(SyncConfig::parse("").unwrap(), SyncConfig::default());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let result = SyncConfig::parse("sync: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut config = SyncConfig::default();
        config.sync.tick_interval_ms = 50;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SyncConfig::default();
        config.sync.marker_prefix = String::new();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.sync.max_concurrent_creates = 0;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.store.table = "players; DROP TABLE players".to_owned();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.icons.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_observer_host_is_invalid() {
        let config = ObserverConfig {
            host: "not an address".to_owned(),
            ..ObserverConfig::default()
        };
        assert!(config.bind_addr().is_err());

        let mut config = SyncConfig::default();
        config.observer.host = "not an address".to_owned();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.observer.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("markersync.yaml");
        let config = SyncConfig::parse(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(config.validate().is_ok());
    }
}
