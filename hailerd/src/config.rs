//! Configuration system for the hailer daemon.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/hailerd/config.toml`)
//! 4. Compiled defaults
//!
//! Network entries come from the file only. Per-network fields left unset
//! fall back to the `[defaults]` section, so workers always receive fully
//! resolved, immutable [`NetworkConfig`] values.

use std::path::PathBuf;

/// Errors that can occur when loading daemon configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Default control socket bind address.
const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:7330";

/// Default IRC port when neither the network nor `[defaults]` sets one.
const DEFAULT_PORT: u16 = 6667;

/// Default nickname.
const DEFAULT_NICK: &str = "hailer";

/// Default username (ident).
const DEFAULT_USER: &str = "hailer";

/// Default realname.
const DEFAULT_REALNAME: &str = "hailer announce daemon";

// ---------------------------------------------------------------------------
// TOML file structs
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure for the daemon.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DaemonConfigFile {
    daemon: DaemonFileConfig,
    defaults: DefaultsFileConfig,
    networks: Vec<NetworkFileConfig>,
}

/// `[daemon]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DaemonFileConfig {
    control_addr: Option<String>,
}

/// `[defaults]` section: fallbacks applied to every network entry.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DefaultsFileConfig {
    port: Option<u16>,
    nick: Option<String>,
    user: Option<String>,
    realname: Option<String>,
}

/// One `[[networks]]` entry. `id` and `hostname` are required; everything
/// else falls back to `[defaults]` or compiled defaults.
#[derive(Debug, serde::Deserialize)]
struct NetworkFileConfig {
    id: String,
    hostname: String,
    port: Option<u16>,
    password: Option<String>,
    bind: Option<String>,
    tls: Option<bool>,
    tls_skip_verify: Option<bool>,
    nick: Option<String>,
    user: Option<String>,
    realname: Option<String>,
    colors: Option<bool>,
    #[serde(default)]
    channels: Vec<String>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the daemon.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "hailer announce relay daemon")]
pub struct DaemonCliArgs {
    /// Address to bind the control socket to.
    #[arg(short = 'b', long, env = "HAILERD_CONTROL")]
    pub control: Option<String>,

    /// Path to config file (default: `~/.config/hailerd/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "HAILERD_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Address the control gateway binds to (e.g., `127.0.0.1:7330`).
    pub control_addr: String,
    /// Log level filter string.
    pub log_level: String,
    /// One entry per configured network, defaults already applied.
    pub networks: Vec<NetworkConfig>,
}

/// Static per-network configuration, immutable after load.
///
/// Owned by the supervisor and shared read-only with the network's worker.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network identifier; must be non-empty and unique across the set.
    pub id: String,
    /// Server hostname to connect to.
    pub hostname: String,
    /// Server port.
    pub port: u16,
    /// Optional server password.
    pub password: Option<String>,
    /// Optional local address to bind the outbound connection to.
    pub bind: Option<String>,
    /// Connect over TLS.
    pub tls: bool,
    /// Skip TLS certificate verification (self-signed servers).
    pub tls_skip_verify: bool,
    /// Nickname to use on this network.
    pub nick: String,
    /// Username (ident) to use on this network.
    pub user: String,
    /// Realname to use on this network.
    pub realname: String,
    /// Whether mIRC formatting codes are passed through in outbound text.
    pub colors: bool,
    /// Channels to auto-join after connecting, each `"#chan"` or
    /// `"#chan key"`.
    pub channels: Vec<String>,
}

impl NetworkConfig {
    /// Splits the configured channel list into `(name, join key)` pairs.
    ///
    /// A channel entry of the form `"#chan key"` joins `#chan` with `key`;
    /// anything without a space joins without a key.
    pub fn channel_entries(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.channels.iter().map(|entry| {
            entry
                .split_once(' ')
                .map_or((entry.as_str(), None), |(name, key)| (name, Some(key)))
        })
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            control_addr: DEFAULT_CONTROL_ADDR.to_string(),
            log_level: "info".to_string(),
            networks: Vec::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and a missing
    /// file is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &DaemonCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, file))
    }

    /// Resolve a `DaemonConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Network entries take per-network
    /// values first, then `[defaults]`, then compiled defaults.
    #[must_use]
    fn resolve(cli: &DaemonCliArgs, file: DaemonConfigFile) -> Self {
        let defaults = Self::default();
        let networks = file
            .networks
            .into_iter()
            .map(|n| resolve_network(n, &file.defaults))
            .collect();

        Self {
            control_addr: cli
                .control
                .clone()
                .or(file.daemon.control_addr)
                .unwrap_or(defaults.control_addr),
            log_level: cli.log_level.clone(),
            networks,
        }
    }
}

/// Apply `[defaults]` and compiled defaults to one network entry.
fn resolve_network(n: NetworkFileConfig, defaults: &DefaultsFileConfig) -> NetworkConfig {
    NetworkConfig {
        id: n.id,
        hostname: n.hostname,
        port: n.port.or(defaults.port).unwrap_or(DEFAULT_PORT),
        password: n.password,
        bind: n.bind,
        tls: n.tls.unwrap_or(false),
        tls_skip_verify: n.tls_skip_verify.unwrap_or(false),
        nick: n
            .nick
            .or_else(|| defaults.nick.clone())
            .unwrap_or_else(|| DEFAULT_NICK.to_string()),
        user: n
            .user
            .or_else(|| defaults.user.clone())
            .unwrap_or_else(|| DEFAULT_USER.to_string()),
        realname: n
            .realname
            .or_else(|| defaults.realname.clone())
            .unwrap_or_else(|| DEFAULT_REALNAME.to_string()),
        colors: n.colors.unwrap_or(true),
        channels: n.channels,
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file for the daemon.
fn load_config_file(
    explicit_path: Option<&std::path::Path>,
) -> Result<DaemonConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(DaemonConfigFile::default());
        };
        config_dir.join("hailerd").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DaemonConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
