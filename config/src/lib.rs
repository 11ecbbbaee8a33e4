//! Configuration for Taskboard.
//!
//! Settings are layered: built-in defaults, then the TOML file at
//! `$TASKBOARD_CONFIG` (or `~/.taskboard/config.toml`), then environment
//! variables. Every key is optional and a missing file is not an error.
//!
//! ```toml
//! [server]
//! mode = "combined"          # TASKBOARD_MODE
//! port = 3000                # PORT
//! metrics_port = 9091        # METRICS_PORT
//! bind = "0.0.0.0"           # TASKBOARD_BIND
//!
//! [store]
//! backend = "sqlite"         # DATABASE_TYPE
//! path = "data/taskboard.db" # DATABASE_PATH
//! pool_size = 4              # DATABASE_POOL_SIZE
//! acquire_timeout_ms = 5000
//!
//! [proxy]
//! api_base_url = "http://api:3000"  # API_BASE_URL
//! timeout_ms = 5000
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use taskboard_store::{BackendKind, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_POOL_SIZE, StoreOptions};
use taskboard_types::Mode;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "TASKBOARD_CONFIG";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

// ============================================================================
// File layer
// ============================================================================

/// Raw contents of the config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub server: Option<ServerSection>,
    pub store: Option<StoreSection>,
    pub proxy: Option<ProxySection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub mode: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub bind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    pub backend: Option<String>,
    pub path: Option<PathBuf>,
    pub pool_size: Option<usize>,
    pub acquire_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxySection {
    pub api_base_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Read the file at `path`. `Ok(None)` when it does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }
}

/// `$TASKBOARD_CONFIG`, else `~/.taskboard/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".taskboard").join("config.toml"))
}

// ============================================================================
// Resolved settings
// ============================================================================

#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub api_base_url: Option<String>,
    pub timeout: Duration,
}

/// Fully resolved process configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    pub bind: IpAddr,
    pub port: u16,
    /// Separate scrape port. `None` serves `/metrics` on the main port.
    pub metrics_port: Option<u16>,
    pub store: StoreOptions,
    pub proxy: ProxySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Combined,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            metrics_port: None,
            store: StoreOptions::default(),
            proxy: ProxySettings {
                api_base_url: None,
                timeout: DEFAULT_PROXY_TIMEOUT,
            },
        }
    }
}

impl Settings {
    /// Load the config file (if any) and apply process environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match config_path() {
            Some(path) => FileConfig::load_from(&path)?.unwrap_or_default(),
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| env::var(key).ok())
    }

    /// Merge defaults, `file` and the variables visible through `lookup`.
    /// Blank variables count as unset.
    pub fn resolve(
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();
        let server = file.server.unwrap_or_default();
        let store = file.store.unwrap_or_default();
        let proxy = file.proxy.unwrap_or_default();

        let mode_raw = env("TASKBOARD_MODE").or(server.mode);
        let mode = match mode_raw {
            Some(raw) => Mode::parse(&raw).map_err(|e| ConfigError::Invalid {
                key: "mode",
                value: raw,
                reason: e.to_string(),
            })?,
            None => defaults.mode,
        };

        let port = match env("PORT") {
            Some(raw) => parse_number("PORT", &raw)?,
            None => server.port.unwrap_or(defaults.port),
        };
        let metrics_port = match env("METRICS_PORT") {
            Some(raw) => Some(parse_number("METRICS_PORT", &raw)?),
            None => server.metrics_port,
        };
        if metrics_port == Some(port) {
            return Err(ConfigError::Invalid {
                key: "metrics_port",
                value: port.to_string(),
                reason: "must differ from the main port".to_string(),
            });
        }
        let bind = match env("TASKBOARD_BIND").or(server.bind) {
            Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "bind",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.bind,
        };

        let backend = match env("DATABASE_TYPE").or(store.backend) {
            Some(raw) => BackendKind::parse(&raw).map_err(|e| ConfigError::Invalid {
                key: "store.backend",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.store.backend,
        };
        let path = env("DATABASE_PATH")
            .map(PathBuf::from)
            .or(store.path)
            .unwrap_or(defaults.store.path);
        let pool_size = match env("DATABASE_POOL_SIZE") {
            Some(raw) => parse_number("DATABASE_POOL_SIZE", &raw)?,
            None => store.pool_size.unwrap_or(DEFAULT_POOL_SIZE),
        };
        if pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "store.pool_size",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let acquire_timeout = store
            .acquire_timeout_ms
            .map_or(DEFAULT_ACQUIRE_TIMEOUT, Duration::from_millis);

        let api_base_url = env("API_BASE_URL").or(proxy.api_base_url);
        let timeout = proxy
            .timeout_ms
            .map_or(DEFAULT_PROXY_TIMEOUT, Duration::from_millis);

        Ok(Self {
            mode,
            bind,
            port,
            metrics_port,
            store: StoreOptions {
                backend,
                path,
                pool_size,
                acquire_timeout,
            },
            proxy: ProxySettings {
                api_base_url,
                timeout,
            },
        })
    }

    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    #[must_use]
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_port.map(|port| SocketAddr::new(self.bind, port))
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
