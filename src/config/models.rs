// src/config/models.rs
use crate::proxy::{set_from_configs, BackendSet};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:80";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub backends: Vec<BackendConfig>,
    pub timeouts: TimeoutConfig,
    pub forward_mode: ForwardMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            backends: Vec::new(),
            timeouts: TimeoutConfig::default(),
            forward_mode: ForwardMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub address: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_ms: u64,
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 2_000,
            request_ms: 10_000,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    /// Upper bound for the outbound call plus reading the whole body.
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

/// What the gateway sends upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardMode {
    /// Forward method, path, query, headers and body.
    #[default]
    Passthrough,
    /// Always `GET /` with an empty body, whatever the caller sent.
    RootGet,
}

impl FromStr for ForwardMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(Self::Passthrough),
            "root_get" => Ok(Self::RootGet),
            other => Err(ConfigError::UnknownForwardMode(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("backend #{0} has an empty address")]
    EmptyAddress(usize),

    #[error("backend {address} has invalid weight {weight} (must be finite and >= 0)")]
    InvalidWeight { address: String, weight: f64 },

    #[error("malformed backend entry {0:?} (expected host:port=weight)")]
    MalformedEntry(String),

    #[error("invalid weight {0:?}")]
    UnparsableWeight(String),

    #[error("invalid listen address {0:?}")]
    InvalidListen(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} timeout must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("unknown forward mode {0:?} (expected passthrough or root_get)")]
    UnknownForwardMode(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        for (i, backend) in self.backends.iter().enumerate() {
            if backend.address.trim().is_empty() {
                return Err(ConfigError::EmptyAddress(i));
            }
            if !backend.weight.is_finite() || backend.weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    address: backend.address.clone(),
                    weight: backend.weight,
                });
            }
        }

        if self.timeouts.connect_ms == 0 {
            return Err(ConfigError::ZeroTimeout("connect"));
        }
        if self.timeouts.request_ms == 0 {
            return Err(ConfigError::ZeroTimeout("request"));
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|_| ConfigError::InvalidListen(self.listen.clone()))
    }

    pub fn backend_set(&self) -> BackendSet {
        set_from_configs(&self.backends)
    }
}
