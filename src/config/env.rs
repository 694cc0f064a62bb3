// src/config/env.rs
//
// Environment overlay. `BACKENDS` carries address/weight pairs together; the
// older `POD_IPS` + `POD_WEIGHTS` pair is still understood but is matched up
// positionally and clamped to the shorter list.

use super::models::{BackendConfig, Config, ConfigError, ForwardMode};
use tracing::warn;

pub const DEFAULT_POD_WEIGHTS: [f64; 3] = [0.5, 0.3, 0.2];

impl Config {
    /// Apply overrides from the environment. `lookup` is `std::env::var` in the
    /// binary and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = lookup("LB_LISTEN") {
            self.listen = listen.trim().to_string();
        }
        if let Some(port) = lookup("LB_PORT") {
            let port: u16 = parse_value("LB_PORT", &port)?;
            let host = self
                .listen
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.listen = format!("{host}:{port}");
        }
        if let Some(ms) = lookup("LB_CONNECT_TIMEOUT_MS") {
            self.timeouts.connect_ms = parse_value("LB_CONNECT_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("LB_REQUEST_TIMEOUT_MS") {
            self.timeouts.request_ms = parse_value("LB_REQUEST_TIMEOUT_MS", &ms)?;
        }
        if let Some(mode) = lookup("LB_FORWARD_MODE") {
            self.forward_mode = mode.parse::<ForwardMode>()?;
        }

        if let Some(raw) = lookup("BACKENDS") {
            self.backends = parse_backend_list(&raw)?;
        } else if let Some(raw) = lookup("POD_IPS") {
            let addresses = split_list(&raw);
            let weights = match lookup("POD_WEIGHTS") {
                Some(raw) => parse_weights(&raw)?,
                None => DEFAULT_POD_WEIGHTS.to_vec(),
            };
            self.backends = pair_positional(&addresses, &weights);
        }

        Ok(())
    }
}

/// Parse `host:port=weight,host:port=weight`. An entry without `=` gets the
/// default weight of 1.
pub fn parse_backend_list(raw: &str) -> Result<Vec<BackendConfig>, ConfigError> {
    split_list(raw)
        .into_iter()
        .map(|entry| match entry.rsplit_once('=') {
            Some((address, weight)) => {
                let address = address.trim();
                if address.is_empty() {
                    return Err(ConfigError::MalformedEntry(entry.clone()));
                }
                Ok(BackendConfig {
                    address: address.to_string(),
                    weight: parse_weight(weight)?,
                })
            }
            None => Ok(BackendConfig {
                address: entry,
                weight: 1.0,
            }),
        })
        .collect()
}

pub fn parse_weights(raw: &str) -> Result<Vec<f64>, ConfigError> {
    split_list(raw).iter().map(|w| parse_weight(w)).collect()
}

/// Zip addresses with weights. Extra entries on either side are dropped, so a
/// count mismatch can never index out of range.
pub fn pair_positional(addresses: &[String], weights: &[f64]) -> Vec<BackendConfig> {
    if addresses.len() != weights.len() {
        warn!(
            addresses = addresses.len(),
            weights = weights.len(),
            "backend address and weight counts differ, using the first {}",
            addresses.len().min(weights.len())
        );
    }

    addresses
        .iter()
        .zip(weights)
        .map(|(address, weight)| BackendConfig {
            address: address.clone(),
            weight: *weight,
        })
        .collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_weight(raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::UnparsableWeight(raw.trim().to_string()))
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
