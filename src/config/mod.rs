// src/config/mod.rs
mod env;
mod models;

pub use env::{pair_positional, parse_backend_list, parse_weights, DEFAULT_POD_WEIGHTS};
pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = read_file(path.as_ref()).await?;
    config.validate()?;
    Ok(config)
}

/// Defaults (or the file, when given), then the process environment on top.
pub async fn load(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => read_file(path).await?,
        None => Config::default(),
    };

    config
        .apply_env(|key| std::env::var(key).ok())
        .context("Invalid configuration in environment")?;
    config.validate()?;
    Ok(config)
}

async fn read_file(path: &Path) -> Result<Config> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let extension = path.extension().and_then(|s| s.to_str());
    let config: Config = if matches!(extension, Some("yaml") | Some("yml")) {
        serde_yaml::from_str(&contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(&contents).context("Failed to parse JSON config")?
    };

    Ok(config)
}
