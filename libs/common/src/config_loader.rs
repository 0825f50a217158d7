//! Configuration loading helper functions
//! Provides layered loading (defaults < file < environment) and legacy
//! environment overrides

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Build the figment for a configuration type
///
/// Priority (highest to lowest):
/// 1. Environment variables with `env_prefix` (nested keys split on `__`)
/// 2. The given file (TOML, YAML or JSON by extension)
/// 3. `T::default()`
pub fn figment_for<T>(file: Option<&Path>, env_prefix: &str) -> Result<Figment>
where
    T: Serialize + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    if let Some(path) = file {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Config("Config file must have an extension".to_string()))?;

        figment = match extension {
            "toml" => figment.merge(Toml::file(path)),
            "yaml" | "yml" => figment.merge(Yaml::file(path)),
            "json" => figment.merge(Json::file(path)),
            _ => {
                return Err(Error::Config(format!(
                    "Unsupported config file format: {}",
                    extension
                )))
            },
        };
    }

    Ok(figment.merge(Env::prefixed(env_prefix).split("__")))
}

/// Load configuration from defaults, an optional file and the environment
pub fn load_config<T>(file: Option<&Path>, env_prefix: &str) -> Result<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Default,
{
    figment_for::<T>(file, env_prefix)?
        .extract()
        .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))
}

/// Read a single environment override, logging where the value came from
///
/// Returns `None` when the variable is unset or fails to parse.
pub fn env_override<T>(env_var: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = std::env::var(env_var).ok()?;
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<T>() {
        Ok(val) => {
            info!("Using {} from environment: {}", env_var, raw);
            Some(val)
        },
        Err(e) => {
            warn!("Failed to parse {} from environment: {}", env_var, e);
            None
        },
    }
}
