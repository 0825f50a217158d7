//! Port and master configuration
//!
//! Layered with figment: defaults, optional file, then `ACN_` environment
//! variables (`ACN_PORT__NAME`, `ACN_MASTER__DEFAULT_UNIT`, ...). The legacy
//! `MODBUS_PORT` and `MODBUS_SLAVE` variables are applied last.

use std::path::Path;

use common::config_loader::{env_override, load_config};
use serde::{Deserialize, Serialize};

use crate::error::{AcnError, Result};

/// Environment prefix for layered overrides
pub const ENV_PREFIX: &str = "ACN_";

/// Highest valid MODBUS unit id
pub const MAX_UNIT_ID: u8 = 247;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    pub name: String,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            name: "/dev/ttyUSB0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    /// MODBUS slave id addressed by default
    pub default_unit: u8,
    pub timeout_ms: u64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            default_unit: 1,
            timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcnConfig {
    pub port: PortConfig,
    pub master: MasterConfig,
    pub reconnect_interval_ms: u64,
    pub log_level: String,
}

impl Default for AcnConfig {
    fn default() -> Self {
        Self {
            port: PortConfig::default(),
            master: MasterConfig::default(),
            reconnect_interval_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl AcnConfig {
    /// Load from defaults, an optional file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config: AcnConfig = load_config(file, ENV_PREFIX)?;
        config.apply_legacy_env();
        config.validate()?;
        Ok(config)
    }

    /// Install the global subscriber at `log_level` (`RUST_LOG` wins)
    pub fn init_logging(&self) -> Result<()> {
        common::logging::init(&self.log_level)?;
        Ok(())
    }

    /// `MODBUS_PORT` / `MODBUS_SLAVE`
    pub fn apply_legacy_env(&mut self) {
        if let Some(port) = env_override::<String>("MODBUS_PORT") {
            self.port.name = port;
        }
        if let Some(unit) = env_override::<u8>("MODBUS_SLAVE") {
            self.master.default_unit = unit;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port.name.trim().is_empty() {
            return Err(AcnError::config("Port name must not be empty"));
        }
        if self.master.default_unit == 0 || self.master.default_unit > MAX_UNIT_ID {
            return Err(AcnError::config(format!(
                "Unit id {} out of range 1..={}",
                self.master.default_unit, MAX_UNIT_ID
            )));
        }
        if self.reconnect_interval_ms == 0 {
            return Err(AcnError::config("Reconnect interval must be non-zero"));
        }
        common::logging::parse_level(&self.log_level)?;
        Ok(())
    }
}
