//! Service configuration
//!
//! Slot cardinality and call limits are fixed per deployment. Per-slot
//! settings (domain preference, IMS switch, emergency numbers) start from the
//! values here and can be changed at runtime through the service.
//!
//! # Usage Examples
//!
//! ```rust
//! use cellular_call_core::config::CellularCallConfig;
//! use cellular_call_core::types::DomainPreferenceMode;
//!
//! let config = CellularCallConfig::new()
//!     .with_slot_count(2)
//!     .with_max_connections(4)
//!     .with_domain_preference_mode(DomainPreferenceMode::CsVoiceOnly);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.max_connections, 4);
//! ```
//!
//! Loading from TOML:
//!
//! ```rust
//! use cellular_call_core::config::CellularCallConfig;
//!
//! let config = CellularCallConfig::from_toml_str(r#"
//!     slot_count = 1
//!     ims_switch_on = false
//!     emergency_numbers = ["120"]
//! "#).unwrap();
//!
//! assert_eq!(config.slot_count, 1);
//! assert!(!config.ims_switch_on);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::connection::DEFAULT_MAX_CONNECTIONS;
use crate::errors::{CallError, Result};
use crate::logging::LoggingConfig;
use crate::types::DomainPreferenceMode;

pub const MAX_SLOT_COUNT: usize = 2;
pub const DEFAULT_COMMAND_QUEUE_DEPTH: usize = 1000;

/// Configuration of a [`CellularCallService`](crate::service::CellularCallService)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellularCallConfig {
    /// Number of SIM slots, 1 or 2
    pub slot_count: usize,
    /// Concurrent connections per controller
    pub max_connections: usize,
    /// Depth of each slot's command queue
    pub command_queue_depth: usize,
    /// Initial voice domain preference of every slot
    pub domain_preference_mode: DomainPreferenceMode,
    /// Initial IMS switch of every slot
    pub ims_switch_on: bool,
    /// Place emergency calls over IMS when the IMS service is connected
    pub ims_prefer_for_emergency: bool,
    /// Emergency numbers on top of the 3GPP defaults
    pub emergency_numbers: Vec<String>,
    pub logging: LoggingConfig,
}

impl Default for CellularCallConfig {
    fn default() -> Self {
        Self {
            slot_count: 1,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            command_queue_depth: DEFAULT_COMMAND_QUEUE_DEPTH,
            domain_preference_mode: DomainPreferenceMode::default(),
            ims_switch_on: true,
            ims_prefer_for_emergency: true,
            emergency_numbers: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl CellularCallConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot_count(mut self, slot_count: usize) -> Self {
        self.slot_count = slot_count;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_command_queue_depth(mut self, depth: usize) -> Self {
        self.command_queue_depth = depth;
        self
    }

    pub fn with_domain_preference_mode(mut self, mode: DomainPreferenceMode) -> Self {
        self.domain_preference_mode = mode;
        self
    }

    pub fn with_ims_switch(mut self, on: bool) -> Self {
        self.ims_switch_on = on;
        self
    }

    pub fn with_ims_prefer_for_emergency(mut self, prefer: bool) -> Self {
        self.ims_prefer_for_emergency = prefer;
        self
    }

    pub fn with_emergency_numbers(mut self, numbers: Vec<String>) -> Self {
        self.emergency_numbers = numbers;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.slot_count == 0 || self.slot_count > MAX_SLOT_COUNT {
            return Err(CallError::config(format!(
                "slot_count must be 1 or 2, got {}",
                self.slot_count
            )));
        }
        if self.max_connections == 0 {
            return Err(CallError::config("max_connections must be positive"));
        }
        if self.command_queue_depth == 0 {
            return Err(CallError::config("command_queue_depth must be positive"));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| CallError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CallError::config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }
}
