//! # Harness Configuration
//!
//! Latencies of the simulated collaborators and the harness's own wait
//! limit. Loaded from YAML; every field is optional and falls back to
//! the defaults below.
//!
//! ```yaml
//! hash_latency: 4
//! program_latency: 8
//! clock_bypass_latency: 2
//! wipe_latency: 6
//! init_delay: 1
//! max_wait_steps: 256
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Collaborator latencies, in controller steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Steps from a hash request to its acknowledge.
    pub hash_latency: u32,
    /// Steps from a program request to its acknowledge.
    pub program_latency: u32,
    /// Steps from a clock-bypass request to the (unsynchronized) acknowledge.
    pub clock_bypass_latency: u32,
    /// Steps from a wipe request to the (unsynchronized) acknowledge.
    pub wipe_latency: u32,
    /// Steps after reset before the power manager raises the init request.
    pub init_delay: u32,
    /// Upper bound on any single harness wait.
    pub max_wait_steps: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hash_latency: 4,
            program_latency: 8,
            clock_bypass_latency: 2,
            wipe_latency: 6,
            init_delay: 1,
            max_wait_steps: 256,
        }
    }
}

impl SimConfig {
    /// Reject configurations no collaborator can honour.
    pub fn validate(&self) -> Result<(), SimError> {
        let latencies = [
            ("hash_latency", self.hash_latency),
            ("program_latency", self.program_latency),
            ("clock_bypass_latency", self.clock_bypass_latency),
            ("wipe_latency", self.wipe_latency),
        ];
        for (name, value) in latencies {
            if value == 0 {
                return Err(SimError::Config(format!("{name} must be at least 1")));
            }
            if u64::from(value) >= self.max_wait_steps {
                return Err(SimError::Config(format!(
                    "{name} ({value}) must be below max_wait_steps ({})",
                    self.max_wait_steps
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SimError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let content = read_file(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| SimError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// Read a file, mapping a missing path to [`SimError::FileNotFound`].
pub(crate) fn read_file(path: &Path) -> Result<String, SimError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SimError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            SimError::Io(e)
        }
    })
}
