//! YAML configuration.
//!
//! ```yaml
//! backend: wgpu
//! params:
//!   blur_size: 1.5
//!   threshold: 0.3
//!   image_width_factor: 960
//!   hysteresis:
//!     low_threshold: 0.15
//!     passes: 2
//!   polarity: dark
//!   output_format: rgba
//! ```
//!
//! Every key is optional; unknown keys are rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::Backend;
use crate::params::EdgeParams;
use crate::EdgeResult;

/// Detector configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdgeConfig {
    pub backend: Backend,
    pub params: EdgeParams,
}

impl EdgeConfig {
    /// Loads and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> EdgeResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading edge config");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parses and validates a configuration from YAML.
    pub fn from_yaml_str(yaml: &str) -> EdgeResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.params.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> EdgeResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
