use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_METRICS_ADDRESS, DEFAULT_METRICS_PATH};

/// Where the metrics endpoint listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MetricsSettings {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_address() -> String {
    DEFAULT_METRICS_ADDRESS.to_string()
}

fn default_path() -> String {
    DEFAULT_METRICS_PATH.to_string()
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            address: default_address(),
            path: default_path(),
        }
    }
}

impl MetricsSettings {
    /// The address to bind. A bare `:port` listens on every interface.
    pub fn bind_address(&self) -> String {
        if self.address.starts_with(':') {
            format!("0.0.0.0{}", self.address)
        } else {
            self.address.clone()
        }
    }

    pub fn route(&self) -> String {
        if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        }
    }
}
