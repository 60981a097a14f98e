use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::{
    global::{MetricsSettings, ProbeSettings, DEFAULT_METHOD},
    on_failure, on_success, with_frequency, with_method, with_payload, with_success_filter,
    with_timeout, ActionConfig, ProbeOption, ProbeResult, ResultFilter,
};

pub fn json_schema() -> Result<String> {
    let schema = schema_for!(Conf);
    Ok(serde_json::to_string_pretty(&schema)?)
}

// Global Settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub probe: ProbeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProbeConf {
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub payload: String,
    #[serde(default, with = "humantime_serde")]
    #[schemars(with = "Option<String>")]
    pub interval: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    #[schemars(with = "Option<String>")]
    pub timeout: Option<Duration>,
    #[serde(default = "default_success")]
    pub success: ResultFilter,
    #[serde(default)]
    pub on_success: Vec<ActionConfig>,
    #[serde(default)]
    pub on_failure: Vec<ActionConfig>,
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

fn default_success() -> ResultFilter {
    ResultFilter::code(200)
}

impl ProbeConf {
    /// A GET probe expecting an HTTP 200.
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method: default_method(),
            payload: String::new(),
            interval: None,
            timeout: None,
            success: default_success(),
            on_success: vec![],
            on_failure: vec![],
        }
    }

    /// Turns the probe section into probe options, filling unset durations
    /// from the global settings.
    pub fn options(&self, settings: &ProbeSettings) -> Result<Vec<ProbeOption>> {
        let mut options = vec![
            with_method(self.method.clone()),
            with_payload(self.payload.clone()),
            with_frequency(settings.normalize_interval(self.interval)),
            with_timeout(settings.normalize_timeout(self.timeout)),
            with_success_filter(self.success.clone()),
        ];

        for a in &self.on_success {
            let action = a
                .build(true)
                .with_context(|| format!("on_success action of {}", self.endpoint))?;
            options.push(on_success(move |r: &ProbeResult| action(r)));
        }
        for a in &self.on_failure {
            let action = a
                .build(false)
                .with_context(|| format!("on_failure action of {}", self.endpoint))?;
            options.push(on_failure(move |r: &ProbeResult| action(r)));
        }

        Ok(options)
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct Conf {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub probes: Vec<ProbeConf>,
}

impl Conf {
    pub fn from_yaml(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&f).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// A configuration probing each endpoint with the defaults.
    pub fn from_endpoints(endpoints: &[String]) -> Self {
        Self {
            probes: endpoints.iter().map(|ep| ProbeConf::new(ep)).collect(),
            ..Default::default()
        }
    }
}
