use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{normalize, DEFAULT_PROBE_INTERVAL, DEFAULT_TIMEOUT};

/// Global probe settings, used when a probe leaves a field unset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProbeSettings {
    #[serde(default, with = "humantime_serde")]
    #[schemars(with = "Option<String>")]
    pub interval: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    #[schemars(with = "Option<String>")]
    pub timeout: Option<Duration>,
}

impl ProbeSettings {
    pub fn normalize_timeout(&self, t: Option<Duration>) -> Duration {
        normalize(
            self.timeout.unwrap_or_default(),
            t.unwrap_or_default(),
            Duration::ZERO,
            DEFAULT_TIMEOUT,
        )
    }

    pub fn normalize_interval(&self, t: Option<Duration>) -> Duration {
        normalize(
            self.interval.unwrap_or_default(),
            t.unwrap_or_default(),
            Duration::ZERO,
            DEFAULT_PROBE_INTERVAL,
        )
    }
}
