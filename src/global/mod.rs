use std::time::Duration;

mod metrics;
pub use metrics::*;
mod probe;
pub use probe::*;

/// Interval between two scheduled triggers of a probe.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(10);
/// Timeout of an outgoing probe request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_METHOD: &str = "GET";
/// Bytes of a response body kept for the success filter; the rest is not read.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

pub const DEFAULT_METRICS_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

pub const DEFAULT_LOG_TARGET: &str = "alien::probe";

/// Picks the local value if it is set, otherwise the global one, otherwise
/// the default. A value is "set" when it is greater than `valid`.
pub fn normalize<T: PartialOrd>(global: T, local: T, valid: T, default: T) -> T {
    if local > valid {
        return local;
    }
    if global > valid {
        return global;
    }
    default
}

pub fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
