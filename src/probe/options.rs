use std::{fmt, sync::Arc, time::Duration};

use reqwest::Client;

use super::{Action, ProbeError, ProbeResult, ResultFilter};
use crate::global::{DEFAULT_LOG_TARGET, DEFAULT_METHOD, DEFAULT_PROBE_INTERVAL};

/// The mutable configuration of a probe, guarded by the probe's processing
/// lock once the probe is built.
pub struct ProbeConfig {
    pub(crate) endpoint: String,
    pub(crate) method: String,
    pub(crate) payload: String,
    pub(crate) frequency: Duration,
    pub(crate) timeout: Option<Duration>,
    pub(crate) client: Client,
    pub(crate) success: Option<ResultFilter>,
    pub(crate) success_actions: Vec<Action>,
    pub(crate) failure_actions: Vec<Action>,
    pub(crate) log_target: String,
}

impl ProbeConfig {
    pub(crate) fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method: DEFAULT_METHOD.to_string(),
            payload: String::new(),
            frequency: DEFAULT_PROBE_INTERVAL,
            timeout: None,
            client: Client::new(),
            success: None,
            success_actions: Vec::new(),
            failure_actions: Vec::new(),
            log_target: DEFAULT_LOG_TARGET.to_string(),
        }
    }

    /// Returns the first problem found, in a fixed order.
    pub(crate) fn validate(&self) -> Result<(), ProbeError> {
        if self.endpoint.is_empty() {
            return Err(ProbeError::InvalidEndpoint);
        }
        if self.method.is_empty() {
            return Err(ProbeError::InvalidMethod);
        }
        if self.frequency.is_zero() {
            return Err(ProbeError::InvalidFrequency);
        }
        if self.success.is_none() {
            return Err(ProbeError::MissingSuccessFilter);
        }
        Ok(())
    }
}

impl fmt::Display for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Probe<{} '{}' every {:?}>",
            self.method, self.endpoint, self.frequency
        )
    }
}

/// Configures a probe at construction time, see [`super::Probe::new`].
pub type ProbeOption = Box<dyn FnOnce(&mut ProbeConfig) -> Result<(), ProbeError> + Send>;

pub fn with_auth_basic(_user: &str, _pass: &str) -> ProbeOption {
    Box::new(|_: &mut ProbeConfig| Err(ProbeError::NotImplemented("basic auth")))
}

pub fn with_header(_header: &str, _value: &str) -> ProbeOption {
    Box::new(|_: &mut ProbeConfig| Err(ProbeError::NotImplemented("custom headers")))
}

/// Sets the rate at which checks run. Defaults to 10 seconds.
pub fn with_frequency(frequency: Duration) -> ProbeOption {
    Box::new(move |p: &mut ProbeConfig| {
        p.frequency = frequency;
        Ok(())
    })
}

/// Sets the timeout of outgoing requests. Without it the client has none.
pub fn with_timeout(timeout: Duration) -> ProbeOption {
    Box::new(move |p: &mut ProbeConfig| {
        p.timeout = Some(timeout);
        Ok(())
    })
}

pub fn with_payload(payload: impl Into<String>) -> ProbeOption {
    let payload = payload.into();
    Box::new(move |p: &mut ProbeConfig| {
        p.payload = payload;
        Ok(())
    })
}

pub fn with_method(method: impl Into<String>) -> ProbeOption {
    let method = method.into();
    Box::new(move |p: &mut ProbeConfig| {
        p.method = method;
        Ok(())
    })
}

/// Sets the `log` target the probe writes its lines under.
pub fn with_log_target(target: impl Into<String>) -> ProbeOption {
    let target = target.into();
    Box::new(move |p: &mut ProbeConfig| {
        p.log_target = target;
        Ok(())
    })
}

/// Sets the condition a result must meet to count as a success. A probe takes
/// exactly one filter; compose several with `All`/`Any`.
pub fn with_success_filter(filter: ResultFilter) -> ProbeOption {
    Box::new(move |p: &mut ProbeConfig| {
        if p.success.is_some() {
            return Err(ProbeError::FilterAlreadySet);
        }
        p.success = Some(filter);
        Ok(())
    })
}

pub fn on_success<F>(action: F) -> ProbeOption
where
    F: Fn(&ProbeResult) + Send + Sync + 'static,
{
    Box::new(move |p: &mut ProbeConfig| {
        p.success_actions.push(Arc::new(action));
        Ok(())
    })
}

pub fn on_failure<F>(action: F) -> ProbeOption
where
    F: Fn(&ProbeResult) + Send + Sync + 'static,
{
    Box::new(move |p: &mut ProbeConfig| {
        p.failure_actions.push(Arc::new(action));
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_filter_set_once() {
        let mut config = ProbeConfig::new("http://localhost");
        with_success_filter(ResultFilter::code(200))(&mut config).unwrap();

        let err = with_success_filter(ResultFilter::code(404))(&mut config).unwrap_err();
        assert!(matches!(err, ProbeError::FilterAlreadySet));
        assert_eq!(config.success, Some(ResultFilter::code(200)));
    }

    #[test]
    fn test_not_implemented() {
        let mut config = ProbeConfig::new("http://localhost");
        assert!(matches!(
            with_auth_basic("user", "pass")(&mut config),
            Err(ProbeError::NotImplemented(_))
        ));
        assert!(matches!(
            with_header("X-Test", "1")(&mut config),
            Err(ProbeError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_validate_order() {
        let mut config = ProbeConfig::new("");
        config.method = String::new();
        config.frequency = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ProbeError::InvalidEndpoint)));

        config.endpoint = "http://localhost".to_string();
        assert!(matches!(config.validate(), Err(ProbeError::InvalidMethod)));

        config.method = "HEAD".to_string();
        assert!(matches!(config.validate(), Err(ProbeError::InvalidFrequency)));

        config.frequency = Duration::from_secs(1);
        assert!(matches!(config.validate(), Err(ProbeError::MissingSuccessFilter)));

        config.success = Some(ResultFilter::code(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_display() {
        let config = ProbeConfig::new("http://localhost/health");
        assert_eq!(
            config.to_string(),
            "Probe<GET 'http://localhost/health' every 10s>"
        );
    }
}
