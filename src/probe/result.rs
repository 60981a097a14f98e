use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

use super::ProbeId;

/// The outcome of one trigger of a probe.
#[derive(Clone, Debug)]
pub struct ProbeResult {
    pub timestamp: DateTime<Utc>,
    pub probe: ProbeId,
    pub endpoint: String,
    pub code: u16,
    pub body: String,
    pub headers: HeaderMap,
    /// Set when the attempt failed before a response was obtained.
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn new(probe: ProbeId, endpoint: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            probe,
            endpoint: endpoint.to_string(),
            code: 0,
            body: String::new(),
            headers: HeaderMap::new(),
            error: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn title(&self, success: bool) -> String {
        if self.error.is_some() {
            format!("{} Error", self.endpoint)
        } else if success {
            format!("{} Success", self.endpoint)
        } else {
            format!("{} Failure", self.endpoint)
        }
    }

    pub fn emoji(success: bool) -> &'static str {
        if success {
            "✅"
        } else {
            "❌"
        }
    }

    pub fn to_text(&self, success: bool) -> String {
        let detail = match &self.error {
            Some(err) => err.clone(),
            None => format!("HTTP Status Code is {}", self.code),
        };
        format!(
            "[{}] {}\n{} - {}\n{}",
            self.title(success),
            Self::emoji(success),
            self.endpoint,
            self.timestamp.to_rfc3339(),
            detail,
        )
    }
}
