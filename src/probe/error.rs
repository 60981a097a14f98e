use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe not initialised")]
    NotInitialised,
    #[error("probe not running")]
    NotRunning,
    #[error("probe not stopped")]
    NotStopped,
    #[error("probe invalid: endpoint")]
    InvalidEndpoint,
    #[error("probe invalid: method")]
    InvalidMethod,
    #[error("probe invalid: frequency is zero")]
    InvalidFrequency,
    #[error("probe invalid: no success filter")]
    MissingSuccessFilter,
    #[error("probe with success filter: filter already set")]
    FilterAlreadySet,
    #[error("probe option not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("failed to build request: {0}")]
    Request(String),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to register probe metric: {0}")]
    Metrics(#[from] prometheus::Error),
}
