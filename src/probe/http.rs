use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use reqwest::{Client, Method};
use scopeguard::defer;
use tokio::{
    sync::{oneshot, watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, Interval, MissedTickBehavior},
};

use super::{Action, ProbeConfig, ProbeError, ProbeOption, ProbeResult};
use crate::{MetricsSink, MAX_BODY_SIZE};

const KIND: &str = "http";

/// Longest period the timer is armed with; longer intervals tick at this rate.
const MAX_TICK_PERIOD: Duration = Duration::from_secs(86_400 * 365 * 30);

static NEXT_PROBE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a probe, unique within the process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProbeId(u64);

impl ProbeId {
    fn next() -> Self {
        Self(NEXT_PROBE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct LoopHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct ProbeInner {
    id: ProbeId,
    init: bool,
    endpoint: String,
    method: String,
    log_target: String,
    /// Guards the configuration and serializes triggers.
    processing: Mutex<ProbeConfig>,
    /// `Some` exactly while the scheduling loop is alive.
    running: Mutex<Option<LoopHandle>>,
    frequency: watch::Sender<Duration>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

/// Checks one endpoint on a schedule and counts the outcomes.
///
/// `Probe` is a handle: clones share the same probe. The scheduling loop only
/// holds a weak reference, so it ends once every handle is dropped.
#[derive(Clone)]
pub struct Probe {
    inner: Arc<ProbeInner>,
}

impl Default for Probe {
    /// A probe that was never built. Every operation on it fails with
    /// [`ProbeError::NotInitialised`].
    fn default() -> Self {
        let config = ProbeConfig::new("");
        let (frequency, _) = watch::channel(config.frequency);
        Self {
            inner: Arc::new(ProbeInner {
                id: ProbeId::next(),
                init: false,
                endpoint: String::new(),
                method: config.method.clone(),
                log_target: config.log_target.clone(),
                processing: Mutex::new(config),
                running: Mutex::new(None),
                frequency,
                metrics: None,
            }),
        }
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("id", &self.inner.id)
            .field("endpoint", &self.inner.endpoint)
            .field("init", &self.inner.init)
            .finish()
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Probe<{} '{}' every {:?}>",
            self.inner.method,
            self.inner.endpoint,
            *self.inner.frequency.borrow()
        )
    }
}

fn build_client(timeout: Option<Duration>) -> Result<Client, ProbeError> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(ProbeError::Client)
}

fn new_ticker(period: Duration) -> Interval {
    let period = period.min(MAX_TICK_PERIOD);
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn run_actions(target: &str, endpoint: &str, actions: &[Action], result: &ProbeResult) {
    for (i, action) in actions.iter().enumerate() {
        if panic::catch_unwind(AssertUnwindSafe(|| action(result))).is_err() {
            log::error!(
                target: target,
                "[{} / {}] action #{} panicked, continuing",
                KIND,
                endpoint,
                i
            );
        }
    }
}

impl Probe {
    /// Builds a probe with the defaults (GET, no payload, every 10 seconds),
    /// then applies `options` in order. The first failing option aborts the
    /// construction. Finally the probe's series are registered in `metrics`.
    pub fn new(
        endpoint: &str,
        metrics: Arc<dyn MetricsSink>,
        options: Vec<ProbeOption>,
    ) -> Result<Self, ProbeError> {
        let mut config = ProbeConfig::new(endpoint);
        for option in options {
            option(&mut config)?;
        }
        config.client = build_client(config.timeout)?;

        metrics.register(endpoint)?;
        log::info!(
            target: config.log_target.as_str(),
            "{}: Registered prometheus metric collector",
            config
        );

        let (frequency, _) = watch::channel(config.frequency);
        Ok(Self {
            inner: Arc::new(ProbeInner {
                id: ProbeId::next(),
                init: true,
                endpoint: endpoint.to_string(),
                method: config.method.clone(),
                log_target: config.log_target.clone(),
                processing: Mutex::new(config),
                running: Mutex::new(None),
                frequency,
                metrics: Some(metrics),
            }),
        })
    }

    pub fn id(&self) -> ProbeId {
        self.inner.id
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub async fn is_running(&self) -> bool {
        self.inner.running.lock().await.is_some()
    }

    /// Starts the scheduling loop and checks once right away.
    pub async fn run(&self) -> Result<(), ProbeError> {
        if !self.inner.init {
            return Err(ProbeError::NotInitialised);
        }

        {
            let mut running = self.inner.running.lock().await;
            if running.is_some() {
                return Err(ProbeError::NotStopped);
            }
            self.inner.processing.lock().await.validate()?;

            let (stop_tx, stop_rx) = oneshot::channel();
            let task = tokio::spawn(run_loop(
                Arc::downgrade(&self.inner),
                self.inner.frequency.subscribe(),
                stop_rx,
            ));
            *running = Some(LoopHandle {
                stop: stop_tx,
                task,
            });
        }

        log::info!(target: self.inner.log_target.as_str(), "{}: Running", self);
        if let Err(err) = self.trigger().await {
            log::warn!(
                target: self.inner.log_target.as_str(),
                "{}: first check failed: {}",
                self,
                err
            );
        }
        Ok(())
    }

    /// Stops the scheduling loop. Waits for an in-flight check to finish and
    /// for the loop to exit before returning.
    pub async fn stop(&self) -> Result<(), ProbeError> {
        if !self.inner.init {
            return Err(ProbeError::NotInitialised);
        }

        log::info!(target: self.inner.log_target.as_str(), "{}: Stopping", self);

        let mut running = self.inner.running.lock().await;
        let Some(handle) = running.take() else {
            log::info!(target: self.inner.log_target.as_str(), "{}: Already stopped", self);
            return Err(ProbeError::NotRunning);
        };

        let _ = handle.stop.send(());
        if let Err(err) = handle.task.await {
            log::error!(
                target: self.inner.log_target.as_str(),
                "{}: scheduling loop aborted: {}",
                self,
                err
            );
        }
        Ok(())
    }

    /// Changes the polling rate. A running loop picks up the new rate at
    /// once.
    pub async fn set_frequency(&self, frequency: Duration) -> Result<(), ProbeError> {
        if !self.inner.init {
            return Err(ProbeError::NotInitialised);
        }
        if frequency.is_zero() {
            return Err(ProbeError::InvalidFrequency);
        }

        let mut config = self.inner.processing.lock().await;
        config.frequency = frequency;
        self.inner.frequency.send_replace(frequency);
        log::info!(target: self.inner.log_target.as_str(), "{}: Frequency changed", *config);
        Ok(())
    }

    pub async fn validate(&self) -> Result<(), ProbeError> {
        if !self.inner.init {
            return Err(ProbeError::NotInitialised);
        }
        self.inner.processing.lock().await.validate()
    }

    /// Checks the endpoint now. Concurrent calls run one at a time.
    pub async fn trigger(&self) -> Result<(), ProbeError> {
        let config = self.inner.processing.lock().await;

        if !self.inner.init {
            return Err(ProbeError::NotInitialised);
        }
        config.validate()?;

        let target = self.inner.log_target.as_str();
        log::debug!(target: target, "{}: Triggered...", *config);

        let result = match self.request(&config).await {
            Ok(result) => result,
            Err(err) => {
                log::warn!(target: target, "{}: failed: {}", *config, err);
                self.record(false);
                let result = ProbeResult::new(self.inner.id, &config.endpoint)
                    .with_error(err.to_string());
                run_actions(target, &config.endpoint, &config.failure_actions, &result);
                return Err(err);
            }
        };

        log::debug!(target: target, "{}: Completed", *config);

        let success = config
            .success
            .as_ref()
            .is_some_and(|filter| filter.check(&result));
        self.record(success);

        let actions = if success {
            &config.success_actions
        } else {
            &config.failure_actions
        };
        run_actions(target, &config.endpoint, actions, &result);
        Ok(())
    }

    async fn request(&self, config: &ProbeConfig) -> Result<ProbeResult, ProbeError> {
        let method = Method::from_bytes(config.method.as_bytes())
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let mut request = config.client.request(method, &config.endpoint);
        if !config.payload.is_empty() {
            request = request.body(config.payload.clone());
        }
        let request = request
            .build()
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let response = config
            .client
            .execute(request)
            .await
            .map_err(ProbeError::Transport)?;
        let code = response.status().as_u16();
        let headers = response.headers().clone();
        let body = read_body(response).await?;

        Ok(ProbeResult::new(self.inner.id, &config.endpoint)
            .with_code(code)
            .with_headers(headers)
            .with_body(body))
    }

    fn record(&self, success: bool) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.record(&self.inner.endpoint, success);
        }
    }
}

/// Reads at most [`MAX_BODY_SIZE`] bytes of the body, dropping the rest of
/// the response unread.
async fn read_body(mut response: reqwest::Response) -> Result<String, ProbeError> {
    let mut body = Vec::new();
    while body.len() < MAX_BODY_SIZE {
        let Some(chunk) = response.chunk().await.map_err(ProbeError::Transport)? else {
            break;
        };
        let keep = chunk.len().min(MAX_BODY_SIZE - body.len());
        body.extend_from_slice(&chunk[..keep]);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

async fn run_loop(
    probe: Weak<ProbeInner>,
    mut frequency: watch::Receiver<Duration>,
    mut stop: oneshot::Receiver<()>,
) {
    let (label, target) = match probe.upgrade() {
        Some(inner) => {
            let target = inner.log_target.clone();
            (Probe { inner }.to_string(), target)
        }
        None => return,
    };
    defer! {
        log::info!(target: target.as_str(), "{}: Stopped", label);
    }

    let mut ticker = new_ticker(*frequency.borrow_and_update());
    loop {
        tokio::select! {
            biased;

            // also fires when every handle to the probe is gone
            _ = &mut stop => break,
            changed = frequency.changed() => {
                if changed.is_err() {
                    break;
                }
                ticker = new_ticker(*frequency.borrow_and_update());
            }
            _ = ticker.tick() => {
                let Some(inner) = probe.upgrade() else {
                    break;
                };
                let probe = Probe { inner };
                if let Err(err) = probe.trigger().await {
                    log::debug!(target: target.as_str(), "{}: scheduled check failed: {}", label, err);
                }
            }
        }
    }
}
