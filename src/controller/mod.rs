use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use prometheus::Registry;
use thiserror::Error;
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex, Notify},
    task::JoinHandle,
};

use crate::{serve_metrics, MetricsSettings, Probe, ProbeError, ProbeId};

mod signal;
pub use signal::*;

const KIND: &str = "alien";

#[derive(Debug, Error)]
pub enum AlienError {
    #[error("alien not initialised")]
    NotInitialised,
    #[error("probe not found")]
    ProbeNotFound,
    #[error("probe already registered")]
    AlreadyRegistered,
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error("metrics server: {0}")]
    Server(#[from] std::io::Error),
}

/// Owns a set of probes, serves their metrics and stops them together.
pub struct Alien {
    init: bool,
    probes: Mutex<HashMap<ProbeId, Probe>>,
    settings: MetricsSettings,
    registry: Registry,
    stop_notify: Arc<Notify>,
}

impl Default for Alien {
    /// A controller that was never built; `run` does nothing and the other
    /// operations fail with [`AlienError::NotInitialised`].
    fn default() -> Self {
        Self {
            init: false,
            probes: Mutex::new(HashMap::new()),
            settings: MetricsSettings::default(),
            registry: Registry::new(),
            stop_notify: Arc::new(Notify::new()),
        }
    }
}

impl Alien {
    /// `registry` is the one the probes' metrics sink is registered in.
    pub fn new(settings: MetricsSettings, registry: Registry) -> Self {
        Self {
            init: true,
            settings,
            registry,
            ..Default::default()
        }
    }

    pub fn settings(&self) -> &MetricsSettings {
        &self.settings
    }

    pub async fn len(&self) -> usize {
        self.probes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.probes.lock().await.is_empty()
    }

    pub async fn contains(&self, probe: &Probe) -> bool {
        self.probes.lock().await.contains_key(&probe.id())
    }

    /// Registers the probe and starts it. A probe that fails to start is not
    /// kept.
    pub async fn add_probe(&self, probe: Probe) -> Result<(), AlienError> {
        if !self.init {
            return Err(AlienError::NotInitialised);
        }

        let mut probes = self.probes.lock().await;
        if probes.contains_key(&probe.id()) {
            log::warn!(
                "[{}]: {} is already registered, ignored!",
                KIND,
                probe
            );
            return Err(AlienError::AlreadyRegistered);
        }
        probes.insert(probe.id(), probe.clone());

        if let Err(err) = probe.run().await {
            probes.remove(&probe.id());
            log::error!("[{}]: {} failed to start: {}", KIND, probe, err);
            return Err(err.into());
        }

        log::info!("[{}]: {} added", KIND, probe);
        Ok(())
    }

    /// Unregisters the probe and stops it if it is running.
    pub async fn remove_probe(&self, probe: &Probe) -> Result<(), AlienError> {
        if !self.init {
            return Err(AlienError::NotInitialised);
        }

        let removed = self
            .probes
            .lock()
            .await
            .remove(&probe.id())
            .ok_or(AlienError::ProbeNotFound)?;

        match removed.stop().await {
            Ok(()) | Err(ProbeError::NotRunning) => {}
            Err(err) => return Err(err.into()),
        }
        log::info!("[{}]: {} removed", KIND, probe);
        Ok(())
    }

    /// Asks a running [`Alien::run`] to shut down. A request made before
    /// `run` waits is kept until it does.
    pub fn stop(&self) {
        self.stop_notify.notify_one();
    }

    /// Waits for Ctrl+C or SIGTERM in the background and then stops the
    /// controller, once.
    pub fn listen_for_termination(&self) -> JoinHandle<()> {
        let stop_notify = Arc::clone(&self.stop_notify);
        tokio::spawn(async move {
            termination_signal().await;
            stop_notify.notify_one();
        })
    }

    /// Serves the metrics endpoint and blocks until stopped, then stops every
    /// registered probe.
    pub async fn run(&self) -> Result<(), AlienError> {
        if !self.init {
            log::warn!("[{}]: not initialised, nothing to run", KIND);
            return Ok(());
        }

        let signals = scopeguard::guard(self.listen_for_termination(), |task| task.abort());

        let listener = match TcpListener::bind(self.settings.bind_address()).await {
            Ok(listener) => listener,
            Err(err) => {
                log::error!(
                    "[{}]: failed to bind metrics server on {}: {}",
                    KIND,
                    self.settings.bind_address(),
                    err
                );
                self.stop_all().await;
                return Err(err.into());
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_metrics(
            listener,
            self.registry.clone(),
            self.settings.route(),
            async move {
                let _ = shutdown_rx.await;
            },
        ));

        self.stop_notify.notified().await;
        log::info!("[{}]: Stop requested at: {}", KIND, Utc::now().to_rfc3339());

        let _ = shutdown_tx.send(());
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::error!("[{}]: metrics server failed: {}", KIND, err),
            Err(err) => log::error!("[{}]: metrics server aborted: {}", KIND, err),
        }

        self.stop_all().await;
        drop(signals);
        Ok(())
    }

    async fn stop_all(&self) {
        let probes = self.probes.lock().await;
        for probe in probes.values() {
            match probe.stop().await {
                Ok(()) => {}
                Err(ProbeError::NotRunning) => {
                    log::debug!("[{}]: {} was not running", KIND, probe)
                }
                Err(err) => log::error!("[{}]: failed to stop {}: {}", KIND, probe, err),
            }
        }
        log::info!("[{}]: {} probe(s) stopped", KIND, probes.len());
    }
}
