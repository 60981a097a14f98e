use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{conf::Conf, Alien, MetricsSink, Probe};

pub fn config_probes(c: &Conf, sink: &Arc<dyn MetricsSink>) -> Result<Vec<Probe>> {
    let mut probes = Vec::with_capacity(c.probes.len());

    for p in &c.probes {
        let options = p.options(&c.settings.probe)?;
        let probe = Probe::new(&p.endpoint, Arc::clone(sink), options).map_err(|err| {
            log::error!("Bad Probe Configuration for {}: {}", p.endpoint, err);
            err
        })?;
        probes.push(probe);
    }

    Ok(probes)
}

pub async fn run_probes(alien: &Alien, probes: Vec<Probe>) -> Result<()> {
    for probe in probes {
        let name = probe.to_string();
        alien
            .add_probe(probe)
            .await
            .with_context(|| format!("add probe {}", name))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use prometheus::Registry;

    use super::*;
    use crate::{conf::ProbeConf, MemorySink, MetricsSettings};

    #[tokio::test]
    async fn test_config_probes() {
        let sink: Arc<dyn MetricsSink> = Arc::new(MemorySink::new());
        let c = Conf::from_endpoints(&["http://127.0.0.1:1/a".to_string()]);
        let probes = config_probes(&c, &sink).unwrap();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].endpoint(), "http://127.0.0.1:1/a");
        assert!(probes[0].validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_run_probes_rejects_invalid() {
        let sink: Arc<dyn MetricsSink> = Arc::new(MemorySink::new());
        let mut c = Conf::default();
        let mut p = ProbeConf::new("http://127.0.0.1:1/a");
        p.method = String::new();
        c.probes.push(p);

        let probes = config_probes(&c, &sink).unwrap();
        let alien = Alien::new(MetricsSettings::default(), Registry::new());
        assert!(run_probes(&alien, probes).await.is_err());
        assert!(alien.is_empty().await);
    }
}
