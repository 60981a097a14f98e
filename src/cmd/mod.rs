use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use prometheus::Registry;

mod probe;
pub use probe::*;

use crate::{
    conf::{self, Conf},
    get_env_or_default, Alien, MetricsSink, PrometheusSink,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Alien probes your endpoints", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'f', long, default_value_t = get_env_or_default("ALIEN_CONFIG", "config.yaml"))]
    yaml_file: String,

    /// Show JSON schema
    #[arg(short = 'j', long, default_value_t = false)]
    json_schema: bool,

    /// Metrics listen address, overrides the configuration file
    #[arg(long)]
    metrics_address: Option<String>,

    /// Metrics path, overrides the configuration file
    #[arg(long)]
    metrics_path: Option<String>,

    /// Endpoints to probe for an HTTP 200, instead of the configuration file
    endpoints: Vec<String>,
}

pub async fn start() -> Result<()> {
    logforth::stdout().apply();

    let args = Args::parse();
    if args.json_schema {
        println!("{}", conf::json_schema()?);
        return Ok(());
    }

    let mut c = if args.endpoints.is_empty() {
        Conf::from_file(&args.yaml_file)?
    } else {
        Conf::from_endpoints(&args.endpoints)
    };
    if let Some(address) = args.metrics_address {
        c.settings.metrics.address = address;
    }
    if let Some(path) = args.metrics_path {
        c.settings.metrics.path = path;
    }
    log::debug!("{:?}", c);

    let registry = Registry::new();
    let sink: Arc<dyn MetricsSink> = Arc::new(PrometheusSink::new(&registry)?);
    let alien = Alien::new(c.settings.metrics.clone(), registry);

    let probes = config_probes(&c, &sink)?;
    run_probes(&alien, probes).await?;

    alien.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::parse_from(["alien", "http://a", "http://b", "--metrics-path", "/m"]);
        assert_eq!(args.endpoints, vec!["http://a", "http://b"]);
        assert_eq!(args.metrics_path.as_deref(), Some("/m"));
        assert!(args.metrics_address.is_none());
        assert!(!args.json_schema);

        let args = Args::parse_from(["alien", "-f", "probes.yaml", "-j"]);
        assert_eq!(args.yaml_file, "probes.yaml");
        assert!(args.json_schema);
        assert!(args.endpoints.is_empty());
    }
}
