//! Time capsule client service
//!
//! Loads configuration, initialises logging and serves the local API.

use anyhow::Context;
use capsule_api::AppState;
use capsule_core::AppConfig;
use tracing_subscriber::EnvFilter;

/// Path of the JSON config file
pub const CONFIG_ENV: &str = "CAPSULE_CONFIG";
pub const NODE_URL_ENV: &str = "CAPSULE_NODE_URL";
pub const CONTRACT_ENV: &str = "CAPSULE_CONTRACT";
pub const API_PORT_ENV: &str = "CAPSULE_API_PORT";

/// Default directives; `RUST_LOG` adds to these. Targets are crate names, so
/// `capsule` covers the `capsule_*` crates and the protocol crate needs its own.
const LOG_DIRECTIVES: [&str; 3] = ["capsule=debug", "timecapsule=debug", "info"];

/// Run the service until the server stops
pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(log_filter()?).init();

    tracing::info!("Starting time capsule service");

    let config = load_config(|key| std::env::var(key).ok())?;
    tracing::info!(
        network = config.network.as_str(),
        node = %config.node.url,
        contract = config.contract.address.as_deref().unwrap_or("unset"),
        unlock_policy = config.unlock_policy.as_str(),
        "Configuration loaded"
    );

    let port = config.api_port;
    let state = AppState::new(config);

    capsule_api::start_server(state, port)
        .await
        .context("API server failed")
}

fn log_filter() -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env();
    for directive in LOG_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Build the config from an optional file plus environment overrides
pub fn load_config(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<AppConfig> {
    let mut config = match var(CONFIG_ENV) {
        Some(path) => {
            AppConfig::load(&path).with_context(|| format!("loading config from {}", path))?
        }
        None => AppConfig::default(),
    };

    if let Some(url) = var(NODE_URL_ENV) {
        config.node.url = url;
    }
    if let Some(contract) = var(CONTRACT_ENV) {
        config.contract.address = Some(contract);
    }
    if let Some(port) = var(API_PORT_ENV) {
        config.api_port = port
            .parse()
            .with_context(|| format!("{} is not a port: {}", API_PORT_ENV, port))?;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = load_config(env(&[])).unwrap();
        assert_eq!(config.api_port, 19054);
        assert!(config.contract.address.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = load_config(env(&[
            (NODE_URL_ENV, "http://127.0.0.1:8545"),
            (CONTRACT_ENV, "0x5fbdb2315678afecb367f032d93f642f64180aa3"),
            (API_PORT_ENV, "8080"),
        ]))
        .unwrap();
        assert_eq!(config.node.url, "http://127.0.0.1:8545");
        assert_eq!(config.api_port, 8080);
        assert!(config.contract_address().is_ok());
    }

    #[test]
    fn test_log_filter_covers_protocol_crate() {
        let rendered = log_filter().unwrap().to_string();
        assert!(rendered.contains("timecapsule=debug"));
        assert!(rendered.contains("capsule=debug"));
    }

    #[test]
    fn test_invalid_overrides() {
        assert!(load_config(env(&[(API_PORT_ENV, "port")])).is_err());
        assert!(load_config(env(&[(CONTRACT_ENV, "0x1234")])).is_err());
        assert!(load_config(env(&[(CONFIG_ENV, "/nonexistent/capsule.json")])).is_err());
    }
}
