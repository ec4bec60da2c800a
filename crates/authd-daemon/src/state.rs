//! Shared runtime state for the daemon binary.

use std::sync::Arc;

use authd_broker::{example::ExampleBroker, BrokerFacade};
use authd_config::BrokerConfig;
use serde::{Deserialize, Serialize};

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<BrokerFacade<ExampleBroker>>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(config: BrokerConfig) -> anyhow::Result<Self> {
        let facade = BrokerFacade::new(ExampleBroker::new(config))
            .map_err(|e| anyhow::anyhow!("failed to initialize broker facade: {e}"))?;
        Ok(Self {
            facade: Arc::new(facade),
            build: BuildInfo {
                service: "authd-example-broker",
                version: env!("CARGO_PKG_VERSION"),
            },
        })
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed().as_secs()
}
