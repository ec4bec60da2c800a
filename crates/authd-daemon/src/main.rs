//! Broker daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads config, and
//! hands off to `authd_daemon::run`. All route handlers live in
//! `routes.rs`; all shared state types live in `state.rs`.

use anyhow::Context;
use authd_config::BrokerConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist -- production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = BrokerConfig::from_env().context("loading broker configuration")?;
    authd_daemon::run(config).await
}
