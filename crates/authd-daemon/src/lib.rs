//! Library surface for the broker daemon binary: the Axum router, shared
//! state, and the D-Bus config-snippet writer, split out so scenario tests
//! can exercise the router without spawning a real process, and so
//! `authd-cli`'s `serve` command can start the same server in-process.

pub mod config_snippet;
pub mod routes;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use authd_config::BrokerConfig;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

/// Write the registration snippet, bind the HTTP listener, and serve until
/// the process is killed. Does not install a tracing subscriber -- callers
/// (the `authd-daemon` binary, or `authd-cli serve`) own that decision.
pub async fn run(config: BrokerConfig) -> anyhow::Result<()> {
    let snippet_path = config_snippet::write_into(&config.brokers_conf_dir, &config_snippet::EXAMPLE_BROKER)
        .context("writing broker D-Bus registration snippet")?;
    info!(path = %snippet_path.display(), "wrote broker registration snippet");

    let addr = config.daemon_addr;
    let shared = Arc::new(state::AppState::new(config)?);

    let app = routes::build_router(shared)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive());

    info!("authd-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")
}
