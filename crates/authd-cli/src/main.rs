use anyhow::{Context, Result};
use authd_config::BrokerConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "authd")]
#[command(about = "Example authentication broker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the broker's HTTP server and write its D-Bus registration snippet.
    Serve,
    /// Validate configuration read from the environment and print it.
    ConfigCheck,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Serve => {
            let config = BrokerConfig::from_env().context("loading broker configuration")?;
            authd_daemon::run(config).await?;
        }
        Commands::ConfigCheck => {
            let config = BrokerConfig::from_env().context("loading broker configuration")?;
            println!("sleep_multiplier={}", config.sleep_multiplier);
            println!("home_base_dir={}", config.home_base_dir);
            println!("daemon_addr={}", config.daemon_addr);
            println!("brokers_conf_dir={}", config.brokers_conf_dir.display());
        }
    }

    Ok(())
}
