use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tokenreview_hub::server;
use tokenreview_hub::telemetry;
use tokenreview_hub::telemetry::LogFormat;
use tokenreview_hub::Config;
use tokenreview_hub::TokenValidator;

#[derive(Parser, Debug)]
#[command(name = "tokenreview-hub")]
#[command(
    about = "Kubernetes webhook token authenticator for JWTs from trusted issuers",
    long_about = None
)]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Listen address (overrides config)
    #[arg(short, long)]
    address: Option<String>,

    /// Listen port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log output format (overrides config)
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    if let Some(address) = args.address {
        config.address = address;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    telemetry::init(args.log_format.unwrap_or(config.log_format));

    let trust_store = config.trust_store()?;
    tracing::info!(issuers = trust_store.len(), "trust store loaded");

    let validator = TokenValidator::new(trust_store, config.validator_config());

    server::serve(&config.bind_address(), Arc::new(validator)).await?;

    Ok(())
}
