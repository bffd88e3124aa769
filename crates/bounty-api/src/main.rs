//! Binary entrypoint for the bounty board API server.
use anyhow::Context;
use bounty_api::run;
use bounty_core::BoardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // BOUNTY_CONFIG points at a YAML file; otherwise defaults plus BOUNTY_* overrides
    let config = match std::env::var("BOUNTY_CONFIG") {
        Ok(path) => BoardConfig::load(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => BoardConfig::from_env().context("reading environment")?,
    };
    bounty_core::logging::init(&config.logging);

    run(config).await
}
