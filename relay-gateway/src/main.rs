//! Relay Gateway - Main entry point.

use anyhow::Result;
use relay_common::config::Config;
use relay_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        config.effective_log_level(),
        &config.observability.log_format,
    );

    tracing::info!("Relay Gateway v{}", env!("CARGO_PKG_VERSION"));

    // Refuse to start without a credential
    if let Err(e) = config.require_api_key() {
        tracing::error!(error = %e, "Startup aborted");
        return Err(e.into());
    }

    relay_gateway::start_server(&config).await
}
