use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use relaygate::{config::DEFAULT_CONFIG_PATH, init_logging, lifecycle, GatewaySettings};
use tracing::{error, warn};

/// HTTP to message broker gateway.
#[derive(Debug, Parser)]
#[command(name = "relaygate", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "RELAYGATE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Load and validate the configuration, print it and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = GatewaySettings::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    if cli.check {
        let rendered =
            serde_json::to_string_pretty(&settings).context("rendering configuration")?;
        println!("{rendered}");
        return Ok(());
    }

    let logging = init_logging(&settings.log, settings.debug).context("initializing logging")?;

    let result = lifecycle::run(Arc::new(settings), lifecycle::shutdown_signal()).await;
    let outcome = match result {
        Ok(report) => {
            if !report.is_clean() {
                warn!(failures = report.failures.len(), "gateway stopped with errors");
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, status = %e.status_code(), "gateway failed to start");
            Err(anyhow::Error::new(e).context("starting gateway"))
        }
    };

    logging.shutdown();
    outcome
}
