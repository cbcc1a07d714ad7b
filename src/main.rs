use std::path::Path;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use suota_soak::suota::SoakRunner;
use suota_soak::{Device, SoakConfig};

const CONFIG_PATH: &str = "suota-soak.json";
const LOG_PATH: &str = "upgrade_test.log";

fn init_logging() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_PATH)
        .with_context(|| format!("opening {LOG_PATH}"))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file)),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = SoakConfig::load_or_default(Path::new(CONFIG_PATH))
        .context("loading soak configuration")?;
    info!(
        versions = config.versions.len(),
        serial = config.serial.as_deref().unwrap_or("<default>"),
        "configuration loaded"
    );

    let device = Device::connect(config.serial.clone(), config.timings.poll_interval())
        .context("connecting to device over adb")?;

    let mut runner = SoakRunner::new(device, config);
    if let Err(err) = runner.run().await {
        let stats = runner.stats();
        error!(
            error = %err,
            attempts = stats.attempts,
            successes = stats.successes,
            "soak run terminated"
        );
        return Err(err.into());
    }
    Ok(())
}
