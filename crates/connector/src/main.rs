//! Connector entry point.
//!
//! 1. Install tracing ([`connector::telemetry`]).
//! 2. Read the runtime manifest named by `EDC_RUNTIME_MANIFEST`, or load every
//!    bundled extension.
//! 3. Boot, serve until Ctrl-C, shut down in reverse order.
//!
//! Any boot error ends the process with a non-zero exit code.

use std::path::PathBuf;

use anyhow::Context;
use connector::{catalog, manifest, telemetry, MANIFEST_ENV};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let telemetry = telemetry::init("connector")?;
    let result = run().await;
    if let Err(err) = &result {
        error!(error = %format!("{err:#}"), "Connector stopped with an error");
    }
    telemetry.shutdown();
    result
}

async fn run() -> anyhow::Result<()> {
    let catalog = catalog();
    let manifest_path = std::env::var_os(MANIFEST_ENV).map(PathBuf::from);
    let manifest = manifest(&catalog, manifest_path.as_deref())?;
    info!(
        runtime = manifest.name.as_deref().unwrap_or("connector"),
        extensions = ?manifest.extensions,
        "Runtime manifest loaded"
    );

    let runtime = catalog
        .bootstrapper(&manifest)?
        .boot()
        .await
        .context("Connector failed to boot")?;

    runtime
        .run(|handle| async move {
            info!(connector = handle.connector_name(), "Connector running, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await
        })
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Connector stopped");
    Ok(())
}
