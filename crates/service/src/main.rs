//! Pixel pricer - USD pegged pixel pricing for a transcoding node
//!
//! Main entry point

use clap::Parser;
use tracing::{error, info};

use pixel_pricer_service::{build_engine, logging, shutdown, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let settings = Settings::parse();
    logging::init(&settings.log_level, settings.log_json);

    info!("Starting pixel pricer v{}", env!("CARGO_PKG_VERSION"));

    let resolved = settings.resolve()?;
    info!(
        "You will currently charge $ {} per million pixels, node {}",
        settings.price, resolved.node_url
    );

    let engine = build_engine(&resolved).await?;
    let mut handle = engine.spawn();
    info!("Press Ctrl+C to shutdown");

    let result = tokio::select! {
        res = handle.wait() => res,
        _ = shutdown::shutdown_signal() => handle.shutdown().await,
    };

    if let Err(e) = result {
        error!("Pricing engine error: {}", e);
        return Err(e.into());
    }

    info!("Shutdown complete");
    Ok(())
}
