//! LED panel game server.
//!
//! # Usage
//!
//! ```bash
//! # Play through HTTP only (no panel attached)
//! ledpanel-server --no-device
//!
//! # With the panel on a serial port and the prediction service
//! ledpanel-server -d /dev/ttyACM0 --decision-url http://127.0.0.1:8001/predecir
//!
//! # Reproducible patterns, debug logging
//! ledpanel-server --seed 42 -v
//! ```

use anyhow::{Context, Result};
use clap::Parser;

use ledpanel_lib::cli::{initialize, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let ctx = initialize(&args).await?;
    tracing::info!("Serving on http://{}", ctx.addr);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");

    ctx.shutdown().await
}
