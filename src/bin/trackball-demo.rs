/* Demo entrypoint: sets up tracing, enables the trackball on the default
 * channel, lights it magenta, and prints state updates for one minute. */
use std::time::Duration;

use anyhow::Result;
use pim447_rs::{Trackball, hex_to_rgbw};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut trackball = Trackball::new();

    trackball.on_state_update(|sample| info!(?sample, "state update"));
    trackball.on_error(|error| warn!("poll error: {error}"));

    trackball.enable().await?;

    let colour = hex_to_rgbw("#ff00ff")?;
    trackball.set_color(colour).await?;
    trackball.set_contrast(0xFF).await?;

    info!("Click or move the cursor to trigger some events");
    tokio::time::sleep(Duration::from_secs(60)).await;

    trackball.disable().await?;
    info!("Stopped checking the trackball state");

    Ok(())
}
