use anyhow::Result;
use std::path::PathBuf;
use tokio::time::{interval_at, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;
use triptych::events::next_event;
use triptych::prelude::*;
use triptych::{ENGINE_NAME, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 2. Load host settings. An explicit settings file may be passed as the
    //    first argument; otherwise `triptych.toml` is used if it exists.
    let settings_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = HostSettings::load(settings_path.as_deref())?;
    info!(
        "{} v{} reading {}",
        ENGINE_NAME,
        VERSION,
        settings.config_source.display()
    );

    // 3. Create the rotator and log what it does.
    let mut rotator = Rotator::new(&settings);
    spawn_event_listener(&rotator);

    // 4. Apply the initial configuration.
    rotator.reload(&settings.config_source).await;

    // 5. Run until Ctrl+C, re-reading the source if a reload period is set.
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    match settings.reload_interval() {
        Some(period) => {
            let mut reload_ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = reload_ticker.tick() => {
                        rotator.reload(&settings.config_source).await;
                    }
                }
            }
        }
        None => {
            shutdown.await?;
        }
    }

    info!("Shutdown signal received.");
    rotator.shutdown().await;
    Ok(())
}

/// Spawns a task that logs every event the rotator broadcasts.
fn spawn_event_listener(rotator: &Rotator) {
    let mut event_rx = rotator.subscribe();
    tokio::spawn(async move {
        while let Some(event) = next_event(&mut event_rx).await {
            match event {
                RotationEvent::SlotRotated { rotation, .. } => info!(
                    "[ROTATION] slot {} -> {} (layer {:?})",
                    rotation.slot, rotation.image, rotation.layer
                ),
                RotationEvent::ConfigApplied {
                    pool_size,
                    interval,
                    fade,
                    ..
                } => info!(
                    "[CONFIG] {} images, every {:?}, fading over {:?}",
                    pool_size, interval, fade
                ),
                other => info!("[SYSTEM] => {:?}", other),
            }
        }
    });
}
