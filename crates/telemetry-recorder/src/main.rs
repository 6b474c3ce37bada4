//! Activity telemetry recorder entry point.
//!
//! Wires configuration, the platform input hooks, the screen grabber, and a
//! detached host into a [`Recorder`] session, then records until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML settings, defaults on first run
//!  └─ Recorder::start()
//!       ├─ TelemetrySinks    (four log files + optional socket mirror)
//!       ├─ CaptureWorker     (screen grab thread)
//!       └─ InputHook x2      (keyboard + mouse hook threads)
//!  └─ ctrl_c().await
//!  └─ Recorder::stop()
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use telemetry_recorder::application::{Recorder, RecorderOptions};
use telemetry_recorder::infrastructure::host_bridge::DetachedHost;
use telemetry_recorder::infrastructure::input_capture::platform_hooks;
use telemetry_recorder::infrastructure::screenshot::XcapGrabber;
use telemetry_recorder::infrastructure::storage::config::load_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.recorder.log_level.clone())),
        )
        .init();

    info!("activity telemetry recorder starting");

    let (keyboard, mouse) = platform_hooks().context("input hooks unavailable")?;

    let mut recorder = Recorder::new(
        RecorderOptions {
            output_dir: config.recorder.output_dir.clone(),
            remote_endpoint: config.remote.endpoint.clone(),
            capture_interval: Duration::from_secs(config.capture.interval_secs),
        },
        keyboard,
        mouse,
        Arc::new(DetachedHost::new()),
        Box::new(XcapGrabber),
    );

    recorder.start().context("failed to start recording")?;
    info!("recording to {}; press Ctrl-C to stop", config.recorder.output_dir.display());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    recorder.stop().context("failed to stop recording cleanly")?;
    Ok(())
}
