pub mod audio;
pub mod events;
pub mod metrics;
pub mod perception;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Duration;

use audio::AlarmController;
use events::LogSink;
use sensing::simulated::{SimulatedPerception, SyntheticCamera};
use session::SessionController;
use settings::{MonitorConfig, MonitorVariant};

pub fn run() {
    utils::init_logging(settings::debug_enabled());

    log::info!("FocusFlow starting up...");

    let config = MonitorConfig::from_env();

    // Both periodic tasks share one thread; each callback runs to completion.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("failed to build async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run_monitor(config)) {
        log::error!("FocusFlow stopped: {err:#}");
        std::process::exit(1);
    }
}

async fn run_monitor(config: MonitorConfig) -> anyhow::Result<()> {
    let perception = Arc::new(SimulatedPerception::new(
        Duration::from_secs(1),
        Duration::from_millis(40),
    ));
    let camera = Arc::new(SyntheticCamera::new(Duration::from_millis(500)));

    let variant = config.variant;
    let mut controller = SessionController::new(config.clone(), perception, camera, Arc::new(LogSink));

    if variant == MonitorVariant::Alarm {
        let playback = audio::default_playback(config.alarm.sound_path.clone());
        controller = controller.with_alarm(AlarmController::new(playback));

        log::info!("Ready to focus? Distractions will trigger the alarm at max volume.");
        log::info!("Press Enter to start the session (Ctrl-C to quit).");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        tokio::select! {
            line = lines.next_line() => {
                line.context("failed to read start command")?;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Quit before the session started");
                return Ok(());
            }
        }
    }

    controller.start_session().await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    let summary = controller.end_session().await?;
    log::info!(
        "Session summary: {}",
        serde_json::to_string(&summary).context("failed to serialize session summary")?
    );

    Ok(())
}
