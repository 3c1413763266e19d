use std::{
    num::NonZeroU32,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use anyhow::Context;
use clap::Parser;
use controller::{
    config::{FollowPolicy, HoldMode},
    input_queue, run_control_loop, ChannelSource, Launcher, LauncherConfig,
};
use serial_link::SerialConnector;
use shared::domain::AimMode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod input;

use config::load_settings;
use input::spawn_stdin_reader;

/// Aims and fires a two-wheel ball launcher from tracker samples on stdin.
#[derive(Parser, Debug)]
struct Cli {
    /// TOML settings file; `launcher.toml` is read if present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Serial device; `auto` picks the first USB serial port.
    #[arg(long)]
    port: Option<String>,
    #[arg(long)]
    baud: Option<u32>,
    /// Discard device commands instead of opening the serial port.
    #[arg(long, conflicts_with = "live")]
    mock: bool,
    #[arg(long)]
    live: bool,
    #[arg(long)]
    mode: Option<AimMode>,
    #[arg(long)]
    follow_policy: Option<FollowPolicy>,
    #[arg(long)]
    spin: Option<String>,
    #[arg(long)]
    auto_fire: Option<bool>,
    #[arg(long)]
    hold: Option<HoldMode>,
    #[arg(long)]
    tick_hz: Option<u32>,
    #[arg(long)]
    frame_width: Option<u32>,
}

impl Cli {
    fn apply(&self, settings: &mut LauncherConfig) {
        if let Some(port) = &self.port {
            settings.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            settings.serial.baud = baud;
        }
        if self.mock {
            settings.serial.mock = true;
        }
        if self.live {
            settings.serial.mock = false;
        }
        if let Some(mode) = self.mode {
            settings.aim.mode = mode;
        }
        if let Some(policy) = self.follow_policy {
            settings.aim.follow_policy = policy;
        }
        if let Some(spin) = &self.spin {
            settings.wheels.spin = spin.clone();
        }
        if let Some(auto) = self.auto_fire {
            settings.fire.auto = auto;
        }
        if let Some(hold) = self.hold {
            settings.fire.hold = hold;
        }
        if let Some(tick_hz) = self.tick_hz {
            settings.tracking.tick_hz = tick_hz;
        }
        if let Some(frame_width) = self.frame_width {
            settings.tracking.frame_width = frame_width;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    cli.apply(&mut settings);
    settings.validate().context("invalid launcher configuration")?;

    let frame_width = NonZeroU32::new(settings.tracking.frame_width)
        .context("tracking.frame_width must be positive")?;
    let connector = SerialConnector::new(settings.serial.settings());
    let mut launcher = Launcher::from_config(&settings, Box::new(connector), Instant::now())
        .context("failed to build launcher")?;

    let (input_tx, input_rx) = input_queue();
    spawn_stdin_reader(input_tx, frame_width).context("failed to start input reader")?;

    let running = Arc::new(AtomicBool::new(true));
    let stop = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; stopping");
            stop.store(false, Ordering::SeqCst);
        }
    });

    info!(
        port = %settings.serial.port,
        mock = settings.serial.mock,
        mode = %settings.aim.mode,
        spin = %settings.wheels.spin,
        "launcher ready"
    );
    // commands arrive in order with the samples on stdin
    let mut source = ChannelSource::new(input_rx, frame_width);
    let exit = run_control_loop(
        &mut launcher,
        &mut source,
        &crossbeam_channel::never(),
        &running,
        settings.tracking.tick_period(),
        |status| match serde_json::to_string_pretty(&status) {
            Ok(json) => println!("{json}"),
            Err(error) => warn!(%error, "failed to render status"),
        },
    )
    .await?;

    info!(?exit, "launcher stopped");
    Ok(())
}
