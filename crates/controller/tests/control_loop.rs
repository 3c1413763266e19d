use std::{
    collections::VecDeque,
    num::NonZeroU32,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use anyhow::anyhow;
use controller::{
    command_queue, dispatch_command,
    config::{HoldMode, SerialConfig},
    run_control_loop, Launcher, LauncherCommand, LauncherConfig, LoopExit, TargetSource,
    TrackSample,
};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serial_link::memory::MemoryDevice;
use shared::{domain::AimMode, protocol::DeviceCommand};

const TICK: Duration = Duration::from_millis(5);

struct ScriptedSource {
    samples: VecDeque<TrackSample>,
    fail_open: bool,
}

impl ScriptedSource {
    fn repeating(target_x: Option<i32>, ticks: usize) -> Self {
        let sample = TrackSample {
            target_x,
            frame_width: NonZeroU32::new(640).expect("width"),
        };
        Self {
            samples: std::iter::repeat(sample).take(ticks).collect(),
            fail_open: false,
        }
    }
}

impl TargetSource for ScriptedSource {
    fn open(&mut self) -> anyhow::Result<()> {
        if self.fail_open {
            return Err(anyhow!("camera 0 not found"));
        }
        Ok(())
    }

    fn next_sample(&mut self) -> anyhow::Result<Option<TrackSample>> {
        Ok(self.samples.pop_front())
    }
}

fn config(hold: HoldMode) -> LauncherConfig {
    let mut config = LauncherConfig {
        serial: SerialConfig {
            mock: false,
            ..SerialConfig::default()
        },
        ..LauncherConfig::default()
    };
    config.fire.hold = hold;
    config.fire.on_secs = 0.02;
    config.fire.off_secs = 0.05;
    config
}

fn launcher(config: &LauncherConfig, device: &MemoryDevice) -> Launcher {
    Launcher::with_rng(
        config,
        Box::new(device.connector("mem")),
        Pcg64::seed_from_u64(3),
        Instant::now(),
    )
    .expect("launcher")
}

#[tokio::test]
async fn atomic_hold_closes_before_the_next_angle() {
    let device = MemoryDevice::new();
    let mut launcher = launcher(&config(HoldMode::Atomic), &device);
    let mut source = ScriptedSource::repeating(Some(320), 40);
    let (_tx, rx) = command_queue();
    let running = AtomicBool::new(true);

    let exit = run_control_loop(&mut launcher, &mut source, &rx, &running, TICK, |_| {})
        .await
        .expect("loop");
    assert_eq!(exit, LoopExit::SourceEnded);

    let commands = device.commands();
    let opens = commands
        .iter()
        .filter(|command| **command == DeviceCommand::Gate { open: true })
        .count();
    assert!(opens >= 1, "no fire cycle in {commands:?}");
    for (index, command) in commands.iter().enumerate() {
        if *command == (DeviceCommand::Gate { open: true }) {
            assert_eq!(commands.get(index + 1), Some(&DeviceCommand::Gate { open: false }));
        }
    }
    assert_eq!(device.closes(), 1);
}

#[tokio::test]
async fn deferred_hold_keeps_aiming_while_the_gate_is_open() {
    let device = MemoryDevice::new();
    let mut config = config(HoldMode::Deferred);
    config.fire.on_secs = 0.03;
    let mut launcher = launcher(&config, &device);
    let mut source = ScriptedSource::repeating(Some(320), 40);
    let (_tx, rx) = command_queue();
    let running = AtomicBool::new(true);

    run_control_loop(&mut launcher, &mut source, &rx, &running, TICK, |_| {})
        .await
        .expect("loop");

    let commands = device.commands();
    let open_at = commands
        .iter()
        .position(|command| *command == DeviceCommand::Gate { open: true })
        .expect("fire cycle");
    assert_eq!(commands.get(open_at + 1), Some(&DeviceCommand::Angle(90)));
}

#[tokio::test]
async fn quit_command_stops_the_loop_and_closes_the_port() {
    let device = MemoryDevice::new();
    let mut launcher = launcher(&config(HoldMode::Atomic), &device);
    let mut source = ScriptedSource::repeating(None, 1_000);
    let (tx, rx) = command_queue();
    let running = AtomicBool::new(true);

    assert!(dispatch_command(&tx, LauncherCommand::SetMode(AimMode::Random)));
    assert!(dispatch_command(&tx, LauncherCommand::Quit));

    let exit = run_control_loop(&mut launcher, &mut source, &rx, &running, TICK, |_| {})
        .await
        .expect("loop");
    assert_eq!(exit, LoopExit::Quit);
    assert_eq!(launcher.mode(), AimMode::Random);
    assert!(launcher.transport().is_closed());
    assert_eq!(device.closes(), 1);
}

#[tokio::test]
async fn cleared_running_flag_is_observed_on_the_next_tick() {
    let device = MemoryDevice::new();
    let mut launcher = launcher(&config(HoldMode::Atomic), &device);
    let mut source = ScriptedSource::repeating(None, 1_000);
    let (_tx, rx) = command_queue();
    let running = AtomicBool::new(true);
    running.store(false, Ordering::SeqCst);

    let exit = run_control_loop(&mut launcher, &mut source, &rx, &running, TICK, |_| {})
        .await
        .expect("loop");
    assert_eq!(exit, LoopExit::Stopped);
    assert!(device.lines().is_empty());
    assert_eq!(device.closes(), 1);
}

#[tokio::test]
async fn status_requests_are_reported_by_the_loop() {
    let device = MemoryDevice::new();
    let mut launcher = launcher(&config(HoldMode::Atomic), &device);
    let mut source = ScriptedSource::repeating(Some(0), 3);
    let (tx, rx) = command_queue();
    let running = AtomicBool::new(true);

    dispatch_command(&tx, LauncherCommand::SetSpin("backspin".into()));
    dispatch_command(&tx, LauncherCommand::SetSpin("wobble".into()));
    dispatch_command(&tx, LauncherCommand::ReportStatus);

    let mut reports = Vec::new();
    run_control_loop(&mut launcher, &mut source, &rx, &running, TICK, |status| {
        reports.push(status)
    })
    .await
    .expect("loop");

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].spin, "backspin");
    let json = serde_json::to_value(&reports[0]).expect("json");
    assert_eq!(json["mode"], "follow");
    assert_eq!(json["transport"]["mode"], "live");
}

#[tokio::test]
async fn failed_source_open_still_closes_the_transport() {
    let device = MemoryDevice::new();
    let mut launcher = launcher(&config(HoldMode::Atomic), &device);
    let mut source = ScriptedSource {
        samples: VecDeque::new(),
        fail_open: true,
    };
    let (_tx, rx) = command_queue();
    let running = AtomicBool::new(true);

    let err = run_control_loop(&mut launcher, &mut source, &rx, &running, TICK, |_| {})
        .await
        .expect_err("open failure");
    assert!(format!("{err:#}").contains("camera 0 not found"));
    assert_eq!(device.closes(), 1);

    drop(launcher);
    assert_eq!(device.closes(), 1);
}
