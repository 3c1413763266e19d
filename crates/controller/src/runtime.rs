//! Control loop driving a `Launcher` from a target source and the operator queue.

use std::{
    num::NonZeroU32,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use anyhow::Context;
use crossbeam_channel::{Receiver, TryRecvError};
use rand::Rng;
use tokio::time::{interval, sleep_until, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    commands::LauncherCommand,
    config::HoldMode,
    fire::FireStep,
    launcher::{Launcher, LauncherStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSample {
    pub target_x: Option<i32>,
    pub frame_width: NonZeroU32,
}

impl TrackSample {
    pub fn lost(frame_width: NonZeroU32) -> Self {
        Self {
            target_x: None,
            frame_width,
        }
    }
}

/// Produces one sample per tick. `Ok(None)` means the stream has ended.
pub trait TargetSource {
    fn open(&mut self) -> anyhow::Result<()>;
    fn next_sample(&mut self) -> anyhow::Result<Option<TrackSample>>;

    /// Operator commands that arrived ahead of the last sample, oldest first.
    fn take_commands(&mut self) -> Vec<LauncherCommand> {
        Vec::new()
    }
}

/// One line of operator input: a tracker sample or a command.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Sample(TrackSample),
    Command(LauncherCommand),
}

/// Ordered operator input fed over a channel.
///
/// Each tick consumes events up to and including the next sample, so commands
/// apply in the order they were entered. With nothing new queued, the most
/// recent sample is repeated.
pub struct ChannelSource {
    events: Receiver<InputEvent>,
    latest: TrackSample,
    pending: Vec<LauncherCommand>,
    ended: bool,
}

impl ChannelSource {
    pub fn new(events: Receiver<InputEvent>, frame_width: NonZeroU32) -> Self {
        Self {
            events,
            latest: TrackSample::lost(frame_width),
            pending: Vec::new(),
            ended: false,
        }
    }
}

impl TargetSource for ChannelSource {
    fn open(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn next_sample(&mut self) -> anyhow::Result<Option<TrackSample>> {
        if self.ended {
            return Ok(None);
        }
        let mut progressed = false;
        loop {
            match self.events.try_recv() {
                Ok(InputEvent::Sample(sample)) => {
                    self.latest = sample;
                    return Ok(Some(sample));
                }
                Ok(InputEvent::Command(command)) => {
                    self.pending.push(command);
                    progressed = true;
                }
                Err(TryRecvError::Empty) => return Ok(Some(self.latest)),
                Err(TryRecvError::Disconnected) => {
                    self.ended = true;
                    return Ok(progressed.then_some(self.latest));
                }
            }
        }
    }

    fn take_commands(&mut self) -> Vec<LauncherCommand> {
        std::mem::take(&mut self.pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The running flag was cleared.
    Stopped,
    Quit,
    SourceEnded,
}

/// Runs ticks until stopped, then shuts the launcher down on every exit path.
pub async fn run_control_loop<R, S>(
    launcher: &mut Launcher<R>,
    source: &mut S,
    commands: &Receiver<LauncherCommand>,
    running: &AtomicBool,
    tick_period: Duration,
    mut report: impl FnMut(LauncherStatus),
) -> anyhow::Result<LoopExit>
where
    R: Rng,
    S: TargetSource,
{
    let result = drive(launcher, source, commands, running, tick_period, &mut report).await;
    launcher.shutdown();
    match &result {
        Ok(exit) => info!(?exit, "control loop finished"),
        Err(error) => warn!(%error, "control loop aborted"),
    }
    result
}

async fn drive<R, S>(
    launcher: &mut Launcher<R>,
    source: &mut S,
    commands: &Receiver<LauncherCommand>,
    running: &AtomicBool,
    tick_period: Duration,
    report: &mut impl FnMut(LauncherStatus),
) -> anyhow::Result<LoopExit>
where
    R: Rng,
    S: TargetSource,
{
    source.open().context("failed to open target source")?;

    let mut ticker = interval(tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        tick = ?tick_period,
        hold = %launcher.hold_mode(),
        "control loop started"
    );

    loop {
        ticker.tick().await;
        if !running.load(Ordering::SeqCst) {
            return Ok(LoopExit::Stopped);
        }

        loop {
            let command = match commands.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            if let Some(exit) = handle_command(launcher, command, &mut *report).await {
                return Ok(exit);
            }
        }

        let next = source
            .next_sample()
            .context("failed to read target sample")?;
        for command in source.take_commands() {
            if let Some(exit) = handle_command(launcher, command, &mut *report).await {
                return Ok(exit);
            }
        }
        let Some(sample) = next else {
            return Ok(LoopExit::SourceEnded);
        };
        let tick = launcher.tick(sample, Instant::now());
        finish_hold(launcher, tick.fire).await;
    }
}

async fn handle_command<R: Rng>(
    launcher: &mut Launcher<R>,
    command: LauncherCommand,
    report: &mut impl FnMut(LauncherStatus),
) -> Option<LoopExit> {
    debug!(command = command.name(), "applying operator command");
    match command {
        LauncherCommand::Quit => return Some(LoopExit::Quit),
        LauncherCommand::ReportStatus => report(launcher.status()),
        command => match launcher.apply(command, Instant::now()) {
            Ok(step) => finish_hold(launcher, step).await,
            Err(error) => warn!(%error, code = ?error.code(), "operator command rejected"),
        },
    }
    None
}

/// In atomic hold mode, waits out an opened gate and closes it before returning.
async fn finish_hold<R>(launcher: &mut Launcher<R>, step: Option<FireStep>) {
    let Some(FireStep::Open { close_at }) = step else {
        return;
    };
    if launcher.hold_mode() != HoldMode::Atomic {
        return;
    }
    sleep_until(tokio::time::Instant::from_std(close_at)).await;
    launcher.poll_fire(Instant::now());
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
