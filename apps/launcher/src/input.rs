//! Line-oriented operator input standing in for the tracker and keyboard.

use std::{
    io::{self, BufRead},
    num::NonZeroU32,
    thread,
};

use controller::{config::seconds, InputEvent, LauncherCommand, TrackSample};
use crossbeam_channel::Sender;
use shared::{domain::AimMode, error::LauncherError};
use tracing::{debug, warn};

pub fn parse_line(line: &str, default_width: NonZeroU32) -> Result<InputEvent, LauncherError> {
    let malformed = || LauncherError::MalformedCommand(line.trim().to_string());
    let words: Vec<&str> = line.split_whitespace().collect();

    let command = match words.as_slice() {
        [] | ["fire"] => LauncherCommand::FireNow,
        ["x", px] => {
            let sample = sample(px, None, default_width).ok_or_else(malformed)?;
            return Ok(InputEvent::Sample(sample));
        }
        ["x", px, width] => {
            let sample = sample(px, Some(*width), default_width).ok_or_else(malformed)?;
            return Ok(InputEvent::Sample(sample));
        }
        ["lost"] => return Ok(InputEvent::Sample(TrackSample::lost(default_width))),
        ["m"] => LauncherCommand::ToggleMode,
        ["follow"] => LauncherCommand::SetMode(AimMode::Follow),
        ["random"] => LauncherCommand::SetMode(AimMode::Random),
        ["t"] => LauncherCommand::SetSpin("topspin".into()),
        ["b"] => LauncherCommand::SetSpin("backspin".into()),
        ["f"] => LauncherCommand::SetSpin("flat".into()),
        ["spin", name] => LauncherCommand::SetSpin(name.to_ascii_lowercase()),
        ["pwm", upper, lower] => LauncherCommand::SetBaseMagnitudes {
            upper: upper.parse().map_err(|_| malformed())?,
            lower: lower.parse().map_err(|_| malformed())?,
        },
        ["timing", on, off] => LauncherCommand::SetFireTiming {
            on: seconds("fire.on_secs", on.parse().map_err(|_| malformed())?)?,
            off: seconds("fire.off_secs", off.parse().map_err(|_| malformed())?)?,
        },
        ["auto", "on"] => LauncherCommand::SetAutoFire(true),
        ["auto", "off"] => LauncherCommand::SetAutoFire(false),
        ["serial", mode] => LauncherCommand::SetTransportMode(mode.parse()?),
        ["status"] => LauncherCommand::ReportStatus,
        ["q"] | ["quit"] => LauncherCommand::Quit,
        _ => return Err(malformed()),
    };
    Ok(InputEvent::Command(command))
}

fn sample(px: &str, width: Option<&str>, default_width: NonZeroU32) -> Option<TrackSample> {
    let frame_width = match width {
        Some(raw) => raw.parse::<NonZeroU32>().ok()?,
        None => default_width,
    };
    Some(TrackSample {
        target_x: Some(px.parse().ok()?),
        frame_width,
    })
}

/// Forwards each line in order. End of input, or a quit line, ends the stream.
pub fn read_operator_input(
    input: impl BufRead,
    events: &Sender<InputEvent>,
    default_width: NonZeroU32,
) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                warn!(%error, "failed to read operator input");
                return;
            }
        };
        let event = match parse_line(&line, default_width) {
            Ok(event) => event,
            Err(error) => {
                warn!(%error, "ignoring operator input");
                continue;
            }
        };
        let quit = event == InputEvent::Command(LauncherCommand::Quit);
        if events.send(event).is_err() {
            debug!("control loop is gone; stopping input reader");
            return;
        }
        if quit {
            return;
        }
    }
    debug!("operator input ended");
}

pub fn spawn_stdin_reader(
    events: Sender<InputEvent>,
    default_width: NonZeroU32,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("operator-input".into())
        .spawn(move || read_operator_input(io::stdin().lock(), &events, default_width))
}

#[cfg(test)]
#[path = "tests/input_tests.rs"]
mod tests;
