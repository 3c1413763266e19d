//! Operator commands queued for the control loop.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use shared::domain::{AimMode, TransportMode};

use crate::runtime::InputEvent;

const COMMAND_QUEUE_DEPTH: usize = 64;
const INPUT_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum LauncherCommand {
    SetMode(AimMode),
    ToggleMode,
    SetSpin(String),
    SetBaseMagnitudes { upper: i32, lower: i32 },
    SetFireTiming { on: Duration, off: Duration },
    SetAutoFire(bool),
    SetTransportMode(TransportMode),
    FireNow,
    ReportStatus,
    Quit,
}

impl LauncherCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetMode(_) => "set_mode",
            Self::ToggleMode => "toggle_mode",
            Self::SetSpin(_) => "set_spin",
            Self::SetBaseMagnitudes { .. } => "set_base_magnitudes",
            Self::SetFireTiming { .. } => "set_fire_timing",
            Self::SetAutoFire(_) => "set_auto_fire",
            Self::SetTransportMode(_) => "set_transport_mode",
            Self::FireNow => "fire_now",
            Self::ReportStatus => "report_status",
            Self::Quit => "quit",
        }
    }
}

pub fn command_queue() -> (Sender<LauncherCommand>, Receiver<LauncherCommand>) {
    bounded(COMMAND_QUEUE_DEPTH)
}

/// Ordered operator input. Senders block when full so no line is dropped.
pub fn input_queue() -> (Sender<InputEvent>, Receiver<InputEvent>) {
    bounded(INPUT_QUEUE_DEPTH)
}

/// Queues a command without blocking the caller. Returns false if it was dropped.
pub fn dispatch_command(cmd_tx: &Sender<LauncherCommand>, cmd: LauncherCommand) -> bool {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued operator command");
            true
        }
        Err(TrySendError::Full(_)) => {
            tracing::warn!(command = cmd_name, "command queue is full; dropping command");
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::warn!(command = cmd_name, "control loop is gone; dropping command");
            false
        }
    }
}
