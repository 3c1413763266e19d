use std::{collections::VecDeque, time::Instant};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Serialize;
use serial_link::{DeviceConnector, Transport, TransportStatus};
use shared::{
    domain::{AimMode, Angle, TransportMode},
    error::LauncherError,
    protocol::DeviceCommand,
};
use tracing::{info, warn};

use crate::{
    aim::AimController,
    commands::LauncherCommand,
    config::{FollowPolicy, HoldMode, LauncherConfig},
    fire::{FireSequencer, FireStatus, FireStep, ManualFire},
    gate::GateActuator,
    runtime::TrackSample,
    wheels::WheelDrive,
};

/// Manual fire is only honoured once this many commanded angles agree.
pub const STEADY_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub angle: Angle,
    pub fire: Option<FireStep>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LauncherStatus {
    pub angle: Angle,
    pub mode: AimMode,
    pub follow_policy: FollowPolicy,
    pub steady: bool,
    pub spin: &'static str,
    pub base_magnitudes: (u32, u32),
    pub wheel_values: (u32, u32),
    pub hold: HoldMode,
    pub fire: FireStatus,
    pub transport: TransportStatus,
}

/// Owns every launcher component and runs them in sequence, one tick at a time.
pub struct Launcher<R = Pcg64> {
    aim: AimController<R>,
    wheels: WheelDrive,
    gate: GateActuator,
    fire: FireSequencer,
    transport: Transport,
    recent_angles: VecDeque<Angle>,
    hold: HoldMode,
    shut_down: bool,
}

impl Launcher<Pcg64> {
    pub fn from_config(
        config: &LauncherConfig,
        connector: Box<dyn DeviceConnector>,
        now: Instant,
    ) -> Result<Self, LauncherError> {
        Self::with_rng(config, connector, Pcg64::from_entropy(), now)
    }
}

impl<R> Launcher<R> {
    pub fn angle(&self) -> Angle {
        self.aim.angle()
    }

    pub fn mode(&self) -> AimMode {
        self.aim.mode()
    }

    pub fn hold_mode(&self) -> HoldMode {
        self.hold
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// True when the last `STEADY_WINDOW` commanded angles are identical.
    pub fn is_steady(&self) -> bool {
        self.recent_angles.len() == STEADY_WINDOW
            && self
                .recent_angles
                .iter()
                .all(|angle| Some(angle) == self.recent_angles.front())
    }

    pub fn poll_fire(&mut self, now: Instant) -> Option<FireStep> {
        let step = self.fire.poll(now);
        if let Some(step) = step {
            self.apply_step(step);
        }
        step
    }

    pub fn fire_now(&mut self, now: Instant) -> (ManualFire, Option<FireStep>) {
        if self.fire.is_holding() {
            return (ManualFire::Busy, None);
        }
        if !self.is_steady() {
            info!(angle = self.aim.angle(), "hold steady to fire");
            return (ManualFire::NotSteady, None);
        }
        let step = self.fire.trigger(now);
        if let Some(step) = step {
            self.apply_step(step);
        }
        (ManualFire::Started, step)
    }

    pub fn status(&self) -> LauncherStatus {
        LauncherStatus {
            angle: self.aim.angle(),
            mode: self.aim.mode(),
            follow_policy: self.aim.policy(),
            steady: self.is_steady(),
            spin: self.wheels.spin().name,
            base_magnitudes: self.wheels.base_magnitudes(),
            wheel_values: self.wheels.current_values(),
            hold: self.hold,
            fire: self.fire.status(),
            transport: self.transport.status(),
        }
    }

    /// Closes the gate if a cycle is holding, then closes the transport.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Some(step) = self.fire.abort(Instant::now()) {
            self.apply_step(step);
        }
        self.transport.close();
        info!("launcher shut down");
    }

    fn apply_step(&mut self, step: FireStep) {
        match step {
            FireStep::Open { .. } => {
                let (upper, lower) = self.wheels.fire(&mut self.transport);
                self.gate.open(&mut self.transport);
                info!(
                    angle = self.aim.angle(),
                    upper,
                    lower,
                    spin = self.wheels.spin().name,
                    "firing"
                );
            }
            FireStep::Close => self.gate.close(&mut self.transport),
        }
    }
}

impl<R: Rng> Launcher<R> {
    pub fn with_rng(
        config: &LauncherConfig,
        connector: Box<dyn DeviceConnector>,
        rng: R,
        now: Instant,
    ) -> Result<Self, LauncherError> {
        config.validate()?;
        let aim = AimController::new(&config.aim, rng)?;
        let wheels = WheelDrive::new(&config.wheels)?;
        let fire = FireSequencer::new(
            config.fire.on_duration()?,
            config.fire.off_interval()?,
            config.fire.auto,
            now,
        );
        let initial = if config.serial.mock {
            TransportMode::Inert
        } else {
            TransportMode::Live
        };

        Ok(Self {
            aim,
            wheels,
            gate: GateActuator,
            fire,
            transport: Transport::new(connector, initial),
            recent_angles: VecDeque::with_capacity(STEADY_WINDOW),
            hold: config.fire.hold,
            shut_down: false,
        })
    }

    /// Aims for this sample, sends the angle, then advances the fire cycle.
    pub fn tick(&mut self, sample: TrackSample, now: Instant) -> TickReport {
        let angle = self
            .aim
            .update_at(sample.target_x, sample.frame_width, now);
        self.transport.send(&DeviceCommand::Angle(angle));

        if self.recent_angles.len() == STEADY_WINDOW {
            self.recent_angles.pop_front();
        }
        self.recent_angles.push_back(angle);

        TickReport {
            angle,
            fire: self.poll_fire(now),
        }
    }

    /// Applies an operator command. `Quit` and `ReportStatus` belong to the
    /// control loop and are no-ops here.
    pub fn apply(
        &mut self,
        command: LauncherCommand,
        now: Instant,
    ) -> Result<Option<FireStep>, LauncherError> {
        match command {
            LauncherCommand::SetMode(mode) => self.aim.set_mode(mode),
            LauncherCommand::ToggleMode => self.aim.set_mode(self.aim.mode().toggled()),
            LauncherCommand::SetSpin(name) => {
                if let Err(error) = self.wheels.set_spin(&name) {
                    warn!(%error, "spin preset rejected");
                    return Err(error);
                }
            }
            LauncherCommand::SetBaseMagnitudes { upper, lower } => {
                self.wheels.set_base_magnitudes(upper, lower)
            }
            LauncherCommand::SetFireTiming { on, off } => self.fire.set_timing(on, off),
            LauncherCommand::SetAutoFire(auto) => self.fire.set_auto(auto),
            LauncherCommand::SetTransportMode(mode) => self.transport.set_mode(mode),
            LauncherCommand::FireNow => return Ok(self.fire_now(now).1),
            LauncherCommand::ReportStatus | LauncherCommand::Quit => {}
        }
        Ok(None)
    }
}

impl<R> Drop for Launcher<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "tests/launcher_tests.rs"]
mod tests;
