use serial_link::Transport;
use shared::{domain::SpinPreset, error::LauncherError, protocol::DeviceCommand};
use tracing::{debug, info};

use crate::config::WheelConfig;

pub struct WheelDrive {
    upper_base: u32,
    lower_base: u32,
    max_magnitude: u32,
    preset: &'static SpinPreset,
}

impl WheelDrive {
    pub fn new(config: &WheelConfig) -> Result<Self, LauncherError> {
        let mut drive = Self {
            upper_base: 0,
            lower_base: 0,
            max_magnitude: config.max_magnitude,
            preset: SpinPreset::lookup(&config.spin)?,
        };
        drive.set_base_magnitudes(config.upper, config.lower);
        Ok(drive)
    }

    /// Out-of-range magnitudes are clamped into `0..=max_magnitude`.
    pub fn set_base_magnitudes(&mut self, upper: i32, lower: i32) {
        self.upper_base = self.clamp_magnitude(upper);
        self.lower_base = self.clamp_magnitude(lower);
        debug!(
            upper = self.upper_base,
            lower = self.lower_base,
            "wheel base magnitudes set"
        );
    }

    pub fn set_spin(&mut self, name: &str) -> Result<(), LauncherError> {
        self.preset = SpinPreset::lookup(name)?;
        info!(spin = self.preset.name, "spin preset armed");
        Ok(())
    }

    pub fn spin(&self) -> &'static SpinPreset {
        self.preset
    }

    pub fn base_magnitudes(&self) -> (u32, u32) {
        (self.upper_base, self.lower_base)
    }

    pub fn max_magnitude(&self) -> u32 {
        self.max_magnitude
    }

    /// Output magnitudes for the active preset: `min(round(base * mult), max_magnitude)`.
    pub fn current_values(&self) -> (u32, u32) {
        (
            self.scaled(self.upper_base, self.preset.upper_mult),
            self.scaled(self.lower_base, self.preset.lower_mult),
        )
    }

    pub fn fire(&self, transport: &mut Transport) -> (u32, u32) {
        let (upper, lower) = self.current_values();
        transport.send(&DeviceCommand::Wheels { upper, lower });
        (upper, lower)
    }

    fn clamp_magnitude(&self, raw: i32) -> u32 {
        u32::try_from(raw).unwrap_or(0).min(self.max_magnitude)
    }

    fn scaled(&self, base: u32, mult: f64) -> u32 {
        let value = (f64::from(base) * mult).round();
        if value >= f64::from(self.max_magnitude) {
            self.max_magnitude
        } else {
            value.max(0.0) as u32
        }
    }
}

#[cfg(test)]
#[path = "tests/wheels_tests.rs"]
mod tests;
