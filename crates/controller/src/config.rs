use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use serial_link::SerialSettings;
use shared::{
    domain::{AimMode, AngleBounds, SpinPreset},
    error::LauncherError,
};

use crate::fire::MAX_PHASE;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub serial: SerialConfig,
    pub aim: AimConfig,
    pub wheels: WheelConfig,
    pub fire: FireConfig,
    pub tracking: TrackingConfig,
}

impl LauncherConfig {
    /// Rejects contradictory settings before anything touches hardware.
    pub fn validate(&self) -> Result<(), LauncherError> {
        self.aim.validate()?;
        self.wheels.validate()?;
        self.fire.validate()?;
        self.tracking.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud: u32,
    pub mock: bool,
    pub read_acks: bool,
}

impl SerialConfig {
    pub fn settings(&self) -> SerialSettings {
        SerialSettings {
            port: self.port.clone(),
            baud: self.baud,
            read_acks: self.read_acks,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        let defaults = SerialSettings::default();
        Self {
            port: defaults.port,
            baud: defaults.baud,
            mock: true,
            read_acks: defaults.read_acks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowPolicy {
    /// Map every sample straight to an angle.
    #[default]
    Reactive,
    /// Re-aim only once recent samples settle, then hold for a random cooldown.
    Steady,
}

impl FromStr for FollowPolicy {
    type Err = LauncherError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "reactive" => Ok(Self::Reactive),
            "steady" => Ok(Self::Steady),
            _ => Err(LauncherError::out_of_range(
                "aim.follow_policy",
                format!("expected 'reactive' or 'steady', got '{raw}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteadyConfig {
    pub history_len: usize,
    pub stability_px: i32,
    pub bias_scale: f64,
    pub bias_jitter_px: i32,
    pub angle_jitter: i32,
    pub cooldown_min: u32,
    pub cooldown_max: u32,
}

impl Default for SteadyConfig {
    fn default() -> Self {
        Self {
            history_len: 5,
            stability_px: 30,
            bias_scale: 1.2,
            bias_jitter_px: 100,
            angle_jitter: 20,
            cooldown_min: 15,
            cooldown_max: 30,
        }
    }
}

impl SteadyConfig {
    fn validate(&self) -> Result<(), LauncherError> {
        if self.history_len == 0 {
            return Err(LauncherError::out_of_range(
                "steady.history_len",
                "must hold at least one sample",
            ));
        }
        if self.stability_px < 0 || self.bias_jitter_px < 0 || self.angle_jitter < 0 {
            return Err(LauncherError::out_of_range(
                "steady",
                "pixel thresholds and jitter amounts must be non-negative",
            ));
        }
        if !self.bias_scale.is_finite() {
            return Err(LauncherError::out_of_range(
                "steady.bias_scale",
                "must be a finite number",
            ));
        }
        if self.cooldown_min > self.cooldown_max {
            return Err(LauncherError::out_of_range(
                "steady.cooldown",
                format!(
                    "cooldown_min {} is greater than cooldown_max {}",
                    self.cooldown_min, self.cooldown_max
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimConfig {
    pub min_angle: i32,
    pub max_angle: i32,
    pub mode: AimMode,
    pub follow_policy: FollowPolicy,
    pub random_wait_min_secs: f64,
    pub random_wait_max_secs: f64,
    pub steady: SteadyConfig,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            min_angle: 0,
            max_angle: 180,
            mode: AimMode::Follow,
            follow_policy: FollowPolicy::Reactive,
            random_wait_min_secs: 1.0,
            random_wait_max_secs: 3.0,
            steady: SteadyConfig::default(),
        }
    }
}

impl AimConfig {
    pub fn bounds(&self) -> Result<AngleBounds, LauncherError> {
        AngleBounds::new(self.min_angle, self.max_angle)
    }

    /// Retarget wait interval in seconds, validated.
    pub fn random_wait(&self) -> Result<(f64, f64), LauncherError> {
        let (min, max) = (self.random_wait_min_secs, self.random_wait_max_secs);
        if !(min.is_finite() && max.is_finite()) || min < 0.0 {
            return Err(LauncherError::out_of_range(
                "aim.random_wait",
                format!("wait bounds must be finite and non-negative, got {min}..{max}"),
            ));
        }
        if max > MAX_PHASE.as_secs_f64() {
            return Err(LauncherError::out_of_range(
                "aim.random_wait",
                format!("random_wait_max_secs {max} exceeds one day"),
            ));
        }
        if min > max {
            return Err(LauncherError::out_of_range(
                "aim.random_wait",
                format!("random_wait_min_secs {min} is greater than random_wait_max_secs {max}"),
            ));
        }
        Ok((min, max))
    }

    fn validate(&self) -> Result<(), LauncherError> {
        self.bounds()?;
        self.random_wait()?;
        self.steady.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    pub upper: i32,
    pub lower: i32,
    pub max_magnitude: u32,
    pub spin: String,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            upper: 140,
            lower: 140,
            max_magnitude: 255,
            spin: "flat".into(),
        }
    }
}

impl WheelConfig {
    fn validate(&self) -> Result<(), LauncherError> {
        SpinPreset::lookup(&self.spin)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldMode {
    /// The control loop waits out the gate hold before the next tick.
    #[default]
    Atomic,
    /// Ticks keep running; the gate closes on the first tick past the deadline.
    Deferred,
}

impl fmt::Display for HoldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atomic => f.write_str("atomic"),
            Self::Deferred => f.write_str("deferred"),
        }
    }
}

impl FromStr for HoldMode {
    type Err = LauncherError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "atomic" => Ok(Self::Atomic),
            "deferred" => Ok(Self::Deferred),
            _ => Err(LauncherError::out_of_range(
                "fire.hold",
                format!("expected 'atomic' or 'deferred', got '{raw}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireConfig {
    pub on_secs: f64,
    pub off_secs: f64,
    pub hold: HoldMode,
    pub auto: bool,
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            on_secs: 0.3,
            off_secs: 2.0,
            hold: HoldMode::Atomic,
            auto: true,
        }
    }
}

impl FireConfig {
    pub fn on_duration(&self) -> Result<Duration, LauncherError> {
        seconds("fire.on_secs", self.on_secs)
    }

    pub fn off_interval(&self) -> Result<Duration, LauncherError> {
        seconds("fire.off_secs", self.off_secs)
    }

    fn validate(&self) -> Result<(), LauncherError> {
        self.on_duration()?;
        self.off_interval()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub tick_hz: u32,
    pub frame_width: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tick_hz: 30,
            frame_width: 640,
        }
    }
}

impl TrackingConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz.max(1)
    }

    fn validate(&self) -> Result<(), LauncherError> {
        if self.tick_hz == 0 {
            return Err(LauncherError::out_of_range(
                "tracking.tick_hz",
                "tick rate must be positive",
            ));
        }
        if self.frame_width == 0 {
            return Err(LauncherError::out_of_range(
                "tracking.frame_width",
                "frame width must be positive",
            ));
        }
        Ok(())
    }
}

/// Converts a seconds value from configuration or operator input.
pub fn seconds(field: &'static str, secs: f64) -> Result<Duration, LauncherError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| LauncherError::out_of_range(field, format!("{secs} is not a valid duration")))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
