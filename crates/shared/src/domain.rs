use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::LauncherError;

/// Servo angle in whole degrees.
pub type Angle = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AimMode {
    #[default]
    Follow,
    Random,
}

impl AimMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Follow => Self::Random,
            Self::Random => Self::Follow,
        }
    }
}

impl fmt::Display for AimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Follow => f.write_str("FOLLOW"),
            Self::Random => f.write_str("RANDOM"),
        }
    }
}

impl FromStr for AimMode {
    type Err = LauncherError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.eq_ignore_ascii_case("follow") {
            Ok(Self::Follow)
        } else if raw.eq_ignore_ascii_case("random") {
            Ok(Self::Random)
        } else {
            Err(LauncherError::out_of_range(
                "aim_mode",
                format!("expected 'follow' or 'random', got '{raw}'"),
            ))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Live,
    #[default]
    Inert,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Inert => f.write_str("inert"),
        }
    }
}

/// Accepts `live`, and `inert` or its alias `mock`.
impl FromStr for TransportMode {
    type Err = LauncherError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "inert" | "mock" => Ok(Self::Inert),
            _ => Err(LauncherError::out_of_range(
                "transport_mode",
                format!("expected 'live' or 'mock', got '{raw}'"),
            )),
        }
    }
}

/// Named (upper, lower) wheel multiplier pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpinPreset {
    pub name: &'static str,
    pub upper_mult: f64,
    pub lower_mult: f64,
}

pub const FLAT: SpinPreset = SpinPreset {
    name: "flat",
    upper_mult: 1.0,
    lower_mult: 1.0,
};

pub const TOPSPIN: SpinPreset = SpinPreset {
    name: "topspin",
    upper_mult: 1.3,
    lower_mult: 1.0,
};

pub const BACKSPIN: SpinPreset = SpinPreset {
    name: "backspin",
    upper_mult: 1.0,
    lower_mult: 1.3,
};

pub const SPIN_PRESETS: [SpinPreset; 3] = [FLAT, TOPSPIN, BACKSPIN];

impl SpinPreset {
    pub fn lookup(name: &str) -> Result<&'static SpinPreset, LauncherError> {
        SPIN_PRESETS
            .iter()
            .find(|preset| preset.name == name)
            .ok_or_else(|| LauncherError::InvalidPreset(name.to_string()))
    }
}

/// Inclusive servo travel limits. `min <= max` is enforced on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AngleBounds {
    min: Angle,
    max: Angle,
}

impl AngleBounds {
    pub fn new(min: Angle, max: Angle) -> Result<Self, LauncherError> {
        if min > max {
            return Err(LauncherError::out_of_range(
                "angle_bounds",
                format!("min_angle {min} is greater than max_angle {max}"),
            ));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Angle {
        self.min
    }

    pub fn max(&self) -> Angle {
        self.max
    }

    /// Computed in `i64` so bounds near the `i32` limits cannot overflow.
    pub fn span(&self) -> i64 {
        i64::from(self.max) - i64::from(self.min)
    }

    pub fn midpoint(&self) -> Angle {
        self.clamp_wide((i64::from(self.min) + i64::from(self.max)) / 2)
    }

    pub fn clamp_wide(&self, angle: i64) -> Angle {
        let clamped = angle.clamp(i64::from(self.min), i64::from(self.max));
        Angle::try_from(clamped).unwrap_or(self.min)
    }

    pub fn clamp(&self, angle: Angle) -> Angle {
        angle.clamp(self.min, self.max)
    }

    pub fn contains(&self, angle: Angle) -> bool {
        (self.min..=self.max).contains(&angle)
    }
}

impl Default for AngleBounds {
    fn default() -> Self {
        Self { min: 0, max: 180 }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
