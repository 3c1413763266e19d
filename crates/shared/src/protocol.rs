//! Line protocol spoken to the launcher microcontroller.
//!
//! Every command is one ASCII line of comma-separated fields terminated by `\n`:
//! `A,<deg>` for the aim servo, `W,<upper>,<lower>` for the wheels, `G,<0|1>` for the gate.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{domain::Angle, error::LauncherError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DeviceCommand {
    Angle(Angle),
    Wheels { upper: u32, lower: u32 },
    Gate { open: bool },
}

impl DeviceCommand {
    /// Framed form, newline included.
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Angle(degrees) => write!(f, "A,{degrees}"),
            Self::Wheels { upper, lower } => write!(f, "W,{upper},{lower}"),
            Self::Gate { open } => write!(f, "G,{}", u8::from(*open)),
        }
    }
}

impl FromStr for DeviceCommand {
    type Err = LauncherError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let line = raw.trim_end_matches(['\r', '\n']);
        let malformed = || LauncherError::MalformedCommand(line.to_string());
        let mut fields = line.split(',');

        let command = match fields.next() {
            Some("A") => {
                let degrees = fields.next().ok_or_else(malformed)?;
                Self::Angle(degrees.parse().map_err(|_| malformed())?)
            }
            Some("W") => {
                let upper = fields.next().ok_or_else(malformed)?;
                let lower = fields.next().ok_or_else(malformed)?;
                Self::Wheels {
                    upper: upper.parse().map_err(|_| malformed())?,
                    lower: lower.parse().map_err(|_| malformed())?,
                }
            }
            Some("G") => match fields.next() {
                Some("1") => Self::Gate { open: true },
                Some("0") => Self::Gate { open: false },
                _ => return Err(malformed()),
            },
            _ => return Err(malformed()),
        };

        if fields.next().is_some() {
            return Err(malformed());
        }
        Ok(command)
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
