use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    DeviceUnavailable,
    InvalidPreset,
    OutOfRange,
    MalformedCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LauncherError {
    #[error("device {port} unavailable: {reason}")]
    DeviceUnavailable { port: String, reason: String },
    #[error("unknown spin preset '{0}'")]
    InvalidPreset(String),
    #[error("{field} out of range: {detail}")]
    OutOfRange { field: &'static str, detail: String },
    #[error("malformed command line '{0}'")]
    MalformedCommand(String),
}

impl LauncherError {
    pub fn out_of_range(field: &'static str, detail: impl Into<String>) -> Self {
        Self::OutOfRange {
            field,
            detail: detail.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DeviceUnavailable { .. } => ErrorCode::DeviceUnavailable,
            Self::InvalidPreset(_) => ErrorCode::InvalidPreset,
            Self::OutOfRange { .. } => ErrorCode::OutOfRange,
            Self::MalformedCommand(_) => ErrorCode::MalformedCommand,
        }
    }
}
