use std::{
    io::{self, Read, Write},
    thread,
    time::Duration,
};

use serialport::{SerialPort, SerialPortType};
use shared::error::LauncherError;
use tracing::{debug, info, warn};

use crate::{DeviceChannel, DeviceConnector};

/// Arduino-style boards reset when the port opens; commands sent before this elapses are lost.
const DEVICE_RESET_DELAY: Duration = Duration::from_secs(2);
const WRITE_TIMEOUT: Duration = Duration::from_millis(50);

/// Port name that asks the connector to pick the first USB serial device.
pub const AUTO_PORT: &str = "auto";
/// Used when auto-detection finds no USB serial device.
pub const FALLBACK_PORT: &str = "/dev/ttyACM0";

#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud: u32,
    pub read_acks: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: AUTO_PORT.into(),
            baud: 9600,
            read_acks: false,
        }
    }
}

/// A port seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    pub name: String,
    pub usb: bool,
}

/// First USB port in enumeration order.
pub fn pick_port(candidates: &[PortCandidate]) -> Option<&str> {
    candidates
        .iter()
        .find(|candidate| candidate.usb)
        .map(|candidate| candidate.name.as_str())
}

fn available_candidates() -> Vec<PortCandidate> {
    match serialport::available_ports() {
        Ok(ports) => ports
            .into_iter()
            .map(|info| PortCandidate {
                usb: matches!(info.port_type, SerialPortType::UsbPort(_)),
                name: info.port_name,
            })
            .collect(),
        Err(error) => {
            warn!(%error, "could not enumerate serial ports");
            Vec::new()
        }
    }
}

pub struct SerialConnector {
    settings: SerialSettings,
}

impl SerialConnector {
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }

    fn resolve_port(&self) -> String {
        if !self.settings.port.eq_ignore_ascii_case(AUTO_PORT) {
            return self.settings.port.clone();
        }
        let candidates = available_candidates();
        match pick_port(&candidates) {
            Some(port) => {
                info!(port, "auto-detected serial port");
                port.to_string()
            }
            None => {
                warn!(port = FALLBACK_PORT, "no USB serial port found; using fallback");
                FALLBACK_PORT.to_string()
            }
        }
    }
}

impl DeviceConnector for SerialConnector {
    fn port(&self) -> &str {
        &self.settings.port
    }

    fn connect(&self) -> Result<Box<dyn DeviceChannel>, LauncherError> {
        let port_name = self.resolve_port();
        let port = serialport::new(&port_name, self.settings.baud)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|error| LauncherError::DeviceUnavailable {
                port: port_name.clone(),
                reason: error.to_string(),
            })?;

        thread::sleep(DEVICE_RESET_DELAY);
        info!(
            port = %port_name,
            baud = self.settings.baud,
            "serial port connected"
        );

        Ok(Box::new(SerialChannel {
            port,
            read_acks: self.settings.read_acks,
            pending: AckBuffer::default(),
        }))
    }
}

/// Bytes received from the board, split into acknowledgement lines.
///
/// A partial line stays buffered until its terminator arrives.
#[derive(Debug, Default)]
pub struct AckBuffer {
    raw: Vec<u8>,
}

impl AckBuffer {
    pub fn extend(&mut self, bytes: &[u8]) {
        self.raw.extend_from_slice(bytes);
    }

    /// Next complete, non-blank line, trimmed.
    pub fn next_line(&mut self) -> Option<String> {
        while let Some(end) = self.raw.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.raw.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }
}

struct SerialChannel {
    port: Box<dyn SerialPort>,
    read_acks: bool,
    pending: AckBuffer,
}

impl DeviceChannel for SerialChannel {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.flush()
    }

    /// Never waits: only bytes already received are consumed.
    fn read_ack(&mut self) -> io::Result<Option<String>> {
        if !self.read_acks {
            return Ok(None);
        }

        let available = self.port.bytes_to_read().map_err(io::Error::from)?;
        if available > 0 {
            let mut chunk = vec![0; available as usize];
            match self.port.read(&mut chunk) {
                Ok(read) => self.pending.extend(&chunk[..read]),
                Err(error) if error.kind() == io::ErrorKind::TimedOut => {
                    debug!("acknowledgement read timed out");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(self.pending.next_line())
    }
}

#[cfg(test)]
#[path = "tests/serial_tests.rs"]
mod tests;
