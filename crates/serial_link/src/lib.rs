use std::io;

use shared::error::LauncherError;

pub mod memory;
mod serial;
mod transport;

pub use serial::{pick_port, PortCandidate, SerialConnector, SerialSettings, AUTO_PORT};
pub use transport::{Transport, TransportStatus};

/// An open line-oriented link to the launcher microcontroller.
pub trait DeviceChannel: Send {
    /// Writes one framed line, newline included.
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    /// Reads a single acknowledgement line if the device sent one.
    fn read_ack(&mut self) -> io::Result<Option<String>>;
}

pub trait DeviceConnector: Send {
    fn port(&self) -> &str;
    fn connect(&self) -> Result<Box<dyn DeviceChannel>, LauncherError>;
}
