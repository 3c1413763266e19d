use std::{borrow::Cow, io, mem};

use serde::Serialize;
use shared::{domain::TransportMode, error::LauncherError, protocol::DeviceCommand};
use tracing::{debug, info, trace, warn};

use crate::{DeviceChannel, DeviceConnector};

enum Link {
    Live(Box<dyn DeviceChannel>),
    Inert,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransportStatus {
    pub mode: TransportMode,
    pub port: String,
    pub sent: u64,
    pub discarded: u64,
    pub last_sent: Option<DeviceCommand>,
    pub last_fault: Option<String>,
}

/// Command channel to the launcher board.
///
/// `send` never fails: in inert mode lines are discarded, and a write failure
/// on a live link drops the link to inert mode and is reported once.
pub struct Transport {
    connector: Box<dyn DeviceConnector>,
    link: Link,
    closed: bool,
    sent: u64,
    discarded: u64,
    last_sent: Option<DeviceCommand>,
    last_fault: Option<LauncherError>,
}

impl Transport {
    pub fn new(connector: Box<dyn DeviceConnector>, initial: TransportMode) -> Self {
        let mut transport = Self {
            connector,
            link: Link::Inert,
            closed: false,
            sent: 0,
            discarded: 0,
            last_sent: None,
            last_fault: None,
        };
        match initial {
            TransportMode::Live => transport.open_live(),
            TransportMode::Inert => info!("inert transport active; commands will not reach hardware"),
        }
        transport
    }

    pub fn mode(&self) -> TransportMode {
        match self.link {
            Link::Live(_) => TransportMode::Live,
            Link::Inert => TransportMode::Inert,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn last_fault(&self) -> Option<&LauncherError> {
        self.last_fault.as_ref()
    }

    pub fn set_mode(&mut self, mode: TransportMode) {
        if self.closed {
            warn!(%mode, "transport already closed; ignoring mode change");
            return;
        }
        if self.mode() == mode {
            return;
        }

        self.drop_link();
        match mode {
            TransportMode::Live => self.open_live(),
            TransportMode::Inert => {
                info!("inert transport active; commands will not reach hardware")
            }
        }
    }

    pub fn send(&mut self, command: &DeviceCommand) {
        self.last_sent = Some(*command);
        self.send_line(&command.encode());
    }

    /// Sends a raw protocol line; a missing newline terminator is appended.
    pub fn send_line(&mut self, line: &str) {
        let line = if line.ends_with('\n') {
            Cow::Borrowed(line)
        } else {
            Cow::Owned(format!("{line}\n"))
        };

        let outcome = match &mut self.link {
            Link::Live(channel) => Some(deliver(channel.as_mut(), &line)),
            Link::Inert => None,
        };

        match outcome {
            None => {
                self.discarded += 1;
                trace!(line = line.trim_end(), "inert transport discarded command");
            }
            Some(Ok(())) => self.sent += 1,
            Some(Err(error)) => self.degrade(error),
        }
    }

    /// Releases the device. Safe to call repeatedly or when never opened.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.drop_link();
    }

    pub fn status(&self) -> TransportStatus {
        TransportStatus {
            mode: self.mode(),
            port: self.connector.port().to_string(),
            sent: self.sent,
            discarded: self.discarded,
            last_sent: self.last_sent,
            last_fault: self.last_fault.as_ref().map(ToString::to_string),
        }
    }

    fn open_live(&mut self) {
        match self.connector.connect() {
            Ok(channel) => {
                self.link = Link::Live(channel);
                self.last_fault = None;
                info!(port = self.connector.port(), "live transport active");
            }
            Err(error) => {
                warn!(%error, "could not open device; falling back to inert transport");
                self.link = Link::Inert;
                self.last_fault = Some(error);
            }
        }
    }

    fn degrade(&mut self, error: io::Error) {
        let port = self.connector.port().to_string();
        warn!(%port, %error, "device write failed; switching to inert transport");
        self.link = Link::Inert;
        self.last_fault = Some(LauncherError::DeviceUnavailable {
            port,
            reason: error.to_string(),
        });
    }

    fn drop_link(&mut self) {
        if let Link::Live(channel) = mem::replace(&mut self.link, Link::Inert) {
            drop(channel);
            info!(port = self.connector.port(), "device link closed");
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

fn deliver(channel: &mut dyn DeviceChannel, line: &str) -> io::Result<()> {
    channel.write_line(line)?;
    match channel.read_ack() {
        Ok(Some(ack)) => debug!(%ack, "device acknowledged"),
        Ok(None) => {}
        Err(error) => debug!(%error, "no acknowledgement from device"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
