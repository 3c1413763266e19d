//! In-memory device used by tests and dry runs: records every framed line,
//! replays queued acknowledgements, and can be told to refuse opens or fail writes.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard},
};

use shared::{error::LauncherError, protocol::DeviceCommand};

use crate::{DeviceChannel, DeviceConnector};

#[derive(Default)]
struct MemoryState {
    lines: Vec<String>,
    acks: VecDeque<String>,
    refuse_open: bool,
    fail_writes: bool,
    opens: u32,
    closes: u32,
}

#[derive(Clone, Default)]
pub struct MemoryDevice {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that is never reachable.
    pub fn unreachable() -> Self {
        let device = Self::new();
        device.state().refuse_open = true;
        device
    }

    pub fn connector(&self, port: impl Into<String>) -> MemoryConnector {
        MemoryConnector {
            device: self.clone(),
            port: port.into(),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state().refuse_open = !reachable;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    pub fn queue_ack(&self, ack: impl Into<String>) {
        self.state().acks.push_back(ack.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.state().lines.clone()
    }

    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state()
            .lines
            .iter()
            .filter_map(|line| line.parse().ok())
            .collect()
    }

    pub fn opens(&self) -> u32 {
        self.state().opens
    }

    pub fn closes(&self) -> u32 {
        self.state().closes
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct MemoryConnector {
    device: MemoryDevice,
    port: String,
}

impl DeviceConnector for MemoryConnector {
    fn port(&self) -> &str {
        &self.port
    }

    fn connect(&self) -> Result<Box<dyn DeviceChannel>, LauncherError> {
        let mut state = self.device.state();
        if state.refuse_open {
            return Err(LauncherError::DeviceUnavailable {
                port: self.port.clone(),
                reason: "no such device".into(),
            });
        }
        state.opens += 1;
        Ok(Box::new(MemoryChannel {
            device: self.device.clone(),
        }))
    }
}

struct MemoryChannel {
    device: MemoryDevice,
}

impl DeviceChannel for MemoryChannel {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut state = self.device.state();
        if state.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device disconnected",
            ));
        }
        state.lines.push(line.to_string());
        Ok(())
    }

    fn read_ack(&mut self) -> io::Result<Option<String>> {
        Ok(self.device.state().acks.pop_front())
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.device.state().closes += 1;
    }
}
