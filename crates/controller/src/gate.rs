use serial_link::Transport;
use shared::protocol::DeviceCommand;

/// Feed gate command emitter. Physical gate state is the board's concern.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateActuator;

impl GateActuator {
    pub fn open(&self, transport: &mut Transport) {
        transport.send(&DeviceCommand::Gate { open: true });
    }

    pub fn close(&self, transport: &mut Transport) {
        transport.send(&DeviceCommand::Gate { open: false });
    }
}
