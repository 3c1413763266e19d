pub mod aim;
pub mod commands;
pub mod config;
pub mod fire;
pub mod gate;
pub mod launcher;
pub mod runtime;
pub mod wheels;

pub use commands::{command_queue, dispatch_command, input_queue, LauncherCommand};
pub use config::LauncherConfig;
pub use launcher::{Launcher, LauncherStatus};
pub use runtime::{
    run_control_loop, ChannelSource, InputEvent, LoopExit, TargetSource, TrackSample,
};
