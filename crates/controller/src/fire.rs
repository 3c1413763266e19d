use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

/// Longest accepted on or off phase. Longer requests are clamped.
pub const MAX_PHASE: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirePhase {
    Idle,
    Holding { close_at: Instant },
}

/// Gate action the owner must carry out for a fire cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireStep {
    /// Spin the wheels and open the gate; close it at `close_at`.
    Open { close_at: Instant },
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualFire {
    Started,
    /// The recent angle history is not identical.
    NotSteady,
    /// A fire cycle is already holding the gate open.
    Busy,
}

#[derive(Debug, Clone, Serialize)]
pub struct FireStatus {
    pub auto: bool,
    pub holding: bool,
    pub cycles: u64,
    pub on_ms: u64,
    pub off_ms: u64,
}

/// Periodic fire cycle timing.
///
/// A cycle starts once `off_interval` has passed since the previous cycle
/// closed. The gate is held open for `on_duration` and closed before the next
/// cycle may start.
pub struct FireSequencer {
    off_interval: Duration,
    on_duration: Duration,
    last_fire: Instant,
    phase: FirePhase,
    cycles: u64,
    auto: bool,
}

impl FireSequencer {
    pub fn new(on_duration: Duration, off_interval: Duration, auto: bool, start: Instant) -> Self {
        Self {
            off_interval: off_interval.min(MAX_PHASE),
            on_duration: on_duration.min(MAX_PHASE),
            last_fire: start,
            phase: FirePhase::Idle,
            cycles: 0,
            auto,
        }
    }

    /// Takes effect from the next cycle; a cycle already holding keeps its deadline.
    pub fn set_timing(&mut self, on_duration: Duration, off_interval: Duration) {
        self.on_duration = on_duration.min(MAX_PHASE);
        self.off_interval = off_interval.min(MAX_PHASE);
        info!(
            on = ?self.on_duration,
            off = ?self.off_interval,
            "fire timing updated"
        );
    }

    pub fn set_auto(&mut self, auto: bool) {
        if self.auto != auto {
            info!(auto, "auto-fire toggled");
        }
        self.auto = auto;
    }

    pub fn auto(&self) -> bool {
        self.auto
    }

    pub fn is_holding(&self) -> bool {
        matches!(self.phase, FirePhase::Holding { .. })
    }

    pub fn close_at(&self) -> Option<Instant> {
        match self.phase {
            FirePhase::Holding { close_at } => Some(close_at),
            FirePhase::Idle => None,
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn poll(&mut self, now: Instant) -> Option<FireStep> {
        match self.phase {
            FirePhase::Holding { close_at } if now >= close_at => {
                self.phase = FirePhase::Idle;
                self.last_fire = now;
                debug!(cycle = self.cycles, "fire cycle closed");
                Some(FireStep::Close)
            }
            FirePhase::Holding { .. } => None,
            FirePhase::Idle if self.auto && now >= self.last_fire + self.off_interval => {
                Some(self.open(now))
            }
            FirePhase::Idle => None,
        }
    }

    /// Starts a cycle immediately unless one is already holding.
    pub fn trigger(&mut self, now: Instant) -> Option<FireStep> {
        match self.phase {
            FirePhase::Holding { .. } => None,
            FirePhase::Idle => Some(self.open(now)),
        }
    }

    /// Ends a holding cycle without waiting for its deadline.
    pub fn abort(&mut self, now: Instant) -> Option<FireStep> {
        match self.phase {
            FirePhase::Holding { .. } => {
                self.phase = FirePhase::Idle;
                self.last_fire = now;
                Some(FireStep::Close)
            }
            FirePhase::Idle => None,
        }
    }

    pub fn status(&self) -> FireStatus {
        FireStatus {
            auto: self.auto,
            holding: self.is_holding(),
            cycles: self.cycles,
            on_ms: millis(self.on_duration),
            off_ms: millis(self.off_interval),
        }
    }

    fn open(&mut self, now: Instant) -> FireStep {
        let close_at = now + self.on_duration;
        self.phase = FirePhase::Holding { close_at };
        self.cycles += 1;
        debug!(cycle = self.cycles, "fire cycle opened");
        FireStep::Open { close_at }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "tests/fire_tests.rs"]
mod tests;
