use std::{
    collections::VecDeque,
    num::NonZeroU32,
    time::{Duration, Instant},
};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use shared::{
    domain::{AimMode, Angle, AngleBounds},
    error::LauncherError,
};
use tracing::{debug, info};

use crate::config::{AimConfig, FollowPolicy, SteadyConfig};

/// Turns per-frame target samples into a servo angle.
///
/// The held angle always lies within the configured bounds. Randomness comes
/// from the injected generator so runs can be replayed from a seed.
pub struct AimController<R = Pcg64> {
    bounds: AngleBounds,
    mode: AimMode,
    policy: FollowPolicy,
    steady: SteadyConfig,
    random_wait: (f64, f64),
    angle: Angle,
    history: VecDeque<i32>,
    cooldown: u32,
    next_retarget: Option<Instant>,
    rng: R,
}

impl AimController<Pcg64> {
    pub fn from_entropy(config: &AimConfig) -> Result<Self, LauncherError> {
        Self::new(config, Pcg64::from_entropy())
    }
}

impl<R> AimController<R> {
    pub fn angle(&self) -> Angle {
        self.angle
    }

    pub fn mode(&self) -> AimMode {
        self.mode
    }

    pub fn bounds(&self) -> AngleBounds {
        self.bounds
    }

    pub fn policy(&self) -> FollowPolicy {
        self.policy
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// Switches mode and restarts random retarget timing. The held angle is kept.
    pub fn set_mode(&mut self, mode: AimMode) {
        if self.mode != mode {
            info!(from = %self.mode, to = %mode, "aim mode changed");
        }
        self.mode = mode;
        self.next_retarget = None;
    }
}

impl<R: Rng> AimController<R> {
    pub fn new(config: &AimConfig, rng: R) -> Result<Self, LauncherError> {
        let bounds = config.bounds()?;
        Ok(Self {
            bounds,
            mode: config.mode,
            policy: config.follow_policy,
            steady: config.steady.clone(),
            random_wait: config.random_wait()?,
            angle: bounds.midpoint(),
            history: VecDeque::with_capacity(config.steady.history_len),
            cooldown: 0,
            next_retarget: None,
            rng,
        })
    }

    pub fn update(&mut self, target: Option<i32>, frame_width: NonZeroU32) -> Angle {
        self.update_at(target, frame_width, Instant::now())
    }

    pub fn update_at(&mut self, target: Option<i32>, frame_width: NonZeroU32, now: Instant) -> Angle {
        match self.mode {
            AimMode::Follow => match self.policy {
                FollowPolicy::Reactive => self.follow_reactive(target, frame_width),
                FollowPolicy::Steady => self.follow_steady(target, frame_width),
            },
            AimMode::Random => self.random_at(now),
        }
    }

    fn follow_reactive(&mut self, target: Option<i32>, frame_width: NonZeroU32) -> Angle {
        self.angle = match target {
            Some(x) => self.map_to_angle(f64::from(x), frame_width),
            None => self.bounds.midpoint(),
        };
        self.angle
    }

    fn follow_steady(&mut self, target: Option<i32>, frame_width: NonZeroU32) -> Angle {
        let Some(x) = target else {
            self.history.clear();
            self.cooldown = 0;
            self.angle = self.bounds.midpoint();
            return self.angle;
        };

        if self.history.len() == self.steady.history_len {
            self.history.pop_front();
        }
        self.history.push_back(x);

        if self.history.len() < self.steady.history_len || self.cooldown > 0 {
            self.cooldown = self.cooldown.saturating_sub(1);
            return self.angle;
        }

        let (lo, hi) = self
            .history
            .iter()
            .fold((i32::MAX, i32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if hi.saturating_sub(lo) > self.steady.stability_px {
            return self.angle;
        }

        let width = f64::from(frame_width.get());
        let offset = f64::from(x) - width / 2.0;
        let jitter_px = f64::from(
            self.rng
                .gen_range(-self.steady.bias_jitter_px..=self.steady.bias_jitter_px),
        );
        let biased = (f64::from(x) + self.steady.bias_scale * offset + jitter_px).clamp(0.0, width);

        let base = self.map_to_angle(biased, frame_width);
        let jitter_deg = self
            .rng
            .gen_range(-self.steady.angle_jitter..=self.steady.angle_jitter);
        self.angle = self.bounds.clamp(base.saturating_add(jitter_deg));
        self.cooldown = self
            .rng
            .gen_range(self.steady.cooldown_min..=self.steady.cooldown_max);

        info!(angle = self.angle, cooldown = self.cooldown, "target settled; re-aimed");
        self.angle
    }

    fn random_at(&mut self, now: Instant) -> Angle {
        if self.next_retarget.is_some_and(|due| now < due) {
            return self.angle;
        }

        self.angle = self.rng.gen_range(self.bounds.min()..=self.bounds.max());
        let (wait_min, wait_max) = self.random_wait;
        let wait = Duration::from_secs_f64(self.rng.gen_range(wait_min..=wait_max));
        self.next_retarget = Some(now + wait);

        debug!(angle = self.angle, ?wait, "random retarget");
        self.angle
    }

    fn map_to_angle(&self, x: f64, frame_width: NonZeroU32) -> Angle {
        let fraction = (x / f64::from(frame_width.get())).clamp(0.0, 1.0);
        let offset = (fraction * self.bounds.span() as f64).round() as i64;
        self.bounds.clamp_wide(i64::from(self.bounds.min()) + offset)
    }
}

#[cfg(test)]
#[path = "tests/aim_tests.rs"]
mod tests;
