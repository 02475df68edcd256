//! Scenario runner - drives a stage session with synthetic input
//!
//! Every tick the runner checks the bundle against the channel bounds and
//! records per-channel extrema.

use std::collections::BTreeMap;

use kinesis_core::{KinesisResult, PerformerId, SessionId};
use kinesis_runtime::{RuntimeStats, SessionConfig, StageSession};
use kinesis_signal::{PointerSample, Viewport};
use kinesis_stage::{EffectKind, UniformBundle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{FrameTimingModel, PerformerModel, SyntheticPerformer};

/// A performer taking part in a scenario
#[derive(Clone, Debug)]
pub struct ScenarioPerformer {
    pub id: PerformerId,
    pub model: PerformerModel,
    /// Stop sending frames after this many ticks
    pub leaves_after: Option<u64>,
}

impl ScenarioPerformer {
    pub fn new(id: u32, model: PerformerModel) -> Self {
        Self {
            id: PerformerId::new(id),
            model,
            leaves_after: None,
        }
    }

    pub fn leaving_after(mut self, ticks: u64) -> Self {
        self.leaves_after = Some(ticks);
        self
    }
}

/// Timing profile for a scenario
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimingProfile {
    Steady,
    Jittery,
    Struggling,
}

/// Scenario configuration
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub ticks: u64,
    pub seed: u64,
    pub session: SessionConfig,
    pub performers: Vec<ScenarioPerformer>,
    pub timing: TimingProfile,
    /// Feed a wandering pointer each tick
    pub pointer: bool,
    /// Cycle through every effect at this interval
    pub switch_every: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            seed: 42,
            session: SessionConfig::default(),
            performers: vec![ScenarioPerformer::new(0, PerformerModel::dancer())],
            timing: TimingProfile::Steady,
            pointer: true,
            switch_every: None,
        }
    }
}

impl ScenarioConfig {
    /// Short single-performer run
    pub fn minimal() -> Self {
        Self {
            ticks: 120,
            ..Default::default()
        }
    }

    /// Several noisy performers on bad hardware, switching effects
    pub fn stress() -> Self {
        Self {
            ticks: 1200,
            performers: vec![
                ScenarioPerformer::new(0, PerformerModel::noisy()),
                ScenarioPerformer::new(1, PerformerModel::dancer()).leaving_after(400),
                ScenarioPerformer::new(2, PerformerModel::noisy()),
            ],
            timing: TimingProfile::Jittery,
            switch_every: Some(150),
            ..Default::default()
        }
    }
}

/// Observed range of a scalar channel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelRange {
    pub min: f32,
    pub max: f32,
}

impl ChannelRange {
    fn new(value: f32) -> Self {
        Self { min: value, max: value }
    }

    fn observe(&mut self, value: f32) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Outcome of a scenario run
#[derive(Clone, Debug)]
pub struct ScenarioReport {
    pub ticks: u64,
    pub ranges: BTreeMap<&'static str, ChannelRange>,
    pub bound_violations: Vec<String>,
    pub degraded_ticks: u64,
    pub final_quality_scale: f32,
    pub final_effect: EffectKind,
    pub final_performers: Vec<PerformerId>,
    pub stats: RuntimeStats,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.bound_violations.is_empty()
    }

    pub fn range(&self, channel: &str) -> Option<ChannelRange> {
        self.ranges.get(channel).copied()
    }
}

/// Drives a `StageSession` through a scenario
pub struct ScenarioRunner {
    config: ScenarioConfig,
    session: StageSession,
    performers: Vec<(SyntheticPerformer, Option<u64>)>,
    timing: FrameTimingModel,
    rng: StdRng,
    viewport: Viewport,
    pointer_px: (f32, f32),
}

impl ScenarioRunner {
    pub fn new(config: ScenarioConfig) -> KinesisResult<Self> {
        let session = StageSession::new(SessionId::new(config.seed), config.session.clone())?;

        let performers = config
            .performers
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let seed = config.seed.wrapping_add(1000 + i as u64);
                (SyntheticPerformer::new(p.id, p.model.clone(), seed), p.leaves_after)
            })
            .collect();

        let timing_seed = config.seed.wrapping_add(7);
        let timing = match config.timing {
            TimingProfile::Steady => FrameTimingModel::steady(timing_seed),
            TimingProfile::Jittery => FrameTimingModel::jittery(timing_seed),
            TimingProfile::Struggling => FrameTimingModel::struggling(timing_seed),
        };

        Ok(ScenarioRunner {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            session,
            performers,
            timing,
            viewport: Viewport::new(1280.0, 720.0),
            pointer_px: (640.0, 360.0),
        })
    }

    pub fn session(&self) -> &StageSession {
        &self.session
    }

    /// Run every tick and report
    pub fn run(mut self) -> ScenarioReport {
        let mut ranges: BTreeMap<&'static str, ChannelRange> = BTreeMap::new();
        let mut violations = Vec::new();
        let mut last_time = 0.0f32;
        let max_delta = self.config.session.clock.max_delta_ms / 1000.0;
        let max_reactivity = self.config.session.max_reactivity;

        for tick in 0..self.config.ticks {
            let dt = self.timing.next_delta();
            let dt_secs = dt.as_secs_f32();

            if let Some(every) = self.config.switch_every {
                if every > 0 && tick > 0 && tick % every == 0 {
                    let effects = EffectKind::all();
                    let next = effects[(tick / every) as usize % effects.len()];
                    self.session.switch_effect(next);
                }
            }

            if self.config.pointer {
                let sample = self.wander_pointer(dt_secs);
                self.session.queue_pointer(sample);
            }

            for (performer, leaves_after) in &mut self.performers {
                if leaves_after.map_or(false, |limit| tick >= limit) {
                    continue;
                }
                if let Some(frame) = performer.next_frame(dt_secs) {
                    self.session.queue_pose(performer.id(), frame);
                }
            }

            let bundle = self.session.tick(dt);
            check_bounds(tick, bundle, last_time, max_delta, max_reactivity, &mut violations);
            last_time = bundle.time;

            for (name, value) in scalar_channels(bundle) {
                ranges
                    .entry(name)
                    .and_modify(|r| r.observe(value))
                    .or_insert_with(|| ChannelRange::new(value));
            }
        }

        ScenarioReport {
            ticks: self.config.ticks,
            ranges,
            bound_violations: violations,
            degraded_ticks: self.session.stats().degraded_ticks,
            final_quality_scale: self.session.perf().quality_scale(),
            final_effect: self.session.effect(),
            final_performers: self.session.performers().collect(),
            stats: self.session.stats().clone(),
        }
    }

    /// Random walk that sometimes leaves the viewport
    fn wander_pointer(&mut self, dt_secs: f32) -> PointerSample {
        let step = 900.0 * dt_secs;
        let (x, y) = self.pointer_px;
        let nx = (x + self.rng.gen_range(-step..=step)).clamp(-100.0, self.viewport.width + 100.0);
        let ny = (y + self.rng.gen_range(-step..=step)).clamp(-100.0, self.viewport.height + 100.0);
        self.pointer_px = (nx, ny);
        PointerSample::new(nx, ny, self.viewport, dt_secs)
    }
}

fn scalar_channels(bundle: &UniformBundle) -> [(&'static str, f32); 9] {
    [
        ("pointer.x", bundle.pointer[0]),
        ("pointer.y", bundle.pointer[1]),
        ("bodySpeed", bundle.body_speed),
        ("expand", bundle.expand),
        ("accent", bundle.accent),
        ("musicReactivity", bundle.music_reactivity),
        ("motionReactivity", bundle.motion_reactivity),
        ("time", bundle.time),
        ("delta", bundle.delta),
    ]
}

fn check_bounds(
    tick: u64,
    bundle: &UniformBundle,
    last_time: f32,
    max_delta: f32,
    max_reactivity: f32,
    violations: &mut Vec<String>,
) {
    let unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);

    for (name, value) in [
        ("pointer.x", bundle.pointer[0]),
        ("pointer.y", bundle.pointer[1]),
        ("bodySpeed", bundle.body_speed),
        ("expand", bundle.expand),
        ("accent", bundle.accent),
    ] {
        if !unit(value) {
            violations.push(format!("tick {tick}: {name} = {value} outside [0, 1]"));
        }
    }

    if !bundle.pointer_velocity.iter().all(|v| v.is_finite()) {
        violations.push(format!("tick {tick}: pointerVelocity not finite"));
    }

    if let Some((i, v)) = bundle.joints.iter().enumerate().find(|(_, v)| !unit(**v)) {
        violations.push(format!("tick {tick}: joints[{i}] = {v} outside [0, 1]"));
    }

    for (name, value) in [
        ("musicReactivity", bundle.music_reactivity),
        ("motionReactivity", bundle.motion_reactivity),
    ] {
        if !(value.is_finite() && (0.0..=max_reactivity).contains(&value)) {
            violations.push(format!("tick {tick}: {name} = {value} outside [0, {max_reactivity}]"));
        }
    }

    if !(bundle.time >= last_time) {
        violations.push(format!("tick {tick}: time went backwards ({last_time} -> {})", bundle.time));
    }
    if !(bundle.delta >= 0.0 && bundle.delta <= max_delta + 1e-6) {
        violations.push(format!("tick {tick}: delta = {} exceeds {max_delta}", bundle.delta));
    }
}
