//! Stage Session - the composition root for one visual surface

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use kinesis_core::{ema, secs_f32, FrameTime, KinesisResult, PerformerId, SessionId};
use kinesis_signal::{PointerSample, PointerState, PoseFrame, PoseTracker};
use kinesis_stage::{
    ApplyReport, EffectKind, EffectMaterial, StageAdapter, UniformBundle, UniformValue,
    QUALITY_SCALE_UNIFORM,
};
use kinesis_time::{FrameClock, PerfMonitor};

use crate::{BundleTap, SessionConfig};

#[derive(Clone, Debug, Default)]
pub struct RuntimeStats {
    pub ticks: u64,
    pub pointer_folded: u64,
    pub pose_folded: u64,
    /// Samples refused because an input queue was full
    pub samples_dropped: u64,
    /// Pose frames without both shoulders
    pub pose_rejected: u64,
    /// Bundle entries the active material did not take
    pub adapter_skips: u64,
    pub degraded_ticks: u64,
    pub performers_joined: u64,
    pub performers_evicted: u64,
    pub last_tick_duration: Duration,
}

#[derive(Debug)]
struct PoseInput {
    performer: PerformerId,
    frame: PoseFrame,
    dt_secs: Option<f32>,
}

#[derive(Debug)]
struct PerformerSlot {
    tracker: PoseTracker,
    /// Any frame, accepted or not; drives eviction
    last_seen: FrameTime,
    /// Last frame the tracker folded; drives untimed `dt`
    last_accepted: FrameTime,
}

/// Owns all pipeline state for one surface
pub struct StageSession {
    id: SessionId,
    config: SessionConfig,
    clock: FrameClock,
    perf: PerfMonitor,
    pointer: PointerState,
    last_pointer: Option<PointerSample>,
    performers: BTreeMap<PerformerId, PerformerSlot>,
    primary: Option<PerformerId>,
    bundle: UniformBundle,
    adapter: StageAdapter<EffectMaterial>,
    pointer_queue: VecDeque<PointerSample>,
    pose_queue: VecDeque<PoseInput>,
    tap: BundleTap,
    stats: RuntimeStats,
}

impl StageSession {
    /// Create a session with validated configuration
    pub fn new(id: SessionId, config: SessionConfig) -> KinesisResult<Self> {
        config.validate()?;

        let mut bundle = UniformBundle::default();
        bundle.set_reactivity(config.music_reactivity, config.motion_reactivity);

        let mut adapter = StageAdapter::new(EffectMaterial::for_effect(config.effect));
        adapter.apply_bundle(&bundle);

        let tap = BundleTap::new();
        tap.publish(&bundle);

        Ok(StageSession {
            id,
            clock: FrameClock::with_config(config.clock.clone()),
            perf: PerfMonitor::new(config.perf.clone()),
            pointer: PointerState::default(),
            last_pointer: None,
            performers: BTreeMap::new(),
            primary: None,
            bundle,
            adapter,
            pointer_queue: VecDeque::with_capacity(config.max_queued_pointer),
            pose_queue: VecDeque::with_capacity(config.max_queued_pose),
            tap,
            stats: RuntimeStats::default(),
            config,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Queue a pointer sample for the next tick.
    /// Returns false when the queue is full and the sample was dropped.
    pub fn queue_pointer(&mut self, sample: PointerSample) -> bool {
        if self.pointer_queue.len() >= self.config.max_queued_pointer {
            self.stats.samples_dropped += 1;
            tracing::warn!(
                capacity = self.config.max_queued_pointer,
                "pointer queue full, sample dropped"
            );
            return false;
        }
        self.pointer_queue.push_back(sample);
        true
    }

    /// Queue a pose frame; dt is derived from the performer's previous frame
    pub fn queue_pose(&mut self, performer: PerformerId, frame: PoseFrame) -> bool {
        self.push_pose(PoseInput {
            performer,
            frame,
            dt_secs: None,
        })
    }

    /// Queue a pose frame with an explicit capture interval
    pub fn queue_pose_timed(&mut self, performer: PerformerId, frame: PoseFrame, dt_secs: f32) -> bool {
        self.push_pose(PoseInput {
            performer,
            frame,
            dt_secs: Some(dt_secs),
        })
    }

    fn push_pose(&mut self, input: PoseInput) -> bool {
        if self.pose_queue.len() >= self.config.max_queued_pose {
            self.stats.samples_dropped += 1;
            tracing::warn!(
                performer = %input.performer,
                capacity = self.config.max_queued_pose,
                "pose queue full, frame dropped"
            );
            return false;
        }
        self.pose_queue.push_back(input);
        true
    }

    /// Set music sensitivity, clamped to `[0, max_reactivity]`. Non-finite input is ignored.
    pub fn set_music_reactivity(&mut self, value: f32) {
        if let Some(v) = self.clamp_reactivity(value) {
            self.bundle.music_reactivity = v;
        }
    }

    /// Set motion sensitivity, clamped to `[0, max_reactivity]`. Non-finite input is ignored.
    pub fn set_motion_reactivity(&mut self, value: f32) {
        if let Some(v) = self.clamp_reactivity(value) {
            self.bundle.motion_reactivity = v;
        }
    }

    fn clamp_reactivity(&self, value: f32) -> Option<f32> {
        value
            .is_finite()
            .then(|| value.clamp(0.0, self.config.max_reactivity))
    }

    /// Swap the active effect and re-apply the current bundle to it.
    /// Returns the previous effect.
    pub fn switch_effect(&mut self, effect: EffectKind) -> EffectKind {
        let previous = self.adapter.material().kind();
        if previous == effect {
            return previous;
        }

        self.adapter.replace_material(EffectMaterial::for_effect(effect));
        tracing::info!(from = %previous, to = %effect, "effect switched");
        self.apply_bundle();
        previous
    }

    /// Switch by registry name
    pub fn switch_effect_by_name(&mut self, name: &str) -> KinesisResult<EffectKind> {
        let effect = EffectKind::from_name(name)?;
        Ok(self.switch_effect(effect))
    }

    /// Run one frame with an explicit delta
    pub fn tick(&mut self, dt: Duration) -> &UniformBundle {
        let start = Instant::now();

        // Stage 1: Advance frame clock
        self.clock.advance(dt);
        self.run_stages(start)
    }

    /// Run one frame timed by the wall clock
    pub fn tick_now(&mut self) -> &UniformBundle {
        let start = Instant::now();

        // Stage 1: Advance frame clock
        self.clock.tick();
        self.run_stages(start)
    }

    fn run_stages(&mut self, start: Instant) -> &UniformBundle {
        self.stats.ticks += 1;

        // Stage 2: Record frame health from the unclamped delta
        let perf = self.perf.record(self.clock.raw_delta());
        if perf.is_degraded() {
            self.stats.degraded_ticks += 1;
        }

        // Stage 3: Fold pointer input
        self.fold_pointer();

        // Stage 4: Fold pose input
        self.fold_pose();

        // Stage 5: Evict stale performers
        self.evict_stale();

        // Stage 6: Merge bundle
        self.merge_bundle();

        // Stage 7: Copy into material
        let report = self.apply_bundle();

        // Stage 8: Publish snapshot
        self.tap.publish(&self.bundle);

        self.stats.last_tick_duration = start.elapsed();
        tracing::trace!(
            tick = self.stats.ticks,
            time = self.bundle.time,
            quality_scale = perf.quality_scale,
            applied = report.applied,
            skipped = report.skipped(),
            "tick complete"
        );
        &self.bundle
    }

    /// Stage 3: Fold queued pointer samples in arrival order.
    /// Without new samples the last one is held over this frame's delta.
    fn fold_pointer(&mut self) {
        if self.pointer_queue.is_empty() {
            if let Some(last) = self.last_pointer {
                let held = PointerSample {
                    dt_secs: self.clock.delta_secs(),
                    ..last
                };
                self.pointer = self.pointer.apply(&held, &self.config.pointer);
            }
            return;
        }

        while let Some(sample) = self.pointer_queue.pop_front() {
            self.pointer = self.pointer.apply(&sample, &self.config.pointer);
            self.last_pointer = Some(sample);
            self.stats.pointer_folded += 1;
        }
    }

    /// Stage 4: Fold queued pose frames into their performers' trackers
    fn fold_pose(&mut self) {
        let now = self.clock.now();

        while let Some(input) = self.pose_queue.pop_front() {
            let dt_secs = input.dt_secs.unwrap_or_else(|| match self.performers.get(&input.performer) {
                Some(slot) => secs_f32(now - slot.last_accepted),
                None => self.clock.delta_secs(),
            });

            let performer = input.performer;
            let pose_config = &self.config.pose;
            let joined = &mut self.stats.performers_joined;
            let slot = self.performers.entry(performer).or_insert_with(|| {
                tracing::info!(performer = %performer, "performer joined");
                *joined += 1;
                PerformerSlot {
                    tracker: PoseTracker::new(pose_config.clone()),
                    last_seen: now,
                    last_accepted: now,
                }
            });

            slot.last_seen = now;
            if slot.tracker.push(&input.frame, dt_secs) {
                slot.last_accepted = now;
                self.stats.pose_folded += 1;
            } else {
                self.stats.pose_rejected += 1;
            }
        }
    }

    /// Stage 5: Drop performers whose last frame is older than the timeout
    fn evict_stale(&mut self) {
        let now = self.clock.now();
        let timeout = self.config.performer_timeout();
        let before = self.performers.len();

        self.performers.retain(|id, slot| {
            let keep = now - slot.last_seen <= timeout;
            if !keep {
                tracing::info!(performer = %id, "performer left");
            }
            keep
        });
        self.stats.performers_evicted += (before - self.performers.len()) as u64;

        let primary = self.select_primary();
        if primary != self.primary {
            tracing::info!(from = ?self.primary, to = ?primary, "primary performer changed");
            self.primary = primary;
        }
    }

    fn select_primary(&self) -> Option<PerformerId> {
        self.config
            .primary_performer
            .filter(|id| self.performers.contains_key(id))
            .or_else(|| self.performers.keys().next().copied())
    }

    /// Stage 6: Merge pointer, primary pose and timing into the bundle
    fn merge_bundle(&mut self) {
        self.bundle.merge_pointer(&self.pointer);

        let primary = self.primary.and_then(|id| self.performers.get(&id));
        match primary {
            Some(slot) => {
                if let Some(features) = slot.tracker.features_ref() {
                    self.bundle.merge_pose(features, slot.tracker.joints());
                }
            }
            None => self.relax_pose(),
        }

        self.bundle
            .merge_timing(self.clock.time_secs(), self.clock.delta_secs());
    }

    /// Ease pose channels toward rest while nobody is tracked.
    /// Joints keep their last positions.
    fn relax_pose(&mut self) {
        let pose = &self.config.pose;
        self.bundle.body_speed = ema(self.bundle.body_speed, 0.0, pose.body_speed_alpha);
        self.bundle.expand = ema(self.bundle.expand, 0.0, pose.expand_alpha);
        self.bundle.accent *= pose.accent_decay;
    }

    /// Stage 7: Copy bundle channels plus the quality scale into the material
    fn apply_bundle(&mut self) -> ApplyReport {
        let mut update = self.bundle.to_update();
        update.set(
            QUALITY_SCALE_UNIFORM,
            UniformValue::Scalar(self.perf.quality_scale()),
        );

        let report = self.adapter.set_uniforms(&update);
        self.stats.adapter_skips += report.skipped() as u64;
        report
    }

    pub fn bundle(&self) -> &UniformBundle {
        &self.bundle
    }

    /// Shared handle to the published bundle snapshot
    pub fn tap(&self) -> BundleTap {
        self.tap.clone()
    }

    pub fn material(&self) -> &EffectMaterial {
        self.adapter.material()
    }

    pub fn effect(&self) -> EffectKind {
        self.adapter.material().kind()
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn performers(&self) -> impl Iterator<Item = PerformerId> + '_ {
        self.performers.keys().copied()
    }

    pub fn primary_performer(&self) -> Option<PerformerId> {
        self.primary
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn perf(&self) -> &PerfMonitor {
        &self.perf
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinesis_signal::{Joint, Landmark, Viewport};
    use kinesis_stage::Material;

    const FRAME: Duration = Duration::from_millis(16);

    fn session() -> StageSession {
        StageSession::new(SessionId::new(1), SessionConfig::default()).unwrap()
    }

    fn pose(spread: f32) -> PoseFrame {
        PoseFrame::empty()
            .with(Joint::LeftShoulder, Landmark::new(0.4, 0.3))
            .with(Joint::RightShoulder, Landmark::new(0.6, 0.3))
            .with(Joint::LeftWrist, Landmark::new(0.5 - spread, 0.35))
            .with(Joint::RightWrist, Landmark::new(0.5 + spread, 0.35))
    }

    #[test]
    fn test_session_creation_rejects_bad_config() {
        let config = SessionConfig {
            max_reactivity: -1.0,
            ..Default::default()
        };
        assert!(StageSession::new(SessionId::new(1), config).is_err());
    }

    #[test]
    fn test_session_tick_defaults() {
        let mut session = session();

        let bundle = session.tick(FRAME).clone();
        assert_eq!(bundle.pointer, [0.5, 0.5]);
        assert_eq!(bundle.music_reactivity, 0.9);
        assert!((bundle.time - 0.016).abs() < 1e-6);
        assert!((bundle.delta - 0.016).abs() < 1e-6);
        assert_eq!(session.stats().ticks, 1);
        assert_eq!(session.effect(), EffectKind::FlowField);
    }

    #[test]
    fn test_pointer_folded_before_merge() {
        let mut session = session();
        let viewport = Viewport::new(800.0, 600.0);

        assert!(session.queue_pointer(PointerSample::new(800.0, 600.0, viewport, 0.016)));
        session.tick(FRAME);

        assert_eq!(session.bundle().pointer, [0.625, 0.625]);
        assert_eq!(session.material().parameters().vec2("pointer"), Some([0.625, 0.625]));
        assert_eq!(session.stats().pointer_folded, 1);
    }

    #[test]
    fn test_pointer_settles_between_events() {
        let mut session = session();
        let viewport = Viewport::new(800.0, 600.0);

        session.queue_pointer(PointerSample::new(800.0, 600.0, viewport, 0.016));
        session.tick(FRAME);
        assert!(session.bundle().pointer_velocity[0] > 1.0);

        for _ in 0..120 {
            session.tick(FRAME);
        }

        let bundle = session.bundle();
        assert!(bundle.pointer[0] > 0.999 && bundle.pointer[1] > 0.999);
        assert!(bundle.pointer_velocity[0].abs() < 1e-3);
        assert!(bundle.pointer_velocity[1].abs() < 1e-3);
        assert_eq!(session.stats().pointer_folded, 1);
    }

    #[test]
    fn test_pointer_untouched_before_first_event() {
        let mut session = session();
        for _ in 0..10 {
            session.tick(FRAME);
        }
        assert_eq!(session.bundle().pointer, [0.5, 0.5]);
        assert_eq!(session.bundle().pointer_velocity, [0.0, 0.0]);
    }

    #[test]
    fn test_pointer_queue_overflow() {
        let config = SessionConfig {
            max_queued_pointer: 2,
            ..Default::default()
        };
        let mut session = StageSession::new(SessionId::new(1), config).unwrap();
        let viewport = Viewport::new(100.0, 100.0);

        assert!(session.queue_pointer(PointerSample::new(10.0, 10.0, viewport, 0.016)));
        assert!(session.queue_pointer(PointerSample::new(20.0, 20.0, viewport, 0.016)));
        assert!(!session.queue_pointer(PointerSample::new(90.0, 90.0, viewport, 0.016)));
        assert_eq!(session.stats().samples_dropped, 1);

        session.tick(FRAME);
        assert_eq!(session.stats().pointer_folded, 2);
        assert!(session.queue_pointer(PointerSample::new(90.0, 90.0, viewport, 0.016)));
    }

    #[test]
    fn test_pose_drives_bundle_and_material() {
        let mut session = session();

        session.queue_pose(PerformerId::new(1), pose(0.3));
        session.tick(FRAME);

        let expand = session.bundle().expand;
        assert!(expand > 0.0);
        assert_eq!(session.material().parameters().scalar("expand"), Some(expand));
        assert_eq!(session.primary_performer(), Some(PerformerId::new(1)));
        assert_eq!(session.stats().pose_folded, 1);
        assert_eq!(session.stats().performers_joined, 1);
    }

    #[test]
    fn test_rejected_pose_keeps_features() {
        let mut session = session();
        session.queue_pose(PerformerId::new(1), pose(0.3));
        session.tick(FRAME);
        let expand = session.bundle().expand;

        session.queue_pose(PerformerId::new(1), PoseFrame::empty());
        session.tick(FRAME);

        assert_eq!(session.stats().pose_rejected, 1);
        assert_eq!(session.bundle().expand, expand);
    }

    fn drifting(step: f32) -> PoseFrame {
        PoseFrame::empty()
            .with(Joint::LeftShoulder, Landmark::new(0.4 + step, 0.3))
            .with(Joint::RightShoulder, Landmark::new(0.6 + step, 0.3))
            .with(Joint::LeftWrist, Landmark::new(0.2 + step, 0.35))
            .with(Joint::RightWrist, Landmark::new(0.8 + step, 0.35))
    }

    #[test]
    fn test_rejected_frame_does_not_shorten_dt() {
        let mut session = session();
        let performer = PerformerId::new(1);

        for i in 0..12 {
            session.queue_pose(performer, drifting(i as f32 * 0.01));
            session.tick(FRAME);
        }
        let before = session.bundle().accent;
        assert!(before > 0.0 && before < 1.0);

        // Wrists only: no shoulders, so the tracker rejects it
        let partial = PoseFrame::empty()
            .with(Joint::LeftWrist, Landmark::new(0.32, 0.35))
            .with(Joint::RightWrist, Landmark::new(0.92, 0.35));
        session.queue_pose(performer, partial);
        session.tick(FRAME);
        assert_eq!(session.stats().pose_rejected, 1);

        session.queue_pose(performer, drifting(0.13));
        session.tick(FRAME);

        let after = session.bundle().accent;
        assert!((after - before * 0.85).abs() < 1e-4, "{before} -> {after}");
    }

    #[test]
    fn test_pose_channels_relax_after_eviction() {
        let config = SessionConfig {
            performer_timeout_ms: 100,
            ..Default::default()
        };
        let mut session = StageSession::new(SessionId::new(1), config).unwrap();

        for i in 0..4 {
            session.queue_pose(PerformerId::new(1), drifting(i as f32 * 0.01));
            session.tick(FRAME);
        }
        let accent = session.bundle().accent;
        let expand = session.bundle().expand;
        let joints = session.bundle().joints;
        assert!(accent > 0.0 && expand > 0.0);

        for _ in 0..20 {
            session.tick(Duration::from_millis(50));
        }

        assert_eq!(session.primary_performer(), None);
        let bundle = session.bundle();
        assert!(bundle.accent < accent * 0.1);
        assert!(bundle.expand < expand * 0.1);
        assert_eq!(bundle.joints, joints);
    }

    #[test]
    fn test_primary_performer_selection() {
        let mut session = session();
        session.queue_pose(PerformerId::new(3), pose(0.4));
        session.queue_pose(PerformerId::new(1), pose(0.05));
        session.tick(FRAME);
        assert_eq!(session.primary_performer(), Some(PerformerId::new(1)));
        let lowest_expand = session.bundle().expand;

        let config = SessionConfig {
            primary_performer: Some(PerformerId::new(3)),
            ..Default::default()
        };
        let mut session = StageSession::new(SessionId::new(2), config).unwrap();
        session.queue_pose(PerformerId::new(3), pose(0.4));
        session.queue_pose(PerformerId::new(1), pose(0.05));
        session.tick(FRAME);
        assert_eq!(session.primary_performer(), Some(PerformerId::new(3)));
        assert!(session.bundle().expand > lowest_expand);
    }

    #[test]
    fn test_performer_eviction() {
        let config = SessionConfig {
            performer_timeout_ms: 100,
            ..Default::default()
        };
        let mut session = StageSession::new(SessionId::new(1), config).unwrap();

        session.queue_pose(PerformerId::new(1), pose(0.3));
        session.tick(FRAME);

        session.tick(Duration::from_millis(50));
        session.tick(Duration::from_millis(50));
        assert_eq!(session.performers().count(), 1);

        session.tick(Duration::from_millis(50));
        assert_eq!(session.performers().count(), 0);
        assert_eq!(session.primary_performer(), None);
        assert_eq!(session.stats().performers_evicted, 1);
    }

    #[test]
    fn test_switch_effect_reapplies_bundle() {
        let mut session = session();
        session.queue_pose(PerformerId::new(1), pose(0.3));
        session.tick(FRAME);
        let expand = session.bundle().expand;

        let previous = session.switch_effect(EffectKind::Kaleidoscope);
        assert_eq!(previous, EffectKind::FlowField);
        assert_eq!(session.effect(), EffectKind::Kaleidoscope);

        let params = session.material().parameters();
        assert_eq!(params.scalar("expand"), Some(expand));
        assert_eq!(params.scalar("segments"), Some(6.0));

        assert!(session.switch_effect_by_name("plasma").is_err());
        assert_eq!(session.switch_effect_by_name("silhouette").unwrap(), EffectKind::Kaleidoscope);
    }

    #[test]
    fn test_reactivity_clamped() {
        let mut session = session();

        session.set_music_reactivity(5.0);
        assert_eq!(session.bundle().music_reactivity, 2.0);

        session.set_music_reactivity(f32::NAN);
        assert_eq!(session.bundle().music_reactivity, 2.0);

        session.set_motion_reactivity(-1.0);
        assert_eq!(session.bundle().motion_reactivity, 0.0);

        session.tick(FRAME);
        assert_eq!(session.material().parameters().scalar("musicReactivity"), Some(2.0));
    }

    #[test]
    fn test_quality_scale_reaches_material() {
        let mut session = session();

        for _ in 0..5 {
            session.tick(Duration::from_millis(30));
        }

        assert_eq!(session.perf().quality_scale(), 0.7);
        assert_eq!(session.material().parameters().scalar(QUALITY_SCALE_UNIFORM), Some(0.7));
        assert_eq!(session.stats().degraded_ticks, 1);
    }

    #[test]
    fn test_stalled_frame_clamped_but_counted() {
        let mut session = session();
        session.tick(Duration::from_millis(500));

        assert!((session.bundle().delta - 0.1).abs() < 1e-6);
        assert_eq!(session.perf().current().last_delta_ms, 500.0);
    }

    #[test]
    fn test_tap_publishes_each_tick() {
        let mut session = session();
        let tap = session.tap();

        session.tick(FRAME);
        session.tick(FRAME);

        assert_eq!(tap.snapshot().time, session.bundle().time);
    }

    #[test]
    fn test_adapter_skips_counted() {
        let config = SessionConfig {
            effect: EffectKind::Silhouette,
            ..Default::default()
        };
        let mut session = StageSession::new(SessionId::new(1), config).unwrap();
        session.tick(FRAME);

        // Silhouette declares 5 of the 10 channels and no quality scale
        assert_eq!(session.stats().adapter_skips, 6);
    }

    proptest::proptest! {
        #[test]
        fn prop_reactivity_stays_bounded(music in proptest::num::f32::ANY, motion in proptest::num::f32::ANY) {
            let mut session = session();
            session.set_music_reactivity(music);
            session.set_motion_reactivity(motion);

            let bundle = session.bundle();
            proptest::prop_assert!((0.0..=2.0).contains(&bundle.music_reactivity));
            proptest::prop_assert!((0.0..=2.0).contains(&bundle.motion_reactivity));
        }
    }
}
