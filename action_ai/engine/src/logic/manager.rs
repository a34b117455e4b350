//! Detector manager: owns the detectors, the pose history and the stance engine
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{ConfigError, EngineConfig};
use crate::detect::{
    elapsed_ms, standard_detectors, ActionDetector, ActionResult, ClipWindow, DetectContext,
    DetectorFamily,
};
use crate::frame::PoseFrame;
use crate::logic::context::{PoseSample, StanceContext, StanceEvent};
use crate::logic::fsm::FsmRegistry;
use crate::logic::intent::{Intent, IntentBus};
use crate::logic::replay::ReplayRecorder;
use crate::logic::stance_states::{stance_registry, StanceState};
use crate::logic::telemetry::{SessionId, TelemetryPacket, TelemetryRun, TelemetrySink};
use crate::logic::timer::{FrameClockTimer, Timer};
use crate::motion::body::{BodyLayout, Skeleton};
use crate::motion::geometry::velocity;
use crate::motion::history::PoseHistory;
use log::{debug, info, trace};

/// Shared mutable data, used by the manager and by intent execution.
pub(crate) struct EngineHost {
    pub(crate) detectors: Vec<Box<dyn ActionDetector>>,
    pub(crate) history: PoseHistory,
    pub(crate) ctx: StanceContext,
    pub(crate) telemetry: TelemetryRun,
}

/// Index of the result handed to the host: the first completion in priority
/// order, else the first action in progress. A combo reporting its preparation
/// (an Advance before the lunge) yields to detectors reporting their own action.
pub(crate) fn resolve_conflicts(results: &[(DetectorFamily, ActionResult)]) -> Option<usize> {
    let own_action = |family: &DetectorFamily, result: &ActionResult| {
        result.action().is_some_and(|a| DetectorFamily::of(a) == *family)
    };
    results
        .iter()
        .position(|(_, r)| r.is_completed())
        .or_else(|| results.iter().position(|(f, r)| own_action(f, r)))
        .or_else(|| results.iter().position(|(_, r)| !r.is_none()))
}

/// Single entry point for pose frames. Not thread-safe by itself; wrap it in a
/// `Mutex` to share it.
pub struct DetectorManager {
    config: EngineConfig,
    layout: BodyLayout,
    registry: FsmRegistry<StanceState>,
    intent_bus: IntentBus,
    host: EngineHost,
    timer: Box<dyn Timer>,
    recorder: Option<ReplayRecorder>,
}

impl DetectorManager {
    /// Manager running the full detector set.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::from_detectors(config, standard_detectors())
    }

    /// Manager running `detectors`, reordered by the priority of their target action.
    pub fn from_detectors(
        config: EngineConfig,
        mut detectors: Vec<Box<dyn ActionDetector>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        detectors.sort_by_key(|d| d.target_action().priority());

        Ok(DetectorManager {
            layout: BodyLayout::from_config(&config),
            registry: stance_registry(),
            intent_bus: IntentBus,
            host: EngineHost {
                detectors,
                history: PoseHistory::from_config(&config),
                ctx: StanceContext::new(config.en_garde_stable_frames, config.stance_break_frames),
                telemetry: TelemetryRun::disabled(),
            },
            timer: Box::new(FrameClockTimer::new()),
            recorder: None,
            config,
        })
    }

    /// Sends telemetry to `sink` under a fresh session id.
    pub fn with_telemetry(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.host.telemetry = TelemetryRun::with_sink(sink);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.host.telemetry.session_id
    }

    /// Starts recording every frame, result and intent from here on.
    pub fn enable_recording(&mut self) {
        if self.recorder.is_none() {
            self.recorder = Some(ReplayRecorder::default());
        }
    }

    /// Stops recording and hands back what was captured.
    pub fn take_recording(&mut self) -> Option<ReplayRecorder> {
        self.recorder.take()
    }

    pub fn stance(&self) -> StanceState {
        self.host.ctx.state()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history_len(&self) -> usize {
        self.host.history.len()
    }

    /// Clip span for a completed `result` that ended at `end_ms`.
    pub fn clip_window(&self, result: &ActionResult, end_ms: u64) -> Option<ClipWindow> {
        result.clip_window(end_ms, self.config.clip_prebuffer_ms)
    }

    /// Runs one frame through validation, the stance engine and every eligible detector.
    /// Invalid frames yield `ActionResult::None` and change nothing.
    pub fn process(&mut self, frame: PoseFrame) -> ActionResult {
        if let Some(recorder) = &mut self.recorder {
            recorder.record_frame(&frame);
        }

        let ts = frame.timestamp_ms();
        if let Err(e) = self.host.history.admit(&frame) {
            debug!("Frame at {}ms rejected: {}", ts, e);
            let reason = e.to_string();
            let session_id = self.host.telemetry.session_id.clone();
            self.host.telemetry.write(&TelemetryPacket::FrameRejected {
                session_id,
                ts,
                reason: reason.as_str(),
            });
            return ActionResult::None;
        }

        // A long gap since the last frame means the fencer was lost in between.
        if let Some(event) = self.timer.poll(ts) {
            self.host.ctx.now_ms = ts;
            self.dispatch(event);
        }

        let sample = self.pose_sample(&frame);
        self.host.history.push(frame);
        self.dispatch(StanceEvent::Pose(sample));
        self.timer.start(ts, self.config.pose_lost_timeout_ms);

        let mut results = self.run_detectors();
        let winner = resolve_conflicts(&results);

        for (_, result) in &results {
            if let ActionResult::InProgress {
                action, confidence, ..
            } = result
            {
                self.dispatch(StanceEvent::Report {
                    action: *action,
                    completed: false,
                    confidence: *confidence,
                });
            } else if let ActionResult::Completed { action, .. } = result {
                self.dispatch(StanceEvent::Report {
                    action: *action,
                    completed: true,
                    confidence: 1.0,
                });
            }
        }

        let Some(index) = winner else {
            return ActionResult::None;
        };
        let (_, result) = results.swap_remove(index);
        self.emit(ts, &result);
        result
    }

    /// Lets the host advance time without a frame. Returns true if the fencer was declared lost.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        match self.timer.poll(now_ms) {
            Some(event) => {
                self.host.ctx.now_ms = now_ms;
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Back to a fresh session state: detectors idle, history empty, stance Idle.
    pub fn reset_all(&mut self) {
        let mut intents = vec![Intent::ResetAll, Intent::ClearHistory];
        let from = self.host.ctx.state();
        if from != StanceState::Idle {
            intents.insert(
                0,
                Intent::LogTransition {
                    from: from.to_string(),
                    to: StanceState::Idle.to_string(),
                    triggered_by: None,
                    reason: "Reset by host".into(),
                },
            );
        }
        self.host.ctx.enter(StanceState::Idle);
        self.timer.cancel();
        self.execute(Intent::Chain(intents));
    }

    fn pose_sample(&self, frame: &PoseFrame) -> PoseSample {
        let now = Skeleton::new(frame, self.layout);
        let hip_speed = self.host.history.latest().map(|previous| {
            let prev = Skeleton::new(previous, self.layout);
            velocity(prev.hip_mid(), now.hip_mid(), elapsed_ms(previous, frame))
        });
        PoseSample {
            ts_ms: frame.timestamp_ms(),
            hip_speed,
            front_knee: now.front_knee_angle(),
            rear_knee: now.rear_knee_angle(),
            stance_width: now.stance_width(),
        }
    }

    /// One result per detector, in priority order. Ineligible detectors report None.
    fn run_detectors(&mut self) -> Vec<(DetectorFamily, ActionResult)> {
        let EngineHost {
            detectors,
            history,
            ctx,
            ..
        } = &mut self.host;
        let Some((current, preceding)) = history.frames().split_last() else {
            return vec![];
        };
        let detect_ctx = DetectContext {
            layout: self.layout,
        };

        detectors
            .iter_mut()
            .map(|detector| {
                let family = detector.family();
                if !ctx.allows(family) {
                    return (family, ActionResult::None);
                }
                let result = detector.detect(current, preceding, &detect_ctx);
                if detector.in_progress() {
                    trace!(
                        "{} detector mid-action at {}ms",
                        detector.target_action(),
                        current.timestamp_ms()
                    );
                }
                (family, result)
            })
            .collect()
    }

    /// Routes an event through the stance FSM and applies what it asks for.
    fn dispatch(&mut self, event: StanceEvent) {
        if let StanceEvent::Pose(sample) = &event {
            self.host.ctx.observe(sample);
        }

        let from = self.host.ctx.state();
        let (to, intents) = self.registry.handle(&mut self.host.ctx, &event, |ctx| &ctx.state);
        if to != from {
            let ts = self.host.ctx.now_ms;
            let duration_ms = ts.saturating_sub(self.host.ctx.entered_ms);
            let session_id = self.host.telemetry.session_id.clone();
            self.host.telemetry.write(&TelemetryPacket::StateDuration {
                session_id,
                ts,
                state: from.as_str(),
                duration_ms,
            });
            self.host.ctx.enter(to);
        }

        for intent in intents {
            self.execute(intent);
        }
    }

    fn execute(&mut self, intent: Intent) {
        if let Some(recorder) = &mut self.recorder {
            recorder.record_intent(self.host.ctx.now_ms, &intent);
        }
        self.intent_bus.execute(&mut self.host, &intent);
    }

    fn emit(&mut self, ts: u64, result: &ActionResult) {
        let (completed, quality, duration_ms) = match result {
            ActionResult::Completed {
                quality, duration_ms, ..
            } => (true, Some(quality.as_str()), Some(*duration_ms)),
            _ => (false, None, None),
        };
        let action = result.action().map(|a| a.label()).unwrap_or_default();

        if completed {
            info!(
                "{} completed at {}ms ({})",
                action,
                ts,
                quality.unwrap_or_default()
            );
        } else {
            trace!("{} in progress at {}ms", action, ts);
        }

        let session_id = self.host.telemetry.session_id.clone();
        self.host.telemetry.write(&TelemetryPacket::ActionEmitted {
            session_id,
            ts,
            action,
            completed,
            quality,
            duration_ms,
            feedback: result.feedback(),
        });

        if let Some(recorder) = &mut self.recorder {
            recorder.record_result(ts, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ActionQuality, SaberAction};

    fn none(family: DetectorFamily) -> (DetectorFamily, ActionResult) {
        (family, ActionResult::None)
    }

    fn progress(action: SaberAction) -> (DetectorFamily, ActionResult) {
        (DetectorFamily::of(action), ActionResult::in_progress(action, 0.5))
    }

    fn done(action: SaberAction) -> (DetectorFamily, ActionResult) {
        let result = ActionResult::Completed {
            action,
            quality: ActionQuality::Good,
            feedback: None,
            duration_ms: 100,
        };
        (DetectorFamily::of(action), result)
    }

    #[test]
    fn completion_beats_earlier_progress() {
        let results = [
            progress(SaberAction::Lunging),
            none(DetectorFamily::Blade),
            done(SaberAction::Retreat),
        ];
        assert_eq!(resolve_conflicts(&results), Some(2));
    }

    #[test]
    fn first_completion_wins() {
        let results = [
            none(DetectorFamily::Attack),
            done(SaberAction::Advance),
            done(SaberAction::Retreat),
        ];
        assert_eq!(resolve_conflicts(&results), Some(1));
    }

    #[test]
    fn first_progress_wins_without_completions() {
        let results = [
            none(DetectorFamily::Attack),
            progress(SaberAction::Lunging),
            progress(SaberAction::Advance),
        ];
        assert_eq!(resolve_conflicts(&results), Some(1));
        let quiet = [none(DetectorFamily::Attack), none(DetectorFamily::Footwork)];
        assert_eq!(resolve_conflicts(&quiet), None);
        assert_eq!(resolve_conflicts(&[]), None);
    }

    #[test]
    fn combo_preparation_yields_to_the_step_itself() {
        let preparation = (
            DetectorFamily::Attack,
            ActionResult::in_progress(SaberAction::Advance, 0.3),
        );
        let step = progress(SaberAction::Advance);
        assert_eq!(resolve_conflicts(&[preparation.clone(), step]), Some(1));
        // Alone, the preparation is still reported.
        assert_eq!(resolve_conflicts(&[preparation, none(DetectorFamily::Footwork)]), Some(0));
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = EngineConfig {
            history_window_ms: 100,
            ..EngineConfig::default()
        };
        assert!(matches!(
            DetectorManager::new(config),
            Err(ConfigError::HistoryTooShort { .. })
        ));
    }

    #[test]
    fn manager_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<DetectorManager>();
    }
}
