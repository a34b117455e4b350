//! Stance lifecycle of the fencer: idle, en garde, lunging, recovering
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{LUNGING_STALE_MS, RIPOSTE_WINDOW_MS};
use crate::detect::{DetectorFamily, SaberAction};
use crate::logic::context::{StanceContext, StanceEvent};
use crate::logic::fsm::{FsmRegistry, StateHandler, TransitionDecision};
use crate::logic::intent::Intent;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Hash, Eq, PartialEq, Clone, Debug, Copy, Serialize, Deserialize)]
/// Stance states; each one enables a different set of detector families
pub enum StanceState {
    Idle,
    EnGarde,
    Lunging,
    Recovery,
}

impl fmt::Display for StanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StanceState {
    /// Static string form (no allocation) for logs and telemetry
    pub fn as_str(&self) -> &'static str {
        match self {
            StanceState::Idle => "Idle",
            StanceState::EnGarde => "EnGarde",
            StanceState::Lunging => "Lunging",
            StanceState::Recovery => "Recovery",
        }
    }

    pub fn eligible_families(&self) -> &'static [DetectorFamily] {
        match self {
            StanceState::Idle => &[],
            StanceState::EnGarde => &[
                DetectorFamily::Footwork,
                DetectorFamily::Attack,
                DetectorFamily::Blade,
            ],
            StanceState::Lunging => &[DetectorFamily::Attack],
            StanceState::Recovery => &[DetectorFamily::Recovery, DetectorFamily::Blade],
        }
    }
}

/// Registry with a handler for every stance.
pub(crate) fn stance_registry() -> FsmRegistry<StanceState> {
    let mut registry = FsmRegistry::new();

    // Nobody in guard yet.
    registry.register(StanceState::Idle, Box::new(IdleState));

    // Ready to move: footwork, attacks and parries.
    registry.register(StanceState::EnGarde, Box::new(EnGardeState));

    // Committed to an attack until it lands or goes stale.
    registry.register(StanceState::Lunging, Box::new(LungingState));

    // Coming back from the lunge.
    registry.register(StanceState::Recovery, Box::new(RecoveryState));

    registry
}

fn pose_lost() -> TransitionDecision<StanceState> {
    TransitionDecision::Transition {
        to: StanceState::Idle,
        reason: "Pose lost".into(),
        intents: vec![Intent::ResetAll, Intent::ClearHistory],
    }
}

fn stance_broken() -> TransitionDecision<StanceState> {
    TransitionDecision::Transition {
        to: StanceState::Idle,
        reason: "Stood up".into(),
        intents: vec![Intent::ResetAll],
    }
}

pub struct IdleState;

impl StateHandler<StanceState> for IdleState {
    /// Enough consecutive ready frames -> EnGarde
    fn on_event(
        &mut self,
        ctx: &mut StanceContext,
        event: &StanceEvent,
    ) -> TransitionDecision<StanceState> {
        match event {
            // Already idle; only the stale frames go.
            StanceEvent::PoseLost => {
                TransitionDecision::Stay(vec![Intent::ResetAll, Intent::ClearHistory])
            }
            StanceEvent::Pose(_) if ctx.stable() => TransitionDecision::Transition {
                to: StanceState::EnGarde,
                reason: "Stable en garde".into(),
                intents: vec![],
            },
            _ => TransitionDecision::Stay(vec![]),
        }
    }
}

pub struct EnGardeState;

impl StateHandler<StanceState> for EnGardeState {
    /// Any lunge-family report -> Lunging; a parry engages the blade; standing up -> Idle.
    /// Footwork and blade detectors are reset when the lunge starts.
    fn on_event(
        &mut self,
        ctx: &mut StanceContext,
        event: &StanceEvent,
    ) -> TransitionDecision<StanceState> {
        match event {
            StanceEvent::PoseLost => pose_lost(),
            StanceEvent::Pose(_) if ctx.broken() => stance_broken(),
            StanceEvent::Report { action, .. } if action.is_lunge_family() => {
                TransitionDecision::Transition {
                    to: StanceState::Lunging,
                    reason: format!("{} started", action),
                    intents: vec![
                        Intent::ResetFamily(DetectorFamily::Footwork),
                        Intent::ResetFamily(DetectorFamily::Blade),
                    ],
                }
            }
            StanceEvent::Report {
                action: SaberAction::Parry,
                completed: false,
                ..
            } => {
                ctx.blade_engaged_until = Some(ctx.now_ms.saturating_add(RIPOSTE_WINDOW_MS));
                TransitionDecision::Stay(vec![])
            }
            StanceEvent::Report {
                action: SaberAction::Riposte,
                completed: true,
                ..
            } => {
                ctx.blade_engaged_until = None;
                TransitionDecision::Stay(vec![])
            }
            _ => TransitionDecision::Stay(vec![]),
        }
    }
}

pub struct LungingState;

impl StateHandler<StanceState> for LungingState {
    /// Lunge completed or gone quiet -> Recovery
    fn on_event(
        &mut self,
        ctx: &mut StanceContext,
        event: &StanceEvent,
    ) -> TransitionDecision<StanceState> {
        match event {
            StanceEvent::PoseLost => pose_lost(),
            StanceEvent::Report {
                action, completed, ..
            } if action.is_lunge_family() => {
                if *completed {
                    TransitionDecision::Transition {
                        to: StanceState::Recovery,
                        reason: format!("{} finished", action),
                        intents: vec![Intent::ResetFamily(DetectorFamily::Attack)],
                    }
                } else {
                    ctx.last_lunge_report_ms = ctx.now_ms;
                    TransitionDecision::Stay(vec![])
                }
            }
            StanceEvent::Pose(sample)
                if sample.ts_ms.saturating_sub(ctx.last_lunge_report_ms) > LUNGING_STALE_MS =>
            {
                TransitionDecision::Transition {
                    to: StanceState::Recovery,
                    reason: "Lunge went quiet".into(),
                    intents: vec![Intent::ResetFamily(DetectorFamily::Attack)],
                }
            }
            _ => TransitionDecision::Stay(vec![]),
        }
    }
}

pub struct RecoveryState;

impl StateHandler<StanceState> for RecoveryState {
    /// Completed recovery or a settled guard -> EnGarde; standing up -> Idle
    fn on_event(
        &mut self,
        ctx: &mut StanceContext,
        event: &StanceEvent,
    ) -> TransitionDecision<StanceState> {
        match event {
            StanceEvent::PoseLost => pose_lost(),
            StanceEvent::Pose(_) if ctx.broken() => stance_broken(),
            StanceEvent::Pose(_) if ctx.stable() => TransitionDecision::Transition {
                to: StanceState::EnGarde,
                reason: "Settled back in guard".into(),
                intents: vec![Intent::ResetFamily(DetectorFamily::Recovery)],
            },
            StanceEvent::Report {
                action: SaberAction::Recovery,
                completed: true,
                ..
            } => TransitionDecision::Transition {
                to: StanceState::EnGarde,
                reason: "Recovered".into(),
                intents: vec![Intent::ResetFamily(DetectorFamily::Recovery)],
            },
            _ => TransitionDecision::Stay(vec![]),
        }
    }
}
