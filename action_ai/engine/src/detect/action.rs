//! Action vocabulary and per-frame detection results
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every action the engine can name.
#[derive(Hash, Eq, PartialEq, Clone, Debug, Copy, Serialize, Deserialize)]
pub enum SaberAction {
    EnGarde,
    Advance,
    Retreat,
    AdvanceLunge,
    Lunge,
    Lunging,
    Flunge,
    BalestraLunge,
    Parry,
    Riposte,
    Recovery,
}

impl SaberAction {
    pub const ALL: [SaberAction; 11] = [
        SaberAction::EnGarde,
        SaberAction::Advance,
        SaberAction::Retreat,
        SaberAction::AdvanceLunge,
        SaberAction::Lunge,
        SaberAction::Lunging,
        SaberAction::Flunge,
        SaberAction::BalestraLunge,
        SaberAction::Parry,
        SaberAction::Riposte,
        SaberAction::Recovery,
    ];

    /// Canonical label shown on screen (French fencing terminology).
    pub fn label(&self) -> &'static str {
        match self {
            SaberAction::EnGarde => "En garde",
            SaberAction::Advance => "Marche",
            SaberAction::Retreat => "Retraite",
            SaberAction::AdvanceLunge => "Marche-fente",
            SaberAction::Lunge => "Fente",
            SaberAction::Lunging => "En fente",
            SaberAction::Flunge => "Flunge",
            SaberAction::BalestraLunge => "Balestra-fente",
            SaberAction::Parry => "Parade",
            SaberAction::Riposte => "Riposte",
            SaberAction::Recovery => "Retour en garde",
        }
    }

    /// English label handed to the speech renderer.
    pub fn speech_label(&self) -> &'static str {
        match self {
            SaberAction::EnGarde => "En garde",
            SaberAction::Advance => "Advance",
            SaberAction::Retreat => "Retreat",
            SaberAction::AdvanceLunge => "Advance lunge",
            SaberAction::Lunge => "Lunge",
            SaberAction::Lunging => "Lunging",
            SaberAction::Flunge => "Flunge",
            SaberAction::BalestraLunge => "Balestra lunge",
            SaberAction::Parry => "Parry",
            SaberAction::Riposte => "Riposte",
            SaberAction::Recovery => "Recovery",
        }
    }

    /// Attacks that carry the fencer into a lunge.
    pub fn is_lunge_family(&self) -> bool {
        matches!(
            self,
            SaberAction::Lunge
                | SaberAction::Lunging
                | SaberAction::AdvanceLunge
                | SaberAction::BalestraLunge
                | SaberAction::Flunge
        )
    }

    /// Conflict-resolution rank; lower wins. Combos outrank their parts.
    pub fn priority(&self) -> u8 {
        match self {
            SaberAction::AdvanceLunge => 0,
            SaberAction::BalestraLunge => 1,
            SaberAction::Flunge => 2,
            SaberAction::Riposte | SaberAction::Parry => 3,
            SaberAction::Lunge | SaberAction::Lunging => 4,
            SaberAction::Recovery => 5,
            SaberAction::Advance => 6,
            SaberAction::Retreat => 7,
            SaberAction::EnGarde => 8,
        }
    }
}

impl fmt::Display for SaberAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.speech_label())
    }
}

/// Grade of a completed action. Ordered Poor < Acceptable < Good < Perfect.
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug, Copy, Serialize, Deserialize)]
pub enum ActionQuality {
    Poor,
    Acceptable,
    Good,
    Perfect,
}

impl ActionQuality {
    pub fn rank(&self) -> u8 {
        match self {
            ActionQuality::Poor => 0,
            ActionQuality::Acceptable => 1,
            ActionQuality::Good => 2,
            ActionQuality::Perfect => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionQuality::Poor => "Poor",
            ActionQuality::Acceptable => "Acceptable",
            ActionQuality::Good => "Good",
            ActionQuality::Perfect => "Perfect",
        }
    }
}

/// Outcome of one detector (or the manager) for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionResult {
    None,
    InProgress {
        action: SaberAction,
        confidence: f32,
        feedback: Option<String>,
    },
    Completed {
        action: SaberAction,
        quality: ActionQuality,
        feedback: Option<String>,
        duration_ms: u64,
    },
}

impl ActionResult {
    pub(crate) fn in_progress(action: SaberAction, confidence: f32) -> Self {
        ActionResult::InProgress {
            action,
            confidence: confidence.clamp(0.0, 1.0),
            feedback: None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ActionResult::None)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ActionResult::Completed { .. })
    }

    pub fn action(&self) -> Option<SaberAction> {
        match self {
            ActionResult::None => None,
            ActionResult::InProgress { action, .. } | ActionResult::Completed { action, .. } => {
                Some(*action)
            }
        }
    }

    pub fn feedback(&self) -> Option<&str> {
        match self {
            ActionResult::None => None,
            ActionResult::InProgress { feedback, .. }
            | ActionResult::Completed { feedback, .. } => feedback.as_deref(),
        }
    }

    /// Span a recorder should keep for a completed action ending at `end_ms`.
    pub fn clip_window(&self, end_ms: u64, prebuffer_ms: u64) -> Option<ClipWindow> {
        match self {
            ActionResult::Completed { duration_ms, .. } => Some(ClipWindow {
                start_ms: end_ms
                    .saturating_sub(*duration_ms)
                    .saturating_sub(prebuffer_ms),
                end_ms,
            }),
            _ => None,
        }
    }
}

/// Time span, in frame timestamps, covering a completed action plus lead-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}
