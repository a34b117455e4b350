//! Shared grading and coaching feedback for completed actions
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::detect::action::ActionQuality;
use crate::motion::geometry::Band;

/// One form criterion evaluated on a completed action.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FormCheck {
    pub(crate) passed: bool,
    /// The angle/form criterion of the action. Exactly one per action.
    pub(crate) primary: bool,
    /// Advisory checks only contribute feedback, never the grade.
    pub(crate) graded: bool,
    pub(crate) hint: Option<&'static str>,
    /// Normalized distance outside the acceptable range; 0 when passed.
    pub(crate) deviation: f32,
}

impl FormCheck {
    /// Band check with a different hint for each side of the band.
    pub(crate) fn band(
        value: f32,
        band: Band,
        below_hint: &'static str,
        above_hint: &'static str,
    ) -> Self {
        let passed = band.contains(value);
        let hint = if passed {
            None
        } else if band.is_below(value) {
            Some(below_hint)
        } else {
            Some(above_hint)
        };
        FormCheck {
            passed,
            primary: false,
            graded: true,
            hint,
            deviation: band.deviation(value),
        }
    }

    pub(crate) fn within(value: f32, band: Band, hint: Option<&'static str>) -> Self {
        FormCheck {
            passed: band.contains(value),
            primary: false,
            graded: true,
            hint,
            deviation: band.deviation(value),
        }
    }

    /// Pass/fail rule without a measurable distance.
    pub(crate) fn rule(passed: bool, hint: Option<&'static str>) -> Self {
        FormCheck {
            passed,
            primary: false,
            graded: true,
            hint,
            deviation: if passed { 0.0 } else { 1.0 },
        }
    }

    pub(crate) fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub(crate) fn advisory(mut self) -> Self {
        self.graded = false;
        self
    }
}

/// All graded checks pass: Perfect. Primary plus at least one other: Good.
/// Any single pass: Acceptable. Otherwise Poor.
pub(crate) fn grade(checks: &[FormCheck]) -> ActionQuality {
    let graded: Vec<&FormCheck> = checks.iter().filter(|c| c.graded).collect();
    let passes = graded.iter().filter(|c| c.passed).count();
    let primary_passed = graded.iter().any(|c| c.primary && c.passed);

    if passes == graded.len() {
        ActionQuality::Perfect
    } else if primary_passed && passes >= 2 {
        ActionQuality::Good
    } else if passes >= 1 {
        ActionQuality::Acceptable
    } else {
        ActionQuality::Poor
    }
}

/// Hint of the failed check that is furthest off. At most one phrase.
pub(crate) fn pick_feedback(checks: &[FormCheck]) -> Option<String> {
    checks
        .iter()
        .filter(|c| !c.passed)
        .filter_map(|c| c.hint.map(|hint| (hint, c.deviation)))
        .fold(None, |best: Option<(&str, f32)>, (hint, deviation)| match best {
            Some((_, d)) if d >= deviation => best,
            _ => Some((hint, deviation)),
        })
        .map(|(hint, _)| hint.to_string())
}
