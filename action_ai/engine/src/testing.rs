//! Synthetic poses for unit and scenario tests
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::frame::{landmark, Landmark, PoseFrame, LANDMARK_COUNT};
use crate::motion::body::BodyLayout;

const THIGH: f32 = 0.15;
const SHIN: f32 = 0.15;
const TORSO: f32 = 0.25;
const UPPER_ARM: f32 = 0.12;
const FOREARM: f32 = 0.12;

pub(crate) const FRAME_MS: u64 = 33;

/// Side-view fencer whose joint angles are set directly.
/// Shins are vertical; thighs are rotated so the knee angle is exact.
#[derive(Clone)]
pub(crate) struct PoseBuilder {
    hip_x: f32,
    hip_y: f32,
    lift: f32,
    lean: f32,
    front_knee: f32,
    rear_knee: f32,
    elbow: f32,
    arm_override: Option<((f32, f32), (f32, f32))>,
    rear_plant_x: Option<f32>,
    layout: BodyLayout,
}

impl PoseBuilder {
    /// Ready stance centred at `hip_x`: knees 100/130, sword arm bent at 110.
    pub(crate) fn new(hip_x: f32) -> Self {
        PoseBuilder {
            hip_x,
            hip_y: 0.5,
            lift: 0.0,
            lean: 0.0,
            front_knee: 100.0,
            rear_knee: 130.0,
            elbow: 110.0,
            arm_override: None,
            rear_plant_x: None,
            layout: BodyLayout::default(),
        }
    }

    pub(crate) fn at(&self, hip_x: f32) -> Self {
        let mut next = self.clone();
        next.hip_x = hip_x;
        next
    }

    pub(crate) fn layout(mut self, layout: BodyLayout) -> Self {
        self.layout = layout;
        self
    }

    pub(crate) fn front_knee(mut self, degrees: f32) -> Self {
        self.front_knee = degrees;
        self
    }

    pub(crate) fn rear_knee(mut self, degrees: f32) -> Self {
        self.rear_knee = degrees;
        self
    }

    pub(crate) fn elbow(mut self, degrees: f32) -> Self {
        self.elbow = degrees;
        self.arm_override = None;
        self
    }

    /// Whole body raised by `lift` (a jump).
    pub(crate) fn jump(mut self, lift: f32) -> Self {
        self.lift = lift;
        self
    }

    /// Shoulders shifted forward of the hips.
    pub(crate) fn lean(mut self, lean: f32) -> Self {
        self.lean = lean;
        self
    }

    /// Places the sword elbow and wrist at offsets from the sword shoulder.
    /// The x offsets are along the forward axis.
    pub(crate) fn arm_offsets(mut self, elbow: (f32, f32), wrist: (f32, f32)) -> Self {
        self.arm_override = Some((elbow, wrist));
        self
    }

    /// Pins the rear ankle at `x` whatever the hips do, as in a lunge. The rear
    /// thigh and shin stretch to keep the rear knee angle exact.
    pub(crate) fn plant_rear(mut self, x: f32) -> Self {
        self.rear_plant_x = Some(x);
        self
    }

    /// Where the rear ankle lands for this pose when it is not planted.
    pub(crate) fn rear_ankle_x(&self) -> f32 {
        let f = self.layout.forward;
        self.hip_x - f * 0.01 - f * THIGH * self.rear_knee.to_radians().sin()
    }

    pub(crate) fn build(&self, timestamp_ms: u64) -> PoseFrame {
        let f = self.layout.forward;
        let lead = self.layout.lead;
        let rear = self.layout.rear();
        let y0 = self.hip_y - self.lift;
        let mut points = vec![Landmark::default(); LANDMARK_COUNT];

        let lead_hip = Landmark::new(self.hip_x + f * 0.01, y0);
        let rear_hip = Landmark::new(self.hip_x - f * 0.01, y0);

        let (sf, cf) = (self.front_knee.to_radians().sin(), self.front_knee.to_radians().cos());
        let front_knee = Landmark::new(lead_hip.x + f * THIGH * sf, y0 - THIGH * cf);
        let front_ankle = Landmark::new(front_knee.x, front_knee.y + SHIN);

        let (sr, cr) = (self.rear_knee.to_radians().sin(), self.rear_knee.to_radians().cos());
        let mut rear_knee = Landmark::new(rear_hip.x - f * THIGH * sr, y0 - THIGH * cr);
        let mut rear_ankle = Landmark::new(rear_knee.x, rear_knee.y + SHIN);
        if let Some(x) = self.rear_plant_x {
            rear_ankle.x = x;
            rear_knee = bent_knee(rear_hip, rear_ankle, self.rear_knee, f);
        }

        let shoulder_mid = Landmark::new(self.hip_x + f * self.lean, y0 - TORSO);
        let lead_shoulder = Landmark::new(shoulder_mid.x + f * 0.01, shoulder_mid.y);
        let rear_shoulder = Landmark::new(shoulder_mid.x - f * 0.01, shoulder_mid.y);

        let (elbow, wrist) = match self.arm_override {
            Some(((ex, ey), (wx, wy))) => (
                Landmark::new(lead_shoulder.x + f * ex, lead_shoulder.y + ey),
                Landmark::new(lead_shoulder.x + f * wx, lead_shoulder.y + wy),
            ),
            None => {
                let elbow = Landmark::new(lead_shoulder.x + f * UPPER_ARM, lead_shoulder.y);
                let (sa, ca) = (self.elbow.to_radians().sin(), self.elbow.to_radians().cos());
                let wrist = Landmark::new(elbow.x - f * FOREARM * ca, elbow.y + FOREARM * sa);
                (elbow, wrist)
            }
        };
        let off_elbow = Landmark::new(rear_shoulder.x - f * 0.05, rear_shoulder.y + 0.1);
        let off_wrist = Landmark::new(off_elbow.x - f * 0.05, off_elbow.y - 0.05);

        let nose = Landmark::new(shoulder_mid.x + f * 0.03, shoulder_mid.y - 0.1);
        points[landmark::NOSE] = nose;
        for index in [
            landmark::LEFT_EYE_INNER,
            landmark::LEFT_EYE,
            landmark::LEFT_EYE_OUTER,
            landmark::RIGHT_EYE_INNER,
            landmark::RIGHT_EYE,
            landmark::RIGHT_EYE_OUTER,
        ] {
            points[index] = Landmark::new(nose.x - f * 0.01, nose.y - 0.01);
        }
        points[landmark::LEFT_EAR] = Landmark::new(nose.x - f * 0.03, nose.y);
        points[landmark::RIGHT_EAR] = Landmark::new(nose.x - f * 0.03, nose.y);
        points[landmark::MOUTH_LEFT] = Landmark::new(nose.x, nose.y + 0.02);
        points[landmark::MOUTH_RIGHT] = Landmark::new(nose.x, nose.y + 0.02);

        points[lead.shoulder()] = lead_shoulder;
        points[rear.shoulder()] = rear_shoulder;
        points[lead.elbow()] = elbow;
        points[rear.elbow()] = off_elbow;
        points[lead.wrist()] = wrist;
        points[rear.wrist()] = off_wrist;
        for (left, right) in [
            (landmark::LEFT_PINKY, landmark::RIGHT_PINKY),
            (landmark::LEFT_INDEX, landmark::RIGHT_INDEX),
            (landmark::LEFT_THUMB, landmark::RIGHT_THUMB),
        ] {
            let (lead_finger, rear_finger) = match lead {
                crate::motion::body::Side::Left => (left, right),
                crate::motion::body::Side::Right => (right, left),
            };
            points[lead_finger] = Landmark::new(wrist.x + f * 0.02, wrist.y);
            points[rear_finger] = Landmark::new(off_wrist.x - f * 0.02, off_wrist.y);
        }

        points[lead.hip()] = lead_hip;
        points[rear.hip()] = rear_hip;
        points[lead.knee()] = front_knee;
        points[rear.knee()] = rear_knee;
        points[lead.ankle()] = front_ankle;
        points[rear.ankle()] = rear_ankle;
        let (lead_heel, rear_heel, lead_toe, rear_toe) = match lead {
            crate::motion::body::Side::Left => (
                landmark::LEFT_HEEL,
                landmark::RIGHT_HEEL,
                landmark::LEFT_FOOT_INDEX,
                landmark::RIGHT_FOOT_INDEX,
            ),
            crate::motion::body::Side::Right => (
                landmark::RIGHT_HEEL,
                landmark::LEFT_HEEL,
                landmark::RIGHT_FOOT_INDEX,
                landmark::LEFT_FOOT_INDEX,
            ),
        };
        points[lead_heel] = Landmark::new(front_ankle.x - f * 0.02, front_ankle.y);
        points[rear_heel] = Landmark::new(rear_ankle.x - f * 0.02, rear_ankle.y);
        points[lead_toe] = Landmark::new(front_ankle.x + f * 0.04, front_ankle.y + 0.01);
        points[rear_toe] = Landmark::new(rear_ankle.x + f * 0.04, rear_ankle.y + 0.01);

        PoseFrame::new(points, timestamp_ms)
    }
}

/// Knee equidistant from `hip` and `ankle`, bent to `degrees` toward the back.
fn bent_knee(hip: Landmark, ankle: Landmark, degrees: f32, f: f32) -> Landmark {
    let (dx, dy) = (ankle.x - hip.x, ankle.y - hip.y);
    let d = (dx * dx + dy * dy).sqrt();
    let (ux, uy) = (dx / d, dy / d);
    let offset = (d / 2.0) / (degrees / 2.0).to_radians().tan();
    Landmark::new(
        (hip.x + ankle.x) / 2.0 - f * offset * uy,
        (hip.y + ankle.y) / 2.0 + f * offset * ux,
    )
}

/// Frames at consecutive 33ms ticks, one per hip position, starting at `start_ms`.
pub(crate) fn track(builder: &PoseBuilder, hip_xs: &[f32], start_ms: u64) -> Vec<PoseFrame> {
    hip_xs
        .iter()
        .enumerate()
        .map(|(i, x)| builder.at(*x).build(start_ms + i as u64 * FRAME_MS))
        .collect()
}

/// `count` hip positions starting at `from`, moving `step` per frame.
pub(crate) fn ramp(from: f32, step: f32, count: usize) -> Vec<f32> {
    (0..count).map(|i| from + step * i as f32).collect()
}

pub(crate) fn short_frame(timestamp_ms: u64) -> PoseFrame {
    PoseFrame::new(vec![Landmark::new(0.5, 0.5); 10], timestamp_ms)
}
