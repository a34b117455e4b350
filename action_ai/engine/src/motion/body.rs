//! Fencer-relative view of a pose frame
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{EngineConfig, Facing, Handedness};
use crate::frame::{landmark, Landmark, PoseFrame};
use crate::motion::geometry::{angle_between_points, midpoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    fn pick(self, left: usize, right: usize) -> usize {
        match self {
            Side::Left => left,
            Side::Right => right,
        }
    }

    pub fn shoulder(self) -> usize {
        self.pick(landmark::LEFT_SHOULDER, landmark::RIGHT_SHOULDER)
    }
    pub fn elbow(self) -> usize {
        self.pick(landmark::LEFT_ELBOW, landmark::RIGHT_ELBOW)
    }
    pub fn wrist(self) -> usize {
        self.pick(landmark::LEFT_WRIST, landmark::RIGHT_WRIST)
    }
    pub fn hip(self) -> usize {
        self.pick(landmark::LEFT_HIP, landmark::RIGHT_HIP)
    }
    pub fn knee(self) -> usize {
        self.pick(landmark::LEFT_KNEE, landmark::RIGHT_KNEE)
    }
    pub fn ankle(self) -> usize {
        self.pick(landmark::LEFT_ANKLE, landmark::RIGHT_ANKLE)
    }
}

/// Which limbs lead and which image direction counts as forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyLayout {
    /// Side of the sword arm and front leg.
    pub lead: Side,
    /// +1.0 when the fencer faces increasing x, -1.0 otherwise.
    pub forward: f32,
}

impl BodyLayout {
    pub fn new(handedness: Handedness, facing: Facing) -> Self {
        BodyLayout {
            lead: match handedness {
                Handedness::Right => Side::Right,
                Handedness::Left => Side::Left,
            },
            forward: match facing {
                Facing::Right => 1.0,
                Facing::Left => -1.0,
            },
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.handedness, config.facing)
    }

    pub fn rear(&self) -> Side {
        self.lead.opposite()
    }

    /// Projects a horizontal displacement onto the fencer's forward axis.
    pub fn forward(&self, dx: f32) -> f32 {
        dx * self.forward
    }
}

impl Default for BodyLayout {
    fn default() -> Self {
        BodyLayout::new(Handedness::Right, Facing::Right)
    }
}

/// Read-only skeleton accessors over a complete frame.
#[derive(Clone, Copy)]
pub struct Skeleton<'a> {
    frame: &'a PoseFrame,
    layout: BodyLayout,
}

impl<'a> Skeleton<'a> {
    pub fn new(frame: &'a PoseFrame, layout: BodyLayout) -> Self {
        Skeleton { frame, layout }
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.frame.timestamp_ms()
    }

    pub fn layout(&self) -> BodyLayout {
        self.layout
    }

    pub fn hip_mid(&self) -> Landmark {
        midpoint(
            self.frame.point(landmark::LEFT_HIP),
            self.frame.point(landmark::RIGHT_HIP),
        )
    }

    pub fn shoulder_mid(&self) -> Landmark {
        midpoint(
            self.frame.point(landmark::LEFT_SHOULDER),
            self.frame.point(landmark::RIGHT_SHOULDER),
        )
    }

    pub fn nose(&self) -> Landmark {
        self.frame.point(landmark::NOSE)
    }

    fn knee_angle(&self, side: Side) -> f32 {
        angle_between_points(
            self.frame.point(side.hip()),
            self.frame.point(side.knee()),
            self.frame.point(side.ankle()),
        )
    }

    pub fn front_knee_angle(&self) -> f32 {
        self.knee_angle(self.layout.lead)
    }

    pub fn rear_knee_angle(&self) -> f32 {
        self.knee_angle(self.layout.rear())
    }

    pub fn weapon_elbow_angle(&self) -> f32 {
        let side = self.layout.lead;
        angle_between_points(
            self.frame.point(side.shoulder()),
            self.frame.point(side.elbow()),
            self.frame.point(side.wrist()),
        )
    }

    pub fn weapon_shoulder(&self) -> Landmark {
        self.frame.point(self.layout.lead.shoulder())
    }

    pub fn off_shoulder(&self) -> Landmark {
        self.frame.point(self.layout.rear().shoulder())
    }

    pub fn weapon_wrist(&self) -> Landmark {
        self.frame.point(self.layout.lead.wrist())
    }

    pub fn front_ankle(&self) -> Landmark {
        self.frame.point(self.layout.lead.ankle())
    }

    pub fn rear_ankle(&self) -> Landmark {
        self.frame.point(self.layout.rear().ankle())
    }

    pub fn stance_width(&self) -> f32 {
        (self.front_ankle().x - self.rear_ankle().x).abs()
    }

    /// Shoulders ahead of hips along the forward axis.
    pub fn torso_lean(&self) -> f32 {
        self.layout.forward(self.shoulder_mid().x - self.hip_mid().x)
    }

    /// Rear ankle forward of the front ankle: the feet have crossed.
    pub fn feet_crossed(&self) -> bool {
        self.layout.forward(self.rear_ankle().x - self.front_ankle().x) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PoseBuilder;

    #[test]
    fn reads_lead_side_angles() {
        let frame = PoseBuilder::new(0.5)
            .front_knee(100.0)
            .rear_knee(130.0)
            .elbow(120.0)
            .build(0);
        let skeleton = Skeleton::new(&frame, BodyLayout::default());
        assert!((skeleton.front_knee_angle() - 100.0).abs() < 0.1);
        assert!((skeleton.rear_knee_angle() - 130.0).abs() < 0.1);
        assert!((skeleton.weapon_elbow_angle() - 120.0).abs() < 0.1);
        assert!(skeleton.stance_width() > 0.2);
        assert!(!skeleton.feet_crossed());
    }

    #[test]
    fn left_handed_layout_swaps_limbs() {
        let frame = PoseBuilder::new(0.5)
            .layout(BodyLayout::new(Handedness::Left, Facing::Left))
            .front_knee(95.0)
            .rear_knee(140.0)
            .build(0);
        let skeleton = Skeleton::new(&frame, BodyLayout::new(Handedness::Left, Facing::Left));
        assert!((skeleton.front_knee_angle() - 95.0).abs() < 0.1);
        assert!(skeleton.front_ankle().x < skeleton.hip_mid().x);
    }

    #[test]
    fn planted_rear_foot_keeps_its_knee_angle() {
        for layout in [
            BodyLayout::default(),
            BodyLayout::new(Handedness::Left, Facing::Left),
        ] {
            let start = PoseBuilder::new(0.5).layout(layout);
            let rear = start.rear_ankle_x();
            let frame = start.at(0.6).rear_knee(170.0).plant_rear(rear).build(0);
            let skeleton = Skeleton::new(&frame, layout);
            assert!((skeleton.rear_ankle().x - rear).abs() < 1e-6);
            assert!((skeleton.rear_knee_angle() - 170.0).abs() < 0.1);
            let free = start.at(0.6).build(0);
            assert!(skeleton.stance_width() > Skeleton::new(&free, layout).stance_width());
        }
    }

    #[test]
    fn forward_projection_follows_facing() {
        let right = BodyLayout::new(Handedness::Right, Facing::Right);
        let left = BodyLayout::new(Handedness::Right, Facing::Left);
        assert_eq!(right.forward(0.1), 0.1);
        assert_eq!(left.forward(0.1), -0.1);
        assert_eq!(right.rear(), Side::Left);
    }
}
