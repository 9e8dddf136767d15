//! Time-bounded blending between a start pose and a target pose

use crate::core::{Pose, DEFAULT_INTERPOLATION_DURATION_S, SLERP_EPSILON};

/// Drives an anchor's rendered pose toward its latest target.
///
/// Position is interpolated linearly, rotation spherically. Progress comes
/// from host-supplied elapsed time only, so a replayed sequence of ticks
/// yields identical poses.
#[derive(Debug, Clone)]
pub struct PoseInterpolator {
    /// Blend duration in seconds, always positive
    duration_s: f64,
    start: Pose,
    target: Pose,
    elapsed_s: f64,
    current: Pose,
}

impl PoseInterpolator {
    /// Start settled at `initial`
    pub fn new(initial: Pose, duration_s: f64) -> Self {
        let duration_s = if duration_s.is_finite() && duration_s > 0.0 {
            duration_s
        } else {
            DEFAULT_INTERPOLATION_DURATION_S
        };
        Self {
            duration_s,
            start: initial,
            target: initial,
            elapsed_s: duration_s,
            current: initial,
        }
    }

    /// Jump straight to `pose` with no blending
    pub fn snap(&mut self, pose: Pose) {
        self.start = pose;
        self.target = pose;
        self.current = pose;
        self.elapsed_s = self.duration_s;
    }

    /// Blend from wherever the pose is now toward `target`.
    ///
    /// Re-sending the current target keeps the blend in progress.
    pub fn retarget(&mut self, target: Pose) {
        if target == self.target {
            return;
        }
        self.start = self.current;
        self.target = target;
        self.elapsed_s = 0.0;
    }

    /// Advance by `delta_s` seconds and return the new pose
    pub fn advance(&mut self, delta_s: f64) -> Pose {
        if self.is_settled() {
            return self.current;
        }
        if delta_s.is_finite() && delta_s > 0.0 {
            self.elapsed_s = (self.elapsed_s + delta_s).min(self.duration_s);
        }
        self.current = self.sample(self.progress());
        self.current
    }

    /// Fraction of the blend completed, in `0.0..=1.0`
    pub fn progress(&self) -> f64 {
        (self.elapsed_s / self.duration_s).clamp(0.0, 1.0)
    }

    pub fn is_settled(&self) -> bool {
        self.elapsed_s >= self.duration_s
    }

    pub fn current(&self) -> Pose {
        self.current
    }

    pub fn start(&self) -> Pose {
        self.start
    }

    pub fn target(&self) -> Pose {
        self.target
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    fn sample(&self, t: f64) -> Pose {
        if t <= 0.0 {
            return self.start;
        }
        if t >= 1.0 || self.start == self.target {
            return self.target;
        }
        let position = self.start.position.lerp(&self.target.position, t);
        // `try_slerp` takes the short arc; `None` means the orientations
        // are already within epsilon of each other.
        let rotation = self
            .start
            .rotation
            .try_slerp(&self.target.rotation, t, SLERP_EPSILON)
            .unwrap_or(self.target.rotation);
        Pose::new(position, rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn test_new_interpolator_is_settled() {
        let pose = Pose::from_position(1.0, 2.0, 3.0);
        let mut interp = PoseInterpolator::new(pose, 1.0);
        assert!(interp.is_settled());
        assert_eq!(interp.advance(0.5), pose);
    }

    #[test]
    fn test_linear_position_blend() {
        let mut interp = PoseInterpolator::new(Pose::from_position(0.0, 0.0, 0.0), 1.0);
        interp.retarget(Pose::from_position(10.0, 0.0, 0.0));
        assert_eq!(interp.current(), Pose::from_position(0.0, 0.0, 0.0));

        let mid = interp.advance(0.25);
        assert_relative_eq!(mid.position, Vector3::new(2.5, 0.0, 0.0), epsilon = 1e-12);
        let later = interp.advance(0.25);
        assert_relative_eq!(later.position, Vector3::new(5.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_clamps_exactly_at_target() {
        let target = Pose::new(
            Vector3::new(1.0, -1.0, 0.5),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        );
        let mut interp = PoseInterpolator::new(Pose::identity(), 0.5);
        interp.retarget(target);
        assert_eq!(interp.advance(10.0), target);
        assert!(interp.is_settled());
        assert_relative_eq!(interp.progress(), 1.0);
    }

    #[test]
    fn test_spherical_rotation_blend() {
        let quarter_turn = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let mut interp = PoseInterpolator::new(Pose::identity(), 1.0);
        interp.retarget(Pose::new(Vector3::zeros(), quarter_turn));
        let mid = interp.advance(0.5);
        assert_relative_eq!(mid.rotation.angle(), std::f64::consts::FRAC_PI_4, epsilon = 1e-9);
    }

    #[test]
    fn test_retarget_mid_flight_starts_from_current() {
        let mut interp = PoseInterpolator::new(Pose::from_position(0.0, 0.0, 0.0), 1.0);
        interp.retarget(Pose::from_position(4.0, 0.0, 0.0));
        interp.advance(0.5);
        interp.retarget(Pose::from_position(0.0, 4.0, 0.0));
        assert_relative_eq!(interp.start().position, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
        let mid = interp.advance(0.5);
        assert_relative_eq!(mid.position, Vector3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_negative_delta_does_not_rewind() {
        let mut interp = PoseInterpolator::new(Pose::from_position(0.0, 0.0, 0.0), 1.0);
        interp.retarget(Pose::from_position(1.0, 0.0, 0.0));
        interp.advance(0.5);
        let held = interp.advance(-0.3);
        assert_relative_eq!(held.position.x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_same_target_keeps_pose_exact() {
        let pose = Pose::new(
            Vector3::new(0.1, 0.7, 1.3),
            UnitQuaternion::from_euler_angles(0.4, -0.2, 0.9),
        );
        let mut interp = PoseInterpolator::new(pose, 1.0);
        for _ in 0..5 {
            interp.retarget(pose);
            assert!(interp.is_settled());
            assert_eq!(interp.advance(0.1), pose);
        }
    }

    #[test]
    fn test_same_target_mid_flight_does_not_restart() {
        let mut interp = PoseInterpolator::new(Pose::from_position(0.0, 0.0, 0.0), 1.0);
        let target = Pose::from_position(4.0, 0.0, 0.0);
        interp.retarget(target);
        interp.advance(0.5);
        interp.retarget(target);
        assert_relative_eq!(interp.progress(), 0.5);
        assert_eq!(interp.advance(0.5), target);
    }

    #[test]
    fn test_nearly_identical_rotation_still_blends_position() {
        let start = Pose::identity();
        let target = Pose::new(Vector3::new(1.0, 0.0, 0.0), UnitQuaternion::from_euler_angles(0.0, 0.0, 1e-12));
        let mut interp = PoseInterpolator::new(start, 1.0);
        interp.retarget(target);
        let mid = interp.advance(0.5);
        assert_relative_eq!(mid.position.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(mid.rotation.angle(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_duration_uses_default() {
        let interp = PoseInterpolator::new(Pose::identity(), 0.0);
        assert_eq!(interp.duration_s(), DEFAULT_INTERPOLATION_DURATION_S);
    }
}
