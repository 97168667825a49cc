//! Alignment constraints: matching axes, rotations and translations, and
//! translation limits.

use glam::Vec3;

use super::rod::anchor_to_anchor;
use super::{Context, PairSolution};
use crate::{Body, BodyHandle, Jacobian, PairJacobian};

/// Keeps a local axis of one body parallel to a local axis of another.
///
/// Axes pointing in opposite directions also count as matched.
#[derive(Clone, Debug)]
pub struct MatchAxisConstraint {
    /// First body.
    pub first_body: BodyHandle,
    /// Axis in the first body's local space.
    pub first_body_axis: Vec3,
    /// Second body.
    pub second_body: BodyHandle,
    /// Axis in the second body's local space.
    pub second_body_axis: Vec3,
}

impl MatchAxisConstraint {
    /// Create an axis constraint (axes should be unit vectors).
    pub fn new(
        first_body: BodyHandle,
        first_body_axis: Vec3,
        second_body: BodyHandle,
        second_body_axis: Vec3,
    ) -> Self {
        Self {
            first_body,
            first_body_axis,
            second_body,
            second_body_axis,
        }
    }

    /// Evaluate the constraint. The drift is the sine of the angle between
    /// the world-space axes.
    pub fn calculate(&self, ctx: &Context, first: &Body, second: &Body) -> PairSolution {
        let first_axis = first.orientation * self.first_body_axis;
        let second_axis = second.orientation * self.second_body_axis;
        let cross = first_axis.cross(second_axis);
        let normal = ctx.normal_or_x(cross);
        PairSolution {
            jacobian: PairJacobian::new(
                Jacobian::new(Vec3::ZERO, -normal),
                Jacobian::new(Vec3::ZERO, normal),
            ),
            drift: cross.length(),
        }
    }

    /// Remove relative rotation that separates the axes.
    pub fn apply_impulse(&self, ctx: &Context, first: &mut Body, second: &mut Body) {
        let solution = self.calculate(ctx, first, second);
        if solution.drift.abs() > ctx.epsilon {
            solution.jacobian.correct_velocity(first, second);
        }
    }

    /// Rotate the axes back together.
    pub fn apply_nudge(&self, ctx: &Context, first: &mut Body, second: &mut Body) {
        let solution = self.calculate(ctx, first, second);
        if solution.drift.abs() > ctx.epsilon {
            solution
                .jacobian
                .correct_position(first, second, solution.drift, ctx.bias_factor);
        }
    }
}

/// Keeps two bodies at the same orientation.
///
/// Solved as two independent axis matches on the local Y and Z axes.
#[derive(Clone, Debug)]
pub struct MatchRotationConstraint {
    /// First body.
    pub first_body: BodyHandle,
    /// Second body.
    pub second_body: BodyHandle,
}

impl MatchRotationConstraint {
    /// Create a rotation constraint.
    pub fn new(first_body: BodyHandle, second_body: BodyHandle) -> Self {
        Self {
            first_body,
            second_body,
        }
    }

    fn axes(&self) -> [MatchAxisConstraint; 2] {
        [
            MatchAxisConstraint::new(self.first_body, Vec3::Y, self.second_body, Vec3::Y),
            MatchAxisConstraint::new(self.first_body, Vec3::Z, self.second_body, Vec3::Z),
        ]
    }

    /// Remove relative rotation on both axes.
    pub fn apply_impulse(&self, ctx: &Context, first: &mut Body, second: &mut Body) {
        for axis in self.axes() {
            axis.apply_impulse(ctx, first, second);
        }
    }

    /// Rotate both axes back together.
    pub fn apply_nudge(&self, ctx: &Context, first: &mut Body, second: &mut Body) {
        for axis in self.axes() {
            axis.apply_nudge(ctx, first, second);
        }
    }
}

/// Makes two body anchors coincide, optionally ignoring offsets along some of
/// the first body's local axes.
#[derive(Clone, Debug)]
pub struct MatchTranslationConstraint {
    /// First body.
    pub first_body: BodyHandle,
    /// Anchor in the first body's local space.
    pub first_body_anchor: Vec3,
    /// Second body.
    pub second_body: BodyHandle,
    /// Anchor in the second body's local space.
    pub second_body_anchor: Vec3,
    /// Allow free movement along the first body's local X axis.
    pub ignore_x: bool,
    /// Allow free movement along the first body's local Y axis.
    pub ignore_y: bool,
    /// Allow free movement along the first body's local Z axis.
    pub ignore_z: bool,
}

impl MatchTranslationConstraint {
    /// Match the two centers of mass on all axes.
    pub fn new(first_body: BodyHandle, second_body: BodyHandle) -> Self {
        Self {
            first_body,
            first_body_anchor: Vec3::ZERO,
            second_body,
            second_body_anchor: Vec3::ZERO,
            ignore_x: false,
            ignore_y: false,
            ignore_z: false,
        }
    }

    /// Set the anchors in body-local space.
    pub fn with_anchors(mut self, first_body_anchor: Vec3, second_body_anchor: Vec3) -> Self {
        self.first_body_anchor = first_body_anchor;
        self.second_body_anchor = second_body_anchor;
        self
    }

    /// Choose which of the first body's local axes are left free.
    pub fn ignoring(mut self, x: bool, y: bool, z: bool) -> Self {
        self.ignore_x = x;
        self.ignore_y = y;
        self.ignore_z = z;
        self
    }

    /// Evaluate the constraint.
    pub fn calculate(&self, ctx: &Context, first: &Body, second: &Body) -> PairSolution {
        let ignored = [
            (self.ignore_x, Vec3::X),
            (self.ignore_y, Vec3::Y),
            (self.ignore_z, Vec3::Z),
        ];
        let orientation = first.orientation;
        anchor_to_anchor(
            ctx,
            first,
            self.first_body_anchor,
            second,
            self.second_body_anchor,
            |mut delta| {
                for (ignore, local_axis) in ignored {
                    if ignore {
                        let axis = orientation * local_axis;
                        delta -= axis * delta.dot(axis);
                    }
                }
                delta
            },
        )
    }

    /// Remove relative velocity between the anchors.
    pub fn apply_impulse(&self, ctx: &Context, first: &mut Body, second: &mut Body) {
        let solution = self.calculate(ctx, first, second);
        if solution.drift.abs() > ctx.epsilon {
            solution.jacobian.correct_velocity(first, second);
        }
    }

    /// Move the anchors back together.
    pub fn apply_nudge(&self, ctx: &Context, first: &mut Body, second: &mut Body) {
        let solution = self.calculate(ctx, first, second);
        if solution.drift.abs() > ctx.epsilon {
            solution
                .jacobian
                .correct_position(first, second, solution.drift, ctx.bias_factor);
        }
    }
}

/// Keeps the second body within `[min_y, max_y]` along the first body's local
/// Y axis.
///
/// Unlike the other constraints this one is one-sided: it only resists motion
/// that pushes further outside the range.
#[derive(Clone, Debug)]
pub struct LimitTranslationConstraint {
    /// Reference body.
    pub first_body: BodyHandle,
    /// Limited body.
    pub second_body: BodyHandle,
    /// Lower bound of the offset along the first body's Y axis.
    pub min_y: f32,
    /// Upper bound of the offset along the first body's Y axis.
    pub max_y: f32,
}

impl LimitTranslationConstraint {
    /// Create a translation limit.
    pub fn new(first_body: BodyHandle, second_body: BodyHandle, min_y: f32, max_y: f32) -> Self {
        Self {
            first_body,
            second_body,
            min_y,
            max_y,
        }
    }

    /// Evaluate the constraint. The drift is the signed offset along the
    /// first body's Y axis, not yet compared against the limits.
    pub fn calculate(&self, first: &Body, second: &Body) -> PairSolution {
        let normal = first.orientation * Vec3::Y;
        let delta = second.position - first.position;
        PairSolution {
            jacobian: PairJacobian::new(
                Jacobian::new(-normal, normal.cross(delta)),
                Jacobian::new(normal, Vec3::ZERO),
            ),
            drift: delta.dot(normal),
        }
    }

    /// Amount by which the range is violated, zero when inside.
    pub fn violation(&self, offset: f32) -> f32 {
        if offset > self.max_y {
            offset - self.max_y
        } else if offset < self.min_y {
            offset - self.min_y
        } else {
            0.0
        }
    }

    /// Stop motion that leaves the range.
    pub fn apply_impulse(&self, _ctx: &Context, first: &mut Body, second: &mut Body) {
        let solution = self.calculate(first, second);
        let velocity = solution.jacobian.effective_velocity(first, second);
        let violation = self.violation(solution.drift);
        let leaving = (violation > 0.0 && velocity > 0.0) || (violation < 0.0 && velocity < 0.0);
        if leaving {
            solution.jacobian.correct_velocity(first, second);
        }
    }

    /// Move the body back inside the range.
    pub fn apply_nudge(&self, ctx: &Context, first: &mut Body, second: &mut Body) {
        let solution = self.calculate(first, second);
        let violation = self.violation(solution.drift);
        if violation.abs() > ctx.epsilon {
            solution
                .jacobian
                .correct_position(first, second, violation, ctx.bias_factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use glam::{Mat3, Quat};

    use super::*;
    use crate::constraint::test_context;
    use crate::BodySet;

    fn body(position: Vec3) -> Body {
        Body::new(position, 1.0, Mat3::IDENTITY)
    }

    fn handles() -> (BodyHandle, BodyHandle) {
        let mut set = BodySet::new();
        let a = set.insert(body(Vec3::ZERO));
        let b = set.insert(body(Vec3::ZERO));
        (a, b)
    }

    #[test]
    fn test_match_axis_parallel_has_no_drift() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let constraint = MatchAxisConstraint::new(ha, Vec3::Y, hb, Vec3::Y);
        let a = body(Vec3::ZERO);
        let b = body(Vec3::X);

        assert!(constraint.calculate(&ctx, &a, &b).drift < 1e-6);
    }

    #[test]
    fn test_match_axis_opposite_counts_as_matched() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let constraint = MatchAxisConstraint::new(ha, Vec3::Y, hb, -Vec3::Y);
        let a = body(Vec3::ZERO);
        let b = body(Vec3::ZERO);

        assert!(constraint.calculate(&ctx, &a, &b).drift < 1e-6);
    }

    #[test]
    fn test_match_axis_stops_relative_spin() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let constraint = MatchAxisConstraint::new(ha, Vec3::Y, hb, Vec3::Y);
        let mut a = body(Vec3::ZERO);
        let mut b = body(Vec3::ZERO)
            .with_orientation(Quat::from_rotation_z(0.3))
            .with_angular_velocity(Vec3::Z);

        constraint.apply_impulse(&ctx, &mut a, &mut b);

        let relative = b.angular_velocity - a.angular_velocity;
        assert!(relative.z.abs() < 1e-5, "relative = {:?}", relative);
    }

    #[test]
    fn test_match_axis_nudge_reduces_angle() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let constraint = MatchAxisConstraint::new(ha, Vec3::Y, hb, Vec3::Y);
        let mut a = body(Vec3::ZERO);
        let mut b = body(Vec3::ZERO).with_orientation(Quat::from_rotation_z(0.3));

        let before = constraint.calculate(&ctx, &a, &b).drift;
        for _ in 0..100 {
            constraint.apply_nudge(&ctx, &mut a, &mut b);
        }
        let after = constraint.calculate(&ctx, &a, &b).drift;

        assert!(after < before * 0.5, "before = {}, after = {}", before, after);
    }

    #[test]
    fn test_match_rotation_aligns_both_axes() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let constraint = MatchRotationConstraint::new(ha, hb);
        let mut a = body(Vec3::ZERO);
        let mut b = body(Vec3::ZERO).with_orientation(Quat::from_rotation_x(0.4));

        for _ in 0..1000 {
            constraint.apply_nudge(&ctx, &mut a, &mut b);
        }

        let angle = a.orientation.angle_between(b.orientation);
        assert!(angle < 0.01, "angle = {}", angle);
    }

    #[test]
    fn test_match_translation_ignores_axis() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let slider = MatchTranslationConstraint::new(ha, hb).ignoring(true, false, false);
        let a = body(Vec3::ZERO);
        let b = body(Vec3::new(5.0, 0.5, 0.0));

        let solution = slider.calculate(&ctx, &a, &b);
        assert!((solution.drift - 0.5).abs() < 1e-5);
        assert!((solution.jacobian.second.slope_velocity - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_match_translation_keeps_free_axis_velocity() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let slider = MatchTranslationConstraint::new(ha, hb).ignoring(true, false, false);
        let mut a = body(Vec3::ZERO);
        let mut b = body(Vec3::new(5.0, 0.5, 0.0)).with_velocity(Vec3::new(2.0, 1.0, 0.0));

        slider.apply_impulse(&ctx, &mut a, &mut b);

        assert!((b.velocity.x - 2.0).abs() < 1e-5);
        assert!((b.velocity.y - a.velocity.y).abs() < 1e-5);
    }

    #[test]
    fn test_match_translation_ignores_first_body_local_axis() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let slider = MatchTranslationConstraint::new(ha, hb).ignoring(true, false, false);
        // Local X of the rail points along world Y
        let mut rail =
            Body::new_static(Vec3::ZERO).with_orientation(Quat::from_rotation_z(FRAC_PI_2));

        let mut b = body(Vec3::Y * 3.0).with_velocity(Vec3::Y * 2.0);
        assert!(slider.calculate(&ctx, &rail, &b).drift < 1e-5);
        slider.apply_impulse(&ctx, &mut rail, &mut b);
        slider.apply_nudge(&ctx, &mut rail, &mut b);
        assert_eq!(b.position, Vec3::Y * 3.0);
        assert_eq!(b.velocity, Vec3::Y * 2.0);

        // World X is constrained instead
        let mut b = body(Vec3::new(0.5, 3.0, 0.0)).with_velocity(Vec3::new(1.0, 2.0, 0.0));
        let solution = slider.calculate(&ctx, &rail, &b);
        assert!((solution.drift - 0.5).abs() < 1e-5, "drift = {}", solution.drift);
        slider.apply_impulse(&ctx, &mut rail, &mut b);
        assert!(b.velocity.x.abs() < 1e-5, "velocity = {:?}", b.velocity);
        assert!((b.velocity.y - 2.0).abs() < 1e-5, "velocity = {:?}", b.velocity);
    }

    #[test]
    fn test_limit_follows_first_body_orientation() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let limit = LimitTranslationConstraint::new(ha, hb, -1.0, 1.0);
        // Local Y of the guide points along world -X
        let mut guide =
            Body::new_static(Vec3::ZERO).with_orientation(Quat::from_rotation_z(FRAC_PI_2));

        // Far along world Y is still inside the range
        let mut b = body(Vec3::Y * 5.0).with_velocity(Vec3::Y * 3.0);
        limit.apply_impulse(&ctx, &mut guide, &mut b);
        assert_eq!(b.velocity, Vec3::Y * 3.0);

        // Past max along world -X and moving further out: stopped
        let mut b = body(Vec3::X * -1.5).with_velocity(Vec3::new(-2.0, 1.0, 0.0));
        limit.apply_impulse(&ctx, &mut guide, &mut b);
        assert!(b.velocity.x.abs() < 1e-5, "velocity = {:?}", b.velocity);
        assert!((b.velocity.y - 1.0).abs() < 1e-5, "velocity = {:?}", b.velocity);
        assert_eq!(guide.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_limit_inside_range_is_inactive() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let limit = LimitTranslationConstraint::new(ha, hb, -1.0, 1.0);
        let mut a = body(Vec3::ZERO);
        let mut b = body(Vec3::Y * 0.5).with_velocity(Vec3::Y * 3.0);

        limit.apply_impulse(&ctx, &mut a, &mut b);
        limit.apply_nudge(&ctx, &mut a, &mut b);

        assert_eq!(b.velocity, Vec3::Y * 3.0);
        assert_eq!(b.position, Vec3::Y * 0.5);
    }

    #[test]
    fn test_limit_stops_leaving_motion_only() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let limit = LimitTranslationConstraint::new(ha, hb, -1.0, 1.0);

        // Beyond max and moving further out: stopped
        let mut a = body(Vec3::ZERO);
        let mut b = body(Vec3::Y * 1.5).with_velocity(Vec3::Y * 2.0);
        limit.apply_impulse(&ctx, &mut a, &mut b);
        assert!((b.velocity.y - a.velocity.y).abs() < 1e-5);

        // Beyond max but already returning: untouched
        let mut a = body(Vec3::ZERO);
        let mut b = body(Vec3::Y * 1.5).with_velocity(Vec3::Y * -2.0);
        limit.apply_impulse(&ctx, &mut a, &mut b);
        assert_eq!(b.velocity, Vec3::Y * -2.0);

        // Below min and moving further down: stopped
        let mut a = body(Vec3::ZERO);
        let mut b = body(Vec3::Y * -1.5).with_velocity(Vec3::Y * -2.0);
        limit.apply_impulse(&ctx, &mut a, &mut b);
        assert!((b.velocity.y - a.velocity.y).abs() < 1e-5);
    }

    #[test]
    fn test_limit_nudges_back_into_range() {
        let ctx = test_context();
        let (ha, hb) = handles();
        let limit = LimitTranslationConstraint::new(ha, hb, -1.0, 1.0);
        let mut a = body(Vec3::ZERO);
        let mut b = body(Vec3::Y * 2.0);

        for _ in 0..1000 {
            limit.apply_nudge(&ctx, &mut a, &mut b);
        }

        let offset = b.position.y - a.position.y;
        assert!(offset < 1.01, "offset = {}", offset);
    }
}
