//! Distance constraints: rods and pins.

use glam::Vec3;

use super::{Context, PairSolution, Solution};
use crate::{Body, BodyHandle, Jacobian, PairJacobian};

/// A body anchor hanging from a fixed world point on a rigid rod.
#[derive(Clone, Debug)]
pub struct ChandelierConstraint {
    /// World-space point the rod hangs from.
    pub fixture: Vec3,
    /// Suspended body.
    pub body: BodyHandle,
    /// Rod attachment in the body's local space.
    pub body_anchor: Vec3,
    /// Rod length.
    pub length: f32,
}

impl ChandelierConstraint {
    /// Create a chandelier attached at the body's center of mass.
    pub fn new(fixture: Vec3, body: BodyHandle, length: f32) -> Self {
        Self {
            fixture,
            body,
            body_anchor: Vec3::ZERO,
            length,
        }
    }

    /// Set the rod attachment in body-local space.
    pub fn with_anchor(mut self, body_anchor: Vec3) -> Self {
        self.body_anchor = body_anchor;
        self
    }

    /// Evaluate the constraint.
    pub fn calculate(&self, ctx: &Context, body: &Body) -> Solution {
        let solution = point_to_fixture(ctx, self.fixture, body, self.body_anchor);
        Solution {
            drift: solution.drift - self.length,
            ..solution
        }
    }

    /// Remove velocity along the rod.
    pub fn apply_impulse(&self, ctx: &Context, body: &mut Body) {
        let solution = self.calculate(ctx, body);
        if solution.drift.abs() > ctx.epsilon {
            solution.jacobian.correct_velocity(body);
        }
    }

    /// Pull the body back to rod length.
    pub fn apply_nudge(&self, ctx: &Context, body: &mut Body) {
        let solution = self.calculate(ctx, body);
        if solution.drift.abs() > ctx.epsilon {
            solution
                .jacobian
                .correct_position(body, solution.drift, ctx.bias_factor);
        }
    }
}

/// A body anchor pinned to a fixed world point.
#[derive(Clone, Debug)]
pub struct FixedTranslationConstraint {
    /// World-space pin position.
    pub fixture: Vec3,
    /// Pinned body.
    pub body: BodyHandle,
    /// Pinned point in the body's local space.
    pub body_anchor: Vec3,
}

impl FixedTranslationConstraint {
    /// Pin the body's center of mass to `fixture`.
    pub fn new(fixture: Vec3, body: BodyHandle) -> Self {
        Self {
            fixture,
            body,
            body_anchor: Vec3::ZERO,
        }
    }

    /// Set the pinned point in body-local space.
    pub fn with_anchor(mut self, body_anchor: Vec3) -> Self {
        self.body_anchor = body_anchor;
        self
    }

    /// Evaluate the constraint.
    pub fn calculate(&self, ctx: &Context, body: &Body) -> Solution {
        point_to_fixture(ctx, self.fixture, body, self.body_anchor)
    }

    /// Remove velocity that moves the anchor off the pin.
    pub fn apply_impulse(&self, ctx: &Context, body: &mut Body) {
        let solution = self.calculate(ctx, body);
        if solution.drift.abs() > ctx.epsilon {
            solution.jacobian.correct_velocity(body);
        }
    }

    /// Move the anchor back onto the pin.
    pub fn apply_nudge(&self, ctx: &Context, body: &mut Body) {
        let solution = self.calculate(ctx, body);
        if solution.drift.abs() > ctx.epsilon {
            solution
                .jacobian
                .correct_position(body, solution.drift, ctx.bias_factor);
        }
    }
}

/// A fixed-length rod between two body anchors, free to swivel at both ends.
#[derive(Clone, Debug)]
pub struct HingedRodConstraint {
    /// First body.
    pub first_body: BodyHandle,
    /// Rod end on the first body, in its local space.
    pub first_body_anchor: Vec3,
    /// Second body.
    pub second_body: BodyHandle,
    /// Rod end on the second body, in its local space.
    pub second_body_anchor: Vec3,
    /// Rod length.
    pub length: f32,
}

impl HingedRodConstraint {
    /// Connect the two centers of mass.
    pub fn new(first_body: BodyHandle, second_body: BodyHandle, length: f32) -> Self {
        Self {
            first_body,
            first_body_anchor: Vec3::ZERO,
            second_body,
            second_body_anchor: Vec3::ZERO,
            length,
        }
    }

    /// Set the rod ends in body-local space.
    pub fn with_anchors(mut self, first_body_anchor: Vec3, second_body_anchor: Vec3) -> Self {
        self.first_body_anchor = first_body_anchor;
        self.second_body_anchor = second_body_anchor;
        self
    }

    /// Evaluate the constraint.
    pub fn calculate(&self, ctx: &Context, first: &Body, second: &Body) -> PairSolution {
        let solution = anchor_to_anchor(
            ctx,
            first,
            self.first_body_anchor,
            second,
            self.second_body_anchor,
            |delta| delta,
        );
        PairSolution {
            drift: solution.drift - self.length,
            ..solution
        }
    }

    /// Remove relative velocity along the rod.
    pub fn apply_impulse(&self, ctx: &Context, first: &mut Body, second: &mut Body) {
        let solution = self.calculate(ctx, first, second);
        if solution.drift.abs() > ctx.epsilon {
            solution.jacobian.correct_velocity(first, second);
        }
    }

    /// Restore the rod length.
    pub fn apply_nudge(&self, ctx: &Context, first: &mut Body, second: &mut Body) {
        let solution = self.calculate(ctx, first, second);
        if solution.drift.abs() > ctx.epsilon {
            solution
                .jacobian
                .correct_position(first, second, solution.drift, ctx.bias_factor);
        }
    }
}

/// Distance from a world fixture to a body anchor.
pub(super) fn point_to_fixture(ctx: &Context, fixture: Vec3, body: &Body, anchor: Vec3) -> Solution {
    let radius = body.orientation * anchor;
    let delta = body.position + radius - fixture;
    let normal = ctx.normal_or_x(delta);
    Solution {
        jacobian: Jacobian::new(normal, radius.cross(normal)),
        drift: delta.length(),
    }
}

/// Distance between two body anchors after `project` has removed any
/// ignored components from their offset.
pub(super) fn anchor_to_anchor(
    ctx: &Context,
    first: &Body,
    first_anchor: Vec3,
    second: &Body,
    second_anchor: Vec3,
    project: impl FnOnce(Vec3) -> Vec3,
) -> PairSolution {
    let first_radius = first.orientation * first_anchor;
    let second_radius = second.orientation * second_anchor;
    let delta = project((second.position + second_radius) - (first.position + first_radius));
    let normal = ctx.normal_or_x(delta);
    PairSolution {
        jacobian: PairJacobian::new(
            Jacobian::new(-normal, -first_radius.cross(normal)),
            Jacobian::new(normal, second_radius.cross(normal)),
        ),
        drift: delta.length(),
    }
}
