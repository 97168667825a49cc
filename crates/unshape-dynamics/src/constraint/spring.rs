//! Soft spring-damper constraint.

use std::f32::consts::TAU;

use glam::Vec3;

use super::rod::anchor_to_anchor;
use super::{Context, PairSolution};
use crate::{Body, BodyHandle};

/// A spring-damper between two body anchors, tuned by frequency and damping
/// ratio rather than raw stiffness.
///
/// Solved as a soft constraint: the spring and damper are folded into the
/// velocity solve through a constraint-force-mixing term, and the impulse
/// applied so far in the current step is fed back into every iteration.
#[derive(Clone, Debug)]
pub struct CoiloverConstraint {
    /// First body.
    pub first_body: BodyHandle,
    /// Spring end on the first body, in its local space.
    pub first_body_anchor: Vec3,
    /// Second body.
    pub second_body: BodyHandle,
    /// Spring end on the second body, in its local space.
    pub second_body_anchor: Vec3,
    /// Length at which the spring exerts no force.
    pub rest_length: f32,
    /// Undamped oscillation frequency in Hz.
    pub frequency_hz: f32,
    /// Ratio of the damping to critical damping.
    pub damping_ratio: f32,
    applied_lambda: f32,
}

impl CoiloverConstraint {
    /// Create a spring between the two centers of mass.
    pub fn new(
        first_body: BodyHandle,
        second_body: BodyHandle,
        frequency_hz: f32,
        damping_ratio: f32,
    ) -> Self {
        Self {
            first_body,
            first_body_anchor: Vec3::ZERO,
            second_body,
            second_body_anchor: Vec3::ZERO,
            rest_length: 0.0,
            frequency_hz,
            damping_ratio,
            applied_lambda: 0.0,
        }
    }

    /// Set the spring ends in body-local space.
    pub fn with_anchors(mut self, first_body_anchor: Vec3, second_body_anchor: Vec3) -> Self {
        self.first_body_anchor = first_body_anchor;
        self.second_body_anchor = second_body_anchor;
        self
    }

    /// Set the rest length.
    pub fn with_rest_length(mut self, rest_length: f32) -> Self {
        self.rest_length = rest_length.max(0.0);
        self
    }

    /// Impulse applied so far in the current step.
    pub fn applied_lambda(&self) -> f32 {
        self.applied_lambda
    }

    /// Forget the impulse accumulated during the previous step.
    pub fn reset(&mut self) {
        self.applied_lambda = 0.0;
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
            drift: solution.drift - self.rest_length,
            ..solution
        }
    }

    /// Apply one iteration of the spring-damper impulse.
    pub fn apply_impulse(&mut self, ctx: &Context, first: &mut Body, second: &mut Body) {
        let solution = self.calculate(ctx, first, second);
        let inverse_mass = solution.jacobian.inverse_effective_mass(first, second);
        if inverse_mass <= 0.0 {
            return;
        }

        let mass = 1.0 / inverse_mass;
        let omega = TAU * self.frequency_hz;
        let stiffness = mass * omega * omega;
        let damping = 2.0 * mass * self.damping_ratio * omega;

        let dt = ctx.elapsed_seconds;
        let softness = dt * (damping + dt * stiffness);
        if softness <= 0.0 {
            return;
        }
        let gamma = 1.0 / softness;
        let bias = solution.drift * dt * stiffness * gamma;

        let velocity = solution.jacobian.effective_velocity(first, second);
        let lambda = -(velocity + bias + gamma * self.applied_lambda) / (inverse_mass + gamma);
        self.applied_lambda += lambda;
        solution.jacobian.apply_impulse(first, second, lambda);
    }
}
