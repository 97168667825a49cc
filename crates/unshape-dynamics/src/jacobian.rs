//! Velocity-space constraint gradients.
//!
//! A [`Jacobian`] describes how a scalar constraint value changes with a
//! body's linear and angular velocity. It turns a scalar corrective `lambda`
//! into a linear + angular impulse (velocity phase) or nudge (position phase).
//!
//! Static bodies behave as if they had infinite mass: they contribute nothing
//! to the effective mass and ignore applied lambdas.

use glam::Vec3;

use crate::Body;

/// Gradient of a scalar constraint with respect to one body's velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Jacobian {
    /// Sensitivity to linear velocity.
    pub slope_velocity: Vec3,
    /// Sensitivity to angular velocity.
    pub slope_angular_velocity: Vec3,
}

impl Jacobian {
    /// Create a Jacobian from its linear and angular slopes.
    pub fn new(slope_velocity: Vec3, slope_angular_velocity: Vec3) -> Self {
        Self {
            slope_velocity,
            slope_angular_velocity,
        }
    }

    /// Rate of change of the constraint caused by the body's current motion.
    pub fn effective_velocity(&self, body: &Body) -> f32 {
        self.slope_velocity.dot(body.velocity)
            + self.slope_angular_velocity.dot(body.angular_velocity)
    }

    /// How easily the body yields along this constraint.
    pub fn inverse_effective_mass(&self, body: &Body) -> f32 {
        if body.is_static {
            return 0.0;
        }
        self.slope_velocity.dot(self.slope_velocity) / body.mass
            + (body.inverse_moment_of_inertia() * self.slope_angular_velocity)
                .dot(self.slope_angular_velocity)
    }

    /// Apply the impulse that cancels the constraint's velocity error.
    pub fn correct_velocity(&self, body: &mut Body) {
        let inverse_mass = self.inverse_effective_mass(body);
        if inverse_mass <= 0.0 {
            return;
        }
        let lambda = -self.effective_velocity(body) / inverse_mass;
        self.apply_impulse(body, lambda);
    }

    /// Nudge the body a `bias_factor` fraction of the way out of `drift`.
    pub fn correct_position(&self, body: &mut Body, drift: f32, bias_factor: f32) {
        let inverse_mass = self.inverse_effective_mass(body);
        if inverse_mass <= 0.0 {
            return;
        }
        let lambda = -bias_factor * drift / inverse_mass;
        self.apply_nudge(body, lambda);
    }

    /// Apply `lambda` as a velocity impulse along the gradient.
    pub fn apply_impulse(&self, body: &mut Body, lambda: f32) {
        if body.is_static {
            return;
        }
        body.apply_impulse(self.slope_velocity * lambda);
        body.apply_angular_impulse(self.slope_angular_velocity * lambda);
    }

    /// Apply `lambda` as a position nudge along the gradient.
    pub fn apply_nudge(&self, body: &mut Body, lambda: f32) {
        if body.is_static {
            return;
        }
        body.apply_nudge(self.slope_velocity * lambda);
        body.apply_angular_nudge(self.slope_angular_velocity * lambda);
    }
}

/// Gradient of a scalar constraint acting on two bodies.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PairJacobian {
    /// Gradient for the first body.
    pub first: Jacobian,
    /// Gradient for the second body.
    pub second: Jacobian,
}

impl PairJacobian {
    /// Combine two single-body gradients.
    pub fn new(first: Jacobian, second: Jacobian) -> Self {
        Self { first, second }
    }

    /// Combined rate of change of the constraint.
    pub fn effective_velocity(&self, first: &Body, second: &Body) -> f32 {
        self.first.effective_velocity(first) + self.second.effective_velocity(second)
    }

    /// Combined inverse effective mass.
    pub fn inverse_effective_mass(&self, first: &Body, second: &Body) -> f32 {
        self.first.inverse_effective_mass(first) + self.second.inverse_effective_mass(second)
    }

    /// Apply the impulse pair that cancels the constraint's velocity error.
    pub fn correct_velocity(&self, first: &mut Body, second: &mut Body) {
        let inverse_mass = self.inverse_effective_mass(first, second);
        if inverse_mass <= 0.0 {
            return;
        }
        let lambda = -self.effective_velocity(first, second) / inverse_mass;
        self.apply_impulse(first, second, lambda);
    }

    /// Nudge both bodies a `bias_factor` fraction of the way out of `drift`.
    pub fn correct_position(
        &self,
        first: &mut Body,
        second: &mut Body,
        drift: f32,
        bias_factor: f32,
    ) {
        let inverse_mass = self.inverse_effective_mass(first, second);
        if inverse_mass <= 0.0 {
            return;
        }
        let lambda = -bias_factor * drift / inverse_mass;
        self.apply_nudge(first, second, lambda);
    }

    /// Apply `lambda` as impulses on both bodies.
    pub fn apply_impulse(&self, first: &mut Body, second: &mut Body, lambda: f32) {
        self.first.apply_impulse(first, lambda);
        self.second.apply_impulse(second, lambda);
    }

    /// Apply `lambda` as nudges on both bodies.
    pub fn apply_nudge(&self, first: &mut Body, second: &mut Body, lambda: f32) {
        self.first.apply_nudge(first, lambda);
        self.second.apply_nudge(second, lambda);
    }
}
