//! Constraints and joints for rigid body simulation.
//!
//! Every constraint reduces to a scalar `drift` plus a Jacobian describing how
//! that drift reacts to body motion. The engine drives constraints through
//! three calls per step:
//! 1. [`Constraint::reset`] once, clearing per-step accumulators
//! 2. [`Constraint::apply_impulse`] repeatedly, removing velocity error
//! 3. [`Constraint::apply_nudge`] repeatedly, removing positional drift

use glam::Vec3;
use tracing::warn;

use crate::{Body, BodyHandle, BodySet, Jacobian, PairJacobian};

mod alignment;
mod contact;
mod rod;
mod spring;

pub use alignment::{
    LimitTranslationConstraint, MatchAxisConstraint, MatchRotationConstraint,
    MatchTranslationConstraint,
};
pub use contact::{FRICTION_COEFFICIENT, GroundCollisionConstraint, restitution_clamp};
pub use rod::{ChandelierConstraint, FixedTranslationConstraint, HingedRodConstraint};
pub use spring::CoiloverConstraint;

/// Per-step solver parameters handed to every constraint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Context {
    /// Duration of the step in seconds.
    pub elapsed_seconds: f32,
    /// Number of impulse rounds in the step.
    pub impulse_iterations: u32,
    /// Number of nudge rounds in the step.
    pub nudge_iterations: u32,
    /// Drift below which a constraint is considered satisfied.
    pub epsilon: f32,
    /// Fraction of drift removed by a single nudge.
    pub bias_factor: f32,
}

impl Context {
    /// Squared [`Self::epsilon`], the threshold for normalizing vectors.
    #[inline]
    pub fn sqr_epsilon(&self) -> f32 {
        self.epsilon * self.epsilon
    }

    /// Unit direction of `delta`, or the X basis vector if `delta` is too
    /// short to normalize.
    #[inline]
    pub fn normal_or_x(&self, delta: Vec3) -> Vec3 {
        if delta.length_squared() > self.sqr_epsilon() {
            delta.normalize()
        } else {
            Vec3::X
        }
    }
}

/// A single-body constraint evaluated against the current state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Solution {
    /// Gradient of the constraint.
    pub jacobian: Jacobian,
    /// Current violation.
    pub drift: f32,
}

/// A two-body constraint evaluated against the current state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairSolution {
    /// Gradient of the constraint.
    pub jacobian: PairJacobian,
    /// Current violation.
    pub drift: f32,
}

/// When a constraint produces corrections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// Corrects whenever its drift exceeds epsilon.
    Always,
    /// Only corrects for certain directions of motion.
    Conditional,
}

/// A constraint between bodies.
#[derive(Clone, Debug)]
pub enum Constraint {
    /// World fixture tethered to a body anchor by a rod.
    Chandelier(ChandelierConstraint),
    /// Spring-damper between two body anchors.
    Coilover(CoiloverConstraint),
    /// Body anchor pinned to a world point.
    FixedTranslation(FixedTranslationConstraint),
    /// Fixed-length rod between two body anchors.
    HingedRod(HingedRodConstraint),
    /// One-sided range along the first body's local Y axis.
    LimitTranslation(LimitTranslationConstraint),
    /// Align a local axis of one body with a local axis of another.
    MatchAxis(MatchAxisConstraint),
    /// Align the orientations of two bodies.
    MatchRotation(MatchRotationConstraint),
    /// Make two body anchors coincide, optionally ignoring axes.
    MatchTranslation(MatchTranslationConstraint),
    /// Contact of a dynamic body against static geometry.
    GroundCollision(GroundCollisionConstraint),
}

impl Constraint {
    /// Bodies this constraint acts on.
    pub fn bodies(&self) -> (BodyHandle, Option<BodyHandle>) {
        match self {
            Constraint::Chandelier(c) => (c.body, None),
            Constraint::Coilover(c) => (c.first_body, Some(c.second_body)),
            Constraint::FixedTranslation(c) => (c.body, None),
            Constraint::HingedRod(c) => (c.first_body, Some(c.second_body)),
            Constraint::LimitTranslation(c) => (c.first_body, Some(c.second_body)),
            Constraint::MatchAxis(c) => (c.first_body, Some(c.second_body)),
            Constraint::MatchRotation(c) => (c.first_body, Some(c.second_body)),
            Constraint::MatchTranslation(c) => (c.first_body, Some(c.second_body)),
            Constraint::GroundCollision(c) => (c.body, None),
        }
    }

    /// Whether this constraint acts on `handle`.
    pub fn references(&self, handle: BodyHandle) -> bool {
        let (first, second) = self.bodies();
        first == handle || second == Some(handle)
    }

    /// When this constraint produces corrections.
    pub fn activation(&self) -> Activation {
        match self {
            Constraint::LimitTranslation(_) | Constraint::GroundCollision(_) => {
                Activation::Conditional
            }
            _ => Activation::Always,
        }
    }

    /// Clear state accumulated during the previous step.
    pub fn reset(&mut self) {
        if let Constraint::Coilover(c) = self {
            c.reset();
        }
    }

    /// Apply a velocity correction.
    pub fn apply_impulse(&mut self, ctx: &Context, bodies: &mut BodySet) {
        match self {
            Constraint::Chandelier(c) => with_body(bodies, c.body, |b| c.apply_impulse(ctx, b)),
            Constraint::Coilover(c) => with_pair(bodies, c.first_body, c.second_body, |a, b| {
                c.apply_impulse(ctx, a, b);
            }),
            Constraint::FixedTranslation(c) => {
                with_body(bodies, c.body, |b| c.apply_impulse(ctx, b));
            }
            Constraint::HingedRod(c) => with_pair(bodies, c.first_body, c.second_body, |a, b| {
                c.apply_impulse(ctx, a, b);
            }),
            Constraint::LimitTranslation(c) => {
                with_pair(bodies, c.first_body, c.second_body, |a, b| {
                    c.apply_impulse(ctx, a, b);
                });
            }
            Constraint::MatchAxis(c) => with_pair(bodies, c.first_body, c.second_body, |a, b| {
                c.apply_impulse(ctx, a, b);
            }),
            Constraint::MatchRotation(c) => {
                with_pair(bodies, c.first_body, c.second_body, |a, b| {
                    c.apply_impulse(ctx, a, b);
                });
            }
            Constraint::MatchTranslation(c) => {
                with_pair(bodies, c.first_body, c.second_body, |a, b| {
                    c.apply_impulse(ctx, a, b);
                });
            }
            Constraint::GroundCollision(c) => {
                with_body(bodies, c.body, |b| c.apply_impulse(ctx, b));
            }
        }
    }

    /// Apply a positional correction.
    pub fn apply_nudge(&mut self, ctx: &Context, bodies: &mut BodySet) {
        match self {
            Constraint::Chandelier(c) => with_body(bodies, c.body, |b| c.apply_nudge(ctx, b)),
            Constraint::FixedTranslation(c) => {
                with_body(bodies, c.body, |b| c.apply_nudge(ctx, b));
            }
            Constraint::HingedRod(c) => with_pair(bodies, c.first_body, c.second_body, |a, b| {
                c.apply_nudge(ctx, a, b);
            }),
            Constraint::LimitTranslation(c) => {
                with_pair(bodies, c.first_body, c.second_body, |a, b| {
                    c.apply_nudge(ctx, a, b);
                });
            }
            Constraint::MatchAxis(c) => with_pair(bodies, c.first_body, c.second_body, |a, b| {
                c.apply_nudge(ctx, a, b);
            }),
            Constraint::MatchRotation(c) => {
                with_pair(bodies, c.first_body, c.second_body, |a, b| {
                    c.apply_nudge(ctx, a, b);
                });
            }
            Constraint::MatchTranslation(c) => {
                with_pair(bodies, c.first_body, c.second_body, |a, b| {
                    c.apply_nudge(ctx, a, b);
                });
            }
            // Soft and contact constraints only act on velocity
            Constraint::Coilover(_) | Constraint::GroundCollision(_) => {}
        }
    }
}

macro_rules! impl_from_constraint {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Constraint {
                fn from(constraint: $ty) -> Self {
                    Constraint::$variant(constraint)
                }
            }
        )*
    };
}

impl_from_constraint! {
    Chandelier => ChandelierConstraint,
    Coilover => CoiloverConstraint,
    FixedTranslation => FixedTranslationConstraint,
    HingedRod => HingedRodConstraint,
    LimitTranslation => LimitTranslationConstraint,
    MatchAxis => MatchAxisConstraint,
    MatchRotation => MatchRotationConstraint,
    MatchTranslation => MatchTranslationConstraint,
    GroundCollision => GroundCollisionConstraint,
}

fn with_body(bodies: &mut BodySet, handle: BodyHandle, f: impl FnOnce(&mut Body)) {
    match bodies.get_mut(handle) {
        Some(body) => f(body),
        None => warn!(%handle, "constraint references a missing body; skipped"),
    }
}

fn with_pair(
    bodies: &mut BodySet,
    first: BodyHandle,
    second: BodyHandle,
    f: impl FnOnce(&mut Body, &mut Body),
) {
    match bodies.get_pair_mut(first, second) {
        Some((a, b)) => f(a, b),
        None => warn!(%first, %second, "constraint references a missing body; skipped"),
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> Context {
    Context {
        elapsed_seconds: 1.0 / 60.0,
        impulse_iterations: 100,
        nudge_iterations: 100,
        epsilon: 0.001,
        bias_factor: 0.01,
    }
}
