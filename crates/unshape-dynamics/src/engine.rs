//! Physics simulation engine.
//!
//! Contains the [`Engine`] that owns bodies and constraints and advances them
//! in fixed steps. Every step runs, in order:
//! 1. collision detection (static vs dynamic pairs only)
//! 2. constraint reset
//! 3. force application (gravity and aerodynamic drag)
//! 4. velocity integration
//! 5. impulse rounds over persistent then contact constraints
//! 6. motion integration
//! 7. nudge rounds over persistent then contact constraints

use std::fmt;
use std::time::Duration;

use glam::Vec3;
use tracing::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    Body, BodyHandle, BodySet, Constraint, Context, DynamicsError, GroundCollisionConstraint,
    IntersectionResultSet, Intersector, PrimitiveIntersector, Result,
};

/// Configuration for the simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Fixed step duration.
    pub step: Duration,
    /// Gravity acceleration.
    pub gravity: Vec3,
    /// Velocity of the surrounding air.
    pub wind_velocity: Vec3,
    /// Density of the surrounding air.
    pub wind_density: f32,
    /// Impulse rounds per step.
    pub impulse_iterations: u32,
    /// Nudge rounds per step.
    pub nudge_iterations: u32,
    /// Drift below which constraints are considered satisfied.
    pub epsilon: f32,
    /// Fraction of drift removed by a single nudge.
    pub bias_factor: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step: Duration::from_micros(16_667),
            gravity: Vec3::new(0.0, -9.8, 0.0),
            wind_velocity: Vec3::ZERO,
            wind_density: 1.2,
            impulse_iterations: 100,
            nudge_iterations: 100,
            epsilon: 0.001,
            bias_factor: 0.01,
        }
    }
}

impl EngineConfig {
    /// Set the step duration.
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Set gravity.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the wind field.
    pub fn with_wind(mut self, velocity: Vec3, density: f32) -> Self {
        self.wind_velocity = velocity;
        self.wind_density = density.max(0.0);
        self
    }

    /// Set the impulse and nudge round counts.
    pub fn with_iterations(mut self, impulse_iterations: u32, nudge_iterations: u32) -> Self {
        self.impulse_iterations = impulse_iterations;
        self.nudge_iterations = nudge_iterations;
        self
    }

    /// Set the drift tolerance.
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon.max(0.0);
        self
    }

    /// Set the nudge bias factor.
    pub fn with_bias_factor(mut self, bias_factor: f32) -> Self {
        self.bias_factor = bias_factor.clamp(0.0, 1.0);
        self
    }

    /// Solver context for one step.
    pub fn context(&self) -> Context {
        Context {
            elapsed_seconds: self.step.as_secs_f32(),
            impulse_iterations: self.impulse_iterations,
            nudge_iterations: self.nudge_iterations,
            epsilon: self.epsilon,
            bias_factor: self.bias_factor,
        }
    }
}

/// Stable reference to a constraint registered with an [`Engine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(u64);

impl fmt::Display for ConstraintHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint#{}", self.0)
    }
}

/// The physics simulation.
pub struct Engine {
    config: EngineConfig,
    accumulated_time: Duration,
    bodies: BodySet,
    constraints: Vec<(ConstraintHandle, Constraint)>,
    next_constraint: u64,
    contacts: Vec<Constraint>,
    intersector: Box<dyn Intersector>,
    intersections: IntersectionResultSet,
    // Per-step scratch, kept to avoid reallocating
    pair_handles: Vec<BodyHandle>,
    touched: Vec<BodyHandle>,
}

impl Engine {
    /// Create an engine with the default configuration and the given step.
    pub fn new(step: Duration) -> Self {
        Self::with_config(EngineConfig::default().with_step(step))
    }

    /// Create an engine from a configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_intersector(config, PrimitiveIntersector)
    }

    /// Create an engine that uses a custom shape intersector.
    pub fn with_intersector(config: EngineConfig, intersector: impl Intersector + 'static) -> Self {
        Self {
            config,
            accumulated_time: Duration::ZERO,
            bodies: BodySet::new(),
            constraints: Vec::new(),
            next_constraint: 0,
            contacts: Vec::new(),
            intersector: Box::new(intersector),
            intersections: IntersectionResultSet::new(),
            pair_handles: Vec::new(),
            touched: Vec::new(),
        }
    }

    /// Configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Time carried over to the next [`Self::update`].
    pub fn accumulated_time(&self) -> Duration {
        self.accumulated_time
    }

    /// Register a body.
    ///
    /// Dynamic bodies must have a finite positive mass and an invertible
    /// moment of inertia. Static bodies have their velocities cleared.
    pub fn add_body(&mut self, mut body: Body) -> Result<BodyHandle> {
        if body.is_static {
            body.velocity = Vec3::ZERO;
            body.angular_velocity = Vec3::ZERO;
        } else {
            if !(body.mass.is_finite() && body.mass > 0.0) {
                return Err(DynamicsError::InvalidMass(body.mass));
            }
            let determinant = body.moment_of_inertia.determinant();
            if !determinant.is_finite() || determinant.abs() <= f32::EPSILON {
                return Err(DynamicsError::SingularInertia);
            }
        }

        let handle = self.bodies.insert(body);
        debug!(%handle, "body added");
        Ok(handle)
    }

    /// Unregister a body together with every constraint that references it.
    ///
    /// Removal is an extension beyond the core add-and-step engine.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<Body> {
        let body = self
            .bodies
            .remove(handle)
            .ok_or(DynamicsError::UnknownBody(handle))?;

        let before = self.constraints.len();
        self.constraints.retain(|(_, c)| !c.references(handle));
        self.contacts.retain(|c| !c.references(handle));
        debug!(
            %handle,
            dropped_constraints = before - self.constraints.len(),
            "body removed"
        );
        Ok(body)
    }

    /// Get a body.
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Get a body mutably.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    /// All registered bodies.
    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    /// Register a constraint. Constraints are solved in registration order.
    pub fn add_constraint(&mut self, constraint: impl Into<Constraint>) -> Result<ConstraintHandle> {
        let constraint = constraint.into();
        let (first, second) = constraint.bodies();
        for handle in std::iter::once(first).chain(second) {
            if !self.bodies.contains(handle) {
                return Err(DynamicsError::UnknownBody(handle));
            }
        }
        if second == Some(first) {
            return Err(DynamicsError::SameBody(first));
        }

        let handle = ConstraintHandle(self.next_constraint);
        self.next_constraint += 1;
        self.constraints.push((handle, constraint));
        debug!(%handle, "constraint added");
        Ok(handle)
    }

    /// Unregister a constraint.
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<Constraint> {
        let index = self
            .constraints
            .iter()
            .position(|(h, _)| *h == handle)
            .ok_or(DynamicsError::UnknownConstraint(handle))?;
        debug!(%handle, "constraint removed");
        Ok(self.constraints.remove(index).1)
    }

    /// Get a constraint.
    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, c)| c)
    }

    /// Get a constraint mutably.
    pub fn constraint_mut(&mut self, handle: ConstraintHandle) -> Option<&mut Constraint> {
        self.constraints
            .iter_mut()
            .find(|(h, _)| *h == handle)
            .map(|(_, c)| c)
    }

    /// Registered constraints in solve order.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().map(|(_, c)| c)
    }

    /// Contact constraints generated by the last step.
    pub fn contacts(&self) -> &[Constraint] {
        &self.contacts
    }

    /// Advance the simulation by every whole step contained in the elapsed
    /// time plus the carried-over remainder. Returns the number of steps run.
    pub fn update(&mut self, elapsed: Duration) -> usize {
        let step = self.config.step;
        if step.is_zero() {
            warn!("engine step is zero; update ignored");
            return 0;
        }

        self.accumulated_time += elapsed;
        let mut steps = 0;
        while self.accumulated_time >= step {
            self.accumulated_time -= step;
            self.step();
            steps += 1;
        }
        steps
    }

    /// Run a single fixed step, ignoring the accumulator.
    pub fn step(&mut self) {
        let ctx = self.config.context();

        self.detect_collisions();
        self.reset_constraints();
        self.apply_forces();
        self.integrate(&ctx);
        self.apply_impulses(&ctx);
        self.apply_motion(&ctx);
        self.apply_nudges(&ctx);

        trace!(
            bodies = self.bodies.len(),
            constraints = self.constraints.len(),
            contacts = self.contacts.len(),
            "step"
        );
    }

    /// Rebuild contact constraints from static/dynamic overlaps.
    fn detect_collisions(&mut self) {
        let Self {
            bodies,
            contacts,
            intersector,
            intersections,
            pair_handles,
            touched,
            ..
        } = self;

        for body in bodies.iter_mut() {
            body.in_collision = false;
        }
        contacts.clear();

        touched.clear();
        pair_handles.clear();
        pair_handles.extend(bodies.iter().map(|(handle, _)| handle));
        for (i, &first_handle) in pair_handles.iter().enumerate() {
            for &second_handle in &pair_handles[i + 1..] {
                let (Some(first), Some(second)) =
                    (bodies.get(first_handle), bodies.get(second_handle))
                else {
                    continue;
                };

                // Static pairs never move; dynamic pairs are not resolved
                if first.is_static == second.is_static {
                    continue;
                }

                for first_shape in &first.collision_shapes {
                    let first_placement =
                        first_shape.transformed(first.position, first.orientation);
                    for second_shape in &second.collision_shapes {
                        let second_placement =
                            second_shape.transformed(second.position, second.orientation);

                        intersections.reset();
                        intersector.check_intersection(
                            &first_placement,
                            &second_placement,
                            intersections,
                        );

                        for result in intersections.intersections() {
                            if !first.is_static {
                                contacts.push(Constraint::GroundCollision(
                                    GroundCollisionConstraint::new(
                                        first_handle,
                                        result.first_displace_normal,
                                        result.first_contact,
                                        result.depth,
                                    ),
                                ));
                                touched.push(first_handle);
                            }
                            if !second.is_static {
                                contacts.push(Constraint::GroundCollision(
                                    GroundCollisionConstraint::new(
                                        second_handle,
                                        result.second_displace_normal,
                                        result.second_contact,
                                        result.depth,
                                    ),
                                ));
                                touched.push(second_handle);
                            }
                        }
                    }
                }
            }
        }

        for &handle in touched.iter() {
            if let Some(body) = bodies.get_mut(handle) {
                body.in_collision = true;
            }
        }
    }

    fn reset_constraints(&mut self) {
        for (_, constraint) in &mut self.constraints {
            constraint.reset();
        }
        for constraint in &mut self.contacts {
            constraint.reset();
        }
    }

    /// Derive accelerations from gravity and drag against the wind field.
    fn apply_forces(&mut self) {
        let gravity = self.config.gravity;
        let wind_velocity = self.config.wind_velocity;
        let wind_density = self.config.wind_density;

        for body in self.bodies.iter_mut().filter(|b| !b.is_static) {
            body.reset_acceleration();
            body.reset_angular_acceleration();

            body.add_acceleration(gravity);

            let relative_velocity = body.velocity - wind_velocity;
            body.apply_force(
                relative_velocity * (-wind_density * relative_velocity.length() * body.drag_factor),
            );

            let angular_velocity = body.angular_velocity;
            body.apply_torque(
                angular_velocity
                    * (-wind_density * angular_velocity.length() * body.angular_drag_factor),
            );
        }
    }

    fn integrate(&mut self, ctx: &Context) {
        let dt = ctx.elapsed_seconds;
        for body in self.bodies.iter_mut().filter(|b| !b.is_static) {
            body.velocity += body.acceleration * dt;
            body.angular_velocity += body.angular_acceleration * dt;
        }
    }

    fn apply_impulses(&mut self, ctx: &Context) {
        for _ in 0..ctx.impulse_iterations {
            for (_, constraint) in &mut self.constraints {
                constraint.apply_impulse(ctx, &mut self.bodies);
            }
            for constraint in &mut self.contacts {
                constraint.apply_impulse(ctx, &mut self.bodies);
            }
        }
    }

    fn apply_motion(&mut self, ctx: &Context) {
        let dt = ctx.elapsed_seconds;
        for body in self.bodies.iter_mut().filter(|b| !b.is_static) {
            let translation = body.velocity * dt;
            body.translate(translation);
            let rotation = body.angular_velocity * dt;
            body.rotate(rotation);
        }
    }

    fn apply_nudges(&mut self, ctx: &Context) {
        for _ in 0..ctx.nudge_iterations {
            for (_, constraint) in &mut self.constraints {
                constraint.apply_nudge(ctx, &mut self.bodies);
            }
            for constraint in &mut self.contacts {
                constraint.apply_nudge(ctx, &mut self.bodies);
            }
        }
    }
}
