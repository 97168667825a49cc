//! Rigid body state.
//!
//! Provides the core [`Body`] type with mass, inertia, accelerations and the
//! force/impulse/nudge primitives the solver is built from.

use glam::{Mat3, Quat, Vec3};

use crate::Placement;

/// Rotations with a smaller magnitude than this are dropped by
/// [`Body::rotate`].
pub const RADIAL_EPSILON: f32 = 1e-5;

/// A rigid body in the simulation.
///
/// All arithmetic on a body is unconditional: a dynamic body with zero mass or
/// a singular moment of inertia produces NaN/Inf. The engine rejects such
/// bodies when they are added.
#[derive(Clone, Debug)]
pub struct Body {
    /// Position of the center of mass in world space.
    pub position: Vec3,
    /// Orientation as quaternion.
    pub orientation: Quat,
    /// Linear velocity.
    pub velocity: Vec3,
    /// Angular velocity.
    pub angular_velocity: Vec3,
    /// Linear acceleration accumulated for the current step.
    pub acceleration: Vec3,
    /// Angular acceleration accumulated for the current step.
    pub angular_acceleration: Vec3,
    /// Mass.
    pub mass: f32,
    /// Moment of inertia tensor in body-local space.
    pub moment_of_inertia: Mat3,
    /// Aerodynamic drag factor for linear motion.
    pub drag_factor: f32,
    /// Aerodynamic drag factor for rotation.
    pub angular_drag_factor: f32,
    /// Restitution (bounciness) 0-1.
    pub restitution_coef: f32,
    /// Collision shapes in body-local space.
    pub collision_shapes: Vec<Placement>,
    /// Whether this body is static (never integrated).
    pub is_static: bool,
    /// Whether this body touched a static body during the last step.
    pub in_collision: bool,
}

impl Body {
    /// Create a new dynamic body.
    pub fn new(position: Vec3, mass: f32, moment_of_inertia: Mat3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            angular_acceleration: Vec3::ZERO,
            mass,
            moment_of_inertia,
            drag_factor: 0.0,
            angular_drag_factor: 0.0,
            restitution_coef: 0.0,
            collision_shapes: Vec::new(),
            is_static: false,
            in_collision: false,
        }
    }

    /// Create a static (immovable) body.
    pub fn new_static(position: Vec3) -> Self {
        Self {
            is_static: true,
            ..Self::new(position, 0.0, Mat3::ZERO)
        }
    }

    /// Set the orientation.
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the linear velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the angular velocity.
    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Set linear and angular drag factors.
    pub fn with_drag(mut self, drag_factor: f32, angular_drag_factor: f32) -> Self {
        self.drag_factor = drag_factor.max(0.0);
        self.angular_drag_factor = angular_drag_factor.max(0.0);
        self
    }

    /// Set the restitution coefficient.
    pub fn with_restitution(mut self, restitution_coef: f32) -> Self {
        self.restitution_coef = restitution_coef.clamp(0.0, 1.0);
        self
    }

    /// Attach a collision shape.
    pub fn with_shape(mut self, placement: Placement) -> Self {
        self.collision_shapes.push(placement);
        self
    }

    /// Inverse of the moment of inertia.
    #[inline]
    pub fn inverse_moment_of_inertia(&self) -> Mat3 {
        self.moment_of_inertia.inverse()
    }

    /// Transform a body-local point into world space.
    #[inline]
    pub fn world_point(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    /// Velocity of a point at `radius` (world space) from the center of mass.
    #[inline]
    pub fn velocity_at(&self, radius: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(radius)
    }

    /// Move the body.
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Rotate the body by a scaled-axis vector (world space).
    ///
    /// The orientation is not re-normalized.
    pub fn rotate(&mut self, vector: Vec3) {
        let angle = vector.length();
        if angle < RADIAL_EPSILON {
            return;
        }
        self.orientation = Quat::from_axis_angle(vector / angle, angle) * self.orientation;
    }

    /// Clear linear acceleration.
    pub fn reset_acceleration(&mut self) {
        self.acceleration = Vec3::ZERO;
    }

    /// Clear angular acceleration.
    pub fn reset_angular_acceleration(&mut self) {
        self.angular_acceleration = Vec3::ZERO;
    }

    /// Add a mass-independent acceleration (gravity).
    pub fn add_acceleration(&mut self, amount: Vec3) {
        self.acceleration += amount;
    }

    /// Add a mass-independent angular acceleration.
    pub fn add_angular_acceleration(&mut self, amount: Vec3) {
        self.angular_acceleration += amount;
    }

    /// Apply a force at the center of mass.
    pub fn apply_force(&mut self, force: Vec3) {
        self.add_acceleration(force / self.mass);
    }

    /// Apply a torque.
    ///
    /// FIXME: the torque is world space but the inertia is body-local.
    pub fn apply_torque(&mut self, torque: Vec3) {
        self.add_angular_acceleration(self.inverse_moment_of_inertia() * torque);
    }

    /// Apply a force at `offset` (world space) from the center of mass.
    pub fn apply_offset_force(&mut self, offset: Vec3, force: Vec3) {
        self.apply_force(force);
        self.apply_torque(offset.cross(force));
    }

    /// Apply an impulse at the center of mass.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.velocity += impulse / self.mass;
    }

    /// Apply an angular impulse.
    pub fn apply_angular_impulse(&mut self, impulse: Vec3) {
        self.angular_velocity += self.inverse_moment_of_inertia() * impulse;
    }

    /// Apply an impulse at `offset` (world space) from the center of mass.
    pub fn apply_offset_impulse(&mut self, offset: Vec3, impulse: Vec3) {
        self.apply_impulse(impulse);
        self.apply_angular_impulse(offset.cross(impulse));
    }

    /// Move the body as if an impulse had acted over one unit of time.
    pub fn apply_nudge(&mut self, nudge: Vec3) {
        self.translate(nudge / self.mass);
    }

    /// Rotate the body as if an angular impulse had acted over one unit of
    /// time.
    pub fn apply_angular_nudge(&mut self, nudge: Vec3) {
        self.rotate(self.inverse_moment_of_inertia() * nudge);
    }
}

/// Moment of inertia of a solid sphere.
pub fn solid_sphere_inertia(mass: f32, radius: f32) -> Mat3 {
    Mat3::from_diagonal(Vec3::splat(0.4 * mass * radius * radius))
}

/// Moment of inertia of a solid box with the given half-extents.
pub fn solid_box_inertia(mass: f32, half_extents: Vec3) -> Mat3 {
    let e = half_extents * 2.0;
    let factor = mass / 12.0;
    Mat3::from_diagonal(Vec3::new(
        factor * (e.y * e.y + e.z * e.z),
        factor * (e.x * e.x + e.z * e.z),
        factor * (e.x * e.x + e.y * e.y),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball() -> Body {
        Body::new(Vec3::ZERO, 2.0, solid_sphere_inertia(2.0, 0.5))
    }

    #[test]
    fn test_apply_impulse_scales_by_mass() {
        let mut body = ball();
        body.apply_impulse(Vec3::new(4.0, 0.0, -2.0));
        assert_eq!(body.velocity, Vec3::new(2.0, 0.0, -1.0));

        body.apply_impulse(Vec3::new(4.0, 0.0, -2.0));
        assert_eq!(body.velocity, Vec3::new(4.0, 0.0, -2.0));
    }

    #[test]
    fn test_apply_force_accumulates_acceleration() {
        let mut body = ball();
        body.apply_force(Vec3::new(10.0, 0.0, 0.0));
        body.add_acceleration(Vec3::new(0.0, -9.8, 0.0));
        assert_eq!(body.acceleration, Vec3::new(5.0, -9.8, 0.0));

        body.reset_acceleration();
        assert_eq!(body.acceleration, Vec3::ZERO);
    }

    #[test]
    fn test_apply_torque_uses_inverse_inertia() {
        let mut body = Body::new(Vec3::ZERO, 1.0, Mat3::from_diagonal(Vec3::new(2.0, 4.0, 8.0)));
        body.apply_torque(Vec3::new(2.0, 2.0, 2.0));
        assert!((body.angular_acceleration - Vec3::new(1.0, 0.5, 0.25)).length() < 1e-6);
    }

    #[test]
    fn test_offset_impulse_spins_body() {
        let mut body = Body::new(Vec3::ZERO, 1.0, Mat3::IDENTITY);
        body.apply_offset_impulse(Vec3::X, Vec3::Y);
        assert_eq!(body.velocity, Vec3::Y);
        assert!((body.angular_velocity - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_offset_force_produces_torque() {
        let mut body = Body::new(Vec3::ZERO, 1.0, Mat3::IDENTITY);
        body.apply_offset_force(Vec3::Z, Vec3::X);
        assert_eq!(body.acceleration, Vec3::X);
        assert!((body.angular_acceleration - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_rotate_ignores_tiny_rotation() {
        let mut body = ball();
        body.rotate(Vec3::splat(RADIAL_EPSILON * 0.1));
        assert_eq!(body.orientation, Quat::IDENTITY);
    }

    #[test]
    fn test_rotate_about_axis() {
        let mut body = ball();
        body.rotate(Vec3::Z * std::f32::consts::FRAC_PI_2);
        let x = body.orientation * Vec3::X;
        assert!((x - Vec3::Y).length() < 1e-5, "x = {:?}", x);
    }

    #[test]
    fn test_nudge_moves_position_not_velocity() {
        let mut body = ball();
        body.apply_nudge(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(body.position, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(body.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_velocity_at_radius() {
        let body = ball().with_angular_velocity(Vec3::Y);
        let v = body.velocity_at(Vec3::X);
        assert!((v + Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_static_body() {
        let body = Body::new_static(Vec3::ZERO);
        assert!(body.is_static);
        assert_eq!(body.mass, 0.0);
    }

    #[test]
    fn test_box_inertia_of_cube() {
        let inertia = solid_box_inertia(12.0, Vec3::splat(0.5));
        assert!((inertia.x_axis.x - 2.0).abs() < 1e-6);
        assert!((inertia.y_axis.y - 2.0).abs() < 1e-6);
        assert!((inertia.z_axis.z - 2.0).abs() < 1e-6);
    }
}
