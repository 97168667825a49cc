//! Contact resolution against static geometry.

use glam::Vec3;

use super::Context;
use crate::{Body, BodyHandle, Jacobian};

/// Coulomb friction coefficient used for ground contacts.
pub const FRICTION_COEFFICIENT: f32 = 0.9;

/// Scale applied to a body's restitution for a given impact speed.
///
/// Slow impacts do not bounce at all, which keeps resting contacts from
/// jittering.
pub fn restitution_clamp(speed: f32) -> f32 {
    let speed = speed.abs();
    if speed < 0.5 {
        0.0
    } else if speed < 1.0 {
        0.05
    } else if speed < 2.0 {
        0.1
    } else {
        1.0
    }
}

/// A detected contact between a dynamic body and a static body.
///
/// Created fresh by collision detection every step.
#[derive(Clone, Debug)]
pub struct GroundCollisionConstraint {
    /// Dynamic body in contact.
    pub body: BodyHandle,
    /// Unit direction that moves the body out of the ground.
    pub normal: Vec3,
    /// World-space contact point on the body.
    pub contact_point: Vec3,
    /// Penetration depth.
    pub depth: f32,
}

impl GroundCollisionConstraint {
    /// Create a contact.
    pub fn new(body: BodyHandle, normal: Vec3, contact_point: Vec3, depth: f32) -> Self {
        Self {
            body,
            normal,
            contact_point,
            depth,
        }
    }

    /// Bounce the body off the ground and apply friction.
    ///
    /// Penetration is resolved by adding a depth-proportional term to the
    /// normal impulse instead of a separate positional pass.
    pub fn apply_impulse(&self, ctx: &Context, body: &mut Body) {
        let radius = self.contact_point - body.position;
        let normal_velocity = self.normal.dot(body.velocity_at(radius));
        if normal_velocity > 0.0 {
            return;
        }

        let restitution = body.restitution_coef * restitution_clamp(normal_velocity);

        let normal_jacobian = Jacobian::new(self.normal, radius.cross(self.normal));
        let inverse_mass = normal_jacobian.inverse_effective_mass(body);
        if inverse_mass <= 0.0 {
            return;
        }
        let effective_mass = 1.0 / inverse_mass;

        let impulse_strength =
            (1.0 + restitution) * effective_mass * normal_velocity - effective_mass * self.depth;
        body.apply_offset_impulse(radius, self.normal * -impulse_strength);

        let contact_velocity = body.velocity_at(radius);
        let lateral_velocity = contact_velocity - self.normal * self.normal.dot(contact_velocity);
        if lateral_velocity.length_squared() <= ctx.sqr_epsilon() {
            return;
        }

        let lateral_speed = lateral_velocity.length();
        let tangent = lateral_velocity / lateral_speed;
        let lateral_jacobian = Jacobian::new(tangent, radius.cross(tangent));
        let lateral_inverse_mass = lateral_jacobian.inverse_effective_mass(body);
        if lateral_inverse_mass <= 0.0 {
            return;
        }

        let max_friction = impulse_strength.abs() * FRICTION_COEFFICIENT;
        let lateral_strength = (lateral_speed / lateral_inverse_mass).min(max_friction);
        body.apply_offset_impulse(radius, tangent * -lateral_strength);
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat3;

    use super::*;
    use crate::constraint::test_context;
    use crate::BodySet;
    use crate::body::solid_sphere_inertia;

    fn ball(velocity: Vec3, restitution: f32) -> Body {
        Body::new(Vec3::Y * 0.5, 1.0, solid_sphere_inertia(1.0, 0.5))
            .with_velocity(velocity)
            .with_restitution(restitution)
    }

    fn contact() -> GroundCollisionConstraint {
        let mut set = BodySet::new();
        let handle = set.insert(Body::new(Vec3::ZERO, 1.0, Mat3::IDENTITY));
        GroundCollisionConstraint::new(handle, Vec3::Y, Vec3::ZERO, 0.0)
    }

    #[test]
    fn test_restitution_tiers() {
        assert_eq!(restitution_clamp(0.2), 0.0);
        assert_eq!(restitution_clamp(-0.7), 0.05);
        assert_eq!(restitution_clamp(1.5), 0.1);
        assert_eq!(restitution_clamp(-2.0), 1.0);
        assert_eq!(restitution_clamp(10.0), 1.0);
    }

    #[test]
    fn test_separating_contact_is_ignored() {
        let ctx = test_context();
        let mut body = ball(Vec3::new(1.0, 2.0, 0.0), 1.0);
        contact().apply_impulse(&ctx, &mut body);

        assert_eq!(body.velocity, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(body.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_fast_impact_bounces_fully() {
        let ctx = test_context();
        let mut body = ball(Vec3::Y * -3.0, 1.0);
        contact().apply_impulse(&ctx, &mut body);

        assert!((body.velocity.y - 3.0).abs() < 1e-4, "velocity = {:?}", body.velocity);
    }

    #[test]
    fn test_slow_impact_does_not_bounce() {
        let ctx = test_context();
        let mut body = ball(Vec3::Y * -0.3, 1.0);
        contact().apply_impulse(&ctx, &mut body);

        assert!(body.velocity.y.abs() < 1e-5, "velocity = {:?}", body.velocity);
    }

    #[test]
    fn test_medium_impact_bounces_partially() {
        let ctx = test_context();
        let mut body = ball(Vec3::Y * -1.5, 1.0);
        contact().apply_impulse(&ctx, &mut body);

        assert!((body.velocity.y - 0.15).abs() < 1e-4, "velocity = {:?}", body.velocity);
    }

    #[test]
    fn test_penetration_adds_push() {
        let ctx = test_context();
        let mut body = ball(Vec3::Y * -0.3, 0.0);
        let mut deep = contact();
        deep.depth = 0.1;
        deep.apply_impulse(&ctx, &mut body);

        assert!((body.velocity.y - 0.1).abs() < 1e-4, "velocity = {:?}", body.velocity);
    }

    #[test]
    fn test_friction_is_capped_by_normal_impulse() {
        let ctx = test_context();
        let mut body = ball(Vec3::new(10.0, -0.6, 0.0), 0.0);
        contact().apply_impulse(&ctx, &mut body);

        // Friction cannot remove more than 0.9 * 0.6 of lateral momentum
        let lost = 10.0 - body.velocity.x;
        assert!(lost > 0.0);
        assert!(lost <= 0.6 * FRICTION_COEFFICIENT + 1e-4, "lost = {}", lost);
    }

    #[test]
    fn test_friction_stops_slow_sliding() {
        let ctx = test_context();
        let mut body = ball(Vec3::new(0.05, -1.0, 0.0), 0.0);
        contact().apply_impulse(&ctx, &mut body);

        let contact_velocity = body.velocity_at(-Vec3::Y * 0.5);
        assert!(contact_velocity.x.abs() < 1e-4, "velocity = {:?}", contact_velocity);
    }
}
