//! Intersection testing between placed shapes.
//!
//! The engine only consumes [`IntersectionResult`]s; the geometry behind them
//! is supplied by an [`Intersector`]. [`PrimitiveIntersector`] covers the
//! sphere, box and plane shapes from [`Shape`].

use glam::{Mat3, Vec3};

use crate::{Placement, Shape};

/// A single overlap between two placements.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionResult {
    /// Deepest point of the first shape, in world space.
    pub first_contact: Vec3,
    /// Deepest point of the second shape, in world space.
    pub second_contact: Vec3,
    /// Unit direction that moves the first shape out of the second.
    pub first_displace_normal: Vec3,
    /// Unit direction that moves the second shape out of the first.
    pub second_displace_normal: Vec3,
    /// Penetration depth.
    pub depth: f32,
}

impl IntersectionResult {
    /// Swap the roles of the first and second shape.
    #[inline]
    pub fn flipped(self) -> Self {
        Self {
            first_contact: self.second_contact,
            second_contact: self.first_contact,
            first_displace_normal: self.second_displace_normal,
            second_displace_normal: self.first_displace_normal,
            depth: self.depth,
        }
    }
}

/// Reusable container for intersection results.
///
/// The engine keeps one set alive across steps and resets it before every
/// placement pair so no allocation happens once it has warmed up.
#[derive(Clone, Debug, Default)]
pub struct IntersectionResultSet {
    intersections: Vec<IntersectionResult>,
    flipped: bool,
}

impl IntersectionResultSet {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all results.
    pub fn reset(&mut self) {
        self.intersections.clear();
        self.flipped = false;
    }

    /// Record an intersection.
    ///
    /// While [`Self::with_flipped`] is running, the result is stored with
    /// its sides swapped.
    pub fn add(&mut self, result: IntersectionResult) {
        if self.flipped {
            self.intersections.push(result.flipped());
        } else {
            self.intersections.push(result);
        }
    }

    /// Run `f` with first/second swapped for every added result.
    ///
    /// Lets a shape pair test written for `(a, b)` also serve `(b, a)`.
    pub fn with_flipped(&mut self, f: impl FnOnce(&mut Self)) {
        let previous = self.flipped;
        self.flipped = !previous;
        f(self);
        self.flipped = previous;
    }

    /// Whether any intersection was recorded.
    pub fn found(&self) -> bool {
        !self.intersections.is_empty()
    }

    /// Recorded intersections.
    pub fn intersections(&self) -> &[IntersectionResult] {
        &self.intersections
    }
}

/// Narrow-phase collision test between two world-space placements.
pub trait Intersector {
    /// Append every overlap between `first` and `second` to `result_set`.
    ///
    /// Implementations must not clear `result_set`.
    fn check_intersection(
        &self,
        first: &Placement,
        second: &Placement,
        result_set: &mut IntersectionResultSet,
    );
}

/// Intersection tests for the built-in primitive shapes.
///
/// Box-box overlap is approximated with axis-aligned boxes.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrimitiveIntersector;

impl Intersector for PrimitiveIntersector {
    fn check_intersection(
        &self,
        first: &Placement,
        second: &Placement,
        result_set: &mut IntersectionResultSet,
    ) {
        match (&first.shape, &second.shape) {
            (Shape::Sphere { radius: r1 }, Shape::Sphere { radius: r2 }) => {
                sphere_sphere(first.position, *r1, second.position, *r2, result_set);
            }
            (Shape::Sphere { radius }, Shape::Plane) => {
                sphere_plane(first.position, *radius, second, result_set);
            }
            (Shape::Plane, Shape::Sphere { radius }) => {
                result_set.with_flipped(|set| sphere_plane(second.position, *radius, first, set));
            }
            (Shape::Box { half_extents }, Shape::Plane) => {
                box_plane(first, *half_extents, second, result_set);
            }
            (Shape::Plane, Shape::Box { half_extents }) => {
                result_set.with_flipped(|set| box_plane(second, *half_extents, first, set));
            }
            (Shape::Sphere { radius }, Shape::Box { half_extents }) => {
                sphere_box(first.position, *radius, second, *half_extents, result_set);
            }
            (Shape::Box { half_extents }, Shape::Sphere { radius }) => {
                result_set.with_flipped(|set| {
                    sphere_box(second.position, *radius, first, *half_extents, set);
                });
            }
            (Shape::Box { half_extents: he1 }, Shape::Box { half_extents: he2 }) => {
                box_box_aabb(first.position, *he1, second.position, *he2, result_set);
            }
            (Shape::Plane, Shape::Plane) => {}
        }
    }
}

/// Test sphere-sphere overlap.
pub fn sphere_sphere(
    pos_a: Vec3,
    radius_a: f32,
    pos_b: Vec3,
    radius_b: f32,
    result_set: &mut IntersectionResultSet,
) {
    let d = pos_b - pos_a;
    let dist_sq = d.length_squared();
    let radius_sum = radius_a + radius_b;

    if dist_sq >= radius_sum * radius_sum {
        return;
    }

    let dist = dist_sq.sqrt();
    // Points from A toward B
    let normal = if dist > 0.0 { d / dist } else { Vec3::Y };

    result_set.add(IntersectionResult {
        first_contact: pos_a + normal * radius_a,
        second_contact: pos_b - normal * radius_b,
        first_displace_normal: -normal,
        second_displace_normal: normal,
        depth: radius_sum - dist,
    });
}

/// Test sphere-plane overlap. The sphere is the first shape.
pub fn sphere_plane(
    sphere_pos: Vec3,
    radius: f32,
    plane: &Placement,
    result_set: &mut IntersectionResultSet,
) {
    let normal = plane.up();
    let dist = (sphere_pos - plane.position).dot(normal);

    if dist >= radius {
        return;
    }

    result_set.add(IntersectionResult {
        first_contact: sphere_pos - normal * radius,
        second_contact: sphere_pos - normal * dist,
        first_displace_normal: normal,
        second_displace_normal: -normal,
        depth: radius - dist,
    });
}

/// Test box-plane overlap. The box is the first shape.
///
/// Every box corner below the plane produces its own intersection so that a
/// resting box is supported on all of its touching corners.
pub fn box_plane(
    box_placement: &Placement,
    half_extents: Vec3,
    plane: &Placement,
    result_set: &mut IntersectionResultSet,
) {
    let normal = plane.up();
    let rot = Mat3::from_quat(box_placement.orientation);
    let axes = [
        rot.col(0) * half_extents.x,
        rot.col(1) * half_extents.y,
        rot.col(2) * half_extents.z,
    ];

    for sx in [-1.0_f32, 1.0] {
        for sy in [-1.0_f32, 1.0] {
            for sz in [-1.0_f32, 1.0] {
                let vertex = box_placement.position + axes[0] * sx + axes[1] * sy + axes[2] * sz;
                let dist = (vertex - plane.position).dot(normal);
                if dist < 0.0 {
                    result_set.add(IntersectionResult {
                        first_contact: vertex,
                        second_contact: vertex - normal * dist,
                        first_displace_normal: normal,
                        second_displace_normal: -normal,
                        depth: -dist,
                    });
                }
            }
        }
    }
}

/// Test sphere-box overlap. The sphere is the first shape.
pub fn sphere_box(
    sphere_pos: Vec3,
    radius: f32,
    box_placement: &Placement,
    half_extents: Vec3,
    result_set: &mut IntersectionResultSet,
) {
    // Sphere center in box local space
    let box_rot = box_placement.orientation;
    let local_pos = box_rot.inverse() * (sphere_pos - box_placement.position);

    let clamped = local_pos.clamp(-half_extents, half_extents);
    let diff = local_pos - clamped;
    let dist_sq = diff.length_squared();

    if dist_sq >= radius * radius {
        return;
    }

    let dist = dist_sq.sqrt();
    let (local_normal, depth) = if dist > 0.0 {
        (diff / dist, radius - dist)
    } else {
        // Center inside the box: push out along the shallowest axis
        let penetrations = half_extents - local_pos.abs();
        if penetrations.x < penetrations.y && penetrations.x < penetrations.z {
            (Vec3::X * local_pos.x.signum(), radius + penetrations.x)
        } else if penetrations.y < penetrations.z {
            (Vec3::Y * local_pos.y.signum(), radius + penetrations.y)
        } else {
            (Vec3::Z * local_pos.z.signum(), radius + penetrations.z)
        }
    };

    let normal = box_rot * local_normal;

    result_set.add(IntersectionResult {
        first_contact: sphere_pos - normal * radius,
        second_contact: box_placement.position + box_rot * clamped,
        first_displace_normal: normal,
        second_displace_normal: -normal,
        depth,
    });
}

/// Test box-box overlap as axis-aligned boxes (ignores rotation).
pub fn box_box_aabb(
    pos_a: Vec3,
    he_a: Vec3,
    pos_b: Vec3,
    he_b: Vec3,
    result_set: &mut IntersectionResultSet,
) {
    let delta = pos_b - pos_a;
    let overlap = (he_a + he_b) - delta.abs();

    if overlap.x <= 0.0 || overlap.y <= 0.0 || overlap.z <= 0.0 {
        return;
    }

    // Axis of minimum penetration, pointing from A toward B
    let min_overlap = overlap.min_element();
    let normal = if min_overlap == overlap.x {
        Vec3::X * sign_or_one(delta.x)
    } else if min_overlap == overlap.y {
        Vec3::Y * sign_or_one(delta.y)
    } else {
        Vec3::Z * sign_or_one(delta.z)
    };

    let midpoint = (pos_a + pos_b) * 0.5;

    result_set.add(IntersectionResult {
        first_contact: midpoint + normal * (min_overlap * 0.5),
        second_contact: midpoint - normal * (min_overlap * 0.5),
        first_displace_normal: -normal,
        second_displace_normal: normal,
        depth: min_overlap,
    });
}

fn sign_or_one(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> Placement {
        Placement::new(Shape::plane())
    }

    #[test]
    fn test_sphere_above_plane_has_no_intersection() {
        let mut set = IntersectionResultSet::new();
        let sphere = Placement::new(Shape::sphere(1.0)).with_position(Vec3::Y * 2.0);
        PrimitiveIntersector.check_intersection(&sphere, &ground(), &mut set);
        assert!(!set.found());
    }

    #[test]
    fn test_sphere_plane_contact() {
        let mut set = IntersectionResultSet::new();
        let sphere = Placement::new(Shape::sphere(1.0)).with_position(Vec3::Y * 0.75);
        PrimitiveIntersector.check_intersection(&sphere, &ground(), &mut set);

        let result = &set.intersections()[0];
        assert!((result.depth - 0.25).abs() < 1e-5);
        assert_eq!(result.first_displace_normal, Vec3::Y);
        assert_eq!(result.second_displace_normal, -Vec3::Y);
        assert!((result.first_contact - Vec3::new(0.0, -0.25, 0.0)).length() < 1e-5);
        assert!(result.second_contact.y.abs() < 1e-5);
    }

    #[test]
    fn test_plane_sphere_is_flipped() {
        let mut set = IntersectionResultSet::new();
        let sphere = Placement::new(Shape::sphere(1.0)).with_position(Vec3::Y * 0.5);
        PrimitiveIntersector.check_intersection(&ground(), &sphere, &mut set);

        let result = &set.intersections()[0];
        assert_eq!(result.second_displace_normal, Vec3::Y);
        assert_eq!(result.first_displace_normal, -Vec3::Y);
        assert!((result.second_contact.y + 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_resting_box_touches_four_corners() {
        let mut set = IntersectionResultSet::new();
        let cube = Placement::new(Shape::box_shape(Vec3::splat(0.5))).with_position(Vec3::Y * 0.45);
        PrimitiveIntersector.check_intersection(&cube, &ground(), &mut set);

        assert_eq!(set.intersections().len(), 4);
        for result in set.intersections() {
            assert!((result.depth - 0.05).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sphere_sphere_normals_point_apart() {
        let mut set = IntersectionResultSet::new();
        sphere_sphere(Vec3::ZERO, 1.0, Vec3::X * 1.5, 1.0, &mut set);

        let result = &set.intersections()[0];
        assert!((result.depth - 0.5).abs() < 1e-5);
        assert_eq!(result.first_displace_normal, -Vec3::X);
        assert_eq!(result.second_displace_normal, Vec3::X);
    }

    #[test]
    fn test_sphere_box_outside_face() {
        let mut set = IntersectionResultSet::new();
        let cube = Placement::new(Shape::box_shape(Vec3::ONE));
        sphere_box(Vec3::new(0.0, 1.5, 0.0), 1.0, &cube, Vec3::ONE, &mut set);

        let result = &set.intersections()[0];
        assert!((result.depth - 0.5).abs() < 1e-5);
        assert!((result.first_displace_normal - Vec3::Y).length() < 1e-5);
        assert!((result.second_contact - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_box_box_separated() {
        let mut set = IntersectionResultSet::new();
        box_box_aabb(Vec3::ZERO, Vec3::ONE, Vec3::X * 3.0, Vec3::ONE, &mut set);
        assert!(!set.found());
    }

    #[test]
    fn test_reset_clears_results() {
        let mut set = IntersectionResultSet::new();
        sphere_sphere(Vec3::ZERO, 1.0, Vec3::X, 1.0, &mut set);
        assert!(set.found());
        set.reset();
        assert!(!set.found());
    }
}
