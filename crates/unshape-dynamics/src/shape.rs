//! Collision shapes and their placements.
//!
//! A [`Placement`] positions a [`Shape`] relative to whatever owns it. Bodies
//! store placements in their local space; the engine transforms them into
//! world space before handing them to an [`Intersector`](crate::Intersector).

use glam::{Quat, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Collision shape geometry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Sphere centered on the placement origin.
    Sphere {
        /// Radius of the sphere.
        radius: f32,
    },
    /// Oriented box centered on the placement origin.
    Box {
        /// Half-extents along each local axis.
        half_extents: Vec3,
    },
    /// Infinite plane through the placement origin.
    ///
    /// The solid side lies below the placement's local Y axis.
    Plane,
}

impl Shape {
    /// Create a sphere shape.
    pub fn sphere(radius: f32) -> Self {
        Shape::Sphere { radius }
    }

    /// Create a box shape from half-extents.
    pub fn box_shape(half_extents: Vec3) -> Self {
        Shape::Box { half_extents }
    }

    /// Create a plane shape.
    pub fn plane() -> Self {
        Shape::Plane
    }
}

/// A shape with a position and orientation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    /// Offset of the shape origin.
    pub position: Vec3,
    /// Orientation of the shape.
    pub orientation: Quat,
    /// Shape geometry.
    pub shape: Shape,
}

impl Placement {
    /// Place a shape at the origin with identity orientation.
    pub fn new(shape: Shape) -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            shape,
        }
    }

    /// Set the placement offset.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set the placement orientation.
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    /// Returns this placement moved into the frame given by `position` and
    /// `orientation`.
    pub fn transformed(&self, position: Vec3, orientation: Quat) -> Placement {
        Placement {
            position: position + orientation * self.position,
            orientation: orientation * self.orientation,
            shape: self.shape.clone(),
        }
    }

    /// Plane normal in the placement's frame (its local Y axis).
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transformed_applies_parent_rotation() {
        let placement = Placement::new(Shape::sphere(1.0)).with_position(Vec3::X);
        let rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let world = placement.transformed(Vec3::new(0.0, 5.0, 0.0), rotation);

        assert!((world.position - Vec3::new(0.0, 6.0, 0.0)).length() < 1e-5);
        assert!(world.orientation.abs_diff_eq(rotation, 1e-6));
    }

    #[test]
    fn test_plane_up_follows_orientation() {
        let plane = Placement::new(Shape::plane())
            .with_orientation(Quat::from_rotation_x(std::f32::consts::PI));
        assert!((plane.up() + Vec3::Y).length() < 1e-5);
    }
}
