//! Constraint-based rigid body dynamics for resin.
//!
//! Advances rigid bodies in fixed steps with a sequential-impulse solver:
//! - `Body` - rigid body state with force, impulse and nudge primitives
//! - `Jacobian` / `PairJacobian` - velocity-space constraint gradients
//! - `Constraint` - rods, pins, springs, axis/translation matching, limits and
//!   ground contacts
//! - `Engine` - fixed-step simulation with collision detection against static
//!   bodies
//!
//! ```
//! use std::time::Duration;
//! use glam::Vec3;
//! use unshape_dynamics::{
//!     Body, ChandelierConstraint, Engine, Placement, Shape, solid_sphere_inertia,
//! };
//!
//! let mut engine = Engine::new(Duration::from_millis(10));
//! engine
//!     .add_body(Body::new_static(Vec3::ZERO).with_shape(Placement::new(Shape::plane())))
//!     .unwrap();
//! let lamp = engine
//!     .add_body(Body::new(Vec3::new(0.5, 2.0, 0.0), 1.0, solid_sphere_inertia(1.0, 0.2)))
//!     .unwrap();
//! engine
//!     .add_constraint(ChandelierConstraint::new(Vec3::Y * 3.0, lamp, 1.0))
//!     .unwrap();
//!
//! engine.update(Duration::from_millis(500));
//! let position = engine.body(lamp).unwrap().position;
//! assert!(((position - Vec3::Y * 3.0).length() - 1.0).abs() < 0.05);
//! ```

mod arena;
mod body;
mod collision;
pub mod constraint;
mod engine;
mod error;
mod jacobian;
mod shape;

pub use arena::{BodyHandle, BodySet};
pub use body::{Body, RADIAL_EPSILON, solid_box_inertia, solid_sphere_inertia};
pub use collision::{
    IntersectionResult, IntersectionResultSet, Intersector, PrimitiveIntersector, box_box_aabb,
    box_plane, sphere_box, sphere_plane, sphere_sphere,
};
pub use constraint::{
    Activation, ChandelierConstraint, CoiloverConstraint, Constraint, Context,
    FixedTranslationConstraint, GroundCollisionConstraint, HingedRodConstraint,
    LimitTranslationConstraint, MatchAxisConstraint, MatchRotationConstraint,
    MatchTranslationConstraint, PairSolution, Solution,
};
pub use engine::{ConstraintHandle, Engine, EngineConfig};
pub use error::{DynamicsError, Result};
pub use jacobian::{Jacobian, PairJacobian};
pub use shape::{Placement, Shape};
