//! Dynamics error types.

use thiserror::Error;

use crate::{BodyHandle, ConstraintHandle};

/// Errors that can occur while registering bodies and constraints.
///
/// The simulation step itself never fails; these only guard the inputs
/// that would otherwise turn into NaN/Inf inside the solver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DynamicsError {
    /// A dynamic body was given a mass that cannot be inverted.
    #[error("invalid mass for dynamic body: {0}")]
    InvalidMass(f32),

    /// A dynamic body was given a moment of inertia with no inverse.
    #[error("moment of inertia is singular")]
    SingularInertia,

    /// A constraint referenced a body that is not registered.
    #[error("unknown body: {0}")]
    UnknownBody(BodyHandle),

    /// A two-body constraint named the same body twice.
    #[error("constraint connects {0} to itself")]
    SameBody(BodyHandle),

    /// A constraint handle did not resolve to a registered constraint.
    #[error("unknown constraint: {0}")]
    UnknownConstraint(ConstraintHandle),
}

/// Result type for dynamics operations.
pub type Result<T> = std::result::Result<T, DynamicsError>;
