//! # kidy-ik: kinematics and dynamics of kinematic trees.
//!
//! - [`multi_body`]: the joint tree, its configuration space and URDF loading.
//! - [`kinematics`]: forward kinematics, joint Jacobians and damped least-squares IK.
//! - [`dynamics`]: inverse dynamics, joint-space inertia, non-linear effects and gravity.
//! - [`spatial`]: SE(3) exponential/logarithm and spatial algebra over nalgebra.

// #![deny(missing_docs)]
#![deny(unsafe_code)]

mod errors;

pub mod dynamics;
pub mod kinematics;
pub mod multi_body;
pub mod spatial;

pub use dynamics::{crba, generalized_gravity, non_linear_effects, rnea};
pub use errors::{IkError, ModelError};
pub use kinematics::{forward_kinematics, ik, IkOutcome, IkSolveParam, KinematicModel};
pub use multi_body::{Joint, JointIndex, JointType, MultiBody, UNIVERSE};
pub use spatial::Inertia;
