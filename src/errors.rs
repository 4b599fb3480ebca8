use thiserror::Error;

/// Errors raised while building or evaluating a [`MultiBody`](crate::MultiBody).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read urdf: {0}")]
    Urdf(#[from] urdf_rs::UrdfError),

    #[error("no root link found")]
    NoRootLink,

    #[error("multiple root links found: {0:?}")]
    MultipleRootLinks(Vec<String>),

    #[error("joint {name} has unsupported type {kind}")]
    UnsupportedJoint { name: String, kind: String },

    #[error("joint {name} has a zero-length axis")]
    ZeroAxis { name: String },

    #[error("unknown joint index {0}")]
    UnknownJoint(usize),

    #[error("joint {name} has a (cos, sin) pair of norm {norm}, expected 1")]
    NotNormalized { name: String, norm: f64 },

    #[error("{what} has size {actual}, expected {expected}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl ModelError {
    pub(crate) fn check_size(what: &'static str, expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(ModelError::SizeMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}

/// Faults of the inverse kinematics solver.
///
/// Running out of iterations is not one of them, see [`IkOutcome`](crate::IkOutcome).
#[derive(Debug, Error)]
pub enum IkError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("damped normal matrix is not positive definite at iteration {iteration}")]
    DampedSolve { iteration: usize },

    #[error("invalid solver parameter: {0}")]
    InvalidParam(&'static str),
}
