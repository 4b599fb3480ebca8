mod ik;

pub use ik::{ik, ik_from, ik_iter, ik_with, IkIter, IkOutcome, IkSolveParam, IkStatus, IkStep};

use nalgebra::{DVector, Isometry3, Matrix6xX};

use crate::errors::ModelError;
use crate::multi_body::{JointIndex, MultiBody};
use crate::spatial::adjoint;

/// What the inverse kinematics needs from a model.
///
/// Implementations are expected to be pure functions of `(self, q)`.
pub trait KinematicModel {
    fn nq(&self) -> usize;
    fn nv(&self) -> usize;
    fn neutral(&self) -> DVector<f64>;
    /// World placement of `joint` at `q`.
    fn joint_placement(&self, q: &DVector<f64>, joint: JointIndex) -> Result<Isometry3<f64>, ModelError>;
    /// 6×nv Jacobian of `joint` at `q`, expressed in the joint frame.
    fn joint_jacobian(&self, q: &DVector<f64>, joint: JointIndex) -> Result<Matrix6xX<f64>, ModelError>;
    fn integrate(&self, q: &DVector<f64>, v: &DVector<f64>) -> Result<DVector<f64>, ModelError>;
    /// Rejects configurations that are off the configuration manifold.
    fn check_normalized(&self, _q: &DVector<f64>) -> Result<(), ModelError> {
        Ok(())
    }
}

/// World placement of every joint, universe first.
pub fn forward_kinematics(model: &MultiBody, q: &DVector<f64>) -> Result<Vec<Isometry3<f64>>, ModelError> {
    model.check_configuration(q)?;
    let mut placements = Vec::with_capacity(model.njoints());
    placements.push(Isometry3::identity());
    for (index, joint) in model.joints().iter().enumerate().skip(1) {
        let placement = placements[joint.parent] * model.joint_transform(index, q);
        placements.push(placement);
    }
    Ok(placements)
}

/// Jacobian of `joint` expressed in its own frame.
///
/// Column `k` is the motion subspace of an ancestor joint `k` seen from `joint`.
pub fn joint_jacobian(model: &MultiBody, q: &DVector<f64>, joint: JointIndex) -> Result<Matrix6xX<f64>, ModelError> {
    let placements = forward_kinematics(model, q)?;
    let support = model.support(joint)?;
    let o_m_j_inv = placements[joint].inverse();
    let mut jacobian = Matrix6xX::zeros(model.nv());
    for k in support {
        let ancestor = &model.joints()[k];
        let column = adjoint(&(o_m_j_inv * placements[k])) * ancestor.kind.motion_subspace();
        jacobian.set_column(ancestor.idx_v, &column);
    }
    Ok(jacobian)
}

impl KinematicModel for MultiBody {
    fn nq(&self) -> usize {
        MultiBody::nq(self)
    }

    fn nv(&self) -> usize {
        MultiBody::nv(self)
    }

    fn neutral(&self) -> DVector<f64> {
        MultiBody::neutral(self)
    }

    fn joint_placement(&self, q: &DVector<f64>, joint: JointIndex) -> Result<Isometry3<f64>, ModelError> {
        self.check_configuration(q)?;
        Ok(self
            .support(joint)?
            .into_iter()
            .fold(Isometry3::identity(), |acc, k| acc * self.joint_transform(k, q)))
    }

    fn joint_jacobian(&self, q: &DVector<f64>, joint: JointIndex) -> Result<Matrix6xX<f64>, ModelError> {
        joint_jacobian(self, q, joint)
    }

    fn integrate(&self, q: &DVector<f64>, v: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        MultiBody::integrate(self, q, v)
    }

    fn check_normalized(&self, q: &DVector<f64>) -> Result<(), ModelError> {
        MultiBody::check_normalized(self, q)
    }
}
