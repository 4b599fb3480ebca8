//! Damped least-squares inverse kinematics.
//!
//! Each iteration evaluates the pose error `err = log6(oMi⁻¹ · oMdes)` of the
//! target joint and, until it is small enough, moves the configuration along
//!
//! ```text
//! J = -Jlog6(iMd⁻¹) · J_local
//! v = -Jᵀ (J Jᵀ + λ·1)⁻¹ err
//! q ← integrate(q, v·dt)
//! ```

use nalgebra::{Cholesky, DVector, Isometry3, Matrix6, Matrix6xX};
use tracing::{debug, info};

use super::KinematicModel;
use crate::errors::{IkError, ModelError};
use crate::multi_body::JointIndex;
use crate::spatial::{jlog6, log6, SpatialVector};

/// Tuning of the solver. The defaults reproduce the classic demo settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkSolveParam {
    /// Convergence threshold on `‖err‖`, compared with a strict `<`.
    pub eps: f64,
    /// Maximum number of forward kinematics evaluations.
    pub max_iter: usize,
    /// Integration step applied to the joint velocity.
    pub dt: f64,
    /// Constant added to the diagonal of `J Jᵀ`.
    pub damping: f64,
}

impl Default for IkSolveParam {
    fn default() -> Self {
        Self {
            eps: 1e-4,
            max_iter: 1000,
            dt: 1e-1,
            damping: 1e-6,
        }
    }
}

impl IkSolveParam {
    pub fn with_eps(self, eps: f64) -> Self {
        Self { eps, ..self }
    }

    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self { max_iter, ..self }
    }

    pub fn with_dt(self, dt: f64) -> Self {
        Self { dt, ..self }
    }

    pub fn with_damping(self, damping: f64) -> Self {
        Self { damping, ..self }
    }

    fn validate(&self) -> Result<(), IkError> {
        if !(self.eps > 0.0) {
            return Err(IkError::InvalidParam("eps must be positive"));
        }
        if self.max_iter == 0 {
            return Err(IkError::InvalidParam("max_iter must be at least 1"));
        }
        if !self.dt.is_finite() {
            return Err(IkError::InvalidParam("dt must be finite"));
        }
        if !(self.damping >= 0.0) || !self.damping.is_finite() {
            return Err(IkError::InvalidParam("damping must be finite and non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkStatus {
    Running,
    Converged,
    Exhausted,
}

/// One forward kinematics evaluation of the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct IkStep {
    /// Zero-based index of the evaluation.
    pub iteration: usize,
    pub err: SpatialVector,
    pub status: IkStatus,
}

/// How a solve ended. `iterations` counts forward kinematics evaluations.
#[derive(Debug, Clone, PartialEq)]
pub enum IkOutcome {
    Converged {
        q: DVector<f64>,
        err: SpatialVector,
        iterations: usize,
    },
    Exhausted {
        q: DVector<f64>,
        err: SpatialVector,
        iterations: usize,
    },
}

impl IkOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, IkOutcome::Converged { .. })
    }

    pub fn q(&self) -> &DVector<f64> {
        match self {
            IkOutcome::Converged { q, .. } | IkOutcome::Exhausted { q, .. } => q,
        }
    }

    pub fn err(&self) -> &SpatialVector {
        match self {
            IkOutcome::Converged { err, .. } | IkOutcome::Exhausted { err, .. } => err,
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            IkOutcome::Converged { iterations, .. } | IkOutcome::Exhausted { iterations, .. } => *iterations,
        }
    }
}

/// Lazy trace of a solve: yields one [`IkStep`] per forward kinematics
/// evaluation and stops after the converged or exhausted step, or after the
/// first error.
#[derive(Debug)]
pub struct IkIter<'a, M: KinematicModel> {
    model: &'a M,
    target: Isometry3<f64>,
    joint: JointIndex,
    param: IkSolveParam,
    q: DVector<f64>,
    err: SpatialVector,
    evaluations: usize,
    status: IkStatus,
    failed: bool,
}

impl<'a, M: KinematicModel> IkIter<'a, M> {
    pub fn new(
        model: &'a M,
        q0: DVector<f64>,
        target: &Isometry3<f64>,
        joint: JointIndex,
        param: IkSolveParam,
    ) -> Result<Self, IkError> {
        param.validate()?;
        ModelError::check_size("configuration", model.nq(), q0.len())?;
        model.check_normalized(&q0)?;
        Ok(Self {
            model,
            target: *target,
            joint,
            param,
            q: q0,
            err: SpatialVector::zeros(),
            evaluations: 0,
            status: IkStatus::Running,
            failed: false,
        })
    }

    /// Current configuration.
    pub fn q(&self) -> &DVector<f64> {
        &self.q
    }

    pub fn status(&self) -> IkStatus {
        self.status
    }

    /// The result so far. A trace left before its terminal step counts as exhausted.
    pub fn outcome(self) -> IkOutcome {
        let (q, err, iterations) = (self.q, self.err, self.evaluations);
        match self.status {
            IkStatus::Converged => IkOutcome::Converged { q, err, iterations },
            IkStatus::Running | IkStatus::Exhausted => IkOutcome::Exhausted { q, err, iterations },
        }
    }

    fn step(&mut self) -> Result<IkStep, IkError> {
        let iteration = self.evaluations;
        let o_m_i = self.model.joint_placement(&self.q, self.joint)?;
        self.evaluations += 1;
        let i_m_d = o_m_i.inverse() * self.target;
        self.err = log6(&i_m_d);
        let err_norm = self.err.norm();
        debug!(iteration, err_norm, "ik iteration");

        if err_norm < self.param.eps {
            self.status = IkStatus::Converged;
            info!(iterations = self.evaluations, err_norm, "ik converged");
        } else if self.evaluations >= self.param.max_iter {
            self.status = IkStatus::Exhausted;
            info!(iterations = self.evaluations, err_norm, "ik reached the iteration limit");
        } else {
            let jacobian = self.model.joint_jacobian(&self.q, self.joint)?;
            let jacobian = -jlog6(&i_m_d.inverse()) * jacobian;
            let v = damped_least_squares(&jacobian, &self.err, self.param.damping)
                .ok_or(IkError::DampedSolve { iteration })?;
            self.q = self.model.integrate(&self.q, &(v * self.param.dt))?;
        }

        Ok(IkStep {
            iteration,
            err: self.err,
            status: self.status,
        })
    }
}

impl<M: KinematicModel> Iterator for IkIter<'_, M> {
    type Item = Result<IkStep, IkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.status != IkStatus::Running {
            return None;
        }
        let step = self.step();
        if step.is_err() {
            self.failed = true;
        }
        Some(step)
    }
}

/// `v = -Jᵀ (J Jᵀ + λ·1)⁻¹ err`, `None` when the damped matrix is not positive definite.
pub(crate) fn damped_least_squares(
    jacobian: &Matrix6xX<f64>,
    err: &SpatialVector,
    damping: f64,
) -> Option<DVector<f64>> {
    let mut jjt: Matrix6<f64> = jacobian * jacobian.transpose();
    for i in 0..6 {
        jjt[(i, i)] += damping;
    }
    let x = Cholesky::new(jjt)?.solve(err);
    Some(-(jacobian.transpose() * x))
}

/// Trace of a solve started from the neutral configuration.
pub fn ik_iter<'a, M: KinematicModel>(
    model: &'a M,
    target: &Isometry3<f64>,
    joint: JointIndex,
    param: IkSolveParam,
) -> Result<IkIter<'a, M>, IkError> {
    IkIter::new(model, model.neutral(), target, joint, param)
}

/// Drives `joint` towards `target`, starting from the neutral configuration.
pub fn ik<M: KinematicModel>(
    model: &M,
    target: &Isometry3<f64>,
    joint: JointIndex,
    param: IkSolveParam,
) -> Result<IkOutcome, IkError> {
    ik_with(model, target, joint, param, |_| {})
}

/// Same as [`ik`], handing every step to `observe`.
pub fn ik_with<M: KinematicModel>(
    model: &M,
    target: &Isometry3<f64>,
    joint: JointIndex,
    param: IkSolveParam,
    observe: impl FnMut(&IkStep),
) -> Result<IkOutcome, IkError> {
    run(ik_iter(model, target, joint, param)?, observe)
}

/// Same as [`ik`], starting from `q0`.
pub fn ik_from<M: KinematicModel>(
    model: &M,
    q0: DVector<f64>,
    target: &Isometry3<f64>,
    joint: JointIndex,
    param: IkSolveParam,
) -> Result<IkOutcome, IkError> {
    run(IkIter::new(model, q0, target, joint, param)?, |_| {})
}

fn run<M: KinematicModel>(mut iter: IkIter<'_, M>, mut observe: impl FnMut(&IkStep)) -> Result<IkOutcome, IkError> {
    for step in iter.by_ref() {
        observe(&step?);
    }
    Ok(iter.outcome())
}
