//! Kinematic tree of single-DoF joints.

pub mod sample;
mod urdf;

use core::f64::consts::PI;

use nalgebra::{DVector, Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use rand::Rng;

use crate::errors::ModelError;
use crate::spatial::{spatial_vec, Inertia, SpatialVector};

/// Index of a joint in a [`MultiBody`]. `0` is the universe.
pub type JointIndex = usize;

pub const UNIVERSE: JointIndex = 0;

const NORMALIZED_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub enum JointType {
    /// The fixed world frame at index 0.
    Universe,
    Revolute { axis: Unit<Vector3<f64>> },
    /// Revolute joint without limits, stored as `(cos θ, sin θ)`.
    RevoluteUnbounded { axis: Unit<Vector3<f64>> },
    Prismatic { axis: Unit<Vector3<f64>> },
}

impl JointType {
    pub fn nq(&self) -> usize {
        match self {
            JointType::Universe => 0,
            JointType::Revolute { .. } | JointType::Prismatic { .. } => 1,
            JointType::RevoluteUnbounded { .. } => 2,
        }
    }

    pub fn nv(&self) -> usize {
        match self {
            JointType::Universe => 0,
            _ => 1,
        }
    }

    /// Motion subspace in the joint frame.
    pub fn motion_subspace(&self) -> SpatialVector {
        match self {
            JointType::Universe => SpatialVector::zeros(),
            JointType::Revolute { axis } | JointType::RevoluteUnbounded { axis } => {
                spatial_vec(axis, &Vector3::zeros())
            }
            JointType::Prismatic { axis } => spatial_vec(&Vector3::zeros(), axis),
        }
    }

    /// Motion of the joint for its slice of the configuration vector.
    pub fn transform(&self, q: &[f64]) -> Isometry3<f64> {
        match self {
            JointType::Universe => Isometry3::identity(),
            JointType::Revolute { axis } => {
                Isometry3::from_parts(Translation3::identity(), UnitQuaternion::from_axis_angle(axis, q[0]))
            }
            JointType::RevoluteUnbounded { axis } => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(axis, q[1].atan2(q[0])),
            ),
            JointType::Prismatic { axis } => Isometry3::from_parts(
                Translation3::from(axis.into_inner() * q[0]),
                UnitQuaternion::identity(),
            ),
        }
    }

    fn neutral(&self, out: &mut [f64]) {
        match self {
            JointType::RevoluteUnbounded { .. } => {
                out[0] = 1.0;
                out[1] = 0.0;
            }
            _ => out.iter_mut().for_each(|x| *x = 0.0),
        }
    }

    fn integrate(&self, q: &[f64], v: f64, out: &mut [f64]) {
        match self {
            JointType::Universe => {}
            JointType::RevoluteUnbounded { .. } => {
                let (s, c) = v.sin_cos();
                let ca = q[0] * c - q[1] * s;
                let sa = q[1] * c + q[0] * s;
                // stay on the unit circle
                let norm = ca.hypot(sa);
                out[0] = ca / norm;
                out[1] = sa / norm;
            }
            _ => out[0] = q[0] + v,
        }
    }

    fn difference(&self, q0: &[f64], q1: &[f64]) -> f64 {
        match self {
            JointType::Universe => 0.0,
            JointType::RevoluteUnbounded { .. } => {
                let c = q0[0] * q1[0] + q0[1] * q1[1];
                let s = q0[0] * q1[1] - q0[1] * q1[0];
                s.atan2(c)
            }
            _ => q1[0] - q0[0],
        }
    }

    fn random(&self, limits: &JointLimits, rng: &mut impl Rng, out: &mut [f64]) {
        match self {
            JointType::Universe => {}
            JointType::RevoluteUnbounded { .. } => {
                let angle: f64 = rng.gen_range(-PI..PI);
                out[0] = angle.cos();
                out[1] = angle.sin();
            }
            _ => {
                let limits = JointLimits::new(limits.lower, limits.upper);
                out[0] = rng.gen_range(limits.lower..=limits.upper)
            }
        }
    }
}

/// Position limits of a bounded joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    pub lower: f64,
    pub upper: f64,
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            lower: -PI,
            upper: PI,
        }
    }
}

impl JointLimits {
    /// Falls back to the default range when `lower..=upper` is empty or not finite.
    pub fn new(lower: f64, upper: f64) -> Self {
        if lower.is_finite() && upper.is_finite() && lower < upper {
            Self { lower, upper }
        } else {
            Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub parent: JointIndex,
    pub kind: JointType,
    /// Pose of the joint frame in the parent joint frame.
    pub placement: Isometry3<f64>,
    /// Everything rigidly attached to the joint, in the joint frame.
    pub inertia: Inertia,
    pub limits: JointLimits,
    pub idx_q: usize,
    pub idx_v: usize,
}

#[derive(Debug, Clone)]
pub struct MultiBody {
    pub name: String,
    pub gravity: Vector3<f64>,
    joints: Vec<Joint>,
    nq: usize,
    nv: usize,
}

impl MultiBody {
    pub fn new(name: impl Into<String>) -> MultiBody {
        MultiBody {
            name: name.into(),
            gravity: Vector3::new(0.0, 0.0, -9.81),
            joints: vec![Joint {
                name: "universe".to_owned(),
                parent: UNIVERSE,
                kind: JointType::Universe,
                placement: Isometry3::identity(),
                inertia: Inertia::zero(),
                limits: JointLimits::default(),
                idx_q: 0,
                idx_v: 0,
            }],
            nq: 0,
            nv: 0,
        }
    }

    /// Appends a joint below `parent` and returns its index.
    pub fn add_joint(
        &mut self,
        parent: JointIndex,
        kind: JointType,
        placement: Isometry3<f64>,
        name: impl Into<String>,
    ) -> Result<JointIndex, ModelError> {
        if parent >= self.joints.len() {
            return Err(ModelError::UnknownJoint(parent));
        }
        let name = name.into();
        if kind == JointType::Universe {
            return Err(ModelError::UnsupportedJoint {
                name,
                kind: "universe".to_owned(),
            });
        }
        let joint = Joint {
            name,
            parent,
            placement,
            inertia: Inertia::zero(),
            limits: JointLimits::default(),
            idx_q: self.nq,
            idx_v: self.nv,
            kind,
        };
        self.nq += joint.kind.nq();
        self.nv += joint.kind.nv();
        self.joints.push(joint);
        Ok(self.joints.len() - 1)
    }

    /// Rigidly attaches a body to `joint`; `placement` is the body frame in the joint frame.
    pub fn append_body(
        &mut self,
        joint: JointIndex,
        inertia: &Inertia,
        placement: &Isometry3<f64>,
    ) -> Result<(), ModelError> {
        let target = self
            .joints
            .get_mut(joint)
            .ok_or(ModelError::UnknownJoint(joint))?;
        target.inertia = target.inertia.clone() + inertia.transformed(placement);
        Ok(())
    }

    pub fn set_limits(&mut self, joint: JointIndex, limits: JointLimits) -> Result<(), ModelError> {
        self.joints
            .get_mut(joint)
            .ok_or(ModelError::UnknownJoint(joint))?
            .limits = limits;
        Ok(())
    }

    pub fn nq(&self) -> usize {
        self.nq
    }

    pub fn nv(&self) -> usize {
        self.nv
    }

    /// Number of joints, universe included.
    pub fn njoints(&self) -> usize {
        self.joints.len()
    }

    pub fn joint(&self, index: JointIndex) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint_id(&self, name: &str) -> Option<JointIndex> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Joints from the first child of the universe down to `index`, both ends included.
    pub fn support(&self, index: JointIndex) -> Result<Vec<JointIndex>, ModelError> {
        if index >= self.joints.len() {
            return Err(ModelError::UnknownJoint(index));
        }
        let mut chain = vec![];
        let mut current = index;
        while current != UNIVERSE {
            chain.push(current);
            current = self.joints[current].parent;
        }
        chain.reverse();
        Ok(chain)
    }

    pub fn neutral(&self) -> DVector<f64> {
        let mut q = DVector::zeros(self.nq);
        for joint in &self.joints[1..] {
            joint
                .kind
                .neutral(&mut q.as_mut_slice()[joint.idx_q..joint.idx_q + joint.kind.nq()]);
        }
        q
    }

    /// Moves `q` along the tangent vector `v` for unit time.
    pub fn integrate(&self, q: &DVector<f64>, v: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        self.check_configuration(q)?;
        self.check_velocity(v)?;
        let mut res = q.clone();
        for joint in &self.joints[1..] {
            let range = joint.idx_q..joint.idx_q + joint.kind.nq();
            joint.kind.integrate(
                &q.as_slice()[range.clone()],
                v[joint.idx_v],
                &mut res.as_mut_slice()[range],
            );
        }
        Ok(res)
    }

    /// Tangent vector `v` such that `integrate(q0, v) == q1`.
    pub fn difference(&self, q0: &DVector<f64>, q1: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        self.check_configuration(q0)?;
        self.check_configuration(q1)?;
        let mut v = DVector::zeros(self.nv);
        for joint in &self.joints[1..] {
            let range = joint.idx_q..joint.idx_q + joint.kind.nq();
            v[joint.idx_v] = joint
                .kind
                .difference(&q0.as_slice()[range.clone()], &q1.as_slice()[range]);
        }
        Ok(v)
    }

    /// Uniform draw inside the joint limits.
    pub fn random_configuration(&self, rng: &mut impl Rng) -> DVector<f64> {
        let mut q = DVector::zeros(self.nq);
        for joint in &self.joints[1..] {
            joint.kind.random(
                &joint.limits,
                rng,
                &mut q.as_mut_slice()[joint.idx_q..joint.idx_q + joint.kind.nq()],
            );
        }
        q
    }

    /// Pose of joint `index` in its parent joint frame at configuration `q`.
    pub(crate) fn joint_transform(&self, index: JointIndex, q: &DVector<f64>) -> Isometry3<f64> {
        let joint = &self.joints[index];
        let motion = joint
            .kind
            .transform(&q.as_slice()[joint.idx_q..joint.idx_q + joint.kind.nq()]);
        joint.placement * motion
    }

    pub(crate) fn check_configuration(&self, q: &DVector<f64>) -> Result<(), ModelError> {
        ModelError::check_size("configuration", self.nq, q.len())
    }

    /// Fails when a `(cos θ, sin θ)` pair is off the unit circle.
    pub fn check_normalized(&self, q: &DVector<f64>) -> Result<(), ModelError> {
        self.check_configuration(q)?;
        for joint in &self.joints[1..] {
            if let JointType::RevoluteUnbounded { .. } = joint.kind {
                let norm = q[joint.idx_q].hypot(q[joint.idx_q + 1]);
                if (norm - 1.0).abs() > NORMALIZED_TOLERANCE {
                    return Err(ModelError::NotNormalized {
                        name: joint.name.clone(),
                        norm,
                    });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn check_velocity(&self, v: &DVector<f64>) -> Result<(), ModelError> {
        ModelError::check_size("velocity", self.nv, v.len())
    }
}
