//! Joint-space dynamics terms: recursive Newton-Euler and the composite rigid
//! body algorithm. All spatial quantities live in the joint frames.

use nalgebra::{DMatrix, DVector};

use crate::errors::ModelError;
use crate::multi_body::{MultiBody, UNIVERSE};
use crate::spatial::{adjoint, cross_force, cross_motion, spatial_vec, SpatialMatrix, SpatialVector};

/// Motion transforms from each parent joint frame to the joint frame.
fn parent_to_joint(model: &MultiBody, q: &DVector<f64>) -> Vec<SpatialMatrix> {
    (0..model.njoints())
        .map(|i| adjoint(&model.joint_transform(i, q).inverse()))
        .collect()
}

/// Inverse dynamics, `τ = M(q)·a + C(q, v)·v + g(q)`.
pub fn rnea(
    model: &MultiBody,
    q: &DVector<f64>,
    v: &DVector<f64>,
    a: &DVector<f64>,
) -> Result<DVector<f64>, ModelError> {
    model.check_configuration(q)?;
    model.check_velocity(v)?;
    model.check_velocity(a)?;

    let n = model.njoints();
    let x = parent_to_joint(model, q);
    let mut vel = vec![SpatialVector::zeros(); n];
    let mut acc = vec![SpatialVector::zeros(); n];
    let mut f = vec![SpatialVector::zeros(); n];

    // gravity enters as an upward acceleration of the base
    acc[UNIVERSE] = spatial_vec(&nalgebra::Vector3::zeros(), &(-model.gravity));

    for (i, joint) in model.joints().iter().enumerate().skip(1) {
        let s = joint.kind.motion_subspace();
        let v_j = s * v[joint.idx_v];
        vel[i] = x[i] * vel[joint.parent] + v_j;
        acc[i] = x[i] * acc[joint.parent] + s * a[joint.idx_v] + cross_motion(&vel[i], &v_j);
        let inertia = joint.inertia.matrix();
        f[i] = inertia * acc[i] + cross_force(&vel[i], &(inertia * vel[i]));
    }

    let mut tau = DVector::zeros(model.nv());
    for (i, joint) in model.joints().iter().enumerate().skip(1).rev() {
        tau[joint.idx_v] = joint.kind.motion_subspace().dot(&f[i]);
        if joint.parent != UNIVERSE {
            let propagated = x[i].transpose() * f[i];
            f[joint.parent] += propagated;
        }
    }
    Ok(tau)
}

/// Joint-space inertia matrix, symmetric with both triangles filled.
pub fn crba(model: &MultiBody, q: &DVector<f64>) -> Result<DMatrix<f64>, ModelError> {
    model.check_configuration(q)?;

    let joints = model.joints();
    let x = parent_to_joint(model, q);
    let mut composite: Vec<SpatialMatrix> = joints.iter().map(|j| j.inertia.matrix()).collect();
    for (i, joint) in joints.iter().enumerate().skip(1).rev() {
        if joint.parent != UNIVERSE {
            let propagated = x[i].transpose() * composite[i] * x[i];
            composite[joint.parent] += propagated;
        }
    }

    let mut mass = DMatrix::zeros(model.nv(), model.nv());
    for (i, joint) in joints.iter().enumerate().skip(1) {
        let mut force = composite[i] * joint.kind.motion_subspace();
        mass[(joint.idx_v, joint.idx_v)] = joint.kind.motion_subspace().dot(&force);

        let mut j = i;
        while joints[j].parent != UNIVERSE {
            force = x[j].transpose() * force;
            j = joints[j].parent;
            let value = joints[j].kind.motion_subspace().dot(&force);
            mass[(joint.idx_v, joints[j].idx_v)] = value;
            mass[(joints[j].idx_v, joint.idx_v)] = value;
        }
    }
    Ok(mass)
}

/// Coriolis, centrifugal and gravity torques, `rnea(q, v, 0)`.
pub fn non_linear_effects(
    model: &MultiBody,
    q: &DVector<f64>,
    v: &DVector<f64>,
) -> Result<DVector<f64>, ModelError> {
    rnea(model, q, v, &DVector::zeros(model.nv()))
}

/// Gravity torques, `rnea(q, 0, 0)`.
pub fn generalized_gravity(model: &MultiBody, q: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
    let zero = DVector::zeros(model.nv());
    rnea(model, q, &zero, &zero)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::multi_body::sample::manipulator;
    use crate::multi_body::{JointType, UNIVERSE};
    use crate::spatial::Inertia;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Matrix3, Vector3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const MASS: f64 = 2.0;
    const LENGTH: f64 = 0.7;
    const IYY: f64 = 0.05;

    /// A point-ish mass at `LENGTH` along x, swinging about y.
    fn pendulum() -> MultiBody {
        let mut model = MultiBody::new("pendulum");
        let joint = model
            .add_joint(
                UNIVERSE,
                JointType::Revolute {
                    axis: Vector3::y_axis(),
                },
                Isometry3::identity(),
                "hinge",
            )
            .unwrap();
        let body = Inertia::new(MASS, Vector3::new(LENGTH, 0., 0.), Matrix3::identity() * IYY);
        model.append_body(joint, &body, &Isometry3::identity()).unwrap();
        model
    }

    fn random_vector(rng: &mut StdRng, n: usize) -> DVector<f64> {
        DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn test_pendulum_gravity() {
        let model = pendulum();
        for theta in [0.0, 0.3, 1.2, -2.0] {
            let q = DVector::from_vec(vec![theta]);
            let g = generalized_gravity(&model, &q).unwrap();
            assert_relative_eq!(g[0], -MASS * 9.81 * LENGTH * theta.cos(), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_pendulum_inertia() {
        let model = pendulum();
        let m = crba(&model, &DVector::from_vec(vec![0.4])).unwrap();
        assert_relative_eq!(m[(0, 0)], IYY + MASS * LENGTH * LENGTH, epsilon = 1e-12);
    }

    #[test]
    fn test_pendulum_has_no_coriolis() {
        let model = pendulum();
        let q = DVector::from_vec(vec![0.9]);
        let nle = non_linear_effects(&model, &q, &DVector::from_vec(vec![3.0])).unwrap();
        assert_relative_eq!(nle, generalized_gravity(&model, &q).unwrap(), epsilon = 1e-10);
    }

    #[test]
    fn test_crba_symmetric_positive_definite() {
        let model = manipulator().unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..5 {
            let q = model.random_configuration(&mut rng);
            let m = crba(&model, &q).unwrap();
            assert_relative_eq!(m, m.transpose(), epsilon = 1e-12);
            assert!(m.clone().cholesky().is_some());
        }
    }

    #[test]
    fn test_rnea_splits_into_inertia_and_nle() {
        let model = manipulator().unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        let q = model.random_configuration(&mut rng);
        let v = random_vector(&mut rng, model.nv());
        let a = random_vector(&mut rng, model.nv());

        let tau = rnea(&model, &q, &v, &a).unwrap();
        let m = crba(&model, &q).unwrap();
        let nle = non_linear_effects(&model, &q, &v).unwrap();
        assert_relative_eq!(tau, &m * &a + nle, epsilon = 1e-9);
    }

    #[test]
    fn test_velocity_terms_are_quadratic() {
        let model = manipulator().unwrap();
        let mut rng = StdRng::seed_from_u64(23);
        let q = model.random_configuration(&mut rng);
        let v = random_vector(&mut rng, model.nv());
        let g = generalized_gravity(&model, &q).unwrap();
        let c1 = non_linear_effects(&model, &q, &v).unwrap() - &g;
        let c2 = non_linear_effects(&model, &q, &(&v * 2.0)).unwrap() - &g;
        assert_relative_eq!(c2, c1 * 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_gravity() {
        let mut model = manipulator().unwrap();
        model.gravity = Vector3::zeros();
        let q = model.neutral();
        assert_relative_eq!(
            generalized_gravity(&model, &q).unwrap(),
            DVector::zeros(model.nv()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_stretched_arm_gravity_on_vertical_axes_is_zero() {
        // straight up: gravity cannot torque the joints about their axes
        let model = manipulator().unwrap();
        let g = generalized_gravity(&model, &model.neutral()).unwrap();
        assert_relative_eq!(g, DVector::zeros(model.nv()), epsilon = 1e-10);
    }

    #[test]
    fn test_vertical_slider() {
        let mut model = MultiBody::new("slider");
        let joint = model
            .add_joint(
                UNIVERSE,
                JointType::Prismatic {
                    axis: Vector3::z_axis(),
                },
                Isometry3::identity(),
                "lift",
            )
            .unwrap();
        let body = Inertia::new(MASS, Vector3::new(0.1, 0.2, 0.), Matrix3::identity());
        model.append_body(joint, &body, &Isometry3::identity()).unwrap();
        let q = DVector::from_vec(vec![0.3]);
        assert_relative_eq!(crba(&model, &q).unwrap()[(0, 0)], MASS, epsilon = 1e-12);
        assert_relative_eq!(generalized_gravity(&model, &q).unwrap()[0], MASS * 9.81, epsilon = 1e-12);
    }

    #[test]
    fn test_urdf_model() {
        let model = MultiBody::from_urdf("urdf/two_link.urdf").unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let q = model.random_configuration(&mut rng);
        let v = random_vector(&mut rng, model.nv());
        let a = random_vector(&mut rng, model.nv());

        let m = crba(&model, &q).unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert!(m.clone().cholesky().is_some());
        let tau = rnea(&model, &q, &v, &a).unwrap();
        assert_relative_eq!(tau, &m * &a + non_linear_effects(&model, &q, &v).unwrap(), epsilon = 1e-9);
    }

    #[test]
    fn test_size_checks() {
        let model = manipulator().unwrap();
        let q = model.neutral();
        assert!(rnea(&model, &q, &DVector::zeros(5), &DVector::zeros(6)).is_err());
        assert!(crba(&model, &DVector::zeros(2)).is_err());
    }
}
