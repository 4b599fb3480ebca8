//! Spatial algebra on top of nalgebra.
//!
//! Motion and force vectors are stored as `[angular; linear]`.
//! Rigid transforms are plain [`Isometry3`], `aMb` maps frame `b` into frame `a`.

mod explog;

pub use explog::{exp3, exp6, jlog3, jlog6, log3, log6};

use nalgebra::{Isometry3, Matrix3, Matrix6, Vector3, Vector6};
use std::ops::Add;

/// Spatial velocity, acceleration or force.
pub type SpatialVector = Vector6<f64>;

/// 6×6 spatial inertia or spatial transform.
pub type SpatialMatrix = Matrix6<f64>;

pub fn angular(v: &SpatialVector) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

pub fn linear(v: &SpatialVector) -> Vector3<f64> {
    Vector3::new(v[3], v[4], v[5])
}

pub fn spatial_vec(ang: &Vector3<f64>, lin: &Vector3<f64>) -> SpatialVector {
    SpatialVector::new(ang.x, ang.y, ang.z, lin.x, lin.y, lin.z)
}

/// Cross-product matrix, `skew(a) * b == a.cross(&b)`.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

pub fn rotation_matrix(m: &Isometry3<f64>) -> Matrix3<f64> {
    m.rotation.to_rotation_matrix().into_inner()
}

/// Action of `aMb` on motion vectors: takes a motion expressed in `b` to `a`.
///
/// ```text
/// Ad = [ R      0 ]
///      [ [p]R   R ]
/// ```
pub fn adjoint(m: &Isometry3<f64>) -> SpatialMatrix {
    let r = rotation_matrix(m);
    let p = m.translation.vector;
    let mut res = SpatialMatrix::zeros();
    res.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    res.fixed_view_mut::<3, 3>(3, 3).copy_from(&r);
    res.fixed_view_mut::<3, 3>(3, 0).copy_from(&(skew(&p) * r));
    res
}

/// Spatial cross product for motion vectors, `v ×ₘ w`.
pub fn cross_motion(v: &SpatialVector, w: &SpatialVector) -> SpatialVector {
    let omega = angular(v);
    let vel = linear(v);
    let ang = omega.cross(&angular(w));
    let lin = omega.cross(&linear(w)) + vel.cross(&angular(w));
    spatial_vec(&ang, &lin)
}

/// Spatial cross product for force vectors, `v ×f f = -(v ×ₘ)ᵀ f`.
pub fn cross_force(v: &SpatialVector, f: &SpatialVector) -> SpatialVector {
    let omega = angular(v);
    let vel = linear(v);
    let tau = angular(f);
    let force = linear(f);
    let ang = omega.cross(&tau) + vel.cross(&force);
    let lin = omega.cross(&force);
    spatial_vec(&ang, &lin)
}

/// Rigid body inertia: mass, centre of mass in the body frame and rotational
/// inertia about the centre of mass.
#[derive(Debug, Clone, PartialEq)]
pub struct Inertia {
    pub mass: f64,
    pub com: Vector3<f64>,
    pub rotational: Matrix3<f64>,
}

impl Default for Inertia {
    fn default() -> Self {
        Self::zero()
    }
}

impl Inertia {
    pub fn new(mass: f64, com: Vector3<f64>, rotational: Matrix3<f64>) -> Self {
        Self {
            mass,
            com,
            rotational,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, Vector3::zeros(), Matrix3::zeros())
    }

    /// Spatial inertia about the body origin.
    ///
    /// ```text
    /// I = [ Ic + m[c][c]ᵀ   m[c] ]
    ///     [ m[c]ᵀ           m·1  ]
    /// ```
    pub fn matrix(&self) -> SpatialMatrix {
        let cx = skew(&self.com);
        let m_cx = cx * self.mass;
        let mut res = SpatialMatrix::zeros();
        res.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(self.rotational + m_cx * cx.transpose()));
        res.fixed_view_mut::<3, 3>(0, 3).copy_from(&m_cx);
        res.fixed_view_mut::<3, 3>(3, 0).copy_from(&m_cx.transpose());
        res.fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&Matrix3::from_diagonal_element(self.mass));
        res
    }

    /// The same body seen from frame `a`, given `aMb` with `b` the current frame.
    pub fn transformed(&self, m: &Isometry3<f64>) -> Self {
        let r = rotation_matrix(m);
        Self {
            mass: self.mass,
            com: m.transform_point(&self.com.into()).coords,
            rotational: r * self.rotational * r.transpose(),
        }
    }
}

impl Add for Inertia {
    type Output = Inertia;

    /// Lump two bodies expressed in the same frame.
    fn add(self, other: Inertia) -> Inertia {
        let mass = self.mass + other.mass;
        if mass <= 0.0 {
            return Inertia::zero();
        }
        let com = (self.com * self.mass + other.com * other.mass) / mass;
        let shift = |i: &Inertia| {
            let d = skew(&(i.com - com));
            i.rotational + d * d.transpose() * i.mass
        };
        Inertia::new(mass, com, shift(&self) + shift(&other))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion};

    #[test]
    fn test_skew_cross_product() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(-0.5, 0.0, 4.0);
        assert_relative_eq!(skew(&a) * b, a.cross(&b));
    }

    #[test]
    fn test_adjoint_pure_translation() {
        let m = Isometry3::translation(1., 2., 3.);
        let ad = adjoint(&m);
        assert_eq!(ad[(0, 0)], 1.);
        assert_eq!(ad[(0, 3)], 0.);
        assert_eq!(ad[(3, 1)], -3.);
        assert_eq!(ad[(3, 2)], 2.);
        assert_eq!(ad[(4, 0)], 3.);
        assert_eq!(ad[(4, 2)], -1.);
        assert_eq!(ad[(5, 0)], -2.);
        assert_eq!(ad[(5, 1)], 1.);

        let twist = SpatialVector::new(1., 1., 1., 1., 1., 1.);
        let res = ad * twist;
        assert_relative_eq!(res, SpatialVector::new(1., 1., 1., 0., 3., 0.));
    }

    #[test]
    fn test_adjoint_is_homomorphism() {
        let a = Isometry3::from_parts(
            Translation3::new(0.3, -1., 2.),
            UnitQuaternion::from_euler_angles(0.1, 0.7, -0.4),
        );
        let b = Isometry3::from_parts(
            Translation3::new(-0.2, 0.5, 0.1),
            UnitQuaternion::from_euler_angles(-1.2, 0.3, 0.9),
        );
        assert_relative_eq!(adjoint(&(a * b)), adjoint(&a) * adjoint(&b), epsilon = 1e-12);
        assert_relative_eq!(
            adjoint(&a.inverse()) * adjoint(&a),
            SpatialMatrix::identity(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_cross_force_is_dual_of_cross_motion() {
        let v = SpatialVector::new(0.1, -0.3, 0.2, 1., 0.5, -2.);
        let w = SpatialVector::new(0.7, 0.2, -0.1, 0.3, 0.3, 1.);
        let f = SpatialVector::new(2., -1., 0.5, 0.2, 0.1, -0.4);
        // <f, v ×ₘ w> + <v ×f f, w> == 0
        assert_relative_eq!(
            f.dot(&cross_motion(&v, &w)) + cross_force(&v, &f).dot(&w),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_inertia_matrix() {
        let inertia = Inertia::new(
            2.0,
            Vector3::new(0.1, 0.0, 0.0),
            Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 3.0)),
        );
        let spatial_inertia = inertia.matrix();
        assert_relative_eq!(spatial_inertia, spatial_inertia.transpose());
        assert_relative_eq!(spatial_inertia[(0, 0)], 1.0);
        assert_relative_eq!(spatial_inertia[(1, 1)], 2.0 + 2.0 * 0.01);
        assert_relative_eq!(spatial_inertia[(2, 2)], 3.0 + 2.0 * 0.01);
        assert_relative_eq!(spatial_inertia[(3, 3)], 2.0);
        assert_relative_eq!(spatial_inertia[(4, 4)], 2.0);
        assert_relative_eq!(spatial_inertia[(5, 5)], 2.0);
    }

    #[test]
    fn test_inertia_transform_matches_adjoint() {
        let inertia = Inertia::new(
            1.5,
            Vector3::new(0.0, 0.2, 0.5),
            Matrix3::from_diagonal(&Vector3::new(0.1, 0.2, 0.05)),
        );
        let m = Isometry3::from_parts(
            Translation3::new(0.3, 0.0, 1.0),
            UnitQuaternion::from_euler_angles(0.4, -0.2, 1.1),
        );
        // I_a = Ad(bMa)ᵀ I_b Ad(bMa)
        let x = adjoint(&m.inverse());
        assert_relative_eq!(
            inertia.transformed(&m).matrix(),
            x.transpose() * inertia.matrix() * x,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_inertia_sum_is_additive() {
        let a = Inertia::new(
            1.0,
            Vector3::new(0.0, 0.0, 0.5),
            Matrix3::identity() * 0.01,
        );
        let b = Inertia::new(
            0.5,
            Vector3::new(0.2, 0.0, 1.0),
            Matrix3::identity() * 0.02,
        );
        let sum = a.clone() + b.clone();
        assert_relative_eq!(sum.mass, 1.5);
        assert_relative_eq!(sum.matrix(), a.matrix() + b.matrix(), epsilon = 1e-12);
        assert_eq!(Inertia::zero() + Inertia::zero(), Inertia::zero());
    }
}
