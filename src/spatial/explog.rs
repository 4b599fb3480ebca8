use nalgebra::{Isometry3, Matrix3, Translation3, UnitQuaternion, Vector3};

use super::{angular, linear, skew, spatial_vec, SpatialMatrix, SpatialVector};

// below this angle the closed forms are replaced by their Taylor expansion
const SMALL_ANGLE: f64 = 1e-4;

pub fn exp3(w: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_scaled_axis(*w)
}

/// Rotation vector of `r`, with angle in `[0, π]`.
pub fn log3(r: &UnitQuaternion<f64>) -> Vector3<f64> {
    r.scaled_axis()
}

/// Derivative of `log3(R·exp3(δ))` with respect to `δ` at zero.
pub fn jlog3(w: &Vector3<f64>) -> Matrix3<f64> {
    let t = w.norm();
    let t2 = t * t;
    let (alpha, beta) = if t < SMALL_ANGLE {
        (1.0 - t2 / 12.0, 1.0 / 12.0 + t2 / 720.0)
    } else {
        let (st, ct) = t.sin_cos();
        let st_1mct = st / (1.0 - ct);
        (t * st_1mct / 2.0, 1.0 / t2 - st_1mct / (2.0 * t))
    };
    Matrix3::from_diagonal_element(alpha) + w * w.transpose() * beta + skew(&(w * 0.5))
}

/// Exponential map of a twist `[ω; v]`.
pub fn exp6(xi: &SpatialVector) -> Isometry3<f64> {
    let w = angular(xi);
    let v = linear(xi);
    let t = w.norm();
    let t2 = t * t;
    let (a, b) = if t < SMALL_ANGLE {
        (0.5 - t2 / 24.0, 1.0 / 6.0 - t2 / 120.0)
    } else {
        let (st, ct) = t.sin_cos();
        ((1.0 - ct) / t2, (t - st) / (t2 * t))
    };
    let wx = skew(&w);
    let p = v + wx * v * a + wx * wx * v * b;
    Isometry3::from_parts(Translation3::from(p), exp3(&w))
}

/// Logarithmic map, the twist `[ω; v]` with `exp6(log6(M)) == M`.
pub fn log6(m: &Isometry3<f64>) -> SpatialVector {
    let w = log3(&m.rotation);
    let p = m.translation.vector;
    let t = w.norm();
    let t2 = t * t;
    let (alpha, beta) = if t < SMALL_ANGLE {
        (1.0 - t2 / 12.0 - t2 * t2 / 720.0, 1.0 / 12.0 + t2 / 720.0)
    } else {
        let (st, ct) = t.sin_cos();
        (
            t * st / (2.0 * (1.0 - ct)),
            1.0 / t2 - st / (2.0 * t * (1.0 - ct)),
        )
    };
    let v = p * alpha - w.cross(&p) * 0.5 + w * (w.dot(&p) * beta);
    spatial_vec(&w, &v)
}

/// Derivative of `log6(M·exp6(δ))` with respect to `δ` at zero.
///
/// ```text
/// Jlog6 = [ Jlog3   0     ]
///         [ B       Jlog3 ]
/// ```
pub fn jlog6(m: &Isometry3<f64>) -> SpatialMatrix {
    let w = log3(&m.rotation);
    let p = m.translation.vector;
    let a = jlog3(&w);

    let t = w.norm();
    let t2 = t * t;
    let (beta, beta_dot_over_theta) = if t < SMALL_ANGLE {
        (1.0 / 12.0 + t2 / 720.0, 1.0 / 360.0)
    } else {
        let (st, ct) = t.sin_cos();
        let t2inv = 1.0 / t2;
        let inv_2_2ct = 1.0 / (2.0 * (1.0 - ct));
        (
            t2inv - st / t * inv_2_2ct,
            -2.0 * t2inv * t2inv + (1.0 + st / t) * t2inv * inv_2_2ct,
        )
    };

    let wtp = w.dot(&p);
    let tmp = w * (beta_dot_over_theta * wtp) - p * (t2 * beta_dot_over_theta + 2.0 * beta);
    let c = tmp * w.transpose()
        + w * p.transpose() * beta
        + Matrix3::from_diagonal_element(wtp * beta)
        + skew(&(p * 0.5));
    let b = c * a;

    let mut res = SpatialMatrix::zeros();
    res.fixed_view_mut::<3, 3>(0, 0).copy_from(&a);
    res.fixed_view_mut::<3, 3>(3, 3).copy_from(&a);
    res.fixed_view_mut::<3, 3>(3, 0).copy_from(&b);
    res
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use core::f64::consts::FRAC_PI_2;

    fn sample_twists() -> Vec<SpatialVector> {
        vec![
            SpatialVector::new(0., 0., 0., 1., 2., 3.),
            SpatialVector::new(FRAC_PI_2, 0., 0., 0., 0., 0.),
            SpatialVector::new(0.3, -0.2, 0.5, 0.1, 1.2, -0.4),
            SpatialVector::new(1e-6, 2e-6, -1e-6, 0.5, 0.0, 0.1),
            SpatialVector::new(-1.1, 0.8, 1.9, -0.3, 0.2, 0.7),
        ]
    }

    #[test]
    fn test_exp6_rotation_about_x() {
        let m = exp6(&SpatialVector::new(FRAC_PI_2, 0., 0., 0., 0., 0.));
        let r = m.rotation.to_rotation_matrix().into_inner();
        assert_abs_diff_eq!(
            r,
            Matrix3::new(1., 0., 0., 0., 0., -1., 0., 1., 0.),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(m.translation.vector, Vector3::zeros());
    }

    #[test]
    fn test_exp6_screw_motion() {
        // quarter turn about z through (1, 0, 0) while advancing 1 along z
        let w = Vector3::new(0., 0., FRAC_PI_2);
        let q = Vector3::new(1., 0., 0.);
        let v = -w.cross(&q) + Vector3::new(0., 0., 1.);
        let m = exp6(&spatial_vec(&w, &v));
        assert_abs_diff_eq!(m.translation.vector, Vector3::new(1., -1., 1.), epsilon = 1e-12);
    }

    #[test]
    fn test_log6_inverts_exp6() {
        for xi in sample_twists() {
            assert_relative_eq!(log6(&exp6(&xi)), xi, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_log6_of_identity() {
        assert_eq!(log6(&Isometry3::identity()), SpatialVector::zeros());
    }

    #[test]
    fn test_jlog3_matches_finite_difference() {
        let w = Vector3::new(0.4, -0.7, 0.2);
        let r = exp3(&w);
        let jac = jlog3(&w);
        let h = 1e-7;
        for i in 0..3 {
            let mut d = Vector3::zeros();
            d[i] = h;
            let fd = (log3(&(r * exp3(&d))) - log3(&(r * exp3(&-d)))) / (2.0 * h);
            assert_relative_eq!(fd, jac.column(i).into_owned(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_jlog6_matches_finite_difference() {
        let h = 1e-7;
        for xi in sample_twists() {
            let m = exp6(&xi);
            let jac = jlog6(&m);
            for i in 0..6 {
                let mut d = SpatialVector::zeros();
                d[i] = h;
                let fd = (log6(&(m * exp6(&d))) - log6(&(m * exp6(&-d)))) / (2.0 * h);
                assert_relative_eq!(fd, jac.column(i).into_owned(), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_jlog6_at_identity() {
        assert_eq!(jlog6(&Isometry3::identity()), SpatialMatrix::identity());
    }
}
