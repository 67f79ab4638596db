use nalgebra::{Matrix3, Vector3};

/// Denominator cutoff for the regularized kernels. A collocation point lying
/// on a filament produces a denominator of this order, and its induced
/// contribution is cut to zero rather than allowed to blow up.
pub const VORTEX_TOL: f64 = 1e-10;

const FOUR_PI: f64 = 4.0 * std::f64::consts::PI;

/// Velocity induced at a point by a unit-strength finite vortex segment.
///
/// `r1` and `r2` are the vectors from the segment endpoints to the
/// evaluation point (start and end of the segment respectively).
pub fn finite_vortex(r1: Vector3<f64>, r2: Vector3<f64>) -> Vector3<f64> {
    let n1 = r1.norm();
    let n2 = r2.norm();
    let den = n1 * n2 + r1.dot(&r2);
    if den.abs() <= VORTEX_TOL || n1 <= VORTEX_TOL || n2 <= VORTEX_TOL {
        return Vector3::zeros();
    }
    let s = 1.0 / n1 + 1.0 / n2;
    r1.cross(&r2) * (s / (FOUR_PI * den))
}

/// [`finite_vortex`] together with its Jacobians with respect to `r1`, `r2`.
pub fn finite_vortex_jac(
    r1: Vector3<f64>,
    r2: Vector3<f64>,
) -> (Vector3<f64>, Matrix3<f64>, Matrix3<f64>) {
    let n1 = r1.norm();
    let n2 = r2.norm();
    let den = n1 * n2 + r1.dot(&r2);
    if den.abs() <= VORTEX_TOL || n1 <= VORTEX_TOL || n2 <= VORTEX_TOL {
        return (Vector3::zeros(), Matrix3::zeros(), Matrix3::zeros());
    }

    let c = r1.cross(&r2);
    let s = 1.0 / n1 + 1.0 / n2;
    let scale = 1.0 / (FOUR_PI * den);
    let v = c * (s * scale);

    // s and den gradients.
    let ds_dr1 = -r1 / (n1 * n1 * n1);
    let ds_dr2 = -r2 / (n2 * n2 * n2);
    let dden_dr1 = r1 * (n2 / n1) + r2;
    let dden_dr2 = r2 * (n1 / n2) + r1;

    // v = s c / (4 pi den):
    //   dv = (ds c + s dc - v' * dden) / (4 pi den), v' = 4 pi den v... kept
    //   in the expanded form below.
    let dc_dr1 = -r2.cross_matrix();
    let dc_dr2 = r1.cross_matrix();

    let j1 = (c * ds_dr1.transpose() + dc_dr1 * s) * scale - v * (dden_dr1 / den).transpose();
    let j2 = (c * ds_dr2.transpose() + dc_dr2 * s) * scale - v * (dden_dr2 / den).transpose();

    (v, j1, j2)
}

/// Velocity induced by a unit-strength semi-infinite filament running from
/// the point at `r` (vector to the evaluation point) to infinity along the
/// unit direction `u`.
pub fn semi_infinite_vortex(u: Vector3<f64>, r: Vector3<f64>) -> Vector3<f64> {
    let n = r.norm();
    let den = n * (n - u.dot(&r));
    if den.abs() <= VORTEX_TOL || n <= VORTEX_TOL {
        return Vector3::zeros();
    }
    u.cross(&r) / (FOUR_PI * den)
}

/// [`semi_infinite_vortex`] together with its Jacobians with respect to `u`
/// and `r`. The `u` Jacobian is needed because the wake direction rotates
/// with angle of attack.
pub fn semi_infinite_vortex_jac(
    u: Vector3<f64>,
    r: Vector3<f64>,
) -> (Vector3<f64>, Matrix3<f64>, Matrix3<f64>) {
    let n = r.norm();
    let udr = u.dot(&r);
    let den = n * (n - udr);
    if den.abs() <= VORTEX_TOL || n <= VORTEX_TOL {
        return (Vector3::zeros(), Matrix3::zeros(), Matrix3::zeros());
    }

    let w = u.cross(&r);
    let scale = 1.0 / (FOUR_PI * den);
    let v = w * scale;

    // den = n^2 - n (u . r)
    let dden_dr = r * 2.0 - r * (udr / n) - u * n;
    let dden_du = -r * n;

    let ju = (-r.cross_matrix()) * scale - v * (dden_du / den).transpose();
    let jr = u.cross_matrix() * scale - v * (dden_dr / den).transpose();

    (v, ju, jr)
}
