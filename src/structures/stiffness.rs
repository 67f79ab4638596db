use nalgebra::{Matrix3, SMatrix, Vector3};

use crate::error::{AnalysisError, Result};
use crate::mesh::{CrossSection, CrossSectionTangent};

pub type ElementMatrix = SMatrix<f64, 12, 12>;

/// Reference vector for the local triad. Spanwise elements cross it to get a
/// chordwise local y axis; an element running parallel to it has no defined
/// triad and is rejected.
const TRIAD_REF: Vector3<f64> = Vector3::new(1.0, 0.0, 0.0);

const TRIAD_TOL: f64 = 1e-8;

/// Direction-cosine matrix (rows are the local x, y, z axes in global
/// coordinates) and length of the element from `p0` to `p1`.
pub fn element_triad(p0: Vector3<f64>, p1: Vector3<f64>) -> Result<(Matrix3<f64>, f64)> {
    let d = p1 - p0;
    let l = d.norm();
    if l < 1e-12 {
        return Err(AnalysisError::DegenerateGeometry(
            "zero-length beam element".to_string(),
        ));
    }
    let x = d / l;
    let y_raw = x.cross(&TRIAD_REF);
    let y_norm = y_raw.norm();
    if y_norm < TRIAD_TOL {
        return Err(AnalysisError::DegenerateGeometry(
            "beam element parallel to the triad reference axis".to_string(),
        ));
    }
    let y = y_raw / y_norm;
    let z = x.cross(&y);
    Ok((Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]), l))
}

/// [`element_triad`] with its directional derivative for node perturbations
/// `dp0`, `dp1`.
pub fn element_triad_tangent(
    p0: Vector3<f64>,
    p1: Vector3<f64>,
    dp0: Vector3<f64>,
    dp1: Vector3<f64>,
) -> Result<(Matrix3<f64>, f64, Matrix3<f64>, f64)> {
    let (t, l) = element_triad(p0, p1)?;
    let x = t.row(0).transpose();
    let y = t.row(1).transpose();

    let dd = dp1 - dp0;
    let dl = x.dot(&dd);
    let dx = (dd - x * dl) / l;

    let y_raw = x.cross(&TRIAD_REF);
    let y_norm = y_raw.norm();
    let dy_raw = dx.cross(&TRIAD_REF);
    let dy = (dy_raw - y * y.dot(&dy_raw)) / y_norm;
    let dz = dx.cross(&y) + x.cross(&dy);

    let dt = Matrix3::from_rows(&[dx.transpose(), dy.transpose(), dz.transpose()]);
    Ok((t, l, dt, dl))
}

/// Scalar entries of the local stiffness matrix: axial, torsion, and the two
/// bending blocks (each a/b/c/d = 12EI/L^3, 6EI/L^2, 4EI/L, 2EI/L).
struct LocalCoeffs {
    ax: f64,
    tor: f64,
    bz: [f64; 4],
    by: [f64; 4],
}

fn bending_coeffs(ei: f64, dei: f64, inv_l: f64, dinv_l: f64) -> ([f64; 4], [f64; 4]) {
    let il2 = inv_l * inv_l;
    let il3 = il2 * inv_l;
    let vals = [12.0 * ei * il3, 6.0 * ei * il2, 4.0 * ei * inv_l, 2.0 * ei * inv_l];
    let dots = [
        12.0 * (dei * il3 + 3.0 * ei * il2 * dinv_l),
        6.0 * (dei * il2 + 2.0 * ei * inv_l * dinv_l),
        4.0 * (dei * inv_l + ei * dinv_l),
        2.0 * (dei * inv_l + ei * dinv_l),
    ];
    (vals, dots)
}

fn fill_local(c: &LocalCoeffs) -> ElementMatrix {
    let mut k = ElementMatrix::zeros();

    // Axial, u_x pair.
    k[(0, 0)] = c.ax;
    k[(0, 6)] = -c.ax;
    k[(6, 6)] = c.ax;

    // Torsion, theta_x pair.
    k[(3, 3)] = c.tor;
    k[(3, 9)] = -c.tor;
    k[(9, 9)] = c.tor;

    // Bending in the x-y plane: u_y with theta_z.
    let [a, b, cc, d] = c.bz;
    k[(1, 1)] = a;
    k[(1, 5)] = b;
    k[(1, 7)] = -a;
    k[(1, 11)] = b;
    k[(5, 5)] = cc;
    k[(5, 7)] = -b;
    k[(5, 11)] = d;
    k[(7, 7)] = a;
    k[(7, 11)] = -b;
    k[(11, 11)] = cc;

    // Bending in the x-z plane: u_z with theta_y, opposite coupling sign.
    let [a, b, cc, d] = c.by;
    k[(2, 2)] = a;
    k[(2, 4)] = -b;
    k[(2, 8)] = -a;
    k[(2, 10)] = -b;
    k[(4, 4)] = cc;
    k[(4, 8)] = b;
    k[(4, 10)] = d;
    k[(8, 8)] = a;
    k[(8, 10)] = b;
    k[(10, 10)] = cc;

    // Mirror the upper triangle.
    for i in 0..12 {
        for j in 0..i {
            k[(i, j)] = k[(j, i)];
        }
    }
    k
}

fn local_stiffness_pair(
    sec: &CrossSection,
    dsec: &CrossSectionTangent,
    l: f64,
    dl: f64,
) -> (ElementMatrix, ElementMatrix) {
    let inv_l = 1.0 / l;
    let dinv_l = -dl * inv_l * inv_l;

    let ea = sec.e * sec.area;
    let dea = sec.e * dsec.darea;
    let gj = sec.g * sec.j;
    let dgj = sec.g * dsec.dj;

    let (bz, dbz) = bending_coeffs(sec.e * sec.iz, sec.e * dsec.diz, inv_l, dinv_l);
    let (by, dby) = bending_coeffs(sec.e * sec.iy, sec.e * dsec.diy, inv_l, dinv_l);

    let k = fill_local(&LocalCoeffs {
        ax: ea * inv_l,
        tor: gj * inv_l,
        bz,
        by,
    });
    let dk = fill_local(&LocalCoeffs {
        ax: dea * inv_l + ea * dinv_l,
        tor: dgj * inv_l + gj * dinv_l,
        bz: dbz,
        by: dby,
    });
    (k, dk)
}

/// Local 12x12 Euler-Bernoulli stiffness in the element frame. DOF order per
/// node is (u_x, u_y, u_z, theta_x, theta_y, theta_z).
pub fn local_stiffness(sec: &CrossSection, l: f64) -> ElementMatrix {
    local_stiffness_pair(sec, &CrossSectionTangent::default(), l, 0.0).0
}

fn expand_transform(t: &Matrix3<f64>) -> ElementMatrix {
    let mut gamma = ElementMatrix::zeros();
    for b in 0..4 {
        gamma.fixed_view_mut::<3, 3>(3 * b, 3 * b).copy_from(t);
    }
    gamma
}

/// Element stiffness in global coordinates.
pub fn element_stiffness(
    sec: &CrossSection,
    p0: Vector3<f64>,
    p1: Vector3<f64>,
) -> Result<ElementMatrix> {
    let (t, l) = element_triad(p0, p1)?;
    let gamma = expand_transform(&t);
    Ok(gamma.transpose() * local_stiffness(sec, l) * gamma)
}

/// Element stiffness together with its directional derivative for the given
/// node and cross-section perturbation.
pub fn element_stiffness_tangent(
    sec: &CrossSection,
    dsec: &CrossSectionTangent,
    p0: Vector3<f64>,
    p1: Vector3<f64>,
    dp0: Vector3<f64>,
    dp1: Vector3<f64>,
) -> Result<(ElementMatrix, ElementMatrix)> {
    let (t, l, dt, dl) = element_triad_tangent(p0, p1, dp0, dp1)?;
    let gamma = expand_transform(&t);
    let dgamma = expand_transform(&dt);
    let (k_l, dk_l) = local_stiffness_pair(sec, dsec, l, dl);

    let k = gamma.transpose() * k_l * gamma;
    let dk = dgamma.transpose() * k_l * gamma
        + gamma.transpose() * dk_l * gamma
        + gamma.transpose() * k_l * dgamma;
    Ok((k, dk))
}

/// Gather the 12 local-frame element DOFs from the two global end-node
/// states.
pub fn local_element_state(
    t: &Matrix3<f64>,
    u0: &nalgebra::Vector6<f64>,
    u1: &nalgebra::Vector6<f64>,
) -> SMatrix<f64, 12, 1> {
    let mut d = SMatrix::<f64, 12, 1>::zeros();
    d.fixed_rows_mut::<3>(0).copy_from(&(t * u0.fixed_rows::<3>(0)));
    d.fixed_rows_mut::<3>(3).copy_from(&(t * u0.fixed_rows::<3>(3)));
    d.fixed_rows_mut::<3>(6).copy_from(&(t * u1.fixed_rows::<3>(0)));
    d.fixed_rows_mut::<3>(9).copy_from(&(t * u1.fixed_rows::<3>(3)));
    d
}
