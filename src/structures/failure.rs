use nalgebra::{Vector3, Vector6};

use crate::error::{AnalysisError, Result};
use crate::mesh::{CrossSection, SectionFamily, StructMesh};

use super::stiffness::{element_triad_tangent, local_element_state};

/// Kreisselmeier-Steinhauser smooth maximum. Overestimates the true maximum
/// by at most ln(n)/rho and is differentiable everywhere.
pub fn ks_aggregate(values: &[f64], rho: f64) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let sum: f64 = values.iter().map(|v| ((v - max) * rho).exp()).sum();
    max + sum.ln() / rho
}

/// Directional derivative of [`ks_aggregate`]: the exponential weights of
/// each margin applied to its tangent.
pub fn ks_aggregate_tangent(values: &[f64], dvalues: &[f64], rho: f64) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = values.iter().map(|v| ((v - max) * rho).exp()).collect();
    let sum: f64 = weights.iter().sum();
    values
        .iter()
        .zip(dvalues)
        .zip(&weights)
        .map(|((_, dv), w)| w * dv)
        .sum::<f64>()
        / sum
}

/// Plate-buckling allowable for a simply supported skin panel in
/// compression.
fn skin_buckling_stress(e: f64, g: f64, thickness: f64, width: f64) -> f64 {
    let nu = e / (2.0 * g) - 1.0;
    let kc = 6.98;
    kc * std::f64::consts::PI.powi(2) * e * (thickness / width).powi(2)
        / (12.0 * (1.0 - nu * nu))
}

/// Stress margins for every recovery point of every element, as
/// (stress / allowable) - 1. Negative means feasible.
///
/// Internal element strains come from the relative end-node state in the
/// local frame: axial stretch, twist rate, and the two bending rotation
/// differences.
pub fn element_margins(
    mesh: &StructMesh,
    sections: &[CrossSection],
    displacements: &[Vector6<f64>],
) -> Result<Vec<f64>> {
    let zeros3 = vec![Vector3::zeros(); mesh.num_nodes()];
    let zeros6 = vec![Vector6::zeros(); mesh.num_nodes()];
    Ok(element_margins_tangent(mesh, sections, displacements, &zeros3, &zeros6)?.0)
}

/// [`element_margins`] together with its directional derivative for node
/// and displacement perturbations. Cross-section property tangents do not
/// enter: stress recovery is pure kinematics scaled by the fixed material
/// constants and section geometry.
pub fn element_margins_tangent(
    mesh: &StructMesh,
    sections: &[CrossSection],
    displacements: &[Vector6<f64>],
    dnodes: &[Vector3<f64>],
    ddisplacements: &[Vector6<f64>],
) -> Result<(Vec<f64>, Vec<f64>)> {
    let n = mesh.num_nodes();
    if displacements.len() != n || dnodes.len() != n || ddisplacements.len() != n {
        return Err(AnalysisError::DimensionMismatch(format!(
            "{} displacement, {} node-tangent, {} displacement-tangent records for {} nodes",
            displacements.len(),
            dnodes.len(),
            ddisplacements.len(),
            n
        )));
    }

    let mut margins = Vec::new();
    let mut dmargins = Vec::new();
    for e in 0..mesh.num_elements() {
        let sec = &sections[e];
        let (t, l, dt, dl) =
            element_triad_tangent(mesh.node(e), mesh.node(e + 1), dnodes[e], dnodes[e + 1])?;
        let d = local_element_state(&t, &displacements[e], &displacements[e + 1]);
        let dd = local_element_state(&dt, &displacements[e], &displacements[e + 1])
            + local_element_state(&t, &ddisplacements[e], &ddisplacements[e + 1]);

        let du_x = d[6] - d[0];
        let dth_x = d[9] - d[3];
        let dth_y = d[10] - d[4];
        let dth_z = d[11] - d[5];
        let ddu_x = dd[6] - dd[0];
        let ddth_x = dd[9] - dd[3];
        let ddth_y = dd[10] - dd[4];
        let ddth_z = dd[11] - dd[5];

        let bend = (dth_y * dth_y + dth_z * dth_z).sqrt();
        let dbend = if bend > 1e-30 {
            (dth_y * ddth_y + dth_z * ddth_z) / bend
        } else {
            0.0
        };

        // Strain rates: v / L and the quotient-rule tangent.
        let rate = |v: f64, dv: f64| (v / l, dv / l - v * dl / (l * l));
        let (ax, dax) = rate(du_x, ddu_x);
        let (bd, dbd) = rate(bend, dbend);
        let (tw, dtw) = rate(dth_x, ddth_x);

        let von_mises = |sxx: f64, dsxx: f64, sxt: f64, dsxt: f64| {
            let vm = (sxx * sxx + 3.0 * sxt * sxt).sqrt();
            let dvm = if vm > 1e-30 {
                (sxx * dsxx + 3.0 * sxt * dsxt) / vm
            } else {
                0.0
            };
            (vm, dvm)
        };

        match sec.family {
            SectionFamily::Tube { radius, .. } => {
                let sxx_a = sec.e * ax;
                let dsxx_a = sec.e * dax;
                let sxx_b = sec.e * radius * bd;
                let dsxx_b = sec.e * radius * dbd;
                let sxt = sec.g * radius * tw;
                let dsxt = sec.g * radius * dtw;
                for (sxx, dsxx) in [
                    (sxx_a + sxx_b, dsxx_a + dsxx_b),
                    (sxx_a - sxx_b, dsxx_a - dsxx_b),
                ] {
                    let (vm, dvm) = von_mises(sxx, dsxx, sxt, dsxt);
                    margins.push(vm / sec.allowable_stress - 1.0);
                    dmargins.push(dvm / sec.allowable_stress);
                }
            }
            SectionFamily::Wingbox {
                skin_thickness,
                width,
                height,
                strength_factor_upper,
                ..
            } => {
                let fiber = height / 2.0;
                let sxx_a = sec.e * ax;
                let dsxx_a = sec.e * dax;
                let sxx_b = sec.e * fiber * bd;
                let dsxx_b = sec.e * fiber * dbd;
                let sxt = sec.g * fiber * tw;
                let dsxt = sec.g * fiber * dtw;

                // Upper skin carries compression under positive lift.
                let sxx_u = sxx_a - sxx_b;
                let dsxx_u = dsxx_a - dsxx_b;
                let sxx_l = sxx_a + sxx_b;
                let dsxx_l = dsxx_a + dsxx_b;

                let (vm_u, dvm_u) = von_mises(sxx_u, dsxx_u, sxt, dsxt);
                let (vm_l, dvm_l) = von_mises(sxx_l, dsxx_l, sxt, dsxt);
                let allow_u = sec.allowable_stress * strength_factor_upper;
                margins.push(vm_u / allow_u - 1.0);
                dmargins.push(dvm_u / allow_u);
                margins.push(vm_l / sec.allowable_stress - 1.0);
                dmargins.push(dvm_l / sec.allowable_stress);

                let s_cr = skin_buckling_stress(sec.e, sec.g, skin_thickness, width);
                margins.push(-sxx_u / s_cr - 1.0);
                dmargins.push(-dsxx_u / s_cr);
            }
        }
    }
    Ok((margins, dmargins))
}
