use nalgebra::{DMatrix, DVector, Vector3};

use crate::aero::vortex::{
    finite_vortex, finite_vortex_jac, semi_infinite_vortex, semi_infinite_vortex_jac,
};
use crate::config::{FlowState, SurfaceConfig};
use crate::mesh::{PanelGeometry, PanelGeometryTangent};

/// Scalar flow perturbations entering a directional derivative.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowTangent {
    pub dvelocity: f64,
    pub dalpha: f64,
    pub dbeta: f64,
    pub ddensity: f64,
    pub dheight: f64,
}

impl FlowTangent {
    pub fn dfreestream_velocity(&self, flow: &FlowState) -> Vector3<f64> {
        let (sa, ca) = flow.alpha.sin_cos();
        let (sb, cb) = flow.beta.sin_cos();
        let u = Vector3::new(ca * cb, -sb, sa * cb);
        let du_da = Vector3::new(-sa * cb, 0.0, ca * cb);
        let du_db = Vector3::new(-ca * sb, -cb, -sa * sb);
        u * self.dvelocity + (du_da * self.dalpha + du_db * self.dbeta) * flow.velocity
    }

    pub fn dwake_direction(&self, flow: &FlowState) -> Vector3<f64> {
        let (sa, ca) = flow.alpha.sin_cos();
        Vector3::new(-sa, 0.0, ca) * self.dalpha
    }

    pub fn dlift_direction(&self, flow: &FlowState) -> Vector3<f64> {
        let (sa, ca) = flow.alpha.sin_cos();
        Vector3::new(-ca, 0.0, -sa) * self.dalpha
    }

    pub fn ddrag_direction(&self, flow: &FlowState) -> Vector3<f64> {
        let (sa, ca) = flow.alpha.sin_cos();
        let (sb, cb) = flow.beta.sin_cos();
        let du_da = Vector3::new(-sa * cb, 0.0, ca * cb);
        let du_db = Vector3::new(-ca * sb, -cb, -sa * sb);
        du_da * self.dalpha + du_db * self.dbeta
    }

    pub fn ddynamic_pressure(&self, flow: &FlowState) -> f64 {
        0.5 * self.ddensity * flow.velocity * flow.velocity
            + flow.density * flow.velocity * self.dvelocity
    }
}

/// The trailing wake runs along the alpha-rotated x axis; sideslip does not
/// tilt the wake. This also keeps the wake direction invariant under both
/// image reflections.
pub fn wake_direction(flow: &FlowState) -> Vector3<f64> {
    let (sa, ca) = flow.alpha.sin_cos();
    Vector3::new(ca, 0.0, sa)
}

/// Ground plane as a reflection plane: points x with x . normal > offset are
/// above ground. The plane contains the freestream, so its normal rotates
/// with angle of attack.
#[derive(Debug, Clone, Copy)]
pub struct GroundPlane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl GroundPlane {
    pub fn new(flow: &FlowState, height: f64) -> Self {
        let (sa, ca) = flow.alpha.sin_cos();
        Self {
            normal: Vector3::new(-sa, 0.0, ca),
            offset: -height,
        }
    }

    /// Signed distance of a point above the plane.
    pub fn clearance(&self, x: &Vector3<f64>) -> f64 {
        x.dot(&self.normal) - self.offset
    }

    fn tangent(flow: &FlowState, dflow: &FlowTangent) -> (Vector3<f64>, f64) {
        let (sa, ca) = flow.alpha.sin_cos();
        (Vector3::new(-ca, 0.0, -sa) * dflow.dalpha, -dflow.dheight)
    }
}

/// One term of the image expansion: optionally mirrored about the centerline
/// and/or the ground plane. The induced velocity of the full system is
/// `sum_images R(v(R(x)))` over the active images, which reproduces the
/// original's ghost surface (same-sign circulation) and mirrored ground set
/// (chirality-flipped circulation) without duplicating panel storage.
#[derive(Debug, Clone, Copy)]
struct Image {
    mirror_y: bool,
    ground: Option<GroundPlane>,
}

impl Image {
    fn point(&self, x: Vector3<f64>) -> Vector3<f64> {
        let mut p = x;
        if self.mirror_y {
            p.y = -p.y;
        }
        if let Some(g) = self.ground {
            p -= g.normal * (2.0 * (p.dot(&g.normal) - g.offset));
        }
        p
    }

    fn vector(&self, v: Vector3<f64>) -> Vector3<f64> {
        let mut w = v;
        if self.mirror_y {
            w.y = -w.y;
        }
        if let Some(g) = self.ground {
            w -= g.normal * (2.0 * w.dot(&g.normal));
        }
        w
    }

    /// Tangent of [`Image::point`]; `plane_tan` carries (dnormal, doffset)
    /// of the ground plane when it moves with the perturbation.
    fn point_tangent(
        &self,
        x: Vector3<f64>,
        dx: Vector3<f64>,
        plane_tan: (Vector3<f64>, f64),
    ) -> Vector3<f64> {
        let (mut p, mut dp) = (x, dx);
        if self.mirror_y {
            p.y = -p.y;
            dp.y = -dp.y;
        }
        if let Some(g) = self.ground {
            let (dn, doffset) = plane_tan;
            let dist = p.dot(&g.normal) - g.offset;
            let ddist = dp.dot(&g.normal) + p.dot(&dn) - doffset;
            dp = dp - g.normal * (2.0 * ddist) - dn * (2.0 * dist);
        }
        dp
    }

    fn vector_tangent(
        &self,
        v: Vector3<f64>,
        dv: Vector3<f64>,
        plane_tan: (Vector3<f64>, f64),
    ) -> Vector3<f64> {
        let (mut w, mut dw) = (v, dv);
        if self.mirror_y {
            w.y = -w.y;
            dw.y = -dw.y;
        }
        if let Some(g) = self.ground {
            let (dn, _) = plane_tan;
            let proj = w.dot(&g.normal);
            let dproj = dw.dot(&g.normal) + w.dot(&dn);
            dw = dw - g.normal * (2.0 * dproj) - dn * (2.0 * proj);
        }
        dw
    }
}

/// The set of image reflections active for a surface (identity included).
#[derive(Debug, Clone)]
pub struct ImageSystem {
    images: Vec<Image>,
    ground: Option<GroundPlane>,
}

impl ImageSystem {
    /// Assumes the configuration has already been validated.
    pub fn new(config: &SurfaceConfig, flow: &FlowState) -> Self {
        let ground = if config.ground_effect {
            flow.height_above_ground.map(|h| GroundPlane::new(flow, h))
        } else {
            None
        };

        let mut images = vec![Image {
            mirror_y: false,
            ground: None,
        }];
        if config.symmetry {
            images.push(Image {
                mirror_y: true,
                ground: None,
            });
        }
        if let Some(g) = ground {
            for k in 0..images.len() {
                images.push(Image {
                    ground: Some(g),
                    ..images[k]
                });
            }
        }
        Self { images, ground }
    }

    pub fn ground_plane(&self) -> Option<&GroundPlane> {
        self.ground.as_ref()
    }
}

/// Velocity induced at `x` by the unit-strength ring of panel `(i, j)`,
/// including the horseshoe wake correction on trailing-edge rings.
fn unit_ring_velocity(
    geom: &PanelGeometry,
    i: usize,
    j: usize,
    x: Vector3<f64>,
    wake_u: Vector3<f64>,
) -> Vector3<f64> {
    // Ring vertices, matching the original's A/B/C/D traversal:
    //         A ----- B      (front, quarter chord of this panel)
    //         |       |
    //         D ----- C      (rear, quarter chord of the next row)
    let va = geom.vortex_point(i, j + 1);
    let vb = geom.vortex_point(i, j);
    let vc = geom.vortex_point(i + 1, j);
    let vd = geom.vortex_point(i + 1, j + 1);

    let ra = x - va;
    let rb = x - vb;
    let rc = x - vc;
    let rd = x - vd;

    let mut w = finite_vortex(ra, rb)
        + finite_vortex(rb, rc)
        + finite_vortex(rc, rd)
        + finite_vortex(rd, ra);

    // Trailing-edge ring: cancel the rear bound leg and shed semi-infinite
    // trailing legs along the freestream.
    if i == geom.nx() - 2 {
        w += finite_vortex(rd, rc);
        w -= semi_infinite_vortex(wake_u, rd);
        w += semi_infinite_vortex(wake_u, rc);
    }
    w
}

/// Primal and directional-derivative evaluation of [`unit_ring_velocity`].
#[allow(clippy::too_many_arguments)]
fn unit_ring_velocity_tangent(
    geom: &PanelGeometry,
    dgeom: &PanelGeometryTangent,
    i: usize,
    j: usize,
    x: Vector3<f64>,
    dx: Vector3<f64>,
    wake_u: Vector3<f64>,
    dwake_u: Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    let ny = geom.ny();
    let idx = |ii: usize, jj: usize| ii * ny + jj;

    let va = geom.vortex_point(i, j + 1);
    let vb = geom.vortex_point(i, j);
    let vc = geom.vortex_point(i + 1, j);
    let vd = geom.vortex_point(i + 1, j + 1);

    let dva = dgeom.dvortex[idx(i, j + 1)];
    let dvb = dgeom.dvortex[idx(i, j)];
    let dvc = dgeom.dvortex[idx(i + 1, j)];
    let dvd = dgeom.dvortex[idx(i + 1, j + 1)];

    let ra = x - va;
    let rb = x - vb;
    let rc = x - vc;
    let rd = x - vd;

    let dra = dx - dva;
    let drb = dx - dvb;
    let drc = dx - dvc;
    let drd = dx - dvd;

    let mut w = Vector3::zeros();
    let mut dw = Vector3::zeros();

    let mut segment = |r1: Vector3<f64>, r2: Vector3<f64>, dr1: Vector3<f64>, dr2: Vector3<f64>| {
        let (v, j1, j2) = finite_vortex_jac(r1, r2);
        (v, j1 * dr1 + j2 * dr2)
    };

    for (v, dv) in [
        segment(ra, rb, dra, drb),
        segment(rb, rc, drb, drc),
        segment(rc, rd, drc, drd),
        segment(rd, ra, drd, dra),
    ] {
        w += v;
        dw += dv;
    }

    if i == geom.nx() - 2 {
        let (v, dv) = segment(rd, rc, drd, drc);
        w += v;
        dw += dv;

        let (v, ju, jr) = semi_infinite_vortex_jac(wake_u, rd);
        w -= v;
        dw -= ju * dwake_u + jr * drd;

        let (v, ju, jr) = semi_infinite_vortex_jac(wake_u, rc);
        w += v;
        dw += ju * dwake_u + jr * drc;
    }

    (w, dw)
}

/// Assemble the dense influence matrix and flow-tangency right-hand side.
///
/// `A[k][l]` is the normal velocity induced at collocation point `k` by the
/// unit-strength ring of panel `l`, summed over all active images;
/// `rhs[k] = -v_freestream . n_k`.
pub fn assemble_system(
    geom: &PanelGeometry,
    flow: &FlowState,
    images: &ImageSystem,
) -> (DMatrix<f64>, DVector<f64>) {
    let n = geom.num_panels();
    let wake_u = wake_direction(flow);
    let v_fs = flow.freestream_velocity();

    let mut a = DMatrix::zeros(n, n);
    let mut rhs = DVector::zeros(n);

    for k in 0..n {
        let xk = geom.collocation[k];
        let nk = geom.normals[k];
        rhs[k] = -v_fs.dot(&nk);

        for image in &images.images {
            let xe = image.point(xk);
            for li in 0..geom.nx() - 1 {
                for lj in 0..geom.ny() - 1 {
                    let l = geom.panel_index(li, lj);
                    let w = image.vector(unit_ring_velocity(geom, li, lj, xe, wake_u));
                    a[(k, l)] += w.dot(&nk);
                }
            }
        }
    }

    (a, rhs)
}

/// Directional derivative of [`assemble_system`] for a combined mesh/flow
/// perturbation.
pub fn assemble_system_tangent(
    geom: &PanelGeometry,
    dgeom: &PanelGeometryTangent,
    flow: &FlowState,
    dflow: &FlowTangent,
    images: &ImageSystem,
) -> (DMatrix<f64>, DVector<f64>) {
    let n = geom.num_panels();
    let wake_u = wake_direction(flow);
    let dwake_u = dflow.dwake_direction(flow);
    let v_fs = flow.freestream_velocity();
    let dv_fs = dflow.dfreestream_velocity(flow);
    let plane_tan = GroundPlane::tangent(flow, dflow);

    let mut da = DMatrix::zeros(n, n);
    let mut drhs = DVector::zeros(n);

    for k in 0..n {
        let xk = geom.collocation[k];
        let dxk = dgeom.dcollocation[k];
        let nk = geom.normals[k];
        let dnk = dgeom.dnormals[k];
        drhs[k] = -(dv_fs.dot(&nk) + v_fs.dot(&dnk));

        for image in &images.images {
            let xe = image.point(xk);
            let dxe = image.point_tangent(xk, dxk, plane_tan);
            for li in 0..geom.nx() - 1 {
                for lj in 0..geom.ny() - 1 {
                    let l = geom.panel_index(li, lj);
                    let (w, dw) = unit_ring_velocity_tangent(
                        geom, dgeom, li, lj, xe, dxe, wake_u, dwake_u,
                    );
                    let w_img = image.vector(w);
                    let dw_img = image.vector_tangent(w, dw, plane_tan);
                    da[(k, l)] += dw_img.dot(&nk) + w_img.dot(&dnk);
                }
            }
        }
    }

    (da, drhs)
}

/// Induced velocity at each evaluation point from the full circulation
/// distribution (all images included). Freestream not included.
pub fn induced_velocities(
    geom: &PanelGeometry,
    flow: &FlowState,
    images: &ImageSystem,
    eval_points: &[Vector3<f64>],
    circulations: &DVector<f64>,
) -> Vec<Vector3<f64>> {
    let wake_u = wake_direction(flow);
    let mut out = vec![Vector3::zeros(); eval_points.len()];

    for (k, xk) in eval_points.iter().enumerate() {
        for image in &images.images {
            let xe = image.point(*xk);
            for li in 0..geom.nx() - 1 {
                for lj in 0..geom.ny() - 1 {
                    let l = geom.panel_index(li, lj);
                    let w = image.vector(unit_ring_velocity(geom, li, lj, xe, wake_u));
                    out[k] += w * circulations[l];
                }
            }
        }
    }
    out
}

/// Directional derivative of [`induced_velocities`].
#[allow(clippy::too_many_arguments)]
pub fn induced_velocities_tangent(
    geom: &PanelGeometry,
    dgeom: &PanelGeometryTangent,
    flow: &FlowState,
    dflow: &FlowTangent,
    images: &ImageSystem,
    eval_points: &[Vector3<f64>],
    deval_points: &[Vector3<f64>],
    circulations: &DVector<f64>,
    dcirculations: &DVector<f64>,
) -> Vec<Vector3<f64>> {
    let wake_u = wake_direction(flow);
    let dwake_u = dflow.dwake_direction(flow);
    let plane_tan = GroundPlane::tangent(flow, dflow);
    let mut out = vec![Vector3::zeros(); eval_points.len()];

    for (k, xk) in eval_points.iter().enumerate() {
        for image in &images.images {
            let xe = image.point(*xk);
            let dxe = image.point_tangent(*xk, deval_points[k], plane_tan);
            for li in 0..geom.nx() - 1 {
                for lj in 0..geom.ny() - 1 {
                    let l = geom.panel_index(li, lj);
                    let (w, dw) =
                        unit_ring_velocity_tangent(geom, dgeom, li, lj, xe, dxe, wake_u, dwake_u);
                    let w_img = image.vector(w);
                    let dw_img = image.vector_tangent(w, dw, plane_tan);
                    out[k] += w_img * dcirculations[l] + dw_img * circulations[l];
                }
            }
        }
    }
    out
}
