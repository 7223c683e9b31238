//! View factor from the ground between two central rows to the sky.
//!
//! A point on the ground at fractional position `f_z` sees the sky through
//! the gap between the rows immediately around it and, when rows are high or
//! sparse enough, through further gaps beyond them. The ground between two
//! rows is discretised, each point gets the sky wedges it can see summed over
//! every visible gap, and the profile is averaged over one row interval.
//!
//! ```text
//!  : \\*                    |\\             front of array
//!  :  \\ **                 | \\
//! next \\   **               | \\ previous row
//! row   \\     **            |  \\
//!  :.....\\.......**..........|..\\........ module lower edge
//!  :       \         **       |    \    :
//!  :        \           **     |    \   h = height above ground
//!  :   tilt  \      psi1   **  |psi0 \  :
//!  +----------\<---------P----*+----->\---- ground
//!             1<-----1-fz-----><--fz--0---- fraction of ground
//! ```
//!
//! Previous rows lie toward the front of the array, next rows toward the back.

use std::f64::consts::PI;

use ndarray::Array1;
use tracing::{debug, warn};

use crate::error::{Result, ShedsError};
use crate::geometry::{ArrayGeometry, EPS, MAX_ROWS};
use crate::interp::{interp, trapezoid};
use crate::surface_view::sky_angle_0_tangent;

#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray1};
#[cfg(feature = "python")]
use pyo3::prelude::*;

pub const DEFAULT_NPOINTS: usize = 100;

/// Oversampling of the extended ground grid relative to the output grid.
const OVERSAMPLE: usize = 3;

/// Angles from ground point `f_z` to the tops of the previous and next rows.
///
/// Flat rows have no such angles and yield `(0, 0)`.
pub fn ground_sky_angles(f_z: f64, g: &ArrayGeometry) -> (f64, f64) {
    if g.is_near_flat() {
        return (0.0, 0.0);
    }
    let gcr_prime = g.gcr_prime();
    let tilt_prime = PI - g.tilt;
    let psi_0 = tilt_prime
        .sin()
        .atan2(f_z / gcr_prime + tilt_prime.cos());
    let f_z_prime = 1.0 - f_z;
    let psi_1 = g.tilt.sin().atan2(f_z_prime / gcr_prime + g.tilt.cos());
    (psi_0, psi_1)
}

/// Angles from ground point `f_z` to the top and bottom of the row beyond
/// the previous row.
///
/// ```text
///  : \\        |            *\\ top of previous row
///  :  \\      |          **   \\
/// prev \\    |         *       \\           front of array
/// row   \\  |       **          \\
/// bottom.\\|......*..............\\........ module lower edge
///  :      |\   **                  \    :
///  psi1  |  \* psi0                 \   h = height above ground
///  :    | ** \                       \  :
///  +---+*-----\<---------P----------->\---- ground
///      <-1+fz-1<---------fz=1---------0---- fraction of ground
/// ```
pub fn ground_sky_angles_prev(f_z: f64, g: &ArrayGeometry) -> (f64, f64) {
    let tilt_prime = PI - g.tilt;
    let z = f_z * g.pitch;
    if g.is_near_flat() {
        // gcr_prime is unbounded, so measure from the module edges instead
        let psi_1 = g.height.atan2(-z);
        let psi_0 = (g.gcr * tilt_prime.sin() + g.height_ratio())
            .atan2((1.0 + f_z) + g.gcr * tilt_prime.cos());
        return (psi_0, psi_1);
    }
    let gcr_prime = g.gcr_prime();
    let psi_0 = tilt_prime
        .sin()
        .atan2((1.0 + f_z) / gcr_prime + tilt_prime.cos());
    // atan2 keeps the bottom edge finite when height is zero
    let psi_1 = g.height.atan2(g.height / g.tilt.tan() - z);
    (psi_0, psi_1)
}

/// Angles from ground point `f_z` to the bottom and top of the row beyond
/// the next row.
///
/// ```text
///  : \\+                     \\
///  :  \\  `*+                 \\
/// next \\      `*+             \\
/// row   \\          `*+         \\ next row bottom
/// top....\\..............`*+.....\\_
///  :       \                  `*+  \ -_  psi0
///  :        \                psi1  `*+  -_
///  :         \                       \  `*+ _
///  +----------\<---------P----------->\------*----- ground
///             1<---------fz=1---------0-1-fz->----- fraction of ground
/// ```
pub fn ground_sky_angles_next(f_z: f64, g: &ArrayGeometry) -> (f64, f64) {
    let tilt_prime = PI - g.tilt;
    let f_z_prime = 1.0 - f_z;
    let z_prime = f_z_prime * g.pitch;
    if g.is_near_flat() {
        let psi_0 = g.height.atan2(-z_prime);
        let psi_1 = (g.gcr * g.tilt.sin() + g.height_ratio())
            .atan2((1.0 + f_z_prime) + g.gcr * g.tilt.cos());
        return (psi_0, psi_1);
    }
    let gcr_prime = g.gcr_prime();
    let psi_0 = g.height.atan2(g.height / tilt_prime.tan() - z_prime);
    let psi_1 = g
        .tilt
        .sin()
        .atan2((1.0 + f_z_prime) / gcr_prime + g.tilt.cos());
    (psi_0, psi_1)
}

/// Ground position beyond which no sky is visible between previous rows:
/// where a line of sight grazes both the top and the bottom of a row.
///
/// `h/P · (1/tan(tilt) + 1/tan(psi_top(x=0)))`, or `MAX_ROWS · h/P` for flat
/// rows where the tangent vanishes.
pub fn f_z0_limit(g: &ArrayGeometry) -> f64 {
    if g.is_near_flat() {
        return MAX_ROWS * g.height_ratio();
    }
    let tan_psi_t_x0 = sky_angle_0_tangent(g.gcr, g.tilt);
    g.height_ratio() * (1.0 / g.tilt.tan() + 1.0 / tan_psi_t_x0)
}

/// Ground position beyond which no sky is visible between next rows.
///
/// `h/P · (1/tan(psi_top'(x=0)) - 1/tan(tilt))`, or `MAX_ROWS · h/P` for flat
/// rows.
pub fn f_z1_limit(g: &ArrayGeometry) -> f64 {
    if g.is_near_flat() {
        return MAX_ROWS * g.height_ratio();
    }
    let tan_psi_t_x1 = sky_angle_0_tangent(g.gcr, PI - g.tilt);
    g.height_ratio() * (1.0 / tan_psi_t_x1 - 1.0 / g.tilt.tan())
}

/// View factor from a ground point to the sky wedge between `psi_0` and
/// `psi_1`, each measured from the ground on its own side.
#[inline]
pub fn calc_fz_sky(psi_0: f64, psi_1: f64) -> f64 {
    (psi_0.cos() + psi_1.cos()) / 2.0
}

/// Upper bound on the number of rows summed on either side.
///
/// At tilt `EPS` the limit is about `h/P / (gcr · EPS)`, so for GCR above
/// 1/15 only non-finite or degenerate limits reach the cap.
fn neighbour_row_cap(g: &ArrayGeometry) -> f64 {
    (MAX_ROWS / EPS * g.height_ratio().max(1.0)).ceil()
}

/// Keeps a row-visibility limit finite and below the row cap.
fn bounded_limit(side: &'static str, limit: f64, cap: f64) -> f64 {
    if !limit.is_finite() {
        warn!(side, limit, cap, "non-finite row visibility limit, using row cap");
        return cap;
    }
    if limit > cap {
        warn!(side, limit, cap, "row visibility limit truncated to row cap");
        return cap;
    }
    limit
}

/// Number of whole-row shifts needed to cover `limit` row intervals.
fn rows_within(limit: f64) -> usize {
    if limit > 0.0 {
        limit.ceil() as usize
    } else {
        0
    }
}

/// Sky view factor profile over one row interval.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundSkyProfile {
    /// Uniform ground positions spanning `[0, 1]`.
    pub fz: Array1<f64>,
    /// Sky view factor at each position.
    pub fz_sky: Array1<f64>,
}

/// Sky view factor of the ground between two central rows of an array with
/// infinitely many rows on either side.
pub fn ground_sky_diffuse_view_factor(g: &ArrayGeometry, npoints: usize) -> Result<GroundSkyProfile> {
    if npoints < 2 {
        return Err(ShedsError::InvalidParameter {
            name: "npoints",
            value: npoints as f64,
            reason: "need at least two ground points",
        });
    }
    let cap = neighbour_row_cap(g);
    let fz0_limit = bounded_limit("prev", f_z0_limit(g), cap);
    let fz1_limit = bounded_limit("next", f_z1_limit(g), cap);

    // Extend the ground past one interval to where sky is still visible
    // between further rows.
    let fz = Array1::linspace(
        (1.0 - fz1_limit).min(0.0),
        fz0_limit.max(1.0),
        OVERSAMPLE * npoints,
    );

    // Gap between the two central rows.
    let mut fz_sky = fz.mapv(|f| {
        let (psi_0, psi_1) = ground_sky_angles(f, g);
        calc_fz_sky(psi_0, psi_1)
    });

    // Gaps beyond the previous row, one row interval further per pass.
    let sky_prev = fz.mapv(|f| {
        let (psi_0, psi_1) = ground_sky_angles_prev(f, g);
        calc_fz_sky(psi_0, psi_1)
    });
    let rows_prev = rows_within(fz0_limit);
    for row in 0..rows_prev {
        let shifted = fz.mapv(|f| f + row as f64);
        fz_sky += &interp(shifted.view(), fz.view(), sky_prev.view());
    }

    // Gaps beyond the next row.
    let sky_next = fz.mapv(|f| {
        let (psi_0, psi_1) = ground_sky_angles_next(f, g);
        calc_fz_sky(psi_0, psi_1)
    });
    let rows_next = rows_within(fz1_limit);
    for row in 0..rows_next {
        let shifted = fz.mapv(|f| f - row as f64);
        fz_sky += &interp(shifted.view(), fz.view(), sky_next.view());
    }

    debug!(
        fz0_limit,
        fz1_limit, rows_prev, rows_next, npoints, "ground sky view factor profile"
    );

    let fz_row = Array1::linspace(0.0, 1.0, npoints);
    let fz_sky_row = interp(fz_row.view(), fz.view(), fz_sky.view()).mapv(|v| v.clamp(0.0, 1.0));
    Ok(GroundSkyProfile {
        fz: fz_row,
        fz_sky: fz_sky_row,
    })
}

/// Sky view factor of the whole ground strip between two rows, with the
/// profile it was integrated from.
pub fn vf_ground_sky(g: &ArrayGeometry, npoints: usize) -> Result<(f64, Array1<f64>)> {
    let profile = ground_sky_diffuse_view_factor(g, npoints)?;
    let fgnd_sky = trapezoid(profile.fz_sky.view(), profile.fz.view());
    Ok((fgnd_sky, profile.fz_sky))
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "ground_sky_diffuse_view_factor")]
#[pyo3(signature = (gcr, height, tilt, pitch, npoints=DEFAULT_NPOINTS))]
pub fn ground_sky_diffuse_view_factor_py<'py>(
    py: Python<'py>,
    gcr: f64,
    height: f64,
    tilt: f64,
    pitch: f64,
    npoints: usize,
) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>)> {
    let g = ArrayGeometry::new(gcr, height, tilt, pitch, PI)?;
    let profile = ground_sky_diffuse_view_factor(&g, npoints)?;
    Ok((profile.fz.into_pyarray(py), profile.fz_sky.into_pyarray(py)))
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "vf_ground_sky")]
#[pyo3(signature = (gcr, height, tilt, pitch, npoints=DEFAULT_NPOINTS))]
pub fn vf_ground_sky_py<'py>(
    py: Python<'py>,
    gcr: f64,
    height: f64,
    tilt: f64,
    pitch: f64,
    npoints: usize,
) -> PyResult<(f64, Bound<'py, PyArray1<f64>>)> {
    let g = ArrayGeometry::new(gcr, height, tilt, pitch, PI)?;
    let (fgnd_sky, fz_sky) = vf_ground_sky(&g, npoints)?;
    Ok((fgnd_sky, fz_sky.into_pyarray(py)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(gcr: f64, height: f64, tilt: f64, pitch: f64) -> ArrayGeometry {
        ArrayGeometry::new(gcr, height, tilt, pitch, PI).unwrap()
    }

    #[test]
    fn test_limits_for_reference_array() {
        // gcr 0.5, 1 m high, 30 degrees, 2 m pitch: both limits are two rows.
        let g = geometry(0.5, 1.0, PI / 6.0, 2.0);
        assert!((f_z0_limit(&g) - 2.0).abs() < 1e-9);
        assert!((f_z1_limit(&g) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_limits_scale_with_height() {
        let g = geometry(0.4, 1.0, 0.0, 2.5);
        assert!((f_z0_limit(&g) - 6.0).abs() < 1e-12);
        assert!((f_z1_limit(&g) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_ground_sky_angles_flat_rows() {
        let g = geometry(0.4, 1.0, 0.0, 2.5);
        assert_eq!(ground_sky_angles(0.3, &g), (0.0, 0.0));
        let g = geometry(0.4, 1.0, PI, 2.5);
        assert_eq!(ground_sky_angles(0.3, &g), (0.0, 0.0));
    }

    #[test]
    fn test_angles_finite_near_flat() {
        for &tilt in &[0.0, 1e-5, 5e-4, PI - 5e-4, PI - 1e-5, PI] {
            let g = geometry(0.4, 1.0, tilt, 2.5);
            for i in 0..=20 {
                let f_z = -1.0 + 0.15 * i as f64;
                let (a, b) = ground_sky_angles(f_z, &g);
                let (c, d) = ground_sky_angles_prev(f_z, &g);
                let (e, f) = ground_sky_angles_next(f_z, &g);
                for v in [a, b, c, d, e, f] {
                    assert!(v.is_finite(), "tilt={tilt} f_z={f_z}");
                }
            }
        }
    }

    #[test]
    fn test_fz_sky_open_ground() {
        assert_eq!(calc_fz_sky(0.0, 0.0), 1.0);
        assert!(calc_fz_sky(PI / 2.0, PI / 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_reference_array_view_factor_bounds() {
        let g = geometry(0.5, 1.0, PI / 6.0, 2.0);
        let (vf, profile) = vf_ground_sky(&g, 100).unwrap();
        let isolated = (1.0 - (PI / 6.0).cos()) / 2.0;
        assert!(vf > isolated && vf < 1.0, "vf = {vf}");
        assert_eq!(profile.len(), 100);
        assert!(profile.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_view_factor_is_deterministic() {
        let g = geometry(0.5, 1.0, PI / 6.0, 2.0);
        let (a, pa) = vf_ground_sky(&g, 100).unwrap();
        let (b, pb) = vf_ground_sky(&g, 100).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_sparse_rows_approach_open_sky() {
        let dense = vf_ground_sky(&geometry(0.5, 1.0, PI / 6.0, 2.0), 100).unwrap().0;
        let sparse = vf_ground_sky(&geometry(0.01, 1.0, PI / 6.0, 200.0), 100).unwrap().0;
        assert!(sparse > dense);
        assert!(sparse > 0.95, "sparse = {sparse}");
        assert!(sparse <= 1.0);
    }

    #[test]
    fn test_ground_level_rows() {
        // No clearance: no sky beyond the neighbouring rows.
        let g = geometry(0.5, 0.0, PI / 6.0, 2.0);
        assert_eq!(f_z0_limit(&g), 0.0);
        let (vf, _) = vf_ground_sky(&g, 50).unwrap();
        assert!(vf > 0.0 && vf < 1.0);
    }

    #[test]
    fn test_reference_view_factors() {
        let cases = [
            ((0.5, 1.0, PI / 6.0, 2.0), 0.537167958329),
            ((0.4, 1.5, 0.35, 3.0), 0.610843640037),
            ((0.6, 0.5, 1.0, 1.7), 0.518768983190),
            ((0.2, 3.0, 0.2, 2.0), 0.800814773884),
            // back side of the first array
            ((0.5, 1.0, PI - PI / 6.0, 2.0), 0.537168209449),
        ];
        for ((gcr, height, tilt, pitch), expected) in cases {
            let (vf, _) = vf_ground_sky(&geometry(gcr, height, tilt, pitch), 100).unwrap();
            assert!((vf - expected).abs() < 1e-9, "{gcr} {height} {tilt} {pitch}: {vf}");
        }
    }

    #[test]
    fn test_nearly_flat_rows_sum_far_gaps() {
        // About 50 rows contribute sky at this tilt.
        let g = geometry(0.35, 2.0, 0.02, 5.7);
        assert!(f_z0_limit(&g) > 50.0);
        let (vf, _) = vf_ground_sky(&g, 100).unwrap();
        assert!((vf - 0.649736983591).abs() < 1e-9, "vf = {vf}");
        let (steeper, _) = vf_ground_sky(&geometry(0.35, 2.0, 0.052, 5.7), 100).unwrap();
        assert!((steeper - 0.650054767168).abs() < 1e-9, "vf = {steeper}");
        let (flatter, _) = vf_ground_sky(&geometry(0.35, 2.0, 0.01, 5.7), 100).unwrap();
        assert!((flatter - 0.697915425394).abs() < 1e-9, "vf = {flatter}");
    }

    #[test]
    fn test_flat_rows_terminate() {
        let g = geometry(0.4, 30.0, 1e-6, 1.0);
        let (vf, profile) = vf_ground_sky(&g, 20).unwrap();
        assert!(vf.is_finite());
        assert!(profile.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_rejects_single_point() {
        let g = geometry(0.5, 1.0, PI / 6.0, 2.0);
        assert!(ground_sky_diffuse_view_factor(&g, 1).is_err());
    }

    #[test]
    fn test_output_grid_spans_one_interval() {
        let g = geometry(0.5, 1.0, PI / 6.0, 2.0);
        let profile = ground_sky_diffuse_view_factor(&g, 11).unwrap();
        assert_eq!(profile.fz[0], 0.0);
        assert!((profile.fz[10] - 1.0).abs() < 1e-12);
    }
}
