//! View factors from the module surface to the sky and to the ground.
//!
//! The shade line splits the module into a shaded lower part and an unshaded
//! upper part. The view factor along the module is taken as linear within each
//! part, so each part gets the mean of the view factors at its two ends.
//! Factors are relative to an isolated row, which sees `(1 + cos(tilt)) / 2`
//! of the sky and `(1 - cos(tilt)) / 2` of the ground.

use std::f64::consts::PI;

use crate::error::Result;
use crate::geometry::{ArrayGeometry, EPS};
use crate::ground_sky::vf_ground_sky;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Angle from the shade line to the top of the next row, and its tangent.
pub fn sky_angle(gcr: f64, tilt: f64, f_x: f64) -> (f64, f64) {
    let f_y = 1.0 - f_x;
    let x1 = f_y * tilt.sin();
    let x2 = 1.0 / gcr - f_y * tilt.cos();
    (x1.atan2(x2), x1 / x2)
}

/// `tan(psi_t) = F_y·sin(tilt) / (1/gcr - F_y·cos(tilt))` with `F_y = 1 - F_x`.
#[inline]
pub fn sky_angle_tangent(gcr: f64, tilt: f64, f_x: f64) -> f64 {
    let f_y = 1.0 - f_x;
    f_y * tilt.sin() / (1.0 / gcr - f_y * tilt.cos())
}

/// Tangent of the angle from the module lower edge to the top of the next row.
#[inline]
pub fn sky_angle_0_tangent(gcr: f64, tilt: f64) -> f64 {
    sky_angle_tangent(gcr, tilt, 0.0)
}

/// Relative sky view factors of the shaded and unshaded module parts.
///
/// The shaded part spans the lower edge to the shade line; the unshaded part
/// spans the shade line to the top edge, which sees the whole sky hemisphere.
pub fn f_sky_diffuse_pv(tilt: f64, tan_psi_top: f64, tan_psi_top_0: f64) -> (f64, f64) {
    let isolated = 1.0 + tilt.cos();
    if tilt > PI - EPS {
        // Facing the ground: no isolated-row sky to correct.
        return (1.0, 1.0);
    }
    let psi_top = tan_psi_top.atan();
    let psi_top_0 = tan_psi_top_0.atan();
    let f_sky_pv_shade = (1.0 + ((psi_top + tilt).cos() + (psi_top_0 + tilt).cos()) / 2.0) / isolated;
    let f_sky_pv_noshade = (1.0 + (1.0 + (psi_top + tilt).cos()) / isolated) / 2.0;
    (f_sky_pv_shade, f_sky_pv_noshade)
}

/// Angle from the shade line to the bottom of the next row, and its tangent.
pub fn ground_angle(gcr: f64, tilt: f64, f_x: f64) -> (f64, f64) {
    let x1 = f_x * tilt.sin();
    let x2 = f_x * tilt.cos() + 1.0 / gcr;
    (x1.atan2(x2), x1 / x2)
}

/// `tan(psi_b) = F_x·sin(tilt) / (F_x·cos(tilt) + 1/gcr)`.
#[inline]
pub fn ground_angle_tangent(gcr: f64, tilt: f64, f_x: f64) -> f64 {
    f_x * tilt.sin() / (f_x * tilt.cos() + 1.0 / gcr)
}

/// Tangent of the angle from the module top edge to the bottom of the next
/// row.
#[inline]
pub fn ground_angle_1_tangent(gcr: f64, tilt: f64) -> f64 {
    ground_angle_tangent(gcr, tilt, 1.0)
}

/// Relative ground view factors of the shaded and unshaded module parts.
///
/// The lower edge sees the whole ground, so its relative factor is one.
pub fn f_ground_pv(tilt: f64, tan_psi_bottom: f64, tan_psi_bottom_1: f64) -> (f64, f64) {
    let isolated = 1.0 - tilt.cos();
    if tilt < EPS {
        // Facing the sky: no isolated-row ground to correct.
        return (1.0, 1.0);
    }
    let psi_bottom = tan_psi_bottom.atan();
    let psi_bottom_1 = tan_psi_bottom_1.atan();
    let f_gnd_pv_shade = (1.0 + (1.0 - (tilt - psi_bottom).cos()) / isolated) / 2.0;
    let f_gnd_pv_noshade =
        (1.0 - ((tilt - psi_bottom).cos() + (tilt - psi_bottom_1).cos()) / 2.0) / isolated;
    (f_gnd_pv_shade, f_gnd_pv_noshade)
}

/// Ground-reflected sky diffuse reaching point `fx` on the module, given the
/// ground's integrated sky view factor. Returns `(fskyz, fgnd_pv)`.
pub(crate) fn fgndpv_zsky(fx: f64, gcr: f64, tilt: f64, fgnd_sky: f64) -> (f64, f64) {
    // The lower edge sees all of the ground in front of it.
    let psi_x_bottom = if fx == 0.0 {
        0.0
    } else {
        ground_angle(gcr, tilt, fx).0
    };
    let psi_max = tilt - psi_x_bottom;
    let fgnd_pv = (1.0 - psi_max.cos()) / 2.0;
    (fgnd_sky * fgnd_pv, fgnd_pv)
}

/// View factor from point `fx` (fraction of the module from its lower edge)
/// to sky diffuse reflected from the ground between rows.
///
/// Returns `(fskyz, fgnd_pv)`: the combined factor and the point's view
/// factor of the ground alone.
pub fn calc_fgndpv_zsky(fx: f64, g: &ArrayGeometry, npoints: usize) -> Result<(f64, f64)> {
    let (fgnd_sky, _) = vf_ground_sky(g, npoints)?;
    Ok(fgndpv_zsky(fx, g.gcr(), g.tilt(), fgnd_sky))
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "calc_fgndpv_zsky")]
#[pyo3(signature = (fx, gcr, height, tilt, pitch, npoints=crate::ground_sky::DEFAULT_NPOINTS))]
pub fn calc_fgndpv_zsky_py(
    fx: f64,
    gcr: f64,
    height: f64,
    tilt: f64,
    pitch: f64,
    npoints: usize,
) -> PyResult<(f64, f64)> {
    let g = ArrayGeometry::new(gcr, height, tilt, pitch, PI)?;
    Ok(calc_fgndpv_zsky(fx, &g, npoints)?)
}
