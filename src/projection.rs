//! Projection of the sun onto the plane perpendicular to the rows.
//!
//! The model is two dimensional: only the component of the sun vector in the
//! vertical plane across the rows matters. `phi` is the angle of that
//! projection from vertical, positive toward the front of the array.

#[cfg(feature = "python")]
use ndarray::{Array1, Zip};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray1};
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use crate::series::SeriesArg;

/// Projected solar angle `phi` and its tangent.
///
/// `tan_phi = cos(azimuth - system_azimuth) · sin(zenith) / cos(zenith)`.
/// The tangent is unbounded with the sun on the horizon.
#[inline]
pub fn solar_projection(solar_zenith: f64, solar_azimuth: f64, system_azimuth: f64) -> (f64, f64) {
    let rotation = solar_azimuth - system_azimuth;
    let x1 = rotation.cos() * solar_zenith.sin();
    let x2 = solar_zenith.cos();
    (x1.atan2(x2), x1 / x2)
}

/// Tangent of the projected solar angle, without the arctangent.
#[inline]
pub fn solar_projection_tangent(solar_zenith: f64, solar_azimuth: f64, system_azimuth: f64) -> f64 {
    (solar_azimuth - system_azimuth).cos() * solar_zenith.tan()
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "solar_projection")]
pub fn solar_projection_py<'py>(
    py: Python<'py>,
    solar_zenith: SeriesArg<'py>,
    solar_azimuth: SeriesArg<'py>,
    system_azimuth: f64,
) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>)> {
    let (ze, az) = crate::series::broadcast2(
        ("solar_zenith", solar_zenith.view()),
        ("solar_azimuth", solar_azimuth.view()),
    )?;
    let mut phi = Array1::<f64>::zeros(ze.len());
    let mut tan_phi = Array1::<f64>::zeros(ze.len());
    Zip::from(&mut phi)
        .and(&mut tan_phi)
        .and(&ze)
        .and(&az)
        .for_each(|p, t, &z, &a| {
            let (phi_i, tan_i) = solar_projection(z, a, system_azimuth);
            *p = phi_i;
            *t = tan_i;
        });
    Ok((phi.into_pyarray(py), tan_phi.into_pyarray(py)))
}
