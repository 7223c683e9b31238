//! Plane-of-array irradiance corrected for neighbouring rows.
//!
//! Takes the isolated-row POA components from a transposition model and
//! reweights them with the ground shading and view factors of the array:
//!
//! 1. ground reflected irradiance is split into the beam-lit ground, which
//!    contributes fully, and the diffuse-lit ground, weighted by how much sky
//!    the ground sees between rows;
//! 2. sky and ground diffuse on the module are weighted separately over its
//!    shaded and unshaded parts;
//! 3. direct irradiance reaches only the unshaded part, after the incidence
//!    angle modifier.

use ndarray::{Array1, ArrayView1};
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::geometry::ArrayGeometry;
use crate::ground_sky::vf_ground_sky;
use crate::projection::solar_projection_tangent;
use crate::series::{broadcast, common_len};
use crate::shade::{shade_line, unshaded_ground_fraction};
use crate::surface_view::{
    f_ground_pv, f_sky_diffuse_pv, ground_angle_1_tangent, ground_angle_tangent,
    sky_angle_0_tangent, sky_angle_tangent,
};

#[cfg(feature = "python")]
use numpy::IntoPyArray;
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyDict;
#[cfg(feature = "python")]
use crate::series::SeriesArg;

/// Ratio of diffuse to global horizontal irradiance. Not finite when GHI is 0.
#[inline]
pub fn diffuse_fraction(ghi: f64, dhi: f64) -> f64 {
    dhi / ghi
}

/// Ground reflected POA with shaded ground seeing only the sky between rows.
///
/// `poa_ground · (f_gnd_beam·(1 - df) + df·vf_gnd_sky)`, with a non-finite
/// diffuse fraction taken as 0.
#[inline]
pub fn poa_ground_sky(poa_ground: f64, f_gnd_beam: f64, df: f64, vf_gnd_sky: f64) -> f64 {
    // unshaded·(DNI·cos(ze)/GHI) + DHI/GHI·vf, with DNI·cos(ze)/GHI = 1 - df
    let df = if df.is_finite() { df } else { 0.0 };
    poa_ground * (f_gnd_beam * (1.0 - df) + df * vf_gnd_sky)
}

/// Sky diffuse POA weighted over the shaded and unshaded module parts.
#[inline]
pub fn poa_sky_diffuse_pv(poa_sky_diffuse: f64, f_x: f64, f_sky_pv_shade: f64, f_sky_pv_noshade: f64) -> f64 {
    poa_sky_diffuse * (f_x * f_sky_pv_shade + (1.0 - f_x) * f_sky_pv_noshade)
}

/// Ground diffuse POA weighted over the shaded and unshaded module parts.
#[inline]
pub fn poa_ground_pv(poa_gnd_sky: f64, f_x: f64, f_gnd_pv_shade: f64, f_gnd_pv_noshade: f64) -> f64 {
    poa_gnd_sky * (f_x * f_gnd_pv_shade + (1.0 - f_x) * f_gnd_pv_noshade)
}

#[inline]
pub fn poa_diffuse_pv(poa_gnd_pv: f64, poa_sky_pv: f64) -> f64 {
    poa_gnd_pv + poa_sky_pv
}

/// Direct POA on the unshaded part of the module.
#[inline]
pub fn poa_direct_pv(poa_direct: f64, iam: f64, f_x: f64) -> f64 {
    poa_direct * iam * (1.0 - f_x)
}

#[inline]
pub fn poa_global_pv(poa_dir_pv: f64, poa_dif_pv: f64) -> f64 {
    poa_dir_pv + poa_dif_pv
}

/// Per-timestamp inputs of [`get_irradiance`]. Length-1 series broadcast.
#[derive(Clone, Copy)]
pub struct IrradianceInputs<'a> {
    pub solar_zenith: ArrayView1<'a, f64>,
    pub solar_azimuth: ArrayView1<'a, f64>,
    pub ghi: ArrayView1<'a, f64>,
    pub dhi: ArrayView1<'a, f64>,
    /// Isolated-row ground reflected POA.
    pub poa_ground: ArrayView1<'a, f64>,
    /// Isolated-row sky diffuse POA.
    pub poa_sky_diffuse: ArrayView1<'a, f64>,
    /// Isolated-row direct POA.
    pub poa_direct: ArrayView1<'a, f64>,
    /// Incidence angle modifier of the direct component.
    pub iam: ArrayView1<'a, f64>,
}

impl<'a> IrradianceInputs<'a> {
    fn named(&self) -> [(&'static str, ArrayView1<'a, f64>); 8] {
        [
            ("solar_zenith", self.solar_zenith),
            ("solar_azimuth", self.solar_azimuth),
            ("ghi", self.ghi),
            ("dhi", self.dhi),
            ("poa_ground", self.poa_ground),
            ("poa_sky_diffuse", self.poa_sky_diffuse),
            ("poa_direct", self.poa_direct),
            ("iam", self.iam),
        ]
    }
}

/// Every quantity computed for one surface at one timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct SurfaceSample {
    poa_global_pv: f64,
    poa_direct_pv: f64,
    poa_diffuse_pv: f64,
    poa_ground_diffuse_pv: f64,
    poa_sky_diffuse_pv: f64,
    tan_phi: f64,
    f_gnd_beam: f64,
    df: f64,
    poa_gnd_sky: f64,
    f_x: f64,
    tan_psi_top: f64,
    f_sky_pv_shade: f64,
    f_sky_pv_noshade: f64,
    tan_psi_bottom: f64,
    f_gnd_pv_shade: f64,
    f_gnd_pv_noshade: f64,
}

/// Irradiance on one side of a row over a time series.
///
/// Built once per evaluation and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct PvSurface {
    pub poa_global_pv: Array1<f64>,
    pub poa_direct_pv: Array1<f64>,
    pub poa_diffuse_pv: Array1<f64>,
    pub poa_ground_diffuse_pv: Array1<f64>,
    pub poa_sky_diffuse_pv: Array1<f64>,
    /// Tangent of the projected solar angle.
    pub tan_phi: Array1<f64>,
    /// Fraction of the ground between rows lit by direct beam.
    pub f_gnd_beam: Array1<f64>,
    /// Diffuse fraction DHI/GHI, unmasked.
    pub df: Array1<f64>,
    pub poa_gnd_sky: Array1<f64>,
    /// Shade line, fraction of the module shaded from its lower edge.
    pub f_x: Array1<f64>,
    pub tan_psi_top: Array1<f64>,
    pub tan_psi_top_0: f64,
    pub f_sky_pv_shade: Array1<f64>,
    pub f_sky_pv_noshade: Array1<f64>,
    pub tan_psi_bottom: Array1<f64>,
    pub tan_psi_bottom_1: f64,
    pub f_gnd_pv_shade: Array1<f64>,
    pub f_gnd_pv_noshade: Array1<f64>,
    /// Sky view factor of the ground between rows.
    pub vf_gnd_sky: f64,
}

impl PvSurface {
    fn from_samples(samples: &[SurfaceSample], tan_psi_top_0: f64, tan_psi_bottom_1: f64, vf_gnd_sky: f64) -> Self {
        let column = |f: fn(&SurfaceSample) -> f64| samples.iter().map(f).collect::<Array1<f64>>();
        Self {
            poa_global_pv: column(|s| s.poa_global_pv),
            poa_direct_pv: column(|s| s.poa_direct_pv),
            poa_diffuse_pv: column(|s| s.poa_diffuse_pv),
            poa_ground_diffuse_pv: column(|s| s.poa_ground_diffuse_pv),
            poa_sky_diffuse_pv: column(|s| s.poa_sky_diffuse_pv),
            tan_phi: column(|s| s.tan_phi),
            f_gnd_beam: column(|s| s.f_gnd_beam),
            df: column(|s| s.df),
            poa_gnd_sky: column(|s| s.poa_gnd_sky),
            f_x: column(|s| s.f_x),
            tan_psi_top: column(|s| s.tan_psi_top),
            tan_psi_top_0,
            f_sky_pv_shade: column(|s| s.f_sky_pv_shade),
            f_sky_pv_noshade: column(|s| s.f_sky_pv_noshade),
            tan_psi_bottom: column(|s| s.tan_psi_bottom),
            tan_psi_bottom_1,
            f_gnd_pv_shade: column(|s| s.f_gnd_pv_shade),
            f_gnd_pv_noshade: column(|s| s.f_gnd_pv_noshade),
            vf_gnd_sky,
        }
    }

    pub fn len(&self) -> usize {
        self.poa_global_pv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poa_global_pv.is_empty()
    }
}

/// Constants of one surface shared by all timestamps.
struct SurfaceConstants {
    gcr: f64,
    tilt: f64,
    system_azimuth: f64,
    vf_gnd_sky: f64,
    tan_psi_top_0: f64,
    tan_psi_bottom_1: f64,
}

#[allow(clippy::too_many_arguments)]
fn surface_sample(
    c: &SurfaceConstants,
    solar_zenith: f64,
    solar_azimuth: f64,
    ghi: f64,
    dhi: f64,
    poa_ground: f64,
    poa_sky_diffuse: f64,
    poa_direct: f64,
    iam: f64,
) -> SurfaceSample {
    let tan_phi = solar_projection_tangent(solar_zenith, solar_azimuth, c.system_azimuth);
    let f_gnd_beam = unshaded_ground_fraction(c.gcr, c.tilt, tan_phi);
    let df = diffuse_fraction(ghi, dhi);
    let poa_gnd_sky = poa_ground_sky(poa_ground, f_gnd_beam, df, c.vf_gnd_sky);
    let f_x = shade_line(c.gcr, c.tilt, tan_phi);

    let tan_psi_top = sky_angle_tangent(c.gcr, c.tilt, f_x);
    let (f_sky_pv_shade, f_sky_pv_noshade) = f_sky_diffuse_pv(c.tilt, tan_psi_top, c.tan_psi_top_0);
    let poa_sky_pv = poa_sky_diffuse_pv(poa_sky_diffuse, f_x, f_sky_pv_shade, f_sky_pv_noshade);

    let tan_psi_bottom = ground_angle_tangent(c.gcr, c.tilt, f_x);
    let (f_gnd_pv_shade, f_gnd_pv_noshade) = f_ground_pv(c.tilt, tan_psi_bottom, c.tan_psi_bottom_1);
    let poa_gnd_pv = poa_ground_pv(poa_gnd_sky, f_x, f_gnd_pv_shade, f_gnd_pv_noshade);

    let poa_dif_pv = poa_diffuse_pv(poa_gnd_pv, poa_sky_pv);
    let poa_dir_pv = poa_direct_pv(poa_direct, iam, f_x);
    SurfaceSample {
        poa_global_pv: poa_global_pv(poa_dir_pv, poa_dif_pv),
        poa_direct_pv: poa_dir_pv,
        poa_diffuse_pv: poa_dif_pv,
        poa_ground_diffuse_pv: poa_gnd_pv,
        poa_sky_diffuse_pv: poa_sky_pv,
        tan_phi,
        f_gnd_beam,
        df,
        poa_gnd_sky,
        f_x,
        tan_psi_top,
        f_sky_pv_shade,
        f_sky_pv_noshade,
        tan_psi_bottom,
        f_gnd_pv_shade,
        f_gnd_pv_noshade,
    }
}

/// Irradiance on the surface described by `geometry` (front side, or the
/// back side via [`ArrayGeometry::backside`]) of a row in the middle of an
/// array with infinitely many rows.
pub fn get_irradiance(inputs: &IrradianceInputs, geometry: &ArrayGeometry, npoints: usize) -> Result<PvSurface> {
    let n = common_len(&inputs.named())?;
    let ze = broadcast("solar_zenith", inputs.solar_zenith, n)?;
    let az = broadcast("solar_azimuth", inputs.solar_azimuth, n)?;
    let ghi = broadcast("ghi", inputs.ghi, n)?;
    let dhi = broadcast("dhi", inputs.dhi, n)?;
    let poa_ground = broadcast("poa_ground", inputs.poa_ground, n)?;
    let poa_sky = broadcast("poa_sky_diffuse", inputs.poa_sky_diffuse, n)?;
    let poa_dir = broadcast("poa_direct", inputs.poa_direct, n)?;
    let iam = broadcast("iam", inputs.iam, n)?;

    let (vf_gnd_sky, _) = vf_ground_sky(geometry, npoints)?;
    let constants = SurfaceConstants {
        gcr: geometry.gcr(),
        tilt: geometry.tilt(),
        system_azimuth: geometry.system_azimuth(),
        vf_gnd_sky,
        tan_psi_top_0: sky_angle_0_tangent(geometry.gcr(), geometry.tilt()),
        tan_psi_bottom_1: ground_angle_1_tangent(geometry.gcr(), geometry.tilt()),
    };
    debug!(
        n,
        tilt = constants.tilt,
        vf_gnd_sky,
        "infinite sheds surface irradiance"
    );

    let samples: Vec<SurfaceSample> = (0..n)
        .into_par_iter()
        .map(|i| {
            surface_sample(
                &constants,
                ze[i],
                az[i],
                ghi[i],
                dhi[i],
                poa_ground[i],
                poa_sky[i],
                poa_dir[i],
                iam[i],
            )
        })
        .collect();

    Ok(PvSurface::from_samples(
        &samples,
        constants.tan_psi_top_0,
        constants.tan_psi_bottom_1,
        vf_gnd_sky,
    ))
}

#[cfg(feature = "python")]
impl PvSurface {
    /// Output columns keyed as in the Python API; diagnostics only with
    /// `all_output`.
    pub(crate) fn to_pydict<'py>(&self, py: Python<'py>, all_output: bool) -> PyResult<Bound<'py, PyDict>> {
        let out = PyDict::new(py);
        let series = |a: &Array1<f64>| a.clone().into_pyarray(py);
        out.set_item("poa_global_pv", series(&self.poa_global_pv))?;
        out.set_item("poa_direct_pv", series(&self.poa_direct_pv))?;
        out.set_item("poa_diffuse_pv", series(&self.poa_diffuse_pv))?;
        out.set_item("poa_ground_diffuse_pv", series(&self.poa_ground_diffuse_pv))?;
        out.set_item("poa_sky_diffuse_pv", series(&self.poa_sky_diffuse_pv))?;
        if all_output {
            out.set_item("solar_projection", series(&self.tan_phi))?;
            out.set_item("ground_illumination", series(&self.f_gnd_beam))?;
            out.set_item("diffuse_fraction", series(&self.df))?;
            out.set_item("poa_ground_sky", series(&self.poa_gnd_sky))?;
            out.set_item("shade_line", series(&self.f_x))?;
            out.set_item("sky_angle_tangent", series(&self.tan_psi_top))?;
            out.set_item("sky_angle_0_tangent", self.tan_psi_top_0)?;
            out.set_item("f_sky_diffuse_pv_shade", series(&self.f_sky_pv_shade))?;
            out.set_item("f_sky_diffuse_pv_noshade", series(&self.f_sky_pv_noshade))?;
            out.set_item("ground_angle_tangent", series(&self.tan_psi_bottom))?;
            out.set_item("ground_angle_1_tangent", self.tan_psi_bottom_1)?;
            out.set_item("f_ground_diffuse_pv_shade", series(&self.f_gnd_pv_shade))?;
            out.set_item("f_ground_diffuse_pv_noshade", series(&self.f_gnd_pv_noshade))?;
            out.set_item("vf_ground_sky", self.vf_gnd_sky)?;
        }
        Ok(out)
    }
}

/// Irradiance from the infinite sheds model as a dict of numpy arrays.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "get_irradiance")]
#[pyo3(signature = (
    solar_zenith, solar_azimuth, system_azimuth, gcr, height, tilt, pitch,
    ghi, dhi, poa_ground, poa_sky_diffuse, poa_direct, iam,
    npoints=crate::ground_sky::DEFAULT_NPOINTS, all_output=false,
))]
#[allow(clippy::too_many_arguments)]
pub fn get_irradiance_py<'py>(
    py: Python<'py>,
    solar_zenith: SeriesArg<'py>,
    solar_azimuth: SeriesArg<'py>,
    system_azimuth: f64,
    gcr: f64,
    height: f64,
    tilt: f64,
    pitch: f64,
    ghi: SeriesArg<'py>,
    dhi: SeriesArg<'py>,
    poa_ground: SeriesArg<'py>,
    poa_sky_diffuse: SeriesArg<'py>,
    poa_direct: SeriesArg<'py>,
    iam: SeriesArg<'py>,
    npoints: usize,
    all_output: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let geometry = ArrayGeometry::new(gcr, height, tilt, pitch, system_azimuth)?;
    let inputs = IrradianceInputs {
        solar_zenith: solar_zenith.view(),
        solar_azimuth: solar_azimuth.view(),
        ghi: ghi.view(),
        dhi: dhi.view(),
        poa_ground: poa_ground.view(),
        poa_sky_diffuse: poa_sky_diffuse.view(),
        poa_direct: poa_direct.view(),
        iam: iam.view(),
    };
    let surface = py.allow_threads(|| get_irradiance(&inputs, &geometry, npoints))?;
    surface.to_pydict(py, all_output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::f64::consts::PI;

    fn assert_approx(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_fully_diffuse_sky_drops_beam_term() {
        let df = diffuse_fraction(300.0, 300.0);
        assert_eq!(df, 1.0);
        assert_eq!(poa_ground_sky(40.0, 0.7, df, 0.35), 40.0 * 0.35);
    }

    #[test]
    fn test_zero_ghi_masks_diffuse_fraction() {
        let df = diffuse_fraction(0.0, 0.0);
        assert!(df.is_nan());
        assert_eq!(poa_ground_sky(10.0, 0.6, df, 0.3), 6.0);
        let df = diffuse_fraction(0.0, 5.0);
        assert!(df.is_infinite());
        assert_eq!(poa_ground_sky(10.0, 0.6, df, 0.3), 6.0);
    }

    #[test]
    fn test_shade_weighting() {
        assert_eq!(poa_sky_diffuse_pv(100.0, 0.0, 0.5, 0.9), 90.0);
        assert_eq!(poa_sky_diffuse_pv(100.0, 1.0, 0.5, 0.9), 50.0);
        assert_approx(poa_ground_pv(20.0, 0.5, 0.8, 0.4), 12.0, 1e-12);
    }

    #[test]
    fn test_direct_only_on_unshaded_part() {
        assert_eq!(poa_direct_pv(800.0, 0.95, 0.0), 760.0);
        assert_eq!(poa_direct_pv(800.0, 0.95, 1.0), 0.0);
        assert_eq!(poa_direct_pv(800.0, 1.0, 0.25), 600.0);
    }

    #[test]
    fn test_global_is_sum_of_components() {
        let geometry = ArrayGeometry::new(0.5, 1.0, PI / 6.0, 2.0, PI).unwrap();
        let ze = array![0.2, 0.9, 1.3];
        let az = array![PI, 2.5, 4.2];
        let ghi = array![900.0, 500.0, 120.0];
        let dhi = array![100.0, 150.0, 110.0];
        let poa_ground = array![12.0, 7.0, 2.0];
        let poa_sky = array![95.0, 140.0, 100.0];
        let poa_dir = array![780.0, 300.0, 5.0];
        let iam = array![0.99];
        let inputs = IrradianceInputs {
            solar_zenith: ze.view(),
            solar_azimuth: az.view(),
            ghi: ghi.view(),
            dhi: dhi.view(),
            poa_ground: poa_ground.view(),
            poa_sky_diffuse: poa_sky.view(),
            poa_direct: poa_dir.view(),
            iam: iam.view(),
        };
        let s = get_irradiance(&inputs, &geometry, 100).unwrap();
        assert_eq!(s.len(), 3);
        for i in 0..3 {
            assert_approx(
                s.poa_global_pv[i],
                s.poa_direct_pv[i] + s.poa_ground_diffuse_pv[i] + s.poa_sky_diffuse_pv[i],
                1e-9,
            );
            assert!((0.0..=1.0).contains(&s.f_x[i]));
            assert!((0.0..=1.0).contains(&s.f_gnd_beam[i]));
            assert!(s.poa_global_pv[i] <= poa_dir[i] * 0.99 + poa_sky[i] + poa_ground[i] + 1e-9);
        }
        assert_eq!(s.poa_direct_pv[0], 780.0 * 0.99);
    }

    #[test]
    fn test_overhead_sun() {
        let geometry = ArrayGeometry::new(0.4, 1.0, PI / 6.0, 2.5, PI).unwrap();
        let one = array![1.0];
        let zero = array![0.0];
        let ghi = array![1000.0];
        let dhi = array![100.0];
        let inputs = IrradianceInputs {
            solar_zenith: zero.view(),
            solar_azimuth: zero.view(),
            ghi: ghi.view(),
            dhi: dhi.view(),
            poa_ground: zero.view(),
            poa_sky_diffuse: zero.view(),
            poa_direct: ghi.view(),
            iam: one.view(),
        };
        let s = get_irradiance(&inputs, &geometry, 100).unwrap();
        assert_eq!(s.tan_phi[0], 0.0);
        assert_eq!(s.f_gnd_beam[0], 1.0 - 0.4 * (PI / 6.0).cos());
        assert_eq!(s.f_x[0], 0.0);
        assert_eq!(s.poa_global_pv[0], 1000.0);
    }

    #[test]
    fn test_scalar_weather_broadcasts() {
        use crate::series::scalar_series;

        let geometry = ArrayGeometry::new(0.4, 1.0, PI / 6.0, 2.5, PI).unwrap();
        let ze = array![0.3, 0.6, 1.0];
        let (az, ghi, dhi, poa_ground, poa_sky, poa_dir, iam) = (PI, 800.0, 120.0, 20.0, 110.0, 600.0, 1.0);
        let scalars = IrradianceInputs {
            solar_zenith: ze.view(),
            solar_azimuth: scalar_series(&az),
            ghi: scalar_series(&ghi),
            dhi: scalar_series(&dhi),
            poa_ground: scalar_series(&poa_ground),
            poa_sky_diffuse: scalar_series(&poa_sky),
            poa_direct: scalar_series(&poa_dir),
            iam: scalar_series(&iam),
        };
        let s = get_irradiance(&scalars, &geometry, 100).unwrap();
        assert_eq!(s.len(), 3);

        let full = |v: f64| Array1::from_elem(3, v);
        let (az3, ghi3, dhi3) = (full(az), full(ghi), full(dhi));
        let (ground3, sky3, dir3, iam3) = (full(poa_ground), full(poa_sky), full(poa_dir), full(iam));
        let series = IrradianceInputs {
            solar_zenith: ze.view(),
            solar_azimuth: az3.view(),
            ghi: ghi3.view(),
            dhi: dhi3.view(),
            poa_ground: ground3.view(),
            poa_sky_diffuse: sky3.view(),
            poa_direct: dir3.view(),
            iam: iam3.view(),
        };
        assert_eq!(s, get_irradiance(&series, &geometry, 100).unwrap());
    }

    #[test]
    fn test_mismatched_series_rejected() {
        let geometry = ArrayGeometry::new(0.4, 1.0, PI / 6.0, 2.5, PI).unwrap();
        let a = array![0.1, 0.2];
        let b = array![0.1, 0.2, 0.3];
        let inputs = IrradianceInputs {
            solar_zenith: a.view(),
            solar_azimuth: b.view(),
            ghi: a.view(),
            dhi: a.view(),
            poa_ground: a.view(),
            poa_sky_diffuse: a.view(),
            poa_direct: a.view(),
            iam: a.view(),
        };
        assert!(get_irradiance(&inputs, &geometry, 100).is_err());
    }
}
