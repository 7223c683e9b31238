//! Front and back irradiance of bifacial rows.

use ndarray::{Array1, ArrayView1, Zip};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, ShedsError};
use crate::geometry::ArrayGeometry;
use crate::ground_sky::DEFAULT_NPOINTS;
use crate::irradiance::{get_irradiance, IrradianceInputs, PvSurface};
use crate::series::{broadcast, broadcast2, common_len};
use crate::transposition::{
    Ashrae, IncidenceAngleModifier, PoaComponents, SkyConditions, SkyTransposition, Transposition,
    TranspositionModel,
};

#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray1};
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use crate::series::SeriesArg;

/// `front + back·bifaciality·(1 + shade_factor)·(1 + transmission_factor)`.
#[inline]
pub fn poa_global_bifacial(
    poa_global_front: f64,
    poa_global_back: f64,
    bifaciality: f64,
    shade_factor: f64,
    transmission_factor: f64,
) -> f64 {
    let effects = (1.0 + shade_factor) * (1.0 + transmission_factor);
    poa_global_front + poa_global_back * bifaciality * effects
}

/// Back side response and derates of a bifacial module.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BifacialParams {
    /// Back side responsivity relative to the front.
    pub bifaciality: f64,
    /// Fractional change of back side irradiance from structure shading,
    /// usually negative.
    pub shade_factor: f64,
    /// Fractional change of back side irradiance from light passing between
    /// cells.
    pub transmission_factor: f64,
}

impl Default for BifacialParams {
    fn default() -> Self {
        Self {
            bifaciality: 0.8,
            shade_factor: -0.02,
            transmission_factor: 0.0,
        }
    }
}

impl BifacialParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.bifaciality.is_finite() && self.bifaciality >= 0.0) {
            return Err(ShedsError::InvalidParameter {
                name: "bifaciality",
                value: self.bifaciality,
                reason: "must be finite and non-negative",
            });
        }
        Ok(())
    }

    /// Combine front and back `poa_global_pv` series. A length-1 series
    /// broadcasts against the other.
    pub fn combine<'a>(&self, front: ArrayView1<'a, f64>, back: ArrayView1<'a, f64>) -> Result<Array1<f64>> {
        let (front, back) = broadcast2(("poa_global_front", front), ("poa_global_back", back))?;
        let p = *self;
        Ok(Zip::from(&front).and(&back).par_map_collect(|&f, &b| {
            poa_global_bifacial(f, b, p.bifaciality, p.shade_factor, p.transmission_factor)
        }))
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl BifacialParams {
    #[new]
    #[pyo3(signature = (bifaciality=0.8, shade_factor=-0.02, transmission_factor=0.0))]
    pub fn py_new(bifaciality: f64, shade_factor: f64, transmission_factor: f64) -> PyResult<Self> {
        let params = Self {
            bifaciality,
            shade_factor,
            transmission_factor,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Settings of [`get_poa_global_bifacial`] beyond geometry and weather.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BifacialOptions {
    /// ASHRAE `b0` of the front cover.
    pub iam_b0_front: f64,
    /// ASHRAE `b0` of the back cover.
    pub iam_b0_back: f64,
    pub params: BifacialParams,
    pub method: TranspositionModel,
    /// Uniform ground albedo seen by the isolated-row transposition.
    pub albedo: f64,
    pub npoints: usize,
}

impl Default for BifacialOptions {
    fn default() -> Self {
        Self {
            iam_b0_front: 0.05,
            iam_b0_back: 0.05,
            params: BifacialParams::default(),
            method: TranspositionModel::HayDavies,
            albedo: 0.25,
            npoints: DEFAULT_NPOINTS,
        }
    }
}

/// Weather and sun position series. Length-1 series broadcast.
#[derive(Clone, Copy)]
pub struct BifacialInputs<'a> {
    pub solar_zenith: ArrayView1<'a, f64>,
    pub solar_azimuth: ArrayView1<'a, f64>,
    pub ghi: ArrayView1<'a, f64>,
    pub dhi: ArrayView1<'a, f64>,
    pub dni: ArrayView1<'a, f64>,
    pub dni_extra: ArrayView1<'a, f64>,
    pub am_rel: ArrayView1<'a, f64>,
}

/// Both surfaces of a bifacial row and their combination.
#[derive(Debug, Clone, PartialEq)]
pub struct BifacialResult {
    pub front: PvSurface,
    pub back: PvSurface,
    pub poa_global_bifacial: Array1<f64>,
}

/// Isolated-row components of one side, as series.
struct SideComponents {
    poa_ground: Array1<f64>,
    poa_sky_diffuse: Array1<f64>,
    poa_direct: Array1<f64>,
    iam: Array1<f64>,
}

impl SideComponents {
    fn from_poa(poa: impl Iterator<Item = PoaComponents> + Clone, iam: &dyn IncidenceAngleModifier) -> Self {
        Self {
            poa_ground: poa.clone().map(|c| c.ground_diffuse).collect(),
            poa_sky_diffuse: poa.clone().map(|c| c.sky_diffuse).collect(),
            poa_direct: poa.clone().map(|c| c.direct).collect(),
            iam: poa.map(|c| iam.modifier(c.aoi)).collect(),
        }
    }

    fn inputs<'a>(
        &'a self,
        solar_zenith: &'a Array1<f64>,
        solar_azimuth: &'a Array1<f64>,
        ghi: &'a Array1<f64>,
        dhi: &'a Array1<f64>,
    ) -> IrradianceInputs<'a> {
        IrradianceInputs {
            solar_zenith: solar_zenith.view(),
            solar_azimuth: solar_azimuth.view(),
            ghi: ghi.view(),
            dhi: dhi.view(),
            poa_ground: self.poa_ground.view(),
            poa_sky_diffuse: self.poa_sky_diffuse.view(),
            poa_direct: self.poa_direct.view(),
            iam: self.iam.view(),
        }
    }
}

/// Front and back irradiance of a row with caller-supplied transposition and
/// incidence angle modifiers.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_bifacial(
    inputs: &BifacialInputs,
    geometry: &ArrayGeometry,
    transposition: &dyn Transposition,
    iam_front: &dyn IncidenceAngleModifier,
    iam_back: &dyn IncidenceAngleModifier,
    params: &BifacialParams,
    npoints: usize,
) -> Result<BifacialResult> {
    params.validate()?;
    let named = [
        ("solar_zenith", inputs.solar_zenith),
        ("solar_azimuth", inputs.solar_azimuth),
        ("ghi", inputs.ghi),
        ("dhi", inputs.dhi),
        ("dni", inputs.dni),
        ("dni_extra", inputs.dni_extra),
        ("am_rel", inputs.am_rel),
    ];
    let n = common_len(&named)?;
    let ze = broadcast("solar_zenith", inputs.solar_zenith, n)?;
    let az = broadcast("solar_azimuth", inputs.solar_azimuth, n)?;
    let ghi = broadcast("ghi", inputs.ghi, n)?;
    let dhi = broadcast("dhi", inputs.dhi, n)?;
    let dni = broadcast("dni", inputs.dni, n)?;
    let dni_extra = broadcast("dni_extra", inputs.dni_extra, n)?;
    let am_rel = broadcast("am_rel", inputs.am_rel, n)?;

    let back_geometry = geometry.backside();
    debug!(
        n,
        front_tilt = geometry.tilt(),
        back_tilt = back_geometry.tilt(),
        back_azimuth = back_geometry.system_azimuth(),
        "bifacial transposition"
    );

    let components: Vec<(PoaComponents, PoaComponents)> = (0..n)
        .into_par_iter()
        .map(|i| {
            let sky = SkyConditions {
                solar_zenith: ze[i],
                solar_azimuth: az[i],
                dni: dni[i],
                ghi: ghi[i],
                dhi: dhi[i],
                dni_extra: dni_extra[i],
                am_rel: am_rel[i],
            };
            let front = transposition.transpose(geometry.tilt(), geometry.system_azimuth(), &sky)?;
            let back = transposition.transpose(back_geometry.tilt(), back_geometry.system_azimuth(), &sky)?;
            Ok((front, back))
        })
        .collect::<Result<_>>()?;

    let front_poa = SideComponents::from_poa(components.iter().map(|c| c.0), iam_front);
    let back_poa = SideComponents::from_poa(components.iter().map(|c| c.1), iam_back);

    let front = get_irradiance(&front_poa.inputs(&ze, &az, &ghi, &dhi), geometry, npoints)?;
    let back = get_irradiance(&back_poa.inputs(&ze, &az, &ghi, &dhi), &back_geometry, npoints)?;
    let poa_global_bifacial = params.combine(front.poa_global_pv.view(), back.poa_global_pv.view())?;
    Ok(BifacialResult {
        front,
        back,
        poa_global_bifacial,
    })
}

/// Global bifacial irradiance with the named sky diffuse model, a uniform
/// ground albedo and ASHRAE incidence angle modifiers on both sides.
pub fn get_poa_global_bifacial(
    inputs: &BifacialInputs,
    geometry: &ArrayGeometry,
    options: &BifacialOptions,
) -> Result<Array1<f64>> {
    let transposition = SkyTransposition::new(options.method, options.albedo)?;
    let result = evaluate_bifacial(
        inputs,
        geometry,
        &transposition,
        &Ashrae { b0: options.iam_b0_front },
        &Ashrae { b0: options.iam_b0_back },
        &options.params,
        options.npoints,
    )?;
    Ok(result.poa_global_bifacial)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "poa_global_bifacial")]
#[pyo3(signature = (poa_global_front, poa_global_back, bifaciality=0.8, shade_factor=-0.02, transmission_factor=0.0))]
pub fn poa_global_bifacial_py<'py>(
    py: Python<'py>,
    poa_global_front: SeriesArg<'py>,
    poa_global_back: SeriesArg<'py>,
    bifaciality: f64,
    shade_factor: f64,
    transmission_factor: f64,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let params = BifacialParams {
        bifaciality,
        shade_factor,
        transmission_factor,
    };
    let combined = params.combine(poa_global_front.view(), poa_global_back.view())?;
    Ok(combined.into_pyarray(py))
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "get_poa_global_bifacial")]
#[pyo3(signature = (
    solar_zenith, solar_azimuth, system_azimuth, gcr, height, tilt, pitch,
    ghi, dhi, dni, dni_extra, am_rel,
    iam_b0_front=0.05, iam_b0_back=0.05, bifaciality=0.8, shade_factor=-0.02,
    transmission_factor=0.0, method="haydavies", albedo=0.25,
    npoints=DEFAULT_NPOINTS,
))]
#[allow(clippy::too_many_arguments)]
pub fn get_poa_global_bifacial_py<'py>(
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
    dni: SeriesArg<'py>,
    dni_extra: SeriesArg<'py>,
    am_rel: SeriesArg<'py>,
    iam_b0_front: f64,
    iam_b0_back: f64,
    bifaciality: f64,
    shade_factor: f64,
    transmission_factor: f64,
    method: &str,
    albedo: f64,
    npoints: usize,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let geometry = ArrayGeometry::new(gcr, height, tilt, pitch, system_azimuth)?;
    let options = BifacialOptions {
        iam_b0_front,
        iam_b0_back,
        params: BifacialParams {
            bifaciality,
            shade_factor,
            transmission_factor,
        },
        method: method.parse()?,
        albedo,
        npoints,
    };
    let inputs = BifacialInputs {
        solar_zenith: solar_zenith.view(),
        solar_azimuth: solar_azimuth.view(),
        ghi: ghi.view(),
        dhi: dhi.view(),
        dni: dni.view(),
        dni_extra: dni_extra.view(),
        am_rel: am_rel.view(),
    };
    let combined = py.allow_threads(|| get_poa_global_bifacial(&inputs, &geometry, &options))?;
    Ok(combined.into_pyarray(py))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::f64::consts::PI;

    fn weather() -> (Array1<f64>, Array1<f64>, Array1<f64>, Array1<f64>, Array1<f64>) {
        let ze = array![0.3, 0.8, 1.2, 1.5];
        let az = array![PI, 2.2, 4.0, 1.6];
        let dni = array![850.0, 600.0, 300.0, 40.0];
        let dhi = array![90.0, 120.0, 110.0, 35.0];
        let ghi = &dni * &ze.mapv(f64::cos) + &dhi;
        (ze, az, ghi, dhi, dni)
    }

    #[test]
    fn test_combination_rule() {
        assert_eq!(poa_global_bifacial(900.0, 100.0, 0.0, -0.02, 0.1), 900.0);
        let combined = poa_global_bifacial(900.0, 100.0, 0.8, -0.02, 0.0);
        assert!((combined - (900.0 + 100.0 * 0.8 * 0.98)).abs() < 1e-9);
    }

    #[test]
    fn test_combine_broadcasts_back_side() {
        let params = BifacialParams {
            bifaciality: 0.5,
            shade_factor: 0.0,
            transmission_factor: 0.0,
        };
        let front = array![100.0, 200.0, 300.0];
        let back = array![40.0];
        let combined = params.combine(front.view(), back.view()).unwrap();
        assert_eq!(combined, array![120.0, 220.0, 320.0]);
        let back = array![40.0, 50.0];
        assert!(params.combine(front.view(), back.view()).is_err());
    }

    #[test]
    fn test_monotonic_in_bifaciality() {
        let mut previous = f64::NEG_INFINITY;
        for i in 0..=10 {
            let b = i as f64 / 10.0;
            let combined = poa_global_bifacial(700.0, 85.0, b, -0.02, 0.05);
            assert!(combined > previous);
            previous = combined;
        }
    }

    #[test]
    fn test_default_options() {
        let o = BifacialOptions::default();
        assert_eq!(o.params.bifaciality, 0.8);
        assert_eq!(o.params.shade_factor, -0.02);
        assert_eq!(o.params.transmission_factor, 0.0);
        assert_eq!(o.method, TranspositionModel::HayDavies);
        assert_eq!(o.npoints, 100);
    }

    #[test]
    fn test_negative_bifaciality_rejected() {
        let params = BifacialParams {
            bifaciality: -0.1,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_pipeline_front_only_matches_front_surface() {
        let (ze, az, ghi, dhi, dni) = weather();
        let dni_extra = array![1361.0];
        let am_rel = array![1.5];
        let inputs = BifacialInputs {
            solar_zenith: ze.view(),
            solar_azimuth: az.view(),
            ghi: ghi.view(),
            dhi: dhi.view(),
            dni: dni.view(),
            dni_extra: dni_extra.view(),
            am_rel: am_rel.view(),
        };
        let geometry = ArrayGeometry::new(0.4, 1.0, PI / 6.0, 2.5, PI).unwrap();
        let transposition = SkyTransposition::new(TranspositionModel::HayDavies, 0.25).unwrap();
        let iam = Ashrae::default();
        let params = BifacialParams {
            bifaciality: 0.0,
            ..Default::default()
        };
        let result = evaluate_bifacial(&inputs, &geometry, &transposition, &iam, &iam, &params, 100).unwrap();
        assert_eq!(result.poa_global_bifacial, result.front.poa_global_pv);
        assert_eq!(result.back.len(), 4);
        assert!(result.back.poa_global_pv.iter().all(|&v| v >= 0.0));
        assert!(result.front.poa_global_pv[0] > result.back.poa_global_pv[0]);
    }

    #[test]
    fn test_named_pipeline_adds_back_side() {
        let (ze, az, ghi, dhi, dni) = weather();
        let dni_extra = array![1361.0];
        let am_rel = array![1.5];
        let inputs = BifacialInputs {
            solar_zenith: ze.view(),
            solar_azimuth: az.view(),
            ghi: ghi.view(),
            dhi: dhi.view(),
            dni: dni.view(),
            dni_extra: dni_extra.view(),
            am_rel: am_rel.view(),
        };
        let geometry = ArrayGeometry::new(0.4, 1.0, PI / 6.0, 2.5, PI).unwrap();
        let front_only = BifacialOptions {
            params: BifacialParams {
                bifaciality: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let front = get_poa_global_bifacial(&inputs, &geometry, &front_only).unwrap();
        let combined = get_poa_global_bifacial(&inputs, &geometry, &BifacialOptions::default()).unwrap();
        for (c, f) in combined.iter().zip(front.iter()) {
            assert!(c >= f);
        }
    }
}
