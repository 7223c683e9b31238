//! Stateful wrapper holding a fixed array configuration.

use ndarray::Array1;
use tracing::debug;

use crate::bifacial::BifacialParams;
use crate::error::{Result, ShedsError};
use crate::geometry::ArrayGeometry;
use crate::ground_sky::DEFAULT_NPOINTS;
use crate::irradiance::{get_irradiance, IrradianceInputs, PvSurface};

#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray1};
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyDict;
#[cfg(feature = "python")]
use crate::series::SeriesArg;

/// An infinite sheds model of one array.
///
/// Each call to [`InfiniteSheds::evaluate`] replaces the cached surfaces with
/// fresh results; cached values are never modified in place.
#[cfg_attr(feature = "python", pyclass)]
#[derive(Debug, Clone)]
pub struct InfiniteSheds {
    geometry: ArrayGeometry,
    npoints: usize,
    is_bifacial: bool,
    params: BifacialParams,
    front_side: Option<PvSurface>,
    back_side: Option<PvSurface>,
    poa_global_bifacial: Option<Array1<f64>>,
}

impl InfiniteSheds {
    /// Model of `geometry`. A monofacial model evaluates only the front side,
    /// with bifaciality forced to zero.
    pub fn new(geometry: ArrayGeometry, npoints: usize, is_bifacial: bool, params: BifacialParams) -> Result<Self> {
        params.validate()?;
        if npoints < 2 {
            return Err(ShedsError::InvalidParameter {
                name: "npoints",
                value: npoints as f64,
                reason: "at least two ground points are needed",
            });
        }
        let params = if is_bifacial {
            params
        } else {
            BifacialParams {
                bifaciality: 0.0,
                ..params
            }
        };
        Ok(Self {
            geometry,
            npoints,
            is_bifacial,
            params,
            front_side: None,
            back_side: None,
            poa_global_bifacial: None,
        })
    }

    /// Monofacial model with the default ground resolution.
    pub fn monofacial(geometry: ArrayGeometry) -> Result<Self> {
        Self::new(geometry, DEFAULT_NPOINTS, false, BifacialParams::default())
    }

    pub fn geometry(&self) -> &ArrayGeometry {
        &self.geometry
    }

    pub fn params(&self) -> &BifacialParams {
        &self.params
    }

    pub fn is_bifacial(&self) -> bool {
        self.is_bifacial
    }

    /// Front side of the last evaluation.
    pub fn front_side(&self) -> Option<&PvSurface> {
        self.front_side.as_ref()
    }

    /// Back side of the last evaluation, when one was computed.
    pub fn back_side(&self) -> Option<&PvSurface> {
        self.back_side.as_ref()
    }

    /// Combined series of the last bifacial evaluation.
    pub fn poa_global_bifacial(&self) -> Option<&Array1<f64>> {
        self.poa_global_bifacial.as_ref()
    }

    pub fn tan_phi(&self) -> Option<&Array1<f64>> {
        self.front_side.as_ref().map(|s| &s.tan_phi)
    }

    pub fn f_gnd_beam(&self) -> Option<&Array1<f64>> {
        self.front_side.as_ref().map(|s| &s.f_gnd_beam)
    }

    pub fn df(&self) -> Option<&Array1<f64>> {
        self.front_side.as_ref().map(|s| &s.df)
    }

    /// Plane-of-array irradiance of the row.
    ///
    /// Both sides use the same isolated-row components. Returns the combined
    /// bifacial series when bifaciality is positive and the front
    /// `poa_global_pv` otherwise.
    pub fn evaluate(&mut self, inputs: &IrradianceInputs) -> Result<Array1<f64>> {
        let front = get_irradiance(inputs, &self.geometry, self.npoints)?;
        if self.params.bifaciality > 0.0 {
            let back = get_irradiance(inputs, &self.geometry.backside(), self.npoints)?;
            let combined = self
                .params
                .combine(front.poa_global_pv.view(), back.poa_global_pv.view())?;
            debug!(n = combined.len(), bifaciality = self.params.bifaciality, "infinite sheds evaluated");
            self.front_side = Some(front);
            self.back_side = Some(back);
            self.poa_global_bifacial = Some(combined.clone());
            Ok(combined)
        } else {
            let poa_global = front.poa_global_pv.clone();
            debug!(n = poa_global.len(), "infinite sheds evaluated, front side only");
            self.front_side = Some(front);
            self.back_side = None;
            self.poa_global_bifacial = None;
            Ok(poa_global)
        }
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl InfiniteSheds {
    #[new]
    #[pyo3(signature = (
        system_azimuth, gcr, height, tilt, pitch, npoints=DEFAULT_NPOINTS,
        is_bifacial=true, bifaciality=0.8, shade_factor=-0.02, transmission_factor=0.0,
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn py_new(
        system_azimuth: f64,
        gcr: f64,
        height: f64,
        tilt: f64,
        pitch: f64,
        npoints: usize,
        is_bifacial: bool,
        bifaciality: f64,
        shade_factor: f64,
        transmission_factor: f64,
    ) -> PyResult<Self> {
        let geometry = ArrayGeometry::new(gcr, height, tilt, pitch, system_azimuth)?;
        let params = BifacialParams {
            bifaciality,
            shade_factor,
            transmission_factor,
        };
        Ok(Self::new(geometry, npoints, is_bifacial, params)?)
    }

    #[getter(geometry)]
    fn geometry_py(&self) -> ArrayGeometry {
        self.geometry
    }

    #[getter(bifaciality)]
    fn bifaciality_py(&self) -> f64 {
        self.params.bifaciality
    }

    #[getter(is_bifacial)]
    fn is_bifacial_py(&self) -> bool {
        self.is_bifacial
    }

    #[getter(front_side)]
    fn front_side_py<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyDict>>> {
        self.front_side.as_ref().map(|s| s.to_pydict(py, true)).transpose()
    }

    #[getter(back_side)]
    fn back_side_py<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyDict>>> {
        self.back_side.as_ref().map(|s| s.to_pydict(py, true)).transpose()
    }

    #[getter(poa_global_bifacial)]
    fn poa_global_bifacial_py<'py>(&self, py: Python<'py>) -> Option<Bound<'py, PyArray1<f64>>> {
        self.poa_global_bifacial.as_ref().map(|a| a.clone().into_pyarray(py))
    }

    #[pyo3(name = "get_irradiance")]
    #[allow(clippy::too_many_arguments)]
    fn evaluate_py<'py>(
        &mut self,
        py: Python<'py>,
        solar_zenith: SeriesArg<'py>,
        solar_azimuth: SeriesArg<'py>,
        ghi: SeriesArg<'py>,
        dhi: SeriesArg<'py>,
        poa_ground: SeriesArg<'py>,
        poa_sky_diffuse: SeriesArg<'py>,
        poa_direct: SeriesArg<'py>,
        iam: SeriesArg<'py>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
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
        let poa_global = self.evaluate(&inputs)?;
        Ok(poa_global.into_pyarray(py))
    }
}
