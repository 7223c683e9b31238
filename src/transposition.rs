//! Isolated-row transposition and incidence angle modifiers.
//!
//! The infinite sheds model corrects plane-of-array components that were
//! computed for a single row standing alone. Those components come from a
//! [`Transposition`] and the direct-beam optical loss from an
//! [`IncidenceAngleModifier`]; any implementation may be plugged in. The
//! isotropic and Hay-Davies sky models with a uniform ground albedo and the
//! ASHRAE modifier are provided.

use std::f64::consts::FRAC_PI_2;
use std::str::FromStr;

use crate::error::{Result, ShedsError};

/// Floor on cos(zenith) in the Hay-Davies beam ratio, about cos(89°).
const MIN_COS_ZENITH: f64 = 0.01745;

/// Sun and irradiance for one timestamp. Angles in radians, irradiance W/m².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyConditions {
    pub solar_zenith: f64,
    pub solar_azimuth: f64,
    pub dni: f64,
    pub ghi: f64,
    pub dhi: f64,
    /// Extraterrestrial direct normal irradiance.
    pub dni_extra: f64,
    /// Relative air mass. Unused by the provided models.
    pub am_rel: f64,
}

/// Plane-of-array components of an isolated row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoaComponents {
    pub direct: f64,
    pub sky_diffuse: f64,
    pub ground_diffuse: f64,
    /// Angle of incidence of the beam on the surface.
    pub aoi: f64,
}

/// Isolated-row transposition of horizontal irradiance onto a tilted plane.
pub trait Transposition: Sync {
    fn transpose(&self, surface_tilt: f64, surface_azimuth: f64, sky: &SkyConditions) -> Result<PoaComponents>;
}

/// Optical transmission factor of the module cover, in `[0, 1]`.
pub trait IncidenceAngleModifier: Sync {
    fn modifier(&self, aoi: f64) -> f64;
}

/// Dot product of the sun vector and the surface normal, clipped to `[-1, 1]`.
#[inline]
pub fn aoi_projection(surface_tilt: f64, surface_azimuth: f64, solar_zenith: f64, solar_azimuth: f64) -> f64 {
    let projection = surface_tilt.cos() * solar_zenith.cos()
        + surface_tilt.sin() * solar_zenith.sin() * (solar_azimuth - surface_azimuth).cos();
    projection.clamp(-1.0, 1.0)
}

/// Angle of incidence between the sun vector and the surface normal.
#[inline]
pub fn aoi(surface_tilt: f64, surface_azimuth: f64, solar_zenith: f64, solar_azimuth: f64) -> f64 {
    aoi_projection(surface_tilt, surface_azimuth, solar_zenith, solar_azimuth).acos()
}

/// Sky diffuse model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranspositionModel {
    /// Uniform sky radiance.
    Isotropic,
    /// Circumsolar share set by the atmospheric transmittance DNI/DNI_extra.
    #[default]
    HayDavies,
}

impl FromStr for TranspositionModel {
    type Err = ShedsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "isotropic" => Ok(Self::Isotropic),
            "haydavies" => Ok(Self::HayDavies),
            _ => Err(ShedsError::UnknownTranspositionModel(s.to_string())),
        }
    }
}

/// Sky diffuse on the tilted plane.
pub fn sky_diffuse(model: TranspositionModel, surface_tilt: f64, cos_aoi: f64, sky: &SkyConditions) -> f64 {
    let isotropic = (1.0 + surface_tilt.cos()) / 2.0;
    match model {
        TranspositionModel::Isotropic => sky.dhi * isotropic,
        TranspositionModel::HayDavies => {
            let anisotropy = if sky.dni_extra > 0.0 { sky.dni / sky.dni_extra } else { 0.0 };
            let rb = cos_aoi.max(0.0) / sky.solar_zenith.cos().max(MIN_COS_ZENITH);
            (sky.dhi * (anisotropy * rb + (1.0 - anisotropy) * isotropic)).max(0.0)
        }
    }
}

/// Ground reflected irradiance from uniformly reflecting ground.
#[inline]
pub fn ground_diffuse(surface_tilt: f64, ghi: f64, albedo: f64) -> f64 {
    ghi * albedo * (1.0 - surface_tilt.cos()) / 2.0
}

/// Transposition with a named sky model and a uniform ground albedo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyTransposition {
    pub model: TranspositionModel,
    pub albedo: f64,
}

impl SkyTransposition {
    pub fn new(model: TranspositionModel, albedo: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&albedo) {
            return Err(ShedsError::InvalidParameter {
                name: "albedo",
                value: albedo,
                reason: "must lie in [0, 1]",
            });
        }
        Ok(Self { model, albedo })
    }
}

impl Transposition for SkyTransposition {
    fn transpose(&self, surface_tilt: f64, surface_azimuth: f64, sky: &SkyConditions) -> Result<PoaComponents> {
        let cos_aoi = aoi_projection(surface_tilt, surface_azimuth, sky.solar_zenith, sky.solar_azimuth);
        Ok(PoaComponents {
            direct: (sky.dni * cos_aoi).max(0.0),
            sky_diffuse: sky_diffuse(self.model, surface_tilt, cos_aoi, sky),
            ground_diffuse: ground_diffuse(surface_tilt, sky.ghi, self.albedo),
            aoi: cos_aoi.acos(),
        })
    }
}

/// ASHRAE incidence angle modifier, `1 - b0·(1/cos(aoi) - 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ashrae {
    pub b0: f64,
}

impl Default for Ashrae {
    fn default() -> Self {
        Self { b0: 0.05 }
    }
}

impl IncidenceAngleModifier for Ashrae {
    fn modifier(&self, aoi: f64) -> f64 {
        if aoi.abs() >= FRAC_PI_2 {
            return 0.0;
        }
        (1.0 - self.b0 * (1.0 / aoi.cos() - 1.0)).max(0.0)
    }
}
