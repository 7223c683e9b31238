//! Cross-section geometry of an array of long, evenly spaced rows.
//!
//! All angles are radians. Tilt is the angle of the surface normal from
//! vertical, in `[0, π]`; the back side of a row is the same plane with tilt
//! `π - tilt` facing the opposite azimuth.

use std::f64::consts::PI;

use crate::error::{Result, ShedsError};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Tilt tolerance below which (or within which of π) a row is treated as flat.
/// cos(0.001) = 0.9999995, so the row is indistinguishable from horizontal.
pub const EPS: f64 = 1e-3;

/// Multiple of `height / pitch` standing in for an unbounded row-visibility
/// limit on flat rows. `MAX_ROWS / EPS` scaled by `height / pitch` also caps
/// the neighbour rows summed for tilted rows.
/// Sized for a 40% GCR array of 1 m modules.
pub const MAX_ROWS: f64 = 15.0;

/// True when `tilt` is within [`EPS`] of 0 or π.
#[inline]
pub fn is_near_flat(tilt: f64) -> bool {
    tilt < EPS || tilt > PI - EPS
}

/// Surface tilt and azimuth of the back side of a row.
pub fn backside(tilt: f64, system_azimuth: f64) -> (f64, f64) {
    (PI - tilt, (PI + system_azimuth).rem_euclid(2.0 * PI))
}

/// Fixed row geometry shared by every timestamp of an evaluation.
#[cfg_attr(feature = "python", pyclass(frozen, get_all))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayGeometry {
    /// Ground coverage ratio, module length over pitch.
    pub(crate) gcr: f64,
    /// Height of the module lower edge above the ground.
    pub(crate) height: f64,
    pub(crate) tilt: f64,
    /// Row spacing, same length unit as `height`.
    pub(crate) pitch: f64,
    pub(crate) system_azimuth: f64,
}

impl ArrayGeometry {
    /// Validated geometry. Rejects non-physical rows, for which the ground
    /// angle formulas are undefined.
    pub fn new(gcr: f64, height: f64, tilt: f64, pitch: f64, system_azimuth: f64) -> Result<Self> {
        if !(gcr.is_finite() && gcr > 0.0) {
            return Err(ShedsError::InvalidParameter {
                name: "gcr",
                value: gcr,
                reason: "must be a positive finite ratio",
            });
        }
        if !(height.is_finite() && height >= 0.0) {
            return Err(ShedsError::InvalidParameter {
                name: "height",
                value: height,
                reason: "must be finite and non-negative",
            });
        }
        if !(0.0..=PI).contains(&tilt) {
            return Err(ShedsError::InvalidParameter {
                name: "tilt",
                value: tilt,
                reason: "must lie in [0, pi] radians",
            });
        }
        if !(pitch.is_finite() && pitch > 0.0) {
            return Err(ShedsError::InvalidParameter {
                name: "pitch",
                value: pitch,
                reason: "must be a positive finite length",
            });
        }
        if !system_azimuth.is_finite() {
            return Err(ShedsError::InvalidParameter {
                name: "system_azimuth",
                value: system_azimuth,
                reason: "must be finite",
            });
        }
        Ok(Self {
            gcr,
            height,
            tilt,
            pitch,
            system_azimuth,
        })
    }

    pub fn gcr(&self) -> f64 {
        self.gcr
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn tilt(&self) -> f64 {
        self.tilt
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn system_azimuth(&self) -> f64 {
        self.system_azimuth
    }

    /// `height / pitch`, the normalised clearance under the rows.
    pub fn height_ratio(&self) -> f64 {
        self.height / self.pitch
    }

    /// GCR extended by the run from the module lower edge down to where the
    /// module plane meets the ground.
    ///
    /// ```text
    ///  : \\                      \\
    ///  :  \\ H = module length    \\
    ///  :.....\\......................\\........ module lower edge
    ///  :       \                       \    :
    ///  :        \                 tilt  \   h = height above ground
    ///  +----------\<---------P----------->\---- ground
    /// ```
    ///
    /// Infinite for flat rows; callers branch on [`is_near_flat`] first.
    pub fn gcr_prime(&self) -> f64 {
        self.gcr + self.height / self.tilt.sin() / self.pitch
    }

    pub fn is_near_flat(&self) -> bool {
        is_near_flat(self.tilt)
    }

    /// The same rows seen from the back surface.
    pub fn backside(&self) -> Self {
        let (tilt, system_azimuth) = backside(self.tilt, self.system_azimuth);
        Self {
            tilt,
            system_azimuth,
            ..*self
        }
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl ArrayGeometry {
    #[new]
    #[pyo3(signature = (gcr, height, tilt, pitch, system_azimuth=PI))]
    fn py_new(gcr: f64, height: f64, tilt: f64, pitch: f64, system_azimuth: f64) -> PyResult<Self> {
        Ok(Self::new(gcr, height, tilt, pitch, system_azimuth)?)
    }

    #[pyo3(name = "gcr_prime")]
    fn py_gcr_prime(&self) -> f64 {
        self.gcr_prime()
    }

    #[pyo3(name = "backside")]
    fn py_backside(&self) -> Self {
        self.backside()
    }
}
