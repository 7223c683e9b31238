#[cfg(feature = "python")]
use pyo3::prelude::*;

pub mod bifacial;
pub mod error;
pub mod geometry;
pub mod ground_sky;
mod interp;
pub mod irradiance;
pub mod projection;
mod series;
pub mod shade;
pub mod sheds;
pub mod surface_view;
pub mod transposition;

pub use bifacial::{
    evaluate_bifacial, get_poa_global_bifacial, poa_global_bifacial, BifacialInputs, BifacialOptions,
    BifacialParams, BifacialResult,
};
pub use error::{Result, ShedsError};
pub use geometry::{backside, ArrayGeometry, EPS, MAX_ROWS};
pub use ground_sky::{ground_sky_diffuse_view_factor, vf_ground_sky, GroundSkyProfile, DEFAULT_NPOINTS};
pub use irradiance::{get_irradiance, IrradianceInputs, PvSurface};
pub use sheds::InfiniteSheds;
pub use transposition::{
    Ashrae, IncidenceAngleModifier, PoaComponents, SkyConditions, SkyTransposition, Transposition,
    TranspositionModel,
};

#[cfg(feature = "python")]
#[pymodule]
fn pvsheds(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    py_module.add_class::<geometry::ArrayGeometry>()?;
    py_module.add_class::<bifacial::BifacialParams>()?;
    py_module.add_class::<sheds::InfiniteSheds>()?;

    // Register submodules
    register_view_factors_module(py_module)?;
    register_irradiance_module(py_module)?;
    register_bifacial_module(py_module)?;

    py_module.add("EPS", geometry::EPS)?;
    py_module.add("MAX_ROWS", geometry::MAX_ROWS)?;
    py_module.add("__doc__", "Infinite sheds irradiance model for rows of PV modules.")?;

    Ok(())
}

#[cfg(feature = "python")]
fn register_view_factors_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "view_factors")?;
    submodule.add("__doc__", "Solar projection, ground shading and view factors.")?;
    submodule.add_function(wrap_pyfunction!(projection::solar_projection_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(
        ground_sky::ground_sky_diffuse_view_factor_py,
        &submodule
    )?)?;
    submodule.add_function(wrap_pyfunction!(ground_sky::vf_ground_sky_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(surface_view::calc_fgndpv_zsky_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_irradiance_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "irradiance")?;
    submodule.add("__doc__", "Plane-of-array irradiance between rows.")?;
    submodule.add_function(wrap_pyfunction!(irradiance::get_irradiance_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_bifacial_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "bifacial")?;
    submodule.add("__doc__", "Front and back irradiance of bifacial rows.")?;
    submodule.add_function(wrap_pyfunction!(bifacial::poa_global_bifacial_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(bifacial::get_poa_global_bifacial_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}
