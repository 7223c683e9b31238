//! Beam shading of the ground between rows and of the module face.

/// Fraction of the ground between rows lit by direct beam.
///
/// `1 - min(1, gcr·|cos(tilt) + sin(tilt)·tan_phi|)`, always in `[0, 1]`.
#[inline]
pub fn unshaded_ground_fraction(gcr: f64, tilt: f64, tan_phi: f64) -> f64 {
    let shadow = gcr * (tilt.cos() + tilt.sin() * tan_phi).abs();
    // f64::min drops a NaN shadow width, leaving the ground fully shaded.
    1.0 - 1.0_f64.min(shadow)
}

/// Fraction of the module, measured from its lower edge, shaded from direct
/// beam by the row in front.
///
/// `clamp(1 - 1 / (gcr·(cos(tilt) + sin(tilt)·tan_phi)), 0, 1)`.
#[inline]
pub fn shade_line(gcr: f64, tilt: f64, tan_phi: f64) -> f64 {
    let f_x = 1.0 - 1.0 / gcr / (tilt.cos() + tilt.sin() * tan_phi);
    if f_x.is_nan() {
        return 0.0;
    }
    f_x.clamp(0.0, 1.0)
}
