//! One-dimensional linear interpolation and trapezoidal integration on
//! monotonic grids.

use ndarray::{s, Array1, ArrayView1, Zip};

/// Piecewise-linear interpolant of `(xp, fp)` evaluated at `x`.
///
/// `xp` must be increasing. Points outside the grid take the nearest end
/// value, so a profile shifted past its grid is held constant.
pub(crate) fn interp_at(x: f64, xp: ArrayView1<f64>, fp: ArrayView1<f64>) -> f64 {
    let n = xp.len();
    debug_assert!(n > 0 && n == fp.len());
    if x.is_nan() {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // First index with xp[i] > x; bounded to 1..n by the checks above.
    let hi = match xp.as_slice() {
        Some(xs) => xs.partition_point(|&v| v <= x),
        None => xp.iter().position(|&v| v > x).unwrap_or(n - 1),
    };
    let lo = hi - 1;
    let dx = xp[hi] - xp[lo];
    if dx == 0.0 {
        return fp[hi];
    }
    let t = (x - xp[lo]) / dx;
    fp[lo] + t * (fp[hi] - fp[lo])
}

/// [`interp_at`] over every point of `x`.
pub(crate) fn interp(x: ArrayView1<f64>, xp: ArrayView1<f64>, fp: ArrayView1<f64>) -> Array1<f64> {
    x.mapv(|xi| interp_at(xi, xp, fp))
}

/// Trapezoidal integral of `y` over the sample points `x`.
pub(crate) fn trapezoid(y: ArrayView1<f64>, x: ArrayView1<f64>) -> f64 {
    if y.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    Zip::from(y.slice(s![1..]))
        .and(y.slice(s![..-1]))
        .and(x.slice(s![1..]))
        .and(x.slice(s![..-1]))
        .for_each(|&y1, &y0, &x1, &x0| total += 0.5 * (y1 + y0) * (x1 - x0));
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_interp_inside_and_outside() {
        let xp = array![0.0, 1.0, 3.0];
        let fp = array![0.0, 10.0, 30.0];
        assert_eq!(interp_at(0.5, xp.view(), fp.view()), 5.0);
        assert_eq!(interp_at(2.0, xp.view(), fp.view()), 20.0);
        assert_eq!(interp_at(1.0, xp.view(), fp.view()), 10.0);
        assert_eq!(interp_at(-4.0, xp.view(), fp.view()), 0.0);
        assert_eq!(interp_at(9.0, xp.view(), fp.view()), 30.0);
    }

    #[test]
    fn test_interp_series() {
        let xp = array![0.0, 1.0];
        let fp = array![2.0, 4.0];
        let x = array![-1.0, 0.25, 0.75, 2.0];
        let out = interp(x.view(), xp.view(), fp.view());
        assert_eq!(out, array![2.0, 2.5, 3.5, 4.0]);
    }

    #[test]
    fn test_trapezoid_linear_is_exact() {
        let x = Array1::linspace(0.0, 1.0, 11);
        let y = x.mapv(|v| 3.0 * v + 1.0);
        assert!((trapezoid(y.view(), x.view()) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_trapezoid_single_point() {
        let x = array![0.0];
        assert_eq!(trapezoid(x.view(), x.view()), 0.0);
    }
}
