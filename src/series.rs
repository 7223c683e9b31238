//! Broadcasting of time-series inputs.
//!
//! Every formula in the model applies independently per timestamp. Inputs are
//! either full series of a common length or single values repeated over it.

use ndarray::{Array1, ArrayView1};

use crate::error::{Result, ShedsError};

#[cfg(feature = "python")]
use numpy::PyReadonlyArray1;
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Common length of a set of series, where length-1 series broadcast.
pub(crate) fn common_len<'a>(series: &[(&'static str, ArrayView1<'a, f64>)]) -> Result<usize> {
    let n = series.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
    for (name, s) in series {
        if s.len() != n && s.len() != 1 {
            return Err(ShedsError::LengthMismatch {
                name,
                expected: n,
                actual: s.len(),
            });
        }
    }
    Ok(n)
}

/// Owned copy of `s` stretched to length `n`.
pub(crate) fn broadcast(name: &'static str, s: ArrayView1<f64>, n: usize) -> Result<Array1<f64>> {
    s.broadcast(n)
        .map(|v| v.to_owned())
        .ok_or(ShedsError::LengthMismatch {
            name,
            expected: n,
            actual: s.len(),
        })
}

/// Broadcast two series against each other.
pub(crate) fn broadcast2<'a>(
    a: (&'static str, ArrayView1<'a, f64>),
    b: (&'static str, ArrayView1<'a, f64>),
) -> Result<(Array1<f64>, Array1<f64>)> {
    let n = common_len(&[a, b])?;
    Ok((broadcast(a.0, a.1, n)?, broadcast(b.0, b.1, n)?))
}

/// Length-1 series viewing a single value.
#[cfg(any(test, feature = "python"))]
pub(crate) fn scalar_series(value: &f64) -> ArrayView1<'_, f64> {
    ArrayView1::from(std::slice::from_ref(value))
}

/// Python argument given as either a float or a 1-D array.
#[cfg(feature = "python")]
#[derive(FromPyObject)]
pub enum SeriesArg<'py> {
    Series(PyReadonlyArray1<'py, f64>),
    Scalar(f64),
}

#[cfg(feature = "python")]
impl SeriesArg<'_> {
    pub fn view(&self) -> ArrayView1<'_, f64> {
        match self {
            Self::Series(a) => a.as_array(),
            Self::Scalar(v) => scalar_series(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_scalar_broadcasts() {
        let a = array![1.0, 2.0, 3.0];
        let b = array![5.0];
        let (a2, b2) = broadcast2(("a", a.view()), ("b", b.view())).unwrap();
        assert_eq!(a2, a);
        assert_eq!(b2, array![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_mismatch_is_reported() {
        let a = array![1.0, 2.0, 3.0];
        let b = array![5.0, 6.0];
        let err = broadcast2(("a", a.view()), ("b", b.view())).unwrap_err();
        assert_eq!(
            err,
            ShedsError::LengthMismatch {
                name: "b",
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_scalar_series_broadcasts() {
        let ghi = 800.0;
        let ze = array![0.1, 0.4, 0.9];
        let (ze2, ghi2) = broadcast2(("solar_zenith", ze.view()), ("ghi", scalar_series(&ghi))).unwrap();
        assert_eq!(ze2, ze);
        assert_eq!(ghi2, array![800.0, 800.0, 800.0]);
    }

    #[test]
    fn test_empty_series() {
        let a = Array1::<f64>::zeros(0);
        assert_eq!(common_len(&[("a", a.view())]).unwrap(), 0);
    }
}
