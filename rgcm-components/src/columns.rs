//! Fixed-rank views of grid arrays.
//!
//! Quantities travel between components as dynamic-rank arrays. Column
//! physics is easier to write against `(longitude, latitude, level)` and
//! `(longitude, latitude)` views.

use ndarray::{ArrayD, ArrayView1, ArrayView2, ArrayView3, Ix1, Ix2, Ix3};
use rgcm_core::errors::{RGCMError, RGCMResult};

fn rank_error(name: &str, expected: &str, values: &ArrayD<f64>) -> RGCMError {
    RGCMError::Error(format!(
        "'{}' has shape {:?}, expected {}",
        name,
        values.shape(),
        expected
    ))
}

/// Views a `(longitude, latitude, level)` array.
pub fn columns<'a>(name: &str, values: &'a ArrayD<f64>) -> RGCMResult<ArrayView3<'a, f64>> {
    values
        .view()
        .into_dimensionality::<Ix3>()
        .map_err(|_| rank_error(name, "(longitude, latitude, level)", values))
}

/// Views a `(longitude, latitude)` array.
pub fn surface<'a>(name: &str, values: &'a ArrayD<f64>) -> RGCMResult<ArrayView2<'a, f64>> {
    values
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| rank_error(name, "(longitude, latitude)", values))
}

/// Views a one-dimensional coordinate.
pub fn coordinate<'a>(name: &str, values: &'a ArrayD<f64>) -> RGCMResult<ArrayView1<'a, f64>> {
    values
        .view()
        .into_dimensionality::<Ix1>()
        .map_err(|_| rank_error(name, "a coordinate", values))
}

/// Fails unless `actual` equals `expected`.
pub fn check_shape(name: &str, expected: &[usize], actual: &[usize]) -> RGCMResult<()> {
    if expected != actual {
        return Err(RGCMError::DimensionMismatch {
            name: name.to_string(),
            dims: String::new(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_views() {
        let values = ArrayD::<f64>::zeros(IxDyn(&[2, 3, 4]));
        assert_eq!(columns("air_temperature", &values).unwrap().dim(), (2, 3, 4));
        assert!(surface("air_temperature", &values).is_err());
        assert!(coordinate("air_temperature", &values).is_err());
    }

    #[test]
    fn test_check_shape() {
        assert!(check_shape("latitude", &[3], &[3]).is_ok());
        assert!(matches!(
            check_shape("latitude", &[3], &[2]),
            Err(RGCMError::DimensionMismatch { .. })
        ));
    }
}
