use num::ToPrimitive;

use crate::{raster::check_dimensions, Array, ArrayNum, DenseRaster, Error, Result};

/// Difference counts of a raster comparison, one bucket per difference class.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RasterDiff {
    pub equal: usize,
    /// Both cells hold data but the values differ (outside of the tolerance)
    /// and neither side is zero.
    pub data_difference: usize,
    pub zero_to_non_zero: usize,
    pub non_zero_to_zero: usize,
    pub zero_to_nodata: usize,
    pub non_zero_to_nodata: usize,
    pub nodata_to_zero: usize,
    pub nodata_to_non_zero: usize,
}

impl RasterDiff {
    pub fn different_cells(&self) -> usize {
        self.data_difference
            + self.zero_to_non_zero
            + self.non_zero_to_zero
            + self.zero_to_nodata
            + self.non_zero_to_nodata
            + self.nodata_to_zero
            + self.nodata_to_non_zero
    }

    pub fn is_exact_match(&self) -> bool {
        self.different_cells() == 0
    }
}

/// Value comparison used by the raster diff: exact equality, or a combined
/// absolute/relative tolerance for floating point comparisons.
pub fn values_equal_with_tolerance(expected: f64, actual: f64, tolerance: f64) -> bool {
    if expected == actual {
        return true;
    }

    if tolerance == 0.0 {
        return false;
    }

    (expected - actual).abs() <= tolerance * f64::max(1.0, f64::max(expected.abs(), actual.abs()))
}

/// Compare two rasters cell by cell and report the counts per difference
/// class. The rasters must have the same dimensions, georeferencing is not
/// compared here.
pub fn diff_rasters<T: ArrayNum>(expected: &DenseRaster<T>, actual: &DenseRaster<T>, tolerance: f64) -> Result<RasterDiff> {
    check_dimensions(expected, actual).map_err(|_| {
        Error::InvalidArgument("Rasters have different sizes, diffing is not possible".to_string())
    })?;

    let mut diff = RasterDiff::default();

    for i in 0..expected.len() {
        match (expected.value(i), actual.value(i)) {
            (Some(exp), Some(act)) => {
                let exp = exp.to_f64().unwrap_or(f64::NAN);
                let act = act.to_f64().unwrap_or(f64::NAN);
                if values_equal_with_tolerance(exp, act, tolerance) {
                    diff.equal += 1;
                } else if exp == 0.0 {
                    diff.zero_to_non_zero += 1;
                } else if act == 0.0 {
                    diff.non_zero_to_zero += 1;
                } else {
                    diff.data_difference += 1;
                }
            }
            (Some(exp), None) => {
                if exp.to_f64() == Some(0.0) {
                    diff.zero_to_nodata += 1;
                } else {
                    diff.non_zero_to_nodata += 1;
                }
            }
            (None, Some(act)) => {
                if act.to_f64() == Some(0.0) {
                    diff.nodata_to_zero += 1;
                } else {
                    diff.nodata_to_non_zero += 1;
                }
            }
            (None, None) => diff.equal += 1,
        }
    }

    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_georeference;

    #[test]
    fn difference_classes_are_counted() {
        let meta = test_georeference(2, 3, Some(-1.0));
        #[rustfmt::skip]
        let expected = DenseRaster::<i32>::new(meta.clone(), vec![
            1, 0,  5,
            0, -1, 7,
        ])
        .unwrap();
        #[rustfmt::skip]
        let actual = DenseRaster::<i32>::new(meta, vec![
            1, 3,  0,
            -1, 4, 8,
        ])
        .unwrap();

        let diff = diff_rasters(&expected, &actual, 0.0).unwrap();
        assert_eq!(diff.equal, 1);
        assert_eq!(diff.zero_to_non_zero, 1);
        assert_eq!(diff.non_zero_to_zero, 1);
        assert_eq!(diff.zero_to_nodata, 1);
        assert_eq!(diff.nodata_to_non_zero, 1);
        assert_eq!(diff.data_difference, 1);
        assert_eq!(diff.different_cells(), 5);
    }

    #[test]
    fn tolerance_accepts_small_floating_point_differences() {
        let meta = test_georeference(2, 2, Some(-1.0));
        let expected = DenseRaster::<f32>::new(meta.clone(), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let actual = DenseRaster::<f32>::new(meta, vec![1.000001, 2.000001, 3.000001, 4.000001]).unwrap();

        // within a 1e-5 tolerance the rasters compare equal
        let diff = diff_rasters(&expected, &actual, 1e-5).unwrap();
        assert!(diff.is_exact_match());

        // an exact comparison reports every cell
        let diff = diff_rasters(&expected, &actual, 0.0).unwrap();
        assert_eq!(diff.different_cells(), 4);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let expected = DenseRaster::<i32>::new(test_georeference(1, 2, None), vec![1, 2]).unwrap();
        let actual = DenseRaster::<i32>::new(test_georeference(2, 1, None), vec![1, 2]).unwrap();
        assert!(diff_rasters(&expected, &actual, 0.0).is_err());
    }
}
