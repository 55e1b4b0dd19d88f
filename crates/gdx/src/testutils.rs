use crate::{
    array::{Columns, Rows},
    CellSize, GeoReference, Point, RasterMetadata, RasterSize,
};

/// Nodata value used for the test rasters.
pub const NOD: f64 = -9999.0;

pub fn nan() -> f64 {
    f64::NAN
}

pub fn test_metadata(rows: i32, cols: i32, nodata: Option<f64>) -> RasterMetadata {
    RasterMetadata {
        raster_size: RasterSize::with_rows_cols(Rows(rows), Columns(cols)),
        nodata,
    }
}

/// Georeference with a square 100m cell size at the origin, the layout used
/// by most kernel tests.
pub fn test_georeference(rows: i32, cols: i32, nodata: Option<f64>) -> GeoReference {
    GeoReference::with_origin(
        "",
        RasterSize::with_rows_cols(Rows(rows), Columns(cols)),
        Point::new(0.0, 0.0),
        CellSize::square(100.0),
        nodata,
    )
}

pub fn test_georeference_with_cell_size(rows: i32, cols: i32, cell_size: f64, nodata: Option<f64>) -> GeoReference {
    GeoReference::with_origin(
        "",
        RasterSize::with_rows_cols(Rows(rows), Columns(cols)),
        Point::new(0.0, 0.0),
        CellSize::square(cell_size),
        nodata,
    )
}

/// Nodata aware comparison of floating point buffers, NaNs compare equal.
pub fn compare_fp_vectors(actual: &[f32], expected: &[f32], tolerance: f32) -> bool {
    if actual.len() != expected.len() {
        return false;
    }

    actual.iter().zip(expected.iter()).all(|(&a, &e)| {
        if a.is_nan() || e.is_nan() {
            a.is_nan() && e.is_nan()
        } else if a.is_infinite() || e.is_infinite() {
            a == e
        } else {
            (a - e).abs() <= tolerance
        }
    })
}

#[macro_export]
macro_rules! assert_rasters_near {
    ($expected:expr, $actual:expr, $tolerance:expr) => {
        let expected = &$expected;
        let actual = &$actual;
        assert_eq!(expected.size(), actual.size(), "raster sizes differ");
        assert!(
            $crate::testutils::compare_fp_vectors(actual.as_slice(), expected.as_slice(), $tolerance),
            "rasters differ\nexpected: {:?}\nactual:   {:?}",
            expected.as_slice(),
            actual.as_slice()
        );
    };
}
