pub mod io;

use crate::{AnyDenseArray, Array, DenseArray, Error, GeoReference, Result};

/// A dense raster with full georeferencing metadata.
pub type DenseRaster<T> = DenseArray<T, GeoReference>;

/// Type erased georeferenced raster.
pub type AnyDenseRaster = AnyDenseArray<GeoReference>;

impl<T: crate::ArrayNum> DenseRaster<T> {
    pub fn set_projection_from_epsg(&mut self, epsg: i32) {
        self.meta.set_projection_from_epsg(epsg);
    }
}

impl AnyDenseRaster {
    pub fn set_projection_from_epsg(&mut self, epsg: i32) {
        crate::anydensearray::dispatch!(self, raster => raster.set_projection_from_epsg(epsg));
    }
}

/// Panicking dimension check for the operator implementations, which cannot
/// report errors through their return type.
pub fn assert_dimensions<R1: Array, R2: Array>(r1: &R1, r2: &R2) {
    assert_eq!(r1.columns(), r2.columns(), "Raster column count does not match");
    assert_eq!(r1.rows(), r2.rows(), "Raster row count does not match");
}

/// Dimension check for kernels, a mismatch is an argument error that fails
/// the whole call.
pub fn check_dimensions<R1: Array, R2: Array>(r1: &R1, r2: &R2) -> Result {
    if r1.size() != r2.size() {
        return Err(Error::SizeMismatch {
            size1: (r1.columns().count() as usize, r1.rows().count() as usize),
            size2: (r2.columns().count() as usize, r2.rows().count() as usize),
        });
    }

    Ok(())
}
