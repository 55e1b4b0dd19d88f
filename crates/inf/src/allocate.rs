//! Allocation entry points for raster buffers.
//! All raster data allocations go through this module so the allocation
//! strategy stays in one place. `std::simd` loads used by the simd code
//! paths do not require alignment, a regular `Vec` is handed out in both
//! configurations.

use crate::{Error, Result};

pub fn new_aligned_vec<T>() -> Vec<T> {
    Vec::new()
}

pub fn aligned_vec_with_capacity<T>(capacity: usize) -> Vec<T> {
    Vec::with_capacity(capacity)
}

pub fn aligned_vec_filled_with<T: Copy>(val: T, len: usize) -> Vec<T> {
    vec![val; len]
}

pub fn aligned_vec_from_slice<T: Copy>(data: &[T]) -> Vec<T> {
    data.to_vec()
}

pub fn aligned_vec_from_iter<T>(iter: impl Iterator<Item = T>) -> Vec<T> {
    iter.collect()
}

/// Fallible allocation for result rasters, reports allocation failure
/// instead of aborting the process.
pub fn try_aligned_vec_filled_with<T: Copy>(val: T, len: usize) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
    data.resize(len, val);
    Ok(data)
}
