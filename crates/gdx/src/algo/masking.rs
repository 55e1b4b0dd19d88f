use std::collections::HashMap;
use std::hash::Hash;

use num::ToPrimitive;

use crate::{raster::check_dimensions, Array, ArrayMetadata, ArrayNum, DenseArray, Result};

/// Clear every cell for which the mask holds nodata.
pub fn apply_mask<T, TMask, Metadata>(
    ras: &DenseArray<T, Metadata>,
    mask: &DenseArray<TMask, Metadata>,
) -> Result<DenseArray<T, Metadata>>
where
    T: ArrayNum,
    TMask: ArrayNum,
    Metadata: ArrayMetadata,
{
    inside_mask(ras, mask)
}

/// Keep only the cells for which the mask holds data.
pub fn inside_mask<T, TMask, Metadata>(
    ras: &DenseArray<T, Metadata>,
    mask: &DenseArray<TMask, Metadata>,
) -> Result<DenseArray<T, Metadata>>
where
    T: ArrayNum,
    TMask: ArrayNum,
    Metadata: ArrayMetadata,
{
    check_dimensions(ras, mask)?;

    let mut result = ras.clone();
    if result.metadata().nodata().is_none() {
        result.set_nodata_value(Some(T::TYPE.default_nodata_value()));
    }

    for i in 0..mask.len() {
        if mask.index_is_nodata(i) {
            result.mark_index_as_nodata(i);
        }
    }

    Ok(result)
}

/// Keep only the cells for which the mask holds nodata.
pub fn outside_mask<T, TMask, Metadata>(
    ras: &DenseArray<T, Metadata>,
    mask: &DenseArray<TMask, Metadata>,
) -> Result<DenseArray<T, Metadata>>
where
    T: ArrayNum,
    TMask: ArrayNum,
    Metadata: ArrayMetadata,
{
    check_dimensions(ras, mask)?;

    let mut result = ras.clone();
    if result.metadata().nodata().is_none() {
        result.set_nodata_value(Some(T::TYPE.default_nodata_value()));
    }

    for i in 0..mask.len() {
        if mask.index_has_data(i) {
            result.mark_index_as_nodata(i);
        }
    }

    Ok(result)
}

/// Clear every cell where the mask is zero or nodata. Rasters without nodata
/// value get zeros instead.
pub fn erase_outside_mask<T, TMask, Metadata>(ras: &mut DenseArray<T, Metadata>, mask: &DenseArray<TMask, Metadata>) -> Result
where
    T: ArrayNum,
    TMask: ArrayNum,
    Metadata: ArrayMetadata,
{
    check_dimensions(ras, mask)?;

    let has_nodata = ras.metadata().nodata().is_some();
    for i in 0..mask.len() {
        if mask.value(i).map_or(true, |v| v == TMask::zero()) {
            if has_nodata {
                ras.mark_index_as_nodata(i);
            } else {
                ras[i] = T::zero();
            }
        }
    }

    Ok(())
}

/// Sum the raster values grouped by the value of the mask cell.
pub fn sum_mask<T, TMask, Metadata>(
    ras: &DenseArray<T, Metadata>,
    mask: &DenseArray<TMask, Metadata>,
) -> Result<HashMap<TMask, f64>>
where
    T: ArrayNum,
    TMask: ArrayNum + Eq + Hash,
    Metadata: ArrayMetadata,
{
    check_dimensions(ras, mask)?;

    let mut result = HashMap::new();
    for i in 0..ras.len() {
        if let (Some(value), Some(mask_value)) = (ras.value(i), mask.value(i)) {
            *result.entry(mask_value).or_insert(0.0) += value.to_f64().unwrap_or(0.0);
        }
    }

    Ok(result)
}

/// Count the data cells per distinct mask value.
pub fn count_mask<TMask, Metadata>(mask: &DenseArray<TMask, Metadata>) -> HashMap<TMask, usize>
where
    TMask: ArrayNum + Eq + Hash,
    Metadata: ArrayMetadata,
{
    let mut result = HashMap::new();
    for v in mask.iter_values() {
        *result.entry(v).or_insert(0) += 1;
    }

    result
}

/// Set the raster to 1 wherever the mask is positive, the cells become data.
pub fn include_mask<T, TMask, Metadata>(mask: &DenseArray<TMask, Metadata>, ras: &mut DenseArray<T, Metadata>) -> Result
where
    T: ArrayNum,
    TMask: ArrayNum,
    Metadata: ArrayMetadata,
{
    check_dimensions(ras, mask)?;

    for i in 0..mask.len() {
        if mask.value(i).is_some_and(|v| v > TMask::zero()) {
            ras[i] = T::one();
        }
    }

    Ok(())
}

/// Mark the raster nodata wherever the mask is positive.
pub fn exclude_mask<T, TMask, Metadata>(mask: &DenseArray<TMask, Metadata>, ras: &mut DenseArray<T, Metadata>) -> Result
where
    T: ArrayNum,
    TMask: ArrayNum,
    Metadata: ArrayMetadata,
{
    check_dimensions(ras, mask)?;

    for i in 0..mask.len() {
        if mask.value(i).is_some_and(|v| v > TMask::zero()) {
            ras.mark_index_as_nodata(i);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_metadata;

    fn values() -> DenseArray<i32> {
        DenseArray::new(test_metadata(1, 4, Some(-1.0)), vec![1, 2, 3, 4]).unwrap()
    }

    fn mask() -> DenseArray<u8> {
        DenseArray::new(test_metadata(1, 4, Some(255.0)), vec![1, 0, 255, 2]).unwrap()
    }

    #[test]
    fn inside_and_outside_mask() {
        let inside = inside_mask(&values(), &mask()).unwrap();
        assert_eq!(inside.masked_data(), vec![Some(1), Some(2), None, Some(4)]);

        let outside = outside_mask(&values(), &mask()).unwrap();
        assert_eq!(outside.masked_data(), vec![None, None, Some(3), None]);
    }

    #[test]
    fn erase_outside_mask_clears_zero_mask_cells() {
        let mut ras = values();
        erase_outside_mask(&mut ras, &mask()).unwrap();
        assert_eq!(ras.masked_data(), vec![Some(1), None, None, Some(4)]);
    }

    #[test]
    fn sums_per_mask_value() {
        let sums = sum_mask(&values(), &mask()).unwrap();
        assert_eq!(sums[&1], 1.0);
        assert_eq!(sums[&0], 2.0);
        assert_eq!(sums[&2], 4.0);
        assert!(!sums.contains_key(&255));
    }

    #[test]
    fn mask_counts() {
        let counts = count_mask(&mask());
        assert_eq!(counts[&1], 1);
        assert_eq!(counts[&0], 1);
        assert_eq!(counts[&2], 1);
        assert!(!counts.contains_key(&255));
    }
}
