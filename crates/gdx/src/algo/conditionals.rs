use crate::{raster::check_dimensions, Array, ArrayMetadata, ArrayNum, DenseArray, Result};

/// Keep the `then` raster where the condition is non-zero, everywhere else
/// the result is nodata.
pub fn if_then<TCond, T, Metadata>(
    condition: &DenseArray<TCond, Metadata>,
    then_raster: &DenseArray<T, Metadata>,
) -> Result<DenseArray<T, Metadata>>
where
    TCond: ArrayNum,
    T: ArrayNum,
    Metadata: ArrayMetadata,
{
    check_dimensions(condition, then_raster)?;

    let mut result = then_raster.clone();
    if result.metadata().nodata().is_none() {
        result.set_nodata_value(Some(T::TYPE.default_nodata_value()));
    }

    for i in 0..condition.len() {
        if condition.value(i).map_or(true, |v| v == TCond::zero()) {
            result.mark_index_as_nodata(i);
        }
    }

    Ok(result)
}

/// Select per cell from the `then` raster where the condition is non-zero and
/// from the `else` raster where it is zero. A nodata condition cell yields
/// nodata, selected cells keep their nodata state.
pub fn if_then_else<TCond, T, Metadata>(
    condition: &DenseArray<TCond, Metadata>,
    then_raster: &DenseArray<T, Metadata>,
    else_raster: &DenseArray<T, Metadata>,
) -> Result<DenseArray<T, Metadata>>
where
    TCond: ArrayNum,
    T: ArrayNum,
    Metadata: ArrayMetadata,
{
    check_dimensions(condition, then_raster)?;
    check_dimensions(condition, else_raster)?;

    let nodata = then_raster
        .metadata()
        .nodata()
        .or_else(|| else_raster.metadata().nodata())
        .unwrap_or_else(|| T::TYPE.default_nodata_value());
    let meta = then_raster.metadata().with_nodata(Some(nodata));

    DenseArray::from_iter_opt(
        meta,
        (0..condition.len()).map(|i| match condition.value(i) {
            None => None,
            Some(cond) => {
                if cond != TCond::zero() {
                    then_raster.value(i)
                } else {
                    else_raster.value(i)
                }
            }
        }),
    )
}

/// Scalar variant of [`if_then_else`], `None` values produce nodata cells.
pub fn if_then_else_values<TCond, T, Metadata>(
    condition: &DenseArray<TCond, Metadata>,
    then_value: Option<T>,
    else_value: Option<T>,
) -> Result<DenseArray<T, Metadata>>
where
    TCond: ArrayNum,
    T: ArrayNum,
    Metadata: ArrayMetadata,
{
    let meta = condition.metadata().with_nodata(Some(T::TYPE.default_nodata_value()));

    DenseArray::from_iter_opt(
        meta,
        (0..condition.len()).map(|i| match condition.value(i) {
            None => None,
            Some(cond) => {
                if cond != TCond::zero() {
                    then_value
                } else {
                    else_value
                }
            }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_metadata;

    fn condition() -> DenseArray<u8> {
        DenseArray::new(test_metadata(1, 4, Some(255.0)), vec![1, 0, 255, 1]).unwrap()
    }

    #[test]
    fn if_then_clears_unselected_cells() {
        let values = DenseArray::<i32>::new(test_metadata(1, 4, Some(-1.0)), vec![10, 20, 30, -1]).unwrap();

        let result = if_then(&condition(), &values).unwrap();
        assert_eq!(result.masked_data(), vec![Some(10), None, None, None]);
    }

    #[test]
    fn if_then_else_selects_per_cell() {
        let then_ras = DenseArray::<i32>::new(test_metadata(1, 4, Some(-1.0)), vec![10, 20, 30, -1]).unwrap();
        let else_ras = DenseArray::<i32>::new(test_metadata(1, 4, Some(-1.0)), vec![1, 2, 3, 4]).unwrap();

        let result = if_then_else(&condition(), &then_ras, &else_ras).unwrap();
        assert_eq!(result.masked_data(), vec![Some(10), Some(2), None, None]);
    }

    #[test]
    fn if_then_else_with_values() {
        let result = if_then_else_values(&condition(), Some(7i32), None).unwrap();
        assert_eq!(result.masked_data(), vec![Some(7), None, None, Some(7)]);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let other = DenseArray::<i32>::new(test_metadata(1, 3, None), vec![1, 2, 3]).unwrap();
        assert!(if_then(&condition(), &other).is_err());
    }
}
