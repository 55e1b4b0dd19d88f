use std::collections::HashMap;
use std::hash::Hash;

use num::{NumCast, ToPrimitive};

use crate::{
    algo::{dasmap::resolution_factor, weighteddistribution::weighted_distribution},
    Array, ArrayMetadata, ArrayNum, Cell, CellSize, Columns, DenseRaster, Error, GeoReference, Point, RasterSize, Result,
    Rows,
};

fn scaled_metadata(meta: &GeoReference, row_factor: f64, nodata: Option<f64>) -> GeoReference {
    let size = RasterSize::with_rows_cols(
        Rows((<f64 as From<i32>>::from(meta.rows().count()) * row_factor) as i32),
        Columns((<f64 as From<i32>>::from(meta.columns().count()) * row_factor) as i32),
    );

    let cell_size = CellSize::new(meta.cell_size_x() / row_factor, meta.cell_size_y() / row_factor);
    GeoReference::with_origin(
        meta.projection().to_string(),
        size,
        Point::new(meta.bottom_left().x(), meta.bottom_left().y()),
        cell_size,
        nodata,
    )
}

/// Inflate the resolution: every cell becomes an NxN block of smaller cells
/// carrying the same value. The operation of choice for categoric maps.
pub fn inflate<T: ArrayNum>(input: &DenseRaster<T>, factor: i32) -> Result<DenseRaster<T>> {
    if factor <= 0 {
        return Err(Error::InvalidArgument("Inflate factor should be positive".to_string()));
    }

    let meta = scaled_metadata(input.metadata(), <f64 as From<i32>>::from(factor), input.metadata().nodata());
    let mut result = DenseRaster::<T>::try_filled_with(Some(T::zero()), meta)?;

    for r in 0..input.rows().count() {
        for c in 0..input.columns().count() {
            let value = input[Cell::from_row_col(r, c)];
            for rr in 0..factor {
                for cc in 0..factor {
                    result[Cell::from_row_col(r * factor + rr, c * factor + cc)] = value;
                }
            }
        }
    }

    Ok(result)
}

/// Inflate the resolution while preserving the map total: every cell becomes
/// an NxN block of cells carrying 1/(NxN) of the value. For numeric maps
/// holding an amount per cell.
pub fn inflate_equal_sum<TResult, T>(input: &DenseRaster<T>, factor: i32) -> Result<DenseRaster<TResult>>
where
    TResult: ArrayNum,
    T: ArrayNum,
{
    if !TResult::HAS_NAN {
        return Err(Error::InvalidArgument(
            "Inflating with sum preservation only makes sense with floating point rasters".to_string(),
        ));
    }

    if factor <= 0 {
        return Err(Error::InvalidArgument("Inflate factor should be positive".to_string()));
    }

    if input.metadata().cell_size_x() <= 0.0 {
        return Err(Error::InvalidArgument("Input raster should have a cell size".to_string()));
    }

    let meta = scaled_metadata(input.metadata(), <f64 as From<i32>>::from(factor), input.metadata().nodata());
    let mut result = DenseRaster::<TResult>::try_filled_with(Some(TResult::zero()), meta)?;

    let block = <f64 as From<i32>>::from(factor * factor);
    for r in 0..input.rows().count() {
        for c in 0..input.columns().count() {
            let value = match input.cell_value(Cell::from_row_col(r, c)) {
                Some(v) => NumCast::from(v.to_f64().unwrap_or(f64::NAN) / block).unwrap_or_else(TResult::default_nodata),
                None => TResult::default_nodata(),
            };

            for rr in 0..factor {
                for cc in 0..factor {
                    result[Cell::from_row_col(r * factor + rr, c * factor + cc)] = value;
                }
            }
        }
    }

    Ok(result)
}

/// Deflate the resolution while preserving the map total: every NxN block of
/// cells collapses into one cell holding the block sum. The output cell is
/// nodata iff every input cell of the block is nodata.
pub fn deflate_equal_sum<T: ArrayNum>(input: &DenseRaster<T>, factor: i32) -> Result<DenseRaster<T>> {
    if !T::HAS_NAN {
        return Err(Error::InvalidArgument(
            "Deflating with sum preservation only makes sense with floating point rasters".to_string(),
        ));
    }

    if factor <= 0 {
        return Err(Error::InvalidArgument("Deflate factor should be positive".to_string()));
    }

    if input.rows().count() % factor != 0 || input.columns().count() % factor != 0 {
        return Err(Error::InvalidArgument(
            "Input raster dimensions should be a multiple of the deflate factor".to_string(),
        ));
    }

    if input.metadata().cell_size_x() <= 0.0 {
        return Err(Error::InvalidArgument("Input raster should have a cell size".to_string()));
    }

    let meta = scaled_metadata(input.metadata(), 1.0 / <f64 as From<i32>>::from(factor), Some(f64::NAN));
    let mut result = DenseRaster::<T>::filled_with_nodata(meta);

    for r in 0..result.rows().count() {
        for c in 0..result.columns().count() {
            let mut sum = T::zero();
            let mut data_cells = 0;

            for rr in 0..factor {
                for cc in 0..factor {
                    let cell = Cell::from_row_col(r * factor + rr, c * factor + cc);
                    if let Some(v) = input.cell_value(cell) {
                        sum = sum + v;
                        data_cells += 1;
                    }
                }
            }

            if data_cells > 0 {
                result[Cell::from_row_col(r, c)] = sum;
            }
        }
    }

    Ok(result)
}

/// Weight raster from a categoric map and a weight per category, categories
/// without table entry become nodata.
pub fn convert_categories_to_weights<TResult, T>(
    categories: &DenseRaster<T>,
    weight_per_category: &HashMap<T, f64>,
) -> Result<DenseRaster<TResult>>
where
    TResult: ArrayNum,
    T: ArrayNum + Eq + Hash,
{
    if !TResult::HAS_NAN {
        return Err(Error::InvalidArgument(
            "Category weights only make sense with floating point rasters".to_string(),
        ));
    }

    let meta = categories.metadata().with_nodata(Some(f64::NAN));
    DenseRaster::from_iter_opt(
        meta,
        categories
            .iter_opt()
            .map(|v| v.and_then(|v| weight_per_category.get(&v).and_then(|&w| NumCast::from(w)))),
    )
}

/// Sum of the category weights of a fine resolution map aggregated onto the
/// coarser target extent.
pub fn aggregate_multi_resolution<TResult, T>(
    landuse: &DenseRaster<T>,
    weight_per_landuse: &HashMap<T, f64>,
    target: &GeoReference,
) -> Result<DenseRaster<TResult>>
where
    TResult: ArrayNum,
    T: ArrayNum + Eq + Hash,
{
    let factor = resolution_factor(landuse.metadata(), target)?;
    let weights = convert_categories_to_weights::<TResult, T>(landuse, weight_per_landuse)?;
    deflate_equal_sum(&weights, factor)
}

/// Weighted distribution where the land use and zone maps carry a higher
/// resolution than the target extent: the amounts are spread at the fine
/// resolution and aggregated back to the target resolution. The zero is
/// nodata rule is disabled so the aggregation sees every cell as data.
pub fn aggregate_and_spread_multi_resolution<TResult, T>(
    landuse: &DenseRaster<T>,
    weight_per_landuse: &HashMap<T, f64>,
    zones: &DenseRaster<T>,
    amount_per_zone: &HashMap<T, f64>,
    target: &GeoReference,
) -> Result<DenseRaster<TResult>>
where
    TResult: ArrayNum,
    T: ArrayNum + Eq + Hash,
{
    if landuse.size() != zones.size() {
        return Err(Error::InvalidArgument(
            "Land use map and zone map should have equal extent".to_string(),
        ));
    }

    let factor = resolution_factor(landuse.metadata(), target)?;
    let weights = convert_categories_to_weights::<f32, T>(landuse, weight_per_landuse)?;
    let spread = weighted_distribution::<TResult, T, f32>(zones, &weights, amount_per_zone, false)?;
    deflate_equal_sum(&spread, factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_georeference_with_cell_size;

    #[test]
    fn inflate_replicates_cells() {
        let meta = test_georeference_with_cell_size(1, 2, 100.0, Some(-1.0));
        let input = DenseRaster::<i32>::new(meta, vec![1, 2]).unwrap();

        let result = inflate(&input, 2).unwrap();
        assert_eq!(result.rows().count(), 2);
        assert_eq!(result.columns().count(), 4);
        assert_eq!(result.metadata().cell_size_x(), 50.0);
        #[rustfmt::skip]
        assert_eq!(result.as_slice(), &[
            1, 1, 2, 2,
            1, 1, 2, 2,
        ]);
    }

    #[test]
    fn inflate_equal_sum_preserves_the_total() {
        let meta = test_georeference_with_cell_size(1, 2, 100.0, Some(f64::NAN));
        let input = DenseRaster::<f32>::new(meta, vec![8.0, 12.0]).unwrap();

        let result = inflate_equal_sum::<f32, _>(&input, 2).unwrap();
        #[rustfmt::skip]
        assert_eq!(result.as_slice(), &[
            2.0, 2.0, 3.0, 3.0,
            2.0, 2.0, 3.0, 3.0,
        ]);
        assert_eq!(crate::algo::sum(&result), crate::algo::sum(&input));
    }

    #[test]
    fn deflate_equal_sum_collapses_blocks() {
        let meta = test_georeference_with_cell_size(2, 4, 50.0, Some(f64::NAN));
        #[rustfmt::skip]
        let input = DenseRaster::<f32>::new(meta, vec![
            1.0, 2.0, f32::NAN, f32::NAN,
            3.0, 4.0, f32::NAN, 5.0,
        ])
        .unwrap();

        let result = deflate_equal_sum(&input, 2).unwrap();
        assert_eq!(result.rows().count(), 1);
        assert_eq!(result.columns().count(), 2);
        assert_eq!(result.metadata().cell_size_x(), 100.0);
        assert_eq!(result.masked_data(), vec![Some(10.0), Some(5.0)]);

        // a block with only nodata collapses to nodata
        let meta = test_georeference_with_cell_size(2, 2, 50.0, Some(f64::NAN));
        let input = DenseRaster::<f32>::filled_with_nodata(meta);
        let result = deflate_equal_sum(&input, 2).unwrap();
        assert_eq!(result.masked_data(), vec![None]);
    }

    #[test]
    fn category_weights_lookup() {
        let meta = test_georeference_with_cell_size(1, 3, 100.0, Some(-1.0));
        let categories = DenseRaster::<i32>::new(meta, vec![1, 2, 7]).unwrap();
        let weights = HashMap::from([(1, 0.5), (2, 2.0)]);

        let result = convert_categories_to_weights::<f32, _>(&categories, &weights).unwrap();
        assert_eq!(result.masked_data(), vec![Some(0.5), Some(2.0), None]);
    }

    #[test]
    fn aggregate_and_spread_preserves_the_zone_amounts() {
        let fine_meta = test_georeference_with_cell_size(2, 4, 50.0, Some(-1.0));
        let coarse_meta = test_georeference_with_cell_size(1, 2, 100.0, Some(f64::NAN));

        #[rustfmt::skip]
        let landuse = DenseRaster::<i32>::new(fine_meta.clone(), vec![
            1, 1, 2, 2,
            1, 1, 2, 2,
        ])
        .unwrap();

        #[rustfmt::skip]
        let zones = DenseRaster::<i32>::new(fine_meta, vec![
            1, 1, 2, 2,
            1, 1, 2, 2,
        ])
        .unwrap();

        let weights = HashMap::from([(1, 1.0), (2, 2.0)]);
        let amounts = HashMap::from([(1, 40.0), (2, 100.0)]);

        let result =
            aggregate_and_spread_multi_resolution::<f32, _>(&landuse, &weights, &zones, &amounts, &coarse_meta).unwrap();

        // each coarse cell holds one full zone
        assert_eq!(result.as_slice(), &[40.0, 100.0]);
    }
}
