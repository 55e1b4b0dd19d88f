use std::collections::HashMap;

use num::ToPrimitive;

use crate::{Array, ArrayMetadata, ArrayNum, Cell, DenseArray, DenseRaster, Error, GeoReference, Result};

/// Keep only the cells carrying one of the listed values, every other cell
/// becomes nodata. The raster must have a nodata value.
pub fn filter_in_place<T: ArrayNum, Metadata: ArrayMetadata>(ras: &mut DenseArray<T, Metadata>, values_to_include: &[T]) {
    for mut proxy in ras.iter_proxy_mut() {
        if proxy.has_value() && !values_to_include.contains(&proxy.raw()) {
            proxy.reset();
        }
    }
}

/// Keep only the cells carrying the given value.
pub fn filter_value_in_place<T: ArrayNum, Metadata: ArrayMetadata>(ras: &mut DenseArray<T, Metadata>, value: T) {
    filter_in_place(ras, &[value]);
}

fn radius_in_cells(meta: &GeoReference, radius_in_meter: f64) -> Result<i32> {
    let cell_size = meta.cell_size_x();
    if cell_size <= 0.0 {
        return Err(Error::InvalidArgument("Filter radius requires a valid cell size".to_string()));
    }

    Ok((radius_in_meter / cell_size) as i32)
}

/// Modal filter: every cell becomes the most frequent value among the data
/// cells within the circular window. The cell's own value wins a frequency
/// tie, otherwise the smallest tied value is taken. Cells whose window holds
/// no data stay nodata.
pub fn majority_filter<T>(ras: &DenseRaster<T>, radius_in_meter: f64) -> Result<DenseRaster<T>>
where
    T: ArrayNum + Eq + std::hash::Hash + Ord,
{
    let radius = radius_in_cells(ras.metadata(), radius_in_meter)?;
    let radius2 = radius * radius;
    let rows = ras.rows().count();
    let cols = ras.columns().count();

    let mut result = ras.clone();
    let mut counts: HashMap<T, u32> = HashMap::new();

    for row in 0..rows {
        for col in 0..cols {
            counts.clear();

            for dr in -radius..=radius {
                let r = row + dr;
                if r < 0 || r >= rows {
                    continue;
                }

                for dc in -radius..=radius {
                    let c = col + dc;
                    if c < 0 || c >= cols || dr * dr + dc * dc > radius2 {
                        continue;
                    }

                    if let Some(v) = ras.cell_value(Cell::from_row_col(r, c)) {
                        *counts.entry(v).or_insert(0) += 1;
                    }
                }
            }

            let cell = Cell::from_row_col(row, col);
            if counts.is_empty() {
                continue;
            }

            let highest_count = counts.values().copied().max().unwrap_or(0);
            let own_value = ras.cell_value(cell);
            let winner = match own_value {
                Some(own) if counts.get(&own) == Some(&highest_count) => own,
                _ => counts
                    .iter()
                    .filter(|(_, &count)| count == highest_count)
                    .map(|(&v, _)| v)
                    .min()
                    .unwrap_or(T::zero()),
            };

            result.set_cell_value(cell, Some(winner));
        }
    }

    Ok(result)
}

/// Smoothing filter: every cell becomes the mean of the data cells inside the
/// square window with the given cell radius. Cells whose window holds no data
/// stay nodata.
pub fn average_filter_square<T>(ras: &DenseRaster<T>, radius: i32) -> Result<DenseRaster<T>>
where
    T: ArrayNum,
{
    if radius < 0 {
        return Err(Error::InvalidArgument("Filter radius may not be negative".to_string()));
    }

    let rows = ras.rows().count();
    let cols = ras.columns().count();
    let mut result = ras.clone();

    for row in 0..rows {
        for col in 0..cols {
            let mut sum = 0.0;
            let mut count = 0usize;

            for r in (row - radius).max(0)..=(row + radius).min(rows - 1) {
                for c in (col - radius).max(0)..=(col + radius).min(cols - 1) {
                    if let Some(v) = ras.cell_value(Cell::from_row_col(r, c)) {
                        sum += v.to_f64().unwrap_or(0.0);
                        count += 1;
                    }
                }
            }

            if count > 0 {
                let mean = sum / count as f64;
                result.set_cell_value(Cell::from_row_col(row, col), num::NumCast::from(mean));
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{test_georeference, test_georeference_with_cell_size};

    #[test]
    fn majority_assigns_the_modal_value() {
        #[rustfmt::skip]
        let ras = DenseRaster::<i32>::new(
            test_georeference(6, 6, Some(-9999.0)),
            vec![
                1, 1, 0, 2, 2, -3,
                1, 1, 5, 2, 2, -3,
                4, 4, 5, 3, 3, -3,
                4, 4, 5, 3, 3, -9999,
                0, 0, 6, 6, -9999, -9999,
                0, 0, 6, -9999, -9999, -9999,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = DenseRaster::<i32>::new(
            ras.metadata().clone(),
            vec![
                1, 1, 1, 2, 2, -3,
                1, 1, 5, 2, 2, -3,
                4, 4, 5, 3, 3, -3,
                4, 4, 5, 3, 3, 3,
                0, 0, 6, 6, 3, -3,
                0, 0, 6, 6, 6, -9999,
            ],
        )
        .unwrap();

        let result = majority_filter(&ras, 200.0).unwrap();
        assert_eq!(expected, result);
    }

    #[test]
    fn majority_on_an_all_nodata_raster_is_a_noop() {
        let ras = DenseRaster::<i32>::filled_with_nodata(test_georeference(3, 3, Some(-9999.0)));
        let result = majority_filter(&ras, 200.0).unwrap();
        assert!(result.contains_only_nodata());
    }

    #[test]
    fn average_filter_fills_nodata_from_the_neighbourhood() {
        #[rustfmt::skip]
        let ras = DenseRaster::<f32>::new(
            test_georeference_with_cell_size(3, 4, 100.0, Some(-1.0)),
            vec![
                1.0,  2.0, -1.0, 4.0,
                5.0,  6.0,  7.0, 8.0,
                -1.0, 10.0, 11.0, -1.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = DenseRaster::<f32>::new(
            ras.metadata().clone(),
            vec![
                14.0 / 4.0, 21.0 / 5.0, 27.0 / 5.0, 19.0 / 3.0,
                24.0 / 5.0, 42.0 / 7.0, 48.0 / 7.0, 30.0 / 4.0,
                21.0 / 3.0, 39.0 / 5.0, 42.0 / 5.0, 26.0 / 3.0,
            ],
        )
        .unwrap();

        let result = average_filter_square(&ras, 1).unwrap();
        crate::assert_rasters_near!(expected, result, 1e-5);
    }
}
