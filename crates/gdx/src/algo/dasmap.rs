use num::{NumCast, ToPrimitive};

use crate::{
    algo::multiresolution::deflate_equal_sum, raster::check_dimensions, Array, ArrayMetadata, ArrayNum, DenseRaster, Error,
    GeoReference, Result,
};

/// Likelihood table g(k, z): the share of zone z's amount that one cell of
/// class k receives. Derived from the cross tabulation of class and zone
/// counts, weighted with the class weights. Zones without positive
/// likelihood degrade to a uniform spread.
fn compute_likelihoods<T: ArrayNum>(
    class_map: &DenseRaster<T>,
    class_weights: &[f64],
    zone_map: &DenseRaster<T>,
    zone_count: usize,
) -> Result<Vec<Vec<f64>>> {
    let class_count = class_weights.len();

    if class_map.size() != zone_map.size() {
        return Err(Error::InvalidArgument(
            "Class map and zone map should have the same size in dasymetric mapping".to_string(),
        ));
    }

    let mut class_zone_counts = vec![vec![0usize; zone_count]; class_count];
    let mut class_counts = vec![0usize; class_count];
    let mut zone_counts = vec![0usize; zone_count];

    for i in 0..class_map.len() {
        let (Some(class), Some(zone)) = (class_map.value(i), zone_map.value(i)) else {
            continue;
        };

        let class = class.to_i64().unwrap_or(-1);
        let zone = zone.to_i64().unwrap_or(-1);
        if class < 0 || class as usize >= class_count {
            return Err(Error::InvalidArgument(
                "Class map value out of range of the class weights in dasymetric mapping".to_string(),
            ));
        }
        if zone < 0 || zone as usize >= zone_count {
            return Err(Error::InvalidArgument(
                "Zone map value out of range of the amounts in dasymetric mapping".to_string(),
            ));
        }

        class_counts[class as usize] += 1;
        zone_counts[zone as usize] += 1;
        class_zone_counts[class as usize][zone as usize] += 1;
    }

    let total: usize = zone_counts.iter().sum();

    // relative likelihood of class k in zone z compared to its global share
    let mut ckz = vec![vec![0.0f64; zone_count]; class_count];
    for k in 0..class_count {
        for z in 0..zone_count {
            if !class_weights[k].is_nan() && zone_counts[z] > 0 && total > 0 && class_counts[k] > 0 {
                ckz[k][z] = class_weights[k] * (class_zone_counts[k][z] as f64 / zone_counts[z] as f64)
                    / (class_counts[k] as f64 / total as f64);
            }
        }
    }

    let mut cz = vec![0.0f64; zone_count];
    for z in 0..zone_count {
        for k in 0..class_count {
            cz[z] += ckz[k][z];
        }
    }

    let mut gkz = vec![vec![0.0f64; zone_count]; class_count];
    for z in 0..zone_count {
        if cz[z] > 0.0 {
            for k in 0..class_count {
                if class_zone_counts[k][z] > 0 {
                    gkz[k][z] = (ckz[k][z] / cz[z]) / class_zone_counts[k][z] as f64;
                }
            }
        } else if zone_counts[z] > 0 {
            // no positive likelihood in the zone, fall back to a uniform spread
            for k in 0..class_count {
                gkz[k][z] = 1.0 / zone_counts[z] as f64;
            }
        }
    }

    Ok(gkz)
}

/// Dasymetric mapping: reallocate an amount per zone over the zone cells
/// proportional to the likelihood of the cell's land use class within that
/// zone. `class_weights[k]` steers class k, all ones for no effect;
/// `amounts[z]` is the amount mapped into zone z, a NaN amount skips the
/// zone.
pub fn das_map<TResult, T>(
    class_map: &DenseRaster<T>,
    class_weights: &[f64],
    zone_map: &DenseRaster<T>,
    amounts: &[f64],
) -> Result<DenseRaster<TResult>>
where
    TResult: ArrayNum,
    T: ArrayNum,
{
    if !TResult::HAS_NAN {
        return Err(Error::InvalidArgument(
            "Dasymetric mapping only makes sense with floating point result rasters".to_string(),
        ));
    }

    check_dimensions(class_map, zone_map).map_err(|_| {
        Error::InvalidArgument("Dasymetric mapping: class map and zone map should have equal extent".to_string())
    })?;

    let meta = zone_map.metadata().with_nodata(Some(f64::NAN));
    let mut result = DenseRaster::<TResult>::filled_with_nodata(meta);

    let gkz = compute_likelihoods(class_map, class_weights, zone_map, amounts.len())?;

    for i in 0..result.len() {
        let (Some(class), Some(zone)) = (class_map.value(i), zone_map.value(i)) else {
            continue;
        };

        let class = class.to_usize().unwrap_or(0);
        let zone = zone.to_usize().unwrap_or(0);
        if !amounts[zone].is_nan() {
            result[i] = NumCast::from(amounts[zone] * gkz[class][zone]).unwrap_or_else(TResult::default_nodata);
        }
    }

    Ok(result)
}

/// Dasymetric mapping with a class and zone map at a finer resolution than
/// the target extent, the mapped amounts are aggregated back to the target
/// resolution.
pub fn das_map_multi_resolution<TResult, T>(
    class_map: &DenseRaster<T>,
    class_weights: &[f64],
    zone_map: &DenseRaster<T>,
    amounts: &[f64],
    target: &GeoReference,
) -> Result<DenseRaster<TResult>>
where
    TResult: ArrayNum,
    T: ArrayNum,
{
    let factor = resolution_factor(class_map.metadata(), target)?;
    let result = das_map::<TResult, T>(class_map, class_weights, zone_map, amounts)?;
    deflate_equal_sum(&result, factor)
}

pub(crate) fn resolution_factor(fine: &GeoReference, coarse: &GeoReference) -> Result<i32> {
    let fine_rows = fine.rows().count();
    let fine_cols = fine.columns().count();
    let coarse_rows = coarse.rows().count();
    let coarse_cols = coarse.columns().count();

    if coarse_rows == 0 || coarse_cols == 0 || fine_rows < coarse_rows || fine_rows % coarse_rows != 0 {
        return Err(Error::InvalidArgument(
            "Input maps should have a size compatible with the target extent".to_string(),
        ));
    }

    let factor = fine_rows / coarse_rows;
    if fine_cols < coarse_cols || fine_cols % coarse_cols != 0 || factor != fine_cols / coarse_cols {
        return Err(Error::InvalidArgument(
            "Input maps should have a size compatible with the target extent".to_string(),
        ));
    }

    Ok(factor)
}
