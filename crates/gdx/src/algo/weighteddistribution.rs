use std::collections::HashMap;
use std::hash::Hash;

use num::{NumCast, ToPrimitive};

use crate::{Array, ArrayMetadata, ArrayNum, DenseRaster, Error, Result};

#[derive(Default, Clone, Copy)]
struct ZoneWeightInfo {
    sum_weights: f64,
    count_data_cells: usize,
    count_nodata_cells: usize,
}

fn sum_weights_per_zone<TZone, TWeight>(
    zones: &DenseRaster<TZone>,
    weights: &DenseRaster<TWeight>,
    amounts: &HashMap<TZone, f64>,
) -> Result<HashMap<TZone, ZoneWeightInfo>>
where
    TZone: ArrayNum + Eq + Hash,
    TWeight: ArrayNum,
{
    if zones.size() != weights.size() {
        return Err(Error::InvalidArgument(format!(
            "Weighted distribution: raster sizes should match {} {}",
            zones.size(),
            weights.size()
        )));
    }

    let mut result: HashMap<TZone, ZoneWeightInfo> = HashMap::new();

    for i in 0..zones.len() {
        let Some(zone) = zones.value(i) else {
            continue;
        };

        if zone < TZone::zero() {
            return Err(Error::InvalidArgument(
                "Weighted distribution: zone raster should be non-negative".to_string(),
            ));
        }

        let info = result.entry(zone).or_default();
        match weights.value(i) {
            Some(weight) => {
                if weight < TWeight::zero() {
                    return Err(Error::InvalidArgument(
                        "Weighted distribution: weight raster should be non-negative".to_string(),
                    ));
                }

                info.count_data_cells += 1;
                info.sum_weights += weight.to_f64().unwrap_or(0.0);
            }
            None => info.count_nodata_cells += 1,
        }
    }

    for (zone, &amount) in amounts {
        if amount != 0.0 && !result.contains_key(zone) {
            return Err(Error::InvalidArgument(format!(
                "Weighted distribution: amount ({amount}) for a zone that is not on the zoning raster"
            )));
        }
    }

    Ok(result)
}

/// Distribute an amount per zone over the zone cells proportional to the
/// weight raster:
///
/// 1. zones with a positive weight sum share the amount proportional to the
///    cell weights,
/// 2. zones whose weights are all zero spread the amount evenly over the
///    data-weight cells,
/// 3. zones whose weights are all nodata spread the amount evenly over the
///    nodata-weight cells.
///
/// With `zero_is_nodata` cells whose share is exactly zero become nodata,
/// the contract used by most wrappers.
pub fn weighted_distribution<TResult, TZone, TWeight>(
    zones: &DenseRaster<TZone>,
    weights: &DenseRaster<TWeight>,
    amounts: &HashMap<TZone, f64>,
    zero_is_nodata: bool,
) -> Result<DenseRaster<TResult>>
where
    TResult: ArrayNum,
    TZone: ArrayNum + Eq + Hash,
    TWeight: ArrayNum,
{
    if !TResult::HAS_NAN {
        return Err(Error::InvalidArgument(
            "Weighted distribution only makes sense with floating point result rasters".to_string(),
        ));
    }

    let nodata_value = if zero_is_nodata { 0.0 } else { f64::NAN };
    let meta = zones.metadata().with_nodata(Some(nodata_value));
    let mut result = DenseRaster::<TResult>::filled_with_nodata(meta);

    let zone_weights = sum_weights_per_zone(zones, weights, amounts)?;

    for i in 0..zones.len() {
        let Some(zone) = zones.value(i) else {
            continue;
        };

        let Some(&amount) = amounts.get(&zone) else {
            continue;
        };

        let info = zone_weights[&zone];
        let mut value: Option<f64> = None;

        if info.sum_weights > 0.0 {
            if let Some(weight) = weights.value(i) {
                value = Some(amount * weight.to_f64().unwrap_or(0.0) / info.sum_weights);
            }
        } else if info.count_data_cells > 0 {
            // all weights are zero, spread the amount evenly over the data cells
            if weights.value(i).is_some() {
                value = Some(amount / info.count_data_cells as f64);
            }
        } else {
            // all weights are nodata, spread the amount evenly over the nodata cells
            value = Some(amount / info.count_nodata_cells as f64);
        }

        if let Some(value) = value {
            if zero_is_nodata && value == 0.0 {
                continue;
            }

            result[i] = NumCast::from(value).unwrap_or_else(TResult::default_nodata);
        }
    }

    Ok(result)
}

/// [`weighted_distribution`] with uniform weights.
pub fn areal_weighted_distribution<TResult, TZone>(
    zones: &DenseRaster<TZone>,
    amounts: &HashMap<TZone, f64>,
) -> Result<DenseRaster<TResult>>
where
    TResult: ArrayNum,
    TZone: ArrayNum + Eq + Hash,
{
    let weights = DenseRaster::<f32>::try_filled_with(Some(1.0), zones.metadata().with_nodata(None))?;
    weighted_distribution(zones, &weights, amounts, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_georeference;
    use crate::ArrayMetadata as _;

    #[test]
    fn shares_are_proportional_to_the_weights() {
        let meta = test_georeference(1, 5, Some(-9999.0));
        let zones = DenseRaster::<i32>::new(meta.clone(), vec![1, 1, 1, 2, 2]).unwrap();
        let weights = DenseRaster::<f32>::new(meta.with_nodata(Some(f64::NAN)), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let amounts = HashMap::from([(1, 60.0), (2, 90.0)]);

        let actual = weighted_distribution::<f32, _, _>(&zones, &weights, &amounts, true).unwrap();
        assert_eq!(actual.metadata().nodata(), Some(0.0));
        assert_eq!(actual.as_slice(), &[10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn uniform_weights_split_evenly() {
        let meta = test_georeference(4, 5, Some(-9999.0));
        let zones = DenseRaster::<i32>::new(
            meta.clone(),
            vec![1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4],
        )
        .unwrap();
        let weights = DenseRaster::<f32>::filled_with(Some(1.0), meta.with_nodata(Some(f64::NAN)));
        let amounts = HashMap::from([(0, 0.0), (1, 1.0), (2, 1.0), (3, 1.0), (4, 1.0)]);

        let actual = weighted_distribution::<f32, _, _>(&zones, &weights, &amounts, true).unwrap();
        assert!(actual.as_slice().iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn nodata_weight_zones_fall_back_to_uniform_spread() {
        let meta = test_georeference(1, 5, Some(-9999.0));
        let zones = DenseRaster::<i32>::new(meta.clone(), vec![1, 1, 1, 2, 2]).unwrap();
        let weights = DenseRaster::<f32>::new(
            meta.with_nodata(Some(-9999.0)),
            vec![1.0, 2.0, -9999.0, -9999.0, -9999.0],
        )
        .unwrap();
        let amounts = HashMap::from([(1, 60.0), (2, 90.0)]);

        let actual = weighted_distribution::<f32, _, _>(&zones, &weights, &amounts, true).unwrap();
        // zone 1 distributes over its data cells, zone 2 over its nodata cells
        assert_eq!(actual.masked_data(), vec![Some(20.0), Some(40.0), None, Some(45.0), Some(45.0)]);
    }

    #[test]
    fn tiered_distribution_per_zone() {
        let meta = test_georeference(5, 5, Some(-9999.0));

        #[rustfmt::skip]
        let zones = DenseRaster::<i32>::new(meta.clone(), vec![
            0, 0, 0, 0, 0,
            1, 1, 1, 1, 1,
            2, 2, 2, 2, 2,
            3, 3, 3, 3, 3,
            -9999, -9999, -9999, -9999, -9999,
        ])
        .unwrap();

        #[rustfmt::skip]
        let weights = DenseRaster::<f32>::new(meta.with_nodata(Some(-9999.0)), vec![
            1.0, 1.0, 1.0, 1.0, 1.0,
            0.0, 0.0, 0.0, 0.0, 0.0,
            2.0, 0.0, 1.1, 0.9, -9999.0,
            0.0, 0.0, 0.0, 0.0, -9999.0,
            1.0, 1.0, 1.0, 1.0, -9999.0,
        ])
        .unwrap();

        let amounts = HashMap::from([(0, 1.0), (1, 0.0), (2, 100.0), (3, 1000.0)]);

        let actual = weighted_distribution::<f32, _, _>(&zones, &weights, &amounts, true).unwrap();

        #[rustfmt::skip]
        let expected = DenseRaster::<f32>::new(actual.metadata().clone(), vec![
            0.2, 0.2, 0.2, 0.2, 0.2,
            0.0, 0.0, 0.0, 0.0, 0.0,
            50.0, 0.0, 27.5, 22.5, 0.0,
            250.0, 250.0, 250.0, 250.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0,
        ])
        .unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn amounts_for_unknown_zones_are_rejected() {
        let meta = test_georeference(1, 5, Some(-9999.0));
        let zones = DenseRaster::<i32>::new(meta.clone(), vec![1, 1, 1, 2, 2]).unwrap();
        let weights = DenseRaster::<f32>::new(meta.with_nodata(Some(f64::NAN)), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let amounts = HashMap::from([(1, 60.0), (2, 60.0), (3, 90.0)]);

        assert!(matches!(
            weighted_distribution::<f32, _, _>(&zones, &weights, &amounts, true),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn negative_weights_are_rejected() {
        let meta = test_georeference(1, 2, Some(-9999.0));
        let zones = DenseRaster::<i32>::new(meta.clone(), vec![1, 1]).unwrap();
        let weights = DenseRaster::<f32>::new(meta.with_nodata(Some(f64::NAN)), vec![1.0, -2.0]).unwrap();
        let amounts = HashMap::from([(1, 60.0)]);

        assert!(weighted_distribution::<f32, _, _>(&zones, &weights, &amounts, true).is_err());
    }

    #[test]
    fn areal_distribution_uses_uniform_weights() {
        let meta = test_georeference(1, 4, Some(-9999.0));
        let zones = DenseRaster::<i32>::new(meta, vec![1, 1, 2, 2]).unwrap();
        let amounts = HashMap::from([(1, 10.0), (2, 30.0)]);

        let actual = areal_weighted_distribution::<f32, _>(&zones, &amounts).unwrap();
        assert_eq!(actual.as_slice(), &[5.0, 5.0, 15.0, 15.0]);
    }
}
