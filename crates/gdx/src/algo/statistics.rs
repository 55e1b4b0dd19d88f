use std::collections::BTreeSet;

use num::ToPrimitive;

use crate::{Array, ArrayMetadata, ArrayNum, DenseArray};

pub const HISTOGRAM_BIN_COUNT: usize = 1024;

/// Cell statistics of a raster, used by the command line tools to summarise
/// raster contents.
#[derive(Debug, Clone)]
pub struct RasterStats {
    pub negative_values: usize,
    pub count_high: usize,
    pub non_zero_values: usize,
    pub zero_values: usize,
    pub nodata_values: usize,

    pub sum: f64,
    pub sigma_non_zero: f64,
    pub highest_value: f64,
    pub lowest_value: f64,

    pub histogram: Vec<usize>,
}

impl Default for RasterStats {
    fn default() -> Self {
        RasterStats {
            negative_values: 0,
            count_high: 0,
            non_zero_values: 0,
            zero_values: 0,
            nodata_values: 0,
            sum: 0.0,
            sigma_non_zero: 0.0,
            highest_value: f64::MIN,
            lowest_value: f64::MAX,
            histogram: vec![0; HISTOGRAM_BIN_COUNT],
        }
    }
}

impl std::fmt::Display for RasterStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Min: {} Max: {} Nodata: {} Zero: {} Nonzero: {} Negative: {} Sigma non zero: {} Sum: {}",
            self.lowest_value,
            self.highest_value,
            self.nodata_values,
            self.zero_values,
            self.non_zero_values,
            self.negative_values,
            self.sigma_non_zero,
            self.sum
        )
    }
}

/// Gather the cell statistics of a raster. Values above `max_value` are
/// counted in `count_high` instead of the histogram.
pub fn statistics<T: ArrayNum, Metadata: ArrayMetadata>(ras: &DenseArray<T, Metadata>, max_value: f64) -> RasterStats {
    let mut stats = RasterStats::default();
    let max_value = max_value.clamp(0.0, (HISTOGRAM_BIN_COUNT - 1) as f64);

    for i in 0..ras.len() {
        let value = match ras.value(i) {
            None => {
                stats.nodata_values += 1;
                continue;
            }
            Some(v) => v.to_f64().unwrap_or(f64::NAN),
        };

        if value != 0.0 {
            stats.non_zero_values += 1;
        } else {
            stats.zero_values += 1;
        }

        stats.sum += value;
        stats.highest_value = stats.highest_value.max(value);
        stats.lowest_value = stats.lowest_value.min(value);

        if value < 0.0 {
            stats.negative_values += 1;
        } else if value > max_value {
            stats.count_high += 1;
        } else {
            stats.histogram[value as usize] += 1;
        }

        if value != 0.0 {
            stats.sigma_non_zero += value * value;
        }
    }

    // sample standard deviation of the non zero cells
    let n = stats.non_zero_values as f64;
    if stats.non_zero_values > 1 {
        let mu = stats.sum / n;
        let mut sigma = ((stats.sigma_non_zero / n) - (mu * mu)).max(0.0).sqrt();
        sigma /= ((n - 1.0) / n).sqrt();
        stats.sigma_non_zero = sigma;
    } else {
        stats.sigma_non_zero = 0.0;
    }

    stats
}

/// The distinct data values of the raster in ascending order.
pub fn unique_raster_values<T, Metadata>(ras: &DenseArray<T, Metadata>) -> Vec<T>
where
    T: ArrayNum + Ord,
    Metadata: ArrayMetadata,
{
    let mut values = BTreeSet::new();
    for v in ras.iter_values() {
        values.insert(v);
    }

    values.into_iter().collect()
}
