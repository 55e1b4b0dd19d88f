//! Map algebra kernels and raster algorithms.

mod cast;
mod clusterid;
mod clustersize;
pub(crate) mod clusterutils;
mod conditionals;
mod conversion;
mod dasmap;
mod distance;
mod distribute;
mod filter;
mod ldd;
mod limits;
mod masking;
mod multiresolution;
mod nodata;
mod normalise;
mod rasterdiff;
mod reclass;
mod statistics;
mod sum;
mod suminbuffer;
mod weighteddistribution;

pub use cast::cast;
pub use clusterid::{cluster_id, cluster_id_with_obstacles, fuzzy_cluster_id, fuzzy_cluster_id_with_obstacles};
pub use clustersize::{cluster_size, cluster_sum};
pub use clusterutils::ClusterDiagonals;
pub use conditionals::{if_then, if_then_else, if_then_else_values};
pub use conversion::{replace_value, replace_value_in_place};
pub use dasmap::{das_map, das_map_multi_resolution};
pub use distance::{
    closest_target, distance, distance_with_barriers, distances_up_to, sum_targets_within_travel_distance,
    sum_within_travel_distance, travel_distance, travel_distances_up_to, value_at_closest_less_than_travel_target,
    value_at_closest_target, value_at_closest_travel_target, BarrierDiagonals,
};
pub use distribute::{raster_distribution, value_distribution, RasterDistributionResult};
pub use filter::{average_filter_square, filter_in_place, filter_value_in_place, majority_filter};
pub use ldd::{
    accuflux, accufractionflux, catchment, fix_ldd, flux_origin, ldd_cluster, ldd_dist, max_upstream_dist, slope_length,
    validate_ldd, FlowDirection, LddProblemCallbacks,
};
pub use limits::{maximum, min_max, minimum};
pub use masking::{apply_mask, count_mask, erase_outside_mask, exclude_mask, include_mask, inside_mask, outside_mask, sum_mask};
pub use multiresolution::{
    aggregate_and_spread_multi_resolution, aggregate_multi_resolution, convert_categories_to_weights, deflate_equal_sum,
    inflate, inflate_equal_sum,
};
pub use nodata::{is_data, is_nodata, make_nodata, replace_nodata, replace_nodata_in_place, turn_value_into_nodata};
pub use normalise::{normalise_max, normalise_min_max};
pub use rasterdiff::{diff_rasters, values_equal_with_tolerance, RasterDiff};
pub use reclass::reclass;
pub use statistics::{statistics, unique_raster_values, RasterStats};
pub use sum::{ssum, sum};
pub use suminbuffer::{compute_integral_image, max_in_buffer, sum_in_buffer, BufferStyle};
pub use weighteddistribution::{areal_weighted_distribution, weighted_distribution};

#[cfg(feature = "simd")]
pub mod simd {
    //! Vectorised variants of the nodata canonicalisation, observable
    //! behaviour matches the scalar functions.
    pub use crate::densearrayutil::simd::{process_nodata_f32, process_nodata_f64, restore_nodata_f32, restore_nodata_f64};
}
