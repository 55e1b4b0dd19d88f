use std::time::{Duration, Instant};

use log::warn;
use num::ToPrimitive;

use crate::{
    algo::{
        clusterutils::{visit_diagonal_neighbours, visit_straight_neighbours, MARK_BORDER, MARK_DONE, MARK_TODO},
        nodata::replace_nodata,
    },
    raster::check_dimensions,
    Array, ArrayMetadata, ArrayNum, Cell, DenseRaster, Error, FiLo, GeoReference, Result,
};

/// Whether a diagonal move may pass between two orthogonally touching
/// barrier cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierDiagonals {
    Include,
    Exclude,
}

const SQRT2: f32 = std::f32::consts::SQRT_2;

fn scratch_metadata(size: crate::RasterSize) -> GeoReference {
    GeoReference::sized_with_nodata(size, None)
}

fn byte_raster(size: crate::RasterSize, fill: u8) -> DenseRaster<u8> {
    DenseRaster::filled_with(Some(fill), scratch_metadata(size))
}

fn relax_cell(
    delta_d: f32,
    cell: Cell,
    new_cell: Cell,
    distance_to_target: &mut DenseRaster<f32>,
    mark: &mut DenseRaster<u8>,
    border: &mut FiLo<Cell>,
) {
    let alternative = distance_to_target[cell] + delta_d;
    if distance_to_target[new_cell] > alternative {
        distance_to_target[new_cell] = alternative;
        if mark[new_cell] != MARK_BORDER {
            mark[new_cell] = MARK_BORDER;
            border.push_back(new_cell);
        }
    }
}

fn relax_cell_with_barriers(
    delta_d: f32,
    cell: Cell,
    new_cell: Cell,
    barriers: &DenseRaster<u8>,
    distance_to_target: &mut DenseRaster<f32>,
    mark: &mut DenseRaster<u8>,
    border: &mut FiLo<Cell>,
) {
    if barriers[new_cell] == 0 {
        relax_cell(delta_d, cell, new_cell, distance_to_target, mark, border);
    }
}

/// Diagonal relaxation with excluded diagonals: the move is also forbidden
/// when both cells across the corner are barriers.
fn relax_cell_with_barriers_diag(
    delta_d: f32,
    cell: Cell,
    new_cell: Cell,
    barriers: &DenseRaster<u8>,
    distance_to_target: &mut DenseRaster<f32>,
    mark: &mut DenseRaster<u8>,
    border: &mut FiLo<Cell>,
) {
    let corner1 = Cell::from_row_col(cell.row, new_cell.col);
    let corner2 = Cell::from_row_col(new_cell.row, cell.col);

    if barriers[new_cell] == 0 && !(barriers[corner1] != 0 && barriers[corner2] != 0) {
        relax_cell(delta_d, cell, new_cell, distance_to_target, mark, border);
    }
}

fn relax_travel_cell<T: ArrayNum>(
    delta_d: f32,
    cell: Cell,
    new_cell: Cell,
    distance_to_target: &mut DenseRaster<f32>,
    mark: &mut DenseRaster<u8>,
    travel_time: &DenseRaster<T>,
    border: &mut FiLo<Cell>,
) {
    if distance_to_target.cell_is_nodata(cell) || distance_to_target.cell_is_nodata(new_cell) {
        return;
    }

    let step_time = travel_time[new_cell].to_f32().unwrap_or(f32::MAX);
    let alternative = distance_to_target[cell] + delta_d * step_time;
    if distance_to_target[new_cell] > alternative {
        distance_to_target[new_cell] = alternative;
        if mark[new_cell] != MARK_BORDER {
            mark[new_cell] = MARK_BORDER;
            border.push_back(new_cell);
        }
    }
}

/// Euclidean distance to the closest non-zero target cell, in map units.
/// Cells further away than `unreachable` keep that value, nodata target
/// cells propagate as nodata.
pub fn distances_up_to<T: ArrayNum>(target: &DenseRaster<T>, unreachable: f32) -> Result<DenseRaster<f32>> {
    let rows = target.rows().count();
    let cols = target.columns().count();

    let meta = target.metadata().with_nodata(Some(f64::NAN));
    let mut distance_to_target = DenseRaster::<f32>::try_filled_with(Some(unreachable), meta)?;
    let mut mark = byte_raster(target.size(), MARK_TODO);
    let mut border = FiLo::sized_for(target.size());

    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if target.cell_is_nodata(cell) {
                distance_to_target.mark_as_nodata(cell);
            } else if target[cell] != T::zero() {
                distance_to_target[cell] = 0.0;
                mark[cell] = MARK_BORDER;
                border.push_back(cell);
            }
        }
    }

    while !border.is_empty() {
        let cell = border.pop_head();
        mark[cell] = MARK_DONE;

        visit_straight_neighbours(cell, rows, cols, |neighbour| {
            relax_cell(1.0, cell, neighbour, &mut distance_to_target, &mut mark, &mut border);
        });

        visit_diagonal_neighbours(cell, rows, cols, |neighbour| {
            relax_cell(SQRT2, cell, neighbour, &mut distance_to_target, &mut mark, &mut border);
        });
    }

    distance_to_target *= target.metadata().cell_size_x() as f32;
    Ok(distance_to_target)
}

/// Euclidean distance to the closest non-zero target cell, in map units.
pub fn distance<T: ArrayNum>(target: &DenseRaster<T>) -> Result<DenseRaster<f32>> {
    distances_up_to(target, f32::INFINITY)
}

/// Euclidean distance to the closest target cell without passing through
/// barrier cells. Cells shielded by barriers report infinity.
pub fn distance_with_barriers<TTarget, TBarrier>(
    target: &DenseRaster<TTarget>,
    barriers: &DenseRaster<TBarrier>,
    diagonals: BarrierDiagonals,
) -> Result<DenseRaster<f32>>
where
    TTarget: ArrayNum,
    TBarrier: ArrayNum,
{
    check_dimensions(target, barriers)?;

    let rows = target.rows().count();
    let cols = target.columns().count();
    let unreachable = f32::INFINITY;

    let meta = target.metadata().with_nodata(Some(f64::NAN));
    let mut distance_to_target = DenseRaster::<f32>::try_filled_with(Some(unreachable), meta)?;
    let mut mark = byte_raster(target.size(), MARK_TODO);
    let mut border = FiLo::sized_for(target.size());

    // targets and barriers are collapsed to byte rasters up front, nodata
    // barriers count as barriers
    let mut byte_target = byte_raster(target.size(), 0);
    let mut byte_barriers = byte_raster(target.size(), 0);

    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if !target.cell_is_nodata(cell) && target[cell] != TTarget::zero() {
                byte_target[cell] = 1;
            }

            if barriers.cell_is_nodata(cell) || barriers[cell] != TBarrier::zero() {
                byte_barriers[cell] = 1;
            }
        }
    }

    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if byte_target[cell] != 0 {
                distance_to_target[cell] = 0.0;
                mark[cell] = MARK_BORDER;
                border.push_back(cell);
            }
        }
    }

    while !border.is_empty() {
        let cell = border.pop_head();
        mark[cell] = MARK_DONE;

        visit_straight_neighbours(cell, rows, cols, |neighbour| {
            relax_cell_with_barriers(1.0, cell, neighbour, &byte_barriers, &mut distance_to_target, &mut mark, &mut border);
        });

        match diagonals {
            BarrierDiagonals::Include => {
                visit_diagonal_neighbours(cell, rows, cols, |neighbour| {
                    relax_cell_with_barriers(
                        SQRT2,
                        cell,
                        neighbour,
                        &byte_barriers,
                        &mut distance_to_target,
                        &mut mark,
                        &mut border,
                    );
                });
            }
            BarrierDiagonals::Exclude => {
                visit_diagonal_neighbours(cell, rows, cols, |neighbour| {
                    relax_cell_with_barriers_diag(
                        SQRT2,
                        cell,
                        neighbour,
                        &byte_barriers,
                        &mut distance_to_target,
                        &mut mark,
                        &mut border,
                    );
                });
            }
        }
    }

    distance_to_target *= target.metadata().cell_size_x() as f32;
    Ok(distance_to_target)
}

/// Lowest accumulated travel time to reach a non-zero target cell. The step
/// cost is the step length multiplied by the travel time of the entered
/// cell. Cells with nodata travel time are unreachable.
pub fn travel_distances_up_to<TTarget, T>(
    target: &DenseRaster<TTarget>,
    travel_time: &DenseRaster<T>,
    unreachable: f32,
) -> Result<DenseRaster<f32>>
where
    TTarget: ArrayNum,
    T: ArrayNum,
{
    check_dimensions(target, travel_time).map_err(|_| {
        Error::InvalidArgument("Target raster dimensions should match travel time raster dimensions".to_string())
    })?;

    let rows = target.rows().count();
    let cols = target.columns().count();

    let meta = target.metadata().with_nodata(Some(f64::NAN));
    let mut distance_to_target = DenseRaster::<f32>::try_filled_with(Some(unreachable), meta)?;
    let mut mark = byte_raster(target.size(), MARK_TODO);
    let mut border = FiLo::sized_for(target.size());

    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if target.cell_is_nodata(cell) || travel_time.cell_is_nodata(cell) {
                distance_to_target.mark_as_nodata(cell);
            } else if target[cell] != TTarget::zero() {
                distance_to_target[cell] = 0.0;
                mark[cell] = MARK_BORDER;
                border.push_back(cell);
            }
        }
    }

    while !border.is_empty() {
        let cell = border.pop_head();
        mark[cell] = MARK_DONE;

        visit_straight_neighbours(cell, rows, cols, |neighbour| {
            relax_travel_cell(1.0, cell, neighbour, &mut distance_to_target, &mut mark, travel_time, &mut border);
        });

        visit_diagonal_neighbours(cell, rows, cols, |neighbour| {
            relax_travel_cell(SQRT2, cell, neighbour, &mut distance_to_target, &mut mark, travel_time, &mut border);
        });
    }

    Ok(distance_to_target)
}

pub fn travel_distance<TTarget, T>(target: &DenseRaster<TTarget>, travel_time: &DenseRaster<T>) -> Result<DenseRaster<f32>>
where
    TTarget: ArrayNum,
    T: ArrayNum,
{
    travel_distances_up_to(target, travel_time, f32::MAX)
}

/// Propagate the id of the originating target along with the distance: every
/// cell carries the value of its closest target cell.
pub fn closest_target<T: ArrayNum>(target: &DenseRaster<T>) -> Result<DenseRaster<T>> {
    let rows = target.rows().count();
    let cols = target.columns().count();
    let unreachable = f32::MAX;

    let meta = target.metadata().with_nodata(None);
    let mut distance_to_target = DenseRaster::<f32>::try_filled_with(Some(unreachable), meta.clone())?;
    let mut closest = DenseRaster::<T>::try_filled_with(Some(T::zero()), meta)?;
    let mut mark = byte_raster(target.size(), MARK_TODO);
    let mut border = FiLo::sized_for(target.size());

    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if target.cell_is_nodata(cell) {
                continue;
            }

            if target[cell] != T::zero() {
                distance_to_target[cell] = 0.0;
                closest[cell] = target[cell];
                mark[cell] = MARK_BORDER;
                border.push_back(cell);
            }
        }
    }

    while !border.is_empty() {
        let cell = border.pop_head();
        mark[cell] = MARK_DONE;

        let mut relax = |delta_d: f32,
                         cell: Cell,
                         neighbour: Cell,
                         distance_to_target: &mut DenseRaster<f32>,
                         closest: &mut DenseRaster<T>,
                         mark: &mut DenseRaster<u8>,
                         border: &mut FiLo<Cell>| {
            let alternative = distance_to_target[cell] + delta_d;
            if distance_to_target[neighbour] > alternative {
                distance_to_target[neighbour] = alternative;
                closest[neighbour] = closest[cell];
                if mark[neighbour] != MARK_BORDER {
                    mark[neighbour] = MARK_BORDER;
                    border.push_back(neighbour);
                }
            }
        };

        visit_straight_neighbours(cell, rows, cols, |neighbour| {
            relax(1.0, cell, neighbour, &mut distance_to_target, &mut closest, &mut mark, &mut border);
        });

        visit_diagonal_neighbours(cell, rows, cols, |neighbour| {
            relax(SQRT2, cell, neighbour, &mut distance_to_target, &mut closest, &mut mark, &mut border);
        });
    }

    Ok(closest)
}

/// The value of an accompanying raster at the closest target cell.
pub fn value_at_closest_target<TValue, TTarget>(
    target: &DenseRaster<TTarget>,
    value: &DenseRaster<TValue>,
) -> Result<DenseRaster<TValue>>
where
    TValue: ArrayNum,
    TTarget: ArrayNum,
{
    check_dimensions(target, value).map_err(|_| {
        Error::InvalidArgument("Target raster dimensions should match value raster dimensions".to_string())
    })?;

    let rows = target.rows().count();
    let cols = target.columns().count();
    let unreachable = (target.len() + 1) as f32;

    let mut value_at_closest = DenseRaster::<TValue>::try_filled_with(Some(TValue::zero()), value.metadata().clone())?;
    let mut distance_to_target =
        DenseRaster::<f32>::try_filled_with(Some(unreachable), scratch_metadata(target.size()))?;
    let mut mark = byte_raster(target.size(), MARK_TODO);
    let mut border = FiLo::sized_for(target.size());

    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if target.cell_is_nodata(cell) {
                continue;
            }

            if target[cell] != TTarget::zero() {
                distance_to_target[cell] = 0.0;
                value_at_closest.set_cell_value(cell, value.cell_value(cell));
                mark[cell] = MARK_BORDER;
                border.push_back(cell);
            }
        }
    }

    while !border.is_empty() {
        let cell = border.pop_head();
        mark[cell] = MARK_DONE;

        let mut relax = |delta_d: f32,
                         cell: Cell,
                         neighbour: Cell,
                         distance_to_target: &mut DenseRaster<f32>,
                         value_at_closest: &mut DenseRaster<TValue>,
                         mark: &mut DenseRaster<u8>,
                         border: &mut FiLo<Cell>| {
            let alternative = distance_to_target[cell] + delta_d;
            if distance_to_target[neighbour] > alternative {
                distance_to_target[neighbour] = alternative;
                value_at_closest[neighbour] = value_at_closest[cell];
                if mark[neighbour] != MARK_BORDER {
                    mark[neighbour] = MARK_BORDER;
                    border.push_back(neighbour);
                }
            }
        };

        visit_straight_neighbours(cell, rows, cols, |neighbour| {
            relax(1.0, cell, neighbour, &mut distance_to_target, &mut value_at_closest, &mut mark, &mut border);
        });

        visit_diagonal_neighbours(cell, rows, cols, |neighbour| {
            relax(SQRT2, cell, neighbour, &mut distance_to_target, &mut value_at_closest, &mut mark, &mut border);
        });
    }

    Ok(value_at_closest)
}

fn value_at_travel_target_impl<TValue, TTravel, TTarget>(
    target: &DenseRaster<TTarget>,
    travel_times: &DenseRaster<TTravel>,
    value: &DenseRaster<TValue>,
    unreachable: f32,
) -> Result<DenseRaster<TValue>>
where
    TValue: ArrayNum,
    TTravel: ArrayNum,
    TTarget: ArrayNum,
{
    check_dimensions(target, value).map_err(|_| {
        Error::InvalidArgument("Target, travel times and value map dimensions should be the same".to_string())
    })?;
    check_dimensions(target, travel_times).map_err(|_| {
        Error::InvalidArgument("Target, travel times and value map dimensions should be the same".to_string())
    })?;

    let rows = target.rows().count();
    let cols = target.columns().count();

    let mut value_at_closest = DenseRaster::<TValue>::try_filled_with(Some(TValue::zero()), value.metadata().clone())?;
    let mut distance_to_target = DenseRaster::<f32>::try_filled_with(Some(unreachable), value.metadata().with_nodata(Some(f64::NAN)))?;
    let mut mark = byte_raster(target.size(), MARK_TODO);
    let mut border = FiLo::sized_for(target.size());

    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if value.cell_is_nodata(cell) {
                value_at_closest.mark_as_nodata(cell);
                distance_to_target.mark_as_nodata(cell);
            } else if !target.cell_is_nodata(cell) && target[cell] != TTarget::zero() {
                distance_to_target[cell] = 0.0;
                value_at_closest[cell] = value[cell];
                mark[cell] = MARK_BORDER;
                border.push_back(cell);
            }
        }
    }

    while !border.is_empty() {
        let cell = border.pop_head();
        mark[cell] = MARK_DONE;

        let mut relax = |delta_d: f32,
                         cell: Cell,
                         neighbour: Cell,
                         distance_to_target: &mut DenseRaster<f32>,
                         value_at_closest: &mut DenseRaster<TValue>,
                         mark: &mut DenseRaster<u8>,
                         border: &mut FiLo<Cell>| {
            let step_time = travel_times[neighbour].to_f32().unwrap_or(f32::MAX);
            let alternative = distance_to_target[cell] + delta_d * step_time;
            if distance_to_target[neighbour] > alternative {
                distance_to_target[neighbour] = alternative;
                value_at_closest[neighbour] = value_at_closest[cell];
                if mark[neighbour] != MARK_BORDER {
                    mark[neighbour] = MARK_BORDER;
                    border.push_back(neighbour);
                }
            }
        };

        visit_straight_neighbours(cell, rows, cols, |neighbour| {
            relax(1.0, cell, neighbour, &mut distance_to_target, &mut value_at_closest, &mut mark, &mut border);
        });

        visit_diagonal_neighbours(cell, rows, cols, |neighbour| {
            relax(SQRT2, cell, neighbour, &mut distance_to_target, &mut value_at_closest, &mut mark, &mut border);
        });
    }

    Ok(value_at_closest)
}

/// The value of an accompanying raster at the target that is closest in
/// travel time.
pub fn value_at_closest_travel_target<TValue, TTravel, TTarget>(
    target: &DenseRaster<TTarget>,
    travel_times: &DenseRaster<TTravel>,
    value: &DenseRaster<TValue>,
) -> Result<DenseRaster<TValue>>
where
    TValue: ArrayNum,
    TTravel: ArrayNum,
    TTarget: ArrayNum,
{
    value_at_travel_target_impl(target, travel_times, value, f32::MAX)
}

/// As [`value_at_closest_travel_target`] but only propagates within the
/// given maximum travel time, cells further away keep 0.
pub fn value_at_closest_less_than_travel_target<TValue, TTravel, TTarget>(
    target: &DenseRaster<TTarget>,
    travel_times: &DenseRaster<TTravel>,
    max_travel_time: f32,
    value: &DenseRaster<TValue>,
) -> Result<DenseRaster<TValue>>
where
    TValue: ArrayNum,
    TTravel: ArrayNum,
    TTarget: ArrayNum,
{
    value_at_travel_target_impl(target, travel_times, value, max_travel_time)
}

fn relax_bounded_travel_cell<T: ArrayNum>(
    delta_d: f32,
    cell: Cell,
    new_cell: Cell,
    distance_to_target: &mut DenseRaster<f32>,
    mark: &mut DenseRaster<u8>,
    travel_time: &DenseRaster<T>,
    border: &mut FiLo<Cell>,
    touched: &mut Vec<Cell>,
) {
    if travel_time.cell_is_nodata(new_cell) {
        return;
    }

    // the step cost is the step length weighted with the mean resistance of
    // both endpoints
    let from_time = travel_time[cell].to_f32().unwrap_or(f32::MAX);
    let to_time = travel_time[new_cell].to_f32().unwrap_or(f32::MAX);
    let alternative = distance_to_target[cell] + delta_d / 2.0 * (from_time + to_time);

    if distance_to_target[new_cell] > alternative {
        distance_to_target[new_cell] = alternative;
        if mark[new_cell] != MARK_BORDER {
            if mark[new_cell] == MARK_TODO {
                touched.push(new_cell);
            }
            mark[new_cell] = MARK_BORDER;
            border.push_back(new_cell);
        }
    }
}

/// One bounded expansion from a mask cell. The scratch rasters come in
/// pristine (`distance` all unreachable, `mark` all todo, queue and cell
/// lists empty) and are restored to that state before returning, only the
/// touched cells are rewritten so the cost stays proportional to the
/// reachable area.
#[allow(clippy::too_many_arguments)]
fn compute_sum_within_distance<TTravel, TValue>(
    target_cell: Cell,
    travel_time: &DenseRaster<TTravel>,
    max_travel_time: f32,
    unreachable: f32,
    value_to_sum: &DenseRaster<TValue>,
    include_adjacent: bool,
    distance_to_target: &mut DenseRaster<f32>,
    mark: &mut DenseRaster<u8>,
    border: &mut FiLo<Cell>,
    touched: &mut Vec<Cell>,
    adjacent: &mut Vec<Cell>,
) -> f64
where
    TTravel: ArrayNum,
    TValue: ArrayNum,
{
    let rows = mark.rows().count();
    let cols = mark.columns().count();

    let mut sum = 0.0;

    distance_to_target[target_cell] = 0.0;
    if !travel_time.cell_is_nodata(target_cell) {
        border.push_back(target_cell);
        mark[target_cell] = MARK_BORDER;
    } else {
        mark[target_cell] = MARK_DONE;
    }
    touched.push(target_cell);

    while !border.is_empty() {
        let cell = border.pop_head();
        debug_assert!(mark[cell] == MARK_BORDER);
        mark[cell] = MARK_DONE;

        visit_straight_neighbours(cell, rows, cols, |neighbour| {
            relax_bounded_travel_cell(1.0, cell, neighbour, distance_to_target, mark, travel_time, border, touched);
        });

        visit_diagonal_neighbours(cell, rows, cols, |neighbour| {
            relax_bounded_travel_cell(SQRT2, cell, neighbour, distance_to_target, mark, travel_time, border, touched);
        });
    }

    // every touched cell lies within the travel budget, sum and restore the marks
    for &cell in touched.iter() {
        debug_assert!(distance_to_target[cell] <= max_travel_time);
        if let Some(v) = value_to_sum.cell_value(cell) {
            sum += v.to_f64().unwrap_or(0.0);
        }
        mark[cell] = MARK_TODO;
    }

    if include_adjacent {
        debug_assert!(adjacent.is_empty());
        for i in 0..touched.len() {
            let cell = touched[i];
            for neighbour in cell.straight_neighbours() {
                if neighbour.row < 0 || neighbour.row >= rows || neighbour.col < 0 || neighbour.col >= cols {
                    continue;
                }

                if distance_to_target[neighbour] > max_travel_time && mark[neighbour] == MARK_TODO {
                    if let Some(v) = value_to_sum.cell_value(neighbour) {
                        sum += v.to_f64().unwrap_or(0.0);
                    }
                    mark[neighbour] = MARK_DONE;
                    adjacent.push(neighbour);
                }
            }
        }
    }

    for &cell in touched.iter() {
        distance_to_target[cell] = unreachable;
    }

    for &cell in adjacent.iter() {
        mark[cell] = MARK_TODO;
    }

    touched.clear();
    adjacent.clear();
    sum
}

const PROGRESS_INTERVAL: Duration = Duration::from_secs(3);

/// For every non-zero mask cell: the sum of `value` over all cells reachable
/// within `max_resistance`, where moving between cells costs the step length
/// weighted with the mean resistance of both endpoints. With
/// `include_adjacent` the orthogonal neighbours of the reached area that were
/// themselves out of reach are added as well.
pub fn sum_within_travel_distance<TResult, TMask, TResistance, TValue>(
    mask: &DenseRaster<TMask>,
    resistance: &DenseRaster<TResistance>,
    value: &DenseRaster<TValue>,
    max_resistance: f32,
    include_adjacent: bool,
) -> Result<DenseRaster<TResult>>
where
    TResult: ArrayNum,
    TMask: ArrayNum,
    TResistance: ArrayNum,
    TValue: ArrayNum,
{
    check_dimensions(mask, resistance)
        .and_then(|()| check_dimensions(mask, value))
        .map_err(|_| Error::InvalidArgument("Mask, resistance and value map dimensions should be the same".to_string()))?;

    if max_resistance <= 0.0 {
        return Err(Error::InvalidArgument("Max resistance should be positive".to_string()));
    }

    for i in 0..resistance.len() {
        if resistance.value(i).is_some_and(|v| v < TResistance::zero()) {
            return Err(Error::InvalidArgument("Resistance may not be negative".to_string()));
        }
    }

    let rows = mask.rows().count();
    let cols = mask.columns().count();

    let mut result_meta = value.metadata().clone();
    if TResult::HAS_NAN {
        result_meta.set_nodata(Some(f64::NAN));
    }
    let mut result = DenseRaster::<TResult>::try_filled_with(Some(TResult::zero()), result_meta)?;

    let unreachable = max_resistance.next_up();
    let mut distance_to_target = DenseRaster::<f32>::try_filled_with(Some(unreachable), scratch_metadata(mask.size()))?;
    let mut mark = byte_raster(mask.size(), MARK_TODO);
    let mut border = FiLo::sized_for(mask.size());
    let mut touched = Vec::new();
    let mut adjacent = Vec::new();

    let start = Instant::now();
    let mut last_progress = start;

    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if !mask.cell_is_nodata(cell) && mask[cell] != TMask::zero() {
                let sum = compute_sum_within_distance(
                    cell,
                    resistance,
                    max_resistance,
                    unreachable,
                    value,
                    include_adjacent,
                    &mut distance_to_target,
                    &mut mark,
                    &mut border,
                    &mut touched,
                    &mut adjacent,
                );

                result[cell] = num::NumCast::from(sum).unwrap_or_else(TResult::zero);
            }
        }

        if last_progress.elapsed() > PROGRESS_INTERVAL {
            last_progress = Instant::now();
            let elapsed = start.elapsed();
            let expected_total = elapsed.mul_f64(f64::from(rows) / f64::from(r + 1));
            warn!(
                "sum_within_travel_distance processed {:.2}%, elapsed {}, expected total runtime {}",
                100.0 * f64::from(r + 1) / f64::from(rows),
                inf::duration::to_hms_string(elapsed),
                inf::duration::to_hms_string(expected_total)
            );
        }
    }

    Ok(result)
}

/// For every cell: the sum of the target values whose bounded travel
/// expansion reaches that cell.
pub fn sum_targets_within_travel_distance<TResult, TTarget, TResistance>(
    targets: &DenseRaster<TTarget>,
    resistance: &DenseRaster<TResistance>,
    max_resistance: f32,
) -> Result<DenseRaster<TResult>>
where
    TResult: ArrayNum,
    TTarget: ArrayNum,
    TResistance: ArrayNum,
{
    check_dimensions(targets, resistance)
        .map_err(|_| Error::InvalidArgument("Targets and resistance map dimensions should be the same".to_string()))?;

    if max_resistance <= 0.0 {
        return Err(Error::InvalidArgument("Max resistance should be positive".to_string()));
    }

    for i in 0..resistance.len() {
        if resistance.value(i).is_some_and(|v| v < TResistance::zero()) {
            return Err(Error::InvalidArgument("Resistance may not be negative".to_string()));
        }
    }

    let rows = targets.rows().count();
    let cols = targets.columns().count();
    let unreachable = max_resistance + 1.0;

    let mut result_meta = targets.metadata().clone();
    if TResult::HAS_NAN {
        result_meta.set_nodata(Some(f64::NAN));
    }
    let mut result = DenseRaster::<TResult>::try_filled_with(Some(TResult::zero()), result_meta)?;

    // large enough to never win a relaxation, small enough to avoid overflow
    // when two diagonal steps are added
    let four = TResistance::one() + TResistance::one() + TResistance::one() + TResistance::one();
    let resistance = replace_nodata(resistance, TResistance::max_value() / four);

    let mut distance_to_target = DenseRaster::<f32>::try_filled_with(Some(unreachable), scratch_metadata(targets.size()))?;
    let mut mark = byte_raster(targets.size(), MARK_TODO);
    let mut added = byte_raster(targets.size(), 0);
    let mut border = FiLo::sized_for(targets.size());

    for r in 0..rows {
        for c in 0..cols {
            let target_cell = Cell::from_row_col(r, c);
            let Some(target_value) = targets.cell_value(target_cell) else {
                continue;
            };
            if target_value == TTarget::zero() {
                continue;
            }

            distance_to_target.fill(unreachable);
            mark.fill(MARK_TODO);
            added.fill(0);
            debug_assert!(border.is_empty());

            distance_to_target[target_cell] = 0.0;
            if !resistance.cell_is_nodata(target_cell) {
                border.push_back(target_cell);
                mark[target_cell] = MARK_BORDER;
            } else {
                mark[target_cell] = MARK_DONE;
            }

            while !border.is_empty() {
                let cell = border.pop_head();
                debug_assert!(mark[cell] == MARK_BORDER);
                mark[cell] = MARK_DONE;

                if distance_to_target[cell] <= max_resistance && added[cell] == 0 {
                    result.add_to_cell(cell, num::NumCast::from(target_value).unwrap_or_else(TResult::zero));
                    added[cell] = 1;
                }

                visit_straight_neighbours(cell, rows, cols, |neighbour| {
                    relax_travel_cell(1.0, cell, neighbour, &mut distance_to_target, &mut mark, &resistance, &mut border);
                });

                visit_diagonal_neighbours(cell, rows, cols, |neighbour| {
                    relax_travel_cell(SQRT2, cell, neighbour, &mut distance_to_target, &mut mark, &resistance, &mut border);
                });
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_georeference;

    #[test]
    fn distance_to_targets() {
        #[rustfmt::skip]
        let targets = DenseRaster::<u8>::new(
            test_georeference(5, 10, Some(255.0)),
            vec![
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                1, 2, 0, 0, 0, 0, 0, 0, 0, 0,
                3, 0, 0, 1, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = DenseRaster::<f32>::new(
            targets.metadata().with_nodata(Some(f64::NAN)),
            vec![
                200.0, 200.0, 241.421, 282.843, 341.421, 382.843, 424.264, 524.264, 624.264, 724.264,
                100.0, 100.0, 141.421, 200.0, 241.421, 282.843, 382.843, 482.843, 582.843, 682.843,
                0.0, 0.0, 100.0, 100.0, 141.421, 241.421, 341.421, 441.421, 541.421, 641.421,
                0.0, 100.0, 100.0, 0.0, 100.0, 200.0, 300.0, 400.0, 500.0, 600.0,
                100.0, 141.421, 141.421, 100.0, 141.421, 241.421, 341.421, 441.421, 541.421, 641.421,
            ],
        )
        .unwrap();

        let actual = distance(&targets).unwrap();
        crate::assert_rasters_near!(expected, actual, 1e-3);
    }

    #[test]
    fn distance_is_zero_on_targets() {
        let targets = DenseRaster::<u8>::filled_with(Some(1), test_georeference(3, 3, Some(255.0)));
        let actual = distance(&targets).unwrap();
        assert!(actual.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn nodata_targets_propagate_as_nodata() {
        let targets = DenseRaster::<u8>::new(test_georeference(1, 3, Some(255.0)), vec![1, 255, 0]).unwrap();
        let actual = distance(&targets).unwrap();
        assert_eq!(actual.value(0), Some(0.0));
        assert_eq!(actual.value(1), None);
        // the nodata cell blocks the only route
        assert_eq!(actual.value(2), Some(f32::INFINITY));
    }

    #[test]
    fn barriers_shield_cells() {
        let meta = test_georeference(5, 10, Some(255.0));

        #[rustfmt::skip]
        let targets = DenseRaster::<u8>::new(
            meta.clone(),
            vec![
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                1, 2, 0, 0, 0, 0, 0, 0, 0, 0,
                3, 0, 0, 1, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let barriers = DenseRaster::<u8>::new(
            meta.clone(),
            vec![
                0, 0, 0, 0, 0, 0, 1, 0, 0, 0,
                1, 1, 1, 0, 0, 0, 1, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 1, 0, 0, 0,
                0, 0, 0, 1, 0, 0, 1, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            ],
        )
        .unwrap();

        let inf = f32::INFINITY;

        #[rustfmt::skip]
        let expected = DenseRaster::<f32>::new(
            meta.with_nodata(Some(f64::NAN)),
            vec![
                541.421, 441.421, 341.421, 300.0, 341.421, 382.843, inf, 782.843, 824.264, 865.685,
                inf, inf, inf, 200.0, 241.421, 282.843, inf, 682.843, 724.264, 765.685,
                0.0, 0.0, 100.0, 100.0, 141.421, 241.421, inf, 582.843, 624.264, 724.264,
                0.0, 100.0, 100.0, 0.0, 100.0, 200.0, inf, 482.843, 582.843, 682.843,
                100.0, 141.421, 141.421, 100.0, 141.421, 241.421, 341.421, 441.421, 541.421, 641.421,
            ],
        )
        .unwrap();

        let actual = distance_with_barriers(&targets, &barriers, BarrierDiagonals::Exclude).unwrap();
        crate::assert_rasters_near!(expected, actual, 1e-3);
    }

    #[test]
    fn travel_distance_accumulates_the_entered_cell_cost() {
        let meta = test_georeference(1, 3, Some(255.0));
        let targets = DenseRaster::<u8>::new(meta.clone(), vec![1, 0, 0]).unwrap();
        let travel_times = DenseRaster::<f32>::new(meta.with_nodata(Some(f64::NAN)), vec![1.0, 2.0, 4.0]).unwrap();

        let actual = travel_distance(&targets, &travel_times).unwrap();
        assert_eq!(actual.as_slice(), &[0.0, 2.0, 6.0]);
    }

    #[test]
    fn unreachable_travel_cells_are_nodata() {
        let meta = test_georeference(1, 3, Some(255.0));
        let targets = DenseRaster::<u8>::new(meta.clone(), vec![1, 0, 0]).unwrap();
        let travel_times = DenseRaster::<f32>::new(meta.with_nodata(Some(f64::NAN)), vec![1.0, f32::NAN, 4.0]).unwrap();

        let actual = travel_distance(&targets, &travel_times).unwrap();
        assert_eq!(actual.value(0), Some(0.0));
        assert_eq!(actual.value(1), None);
        assert_eq!(actual.value(2), Some(f32::MAX));
    }

    #[test]
    fn closest_target_carries_the_target_id() {
        let targets = DenseRaster::<i32>::new(test_georeference(1, 5, Some(-1.0)), vec![1, 0, 0, 0, 2]).unwrap();
        let actual = closest_target(&targets).unwrap();
        assert_eq!(actual.as_slice(), &[1, 1, 1, 2, 2]);
    }

    #[test]
    fn value_at_closest_target_carries_the_companion_value() {
        let meta = test_georeference(1, 3, Some(-1.0));
        let targets = DenseRaster::<i32>::new(meta.clone(), vec![1, 0, 2]).unwrap();
        let values = DenseRaster::<f32>::new(meta.with_nodata(Some(f64::NAN)), vec![7.0, 0.0, 9.0]).unwrap();

        let actual = value_at_closest_target(&targets, &values).unwrap();
        assert_eq!(actual.as_slice(), &[7.0, 7.0, 9.0]);
    }

    #[test_log::test]
    fn sum_within_travel_distance_matches_the_reference_output() {
        let meta = test_georeference(5, 4, Some(f64::NAN));

        let mask = DenseRaster::<u8>::filled_with(Some(1), test_georeference(5, 4, Some(255.0)));

        #[rustfmt::skip]
        let resistance = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                1.0, 1.0, 1.0, 1.0,
                1.0, 1.0, 9.0, 1.0,
                0.5, 0.5, 0.5, 0.5,
                1.0, 1.0, 1.0, 1.0,
                1.0, 1.0, 1.0, 1.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let value = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                1.0, 10.0, 1.0, 1.0,
                1.0, 10.0, 1.0, 1.0,
                1.0, 10.0, 1.0, 1.0,
                1.0, 10.0, 0.0, 1.0,
                1.0, 10.0, 1.0, 1.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                12.0, 22.0, 12.0, 3.0,
                13.0, 31.0, 1.0, 3.0,
                14.0, 33.0, 13.0, 14.0,
                13.0, 31.0, 13.0, 3.0,
                12.0, 22.0, 12.0, 3.0,
            ],
        )
        .unwrap();

        let actual = sum_within_travel_distance::<f32, _, _, _>(&mask, &resistance, &value, 1.01, false).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn sum_within_travel_distance_nan_resistance_blocks_expansion() {
        let meta = test_georeference(5, 4, Some(f64::NAN));

        let mask = DenseRaster::<u8>::filled_with(Some(1), test_georeference(5, 4, Some(255.0)));

        #[rustfmt::skip]
        let resistance = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                1.0, 1.0, 1.0, 1.0,
                1.0, 1.0, f32::NAN, 1.0,
                0.5, 0.5, 0.5, 0.5,
                1.0, 1.0, 1.0, 1.0,
                1.0, 1.0, 1.0, 1.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let value = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                1.0, 10.0, 1.0, 1.0,
                1.0, 10.0, 1.0, 1.0,
                1.0, 10.0, 1.0, 1.0,
                1.0, 10.0, f32::NAN, 1.0,
                1.0, 10.0, 1.0, 1.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                12.0, 22.0, 12.0, 3.0,
                13.0, 31.0, 1.0, 3.0,
                14.0, 33.0, 13.0, 14.0,
                13.0, 31.0, 13.0, 3.0,
                12.0, 22.0, 12.0, 3.0,
            ],
        )
        .unwrap();

        let actual = sum_within_travel_distance::<f32, _, _, _>(&mask, &resistance, &value, 1.01, false).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn sum_within_travel_distance_with_adjacent_cells() {
        let meta = test_georeference(5, 4, Some(f64::NAN));

        let mask = DenseRaster::<u8>::filled_with(Some(1), test_georeference(5, 4, Some(255.0)));

        #[rustfmt::skip]
        let resistance = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                1.0, 1.0, 1.0, 1.0,
                1.0, 1.0, 9.0, 1.0,
                0.5, 0.5, 0.5, 0.5,
                1.0, 1.0, 1.0, 1.0,
                1.0, 1.0, 1.0, 1.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let value = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                1.0, 10.0, 1.0, 1.0,
                1.0, 10.0, 1.0, 1.0,
                1.0, 10.0, 1.0, 1.0,
                1.0, 10.0, 0.0, 1.0,
                1.0, 10.0, 1.0, 1.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                24.0, 35.0, 25.0, 15.0,
                35.0, 46.0, 14.0, 7.0,
                38.0, 58.0, 39.0, 38.0,
                34.0, 46.0, 37.0, 16.0,
                24.0, 34.0, 25.0, 14.0,
            ],
        )
        .unwrap();

        let actual = sum_within_travel_distance::<f32, _, _, _>(&mask, &resistance, &value, 1.01, true).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn sum_within_travel_distance_expansion_follows_the_cheap_corridor() {
        let meta = test_georeference(5, 10, Some(f64::NAN));

        #[rustfmt::skip]
        let mask = DenseRaster::<u8>::new(
            test_georeference(5, 10, Some(255.0)),
            vec![
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                1, 1, 0, 0, 0, 0, 0, 0, 0, 0,
                1, 0, 0, 1, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let resistance = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 1.0, 1.0,
                9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 1.0, 9.0, 1.0,
                1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 9.0, 9.0, 1.0,
                9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 1.0,
                9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 1.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let value = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0,
                20.0, 21.0, 22.0, 23.0, 24.0, 25.0, 26.0, 27.0, 28.0, 29.0,
                30.0, 31.0, 32.0, 33.0, 34.0, 35.0, 36.0, 37.0, 38.0, 39.0,
                40.0, 41.0, 42.0, 43.0, 44.0, 45.0, 46.0, 47.0, 48.0, 49.0,
                50.0, 51.0, 52.0, 53.0, 54.0, 55.0, 56.0, 57.0, 58.0, 59.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = DenseRaster::<f32>::new(
            meta.clone(),
            vec![
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                685.0, 823.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                346.0, 0.0, 0.0, 463.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            ],
        )
        .unwrap();

        let actual = sum_within_travel_distance::<f32, _, _, _>(&mask, &resistance, &value, 10.0001, false).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn negative_resistance_is_an_argument_error() {
        let meta = test_georeference(1, 2, Some(f64::NAN));
        let mask = DenseRaster::<u8>::filled_with(Some(1), test_georeference(1, 2, Some(255.0)));
        let resistance = DenseRaster::<f32>::new(meta.clone(), vec![1.0, -2.0]).unwrap();
        let value = DenseRaster::<f32>::new(meta, vec![1.0, 1.0]).unwrap();

        assert!(matches!(
            sum_within_travel_distance::<f32, _, _, _>(&mask, &resistance, &value, 1.0, false),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            sum_within_travel_distance::<f32, _, _, _>(&mask, &resistance, &value, 0.0, false),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn scratch_rasters_are_restored_between_expansions() {
        // two mask cells, identical local situations must give identical sums
        let meta = test_georeference(3, 7, Some(f64::NAN));

        #[rustfmt::skip]
        let mask = DenseRaster::<u8>::new(
            test_georeference(3, 7, Some(255.0)),
            vec![
                0, 0, 0, 0, 0, 0, 0,
                0, 1, 0, 0, 0, 1, 0,
                0, 0, 0, 0, 0, 0, 0,
            ],
        )
        .unwrap();

        let resistance = DenseRaster::<f32>::filled_with(Some(1.0), meta.clone());
        let value = DenseRaster::<f32>::filled_with(Some(2.0), meta.clone());

        let actual = sum_within_travel_distance::<f32, _, _, _>(&mask, &resistance, &value, 1.01, false).unwrap();
        assert_eq!(actual.cell_value(Cell::from_row_col(1, 1)), actual.cell_value(Cell::from_row_col(1, 5)));
    }

    #[test]
    fn sum_targets_within_travel_distance_accumulates_target_values() {
        let meta = test_georeference(1, 5, Some(f64::NAN));
        let targets = DenseRaster::<i32>::new(test_georeference(1, 5, Some(-1.0)), vec![2, 0, 0, 0, 3]).unwrap();
        let resistance = DenseRaster::<f32>::filled_with(Some(1.0), meta);

        let actual = sum_targets_within_travel_distance::<f32, _, _>(&targets, &resistance, 2.01).unwrap();
        // both targets reach the middle cell, each end cell only sees its own target
        assert_eq!(actual.as_slice(), &[2.0, 2.0, 5.0, 3.0, 3.0]);
    }
}
