//! Kernels over local drain direction (LDD) rasters.
//!
//! An LDD is a byte raster whose cells carry a direction code 1-9 naming the
//! neighbour the water flows to, keypad style:
//!
//! ```text
//!  7 8 9
//!  4 5 6    5 = pit (sink), 0 = nodata
//!  1 2 3
//! ```

use std::collections::VecDeque;

use log::warn;
use num::ToPrimitive;

use crate::{raster::check_dimensions, Array, ArrayMetadata, ArrayNum, Cell, DenseRaster, Error, Result};

/// The direction a cell drains to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FlowDirection {
    SouthWest = 1,
    South = 2,
    SouthEast = 3,
    West = 4,
    Pit = 5,
    East = 6,
    NorthWest = 7,
    North = 8,
    NorthEast = 9,
}

impl FlowDirection {
    pub fn from_code(code: u8) -> Option<FlowDirection> {
        match code {
            1 => Some(FlowDirection::SouthWest),
            2 => Some(FlowDirection::South),
            3 => Some(FlowDirection::SouthEast),
            4 => Some(FlowDirection::West),
            5 => Some(FlowDirection::Pit),
            6 => Some(FlowDirection::East),
            7 => Some(FlowDirection::NorthWest),
            8 => Some(FlowDirection::North),
            9 => Some(FlowDirection::NorthEast),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Row and column offset of the neighbour the water flows to.
    pub fn offset(self) -> (i32, i32) {
        match self {
            FlowDirection::SouthWest => (1, -1),
            FlowDirection::South => (1, 0),
            FlowDirection::SouthEast => (1, 1),
            FlowDirection::West => (0, -1),
            FlowDirection::Pit => (0, 0),
            FlowDirection::East => (0, 1),
            FlowDirection::NorthWest => (-1, -1),
            FlowDirection::North => (-1, 0),
            FlowDirection::NorthEast => (-1, 1),
        }
    }

    pub fn is_pit(self) -> bool {
        self == FlowDirection::Pit
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            FlowDirection::SouthWest | FlowDirection::SouthEast | FlowDirection::NorthWest | FlowDirection::NorthEast
        )
    }

    /// Step length in cell units: 1 for straight moves, √2 for diagonal moves.
    pub fn step_length(self) -> f32 {
        if self.is_pit() {
            0.0
        } else if self.is_diagonal() {
            std::f32::consts::SQRT_2
        } else {
            1.0
        }
    }
}

/// The flow direction of a cell, `None` for nodata cells, the zero code and
/// invalid direction values.
fn flow_direction(ldd: &DenseRaster<u8>, cell: Cell) -> Option<FlowDirection> {
    if ldd.cell_is_nodata(cell) {
        return None;
    }

    match ldd[cell] {
        0 => None,
        code => FlowDirection::from_code(code),
    }
}

/// The cell the water flows to, `None` for pits and flow paths that end in a
/// nodata cell or outside of the map.
fn downstream_cell(ldd: &DenseRaster<u8>, cell: Cell) -> Option<Cell> {
    let direction = flow_direction(ldd, cell)?;
    if direction.is_pit() {
        return None;
    }

    let (dr, dc) = direction.offset();
    let next = cell.offset(dr, dc);
    if !ldd.metadata().is_cell_on_map(next) || flow_direction(ldd, next).is_none() {
        return None;
    }

    Some(next)
}

/// Problem callbacks of the LDD validation, every field may be left empty.
#[derive(Default)]
pub struct LddProblemCallbacks<'a> {
    pub on_loop: Option<&'a mut dyn FnMut(Cell)>,
    pub on_invalid_value: Option<&'a mut dyn FnMut(Cell)>,
    pub on_ends_in_nodata: Option<&'a mut dyn FnMut(Cell)>,
    pub on_outside_of_map: Option<&'a mut dyn FnMut(Cell)>,
}

fn notify(callback: &mut Option<&mut dyn FnMut(Cell)>, cell: Cell) {
    if let Some(cb) = callback {
        cb(cell);
    }
}

const WALK_UNSEEN: u8 = 0;
const WALK_ON_PATH: u8 = 1;
const WALK_DONE: u8 = 2;

/// Walk every flow path and report direction values outside of {0, 1..9},
/// directions that step outside the map or into a nodata cell, and cells that
/// participate in a loop. Returns true when no problem was found.
pub fn validate_ldd(ldd: &DenseRaster<u8>, callbacks: &mut LddProblemCallbacks) -> bool {
    let cols = ldd.columns().count();
    let mut state = vec![WALK_UNSEEN; ldd.len()];
    let mut path = Vec::new();
    let mut valid = true;

    for index in 0..ldd.len() {
        if state[index] != WALK_UNSEEN {
            continue;
        }

        path.clear();
        let mut cell = Cell::from_index(index, cols);

        loop {
            let cur = cell.index_in_raster(cols);
            if state[cur] == WALK_DONE {
                break;
            }

            if state[cur] == WALK_ON_PATH {
                // the walk re-entered its own path
                notify(&mut callbacks.on_loop, cell);
                valid = false;
                break;
            }

            state[cur] = WALK_ON_PATH;
            path.push(cur);

            if ldd.cell_is_nodata(cell) || ldd[cell] == 0 {
                break;
            }

            let direction = match FlowDirection::from_code(ldd[cell]) {
                Some(direction) => direction,
                None => {
                    notify(&mut callbacks.on_invalid_value, cell);
                    valid = false;
                    break;
                }
            };

            if direction.is_pit() {
                break;
            }

            let (dr, dc) = direction.offset();
            let next = cell.offset(dr, dc);
            if !ldd.metadata().is_cell_on_map(next) {
                notify(&mut callbacks.on_outside_of_map, cell);
                valid = false;
                break;
            }

            if ldd.cell_is_nodata(next) || ldd[next] == 0 {
                notify(&mut callbacks.on_ends_in_nodata, cell);
                valid = false;
                break;
            }

            cell = next;
        }

        for &visited in &path {
            state[visited] = WALK_DONE;
        }
    }

    if !valid {
        warn!("LDD raster validation found problems");
    }

    valid
}

/// Repair an LDD: invalid direction codes, directions that step outside the
/// map or into a nodata cell, and one cell of every loop become pits. The
/// result validates clean.
pub fn fix_ldd(ldd: &DenseRaster<u8>) -> DenseRaster<u8> {
    let mut result = ldd.clone();
    let cols = result.columns().count();

    for index in 0..result.len() {
        let cell = Cell::from_index(index, cols);
        if result.index_is_nodata(index) || result[index] == 0 {
            continue;
        }

        match FlowDirection::from_code(result[index]) {
            None => result[index] = FlowDirection::Pit.code(),
            Some(direction) => {
                if direction.is_pit() {
                    continue;
                }

                let (dr, dc) = direction.offset();
                let next = cell.offset(dr, dc);
                if !result.metadata().is_cell_on_map(next) || result.cell_is_nodata(next) || result[next] == 0 {
                    result[index] = FlowDirection::Pit.code();
                }
            }
        }
    }

    // break the remaining loops by turning the loop entry cells into pits
    let mut state = vec![WALK_UNSEEN; result.len()];
    let mut path = Vec::new();
    for index in 0..result.len() {
        if state[index] != WALK_UNSEEN {
            continue;
        }

        path.clear();
        let mut cell = Cell::from_index(index, cols);
        loop {
            let cur = cell.index_in_raster(cols);
            if state[cur] == WALK_DONE {
                break;
            }

            if state[cur] == WALK_ON_PATH {
                result[cur] = FlowDirection::Pit.code();
                break;
            }

            state[cur] = WALK_ON_PATH;
            path.push(cur);

            match downstream_cell(&result, cell) {
                Some(next) => cell = next,
                None => break,
            }
        }

        for &visited in &path {
            state[visited] = WALK_DONE;
        }
    }

    result
}

fn ldd_data_cell(ldd: &DenseRaster<u8>, cell: Cell) -> bool {
    !ldd.cell_is_nodata(cell) && ldd[cell] != 0
}

/// Topological relaxation over the flow field: cells are processed once all
/// their upstream dependencies are resolved, `resolve` combines the resolved
/// cell with its downstream neighbour. A cycle is a fatal runtime error.
fn topological_visit(
    ldd: &DenseRaster<u8>,
    mut resolve: impl FnMut(Cell, Option<Cell>),
) -> Result {
    let cols = ldd.columns().count();

    let mut in_degree = vec![0u32; ldd.len()];
    let mut data_cells = 0usize;

    for index in 0..ldd.len() {
        let cell = Cell::from_index(index, cols);
        if !ldd_data_cell(ldd, cell) {
            continue;
        }

        data_cells += 1;
        if let Some(next) = downstream_cell(ldd, cell) {
            in_degree[next.index_in_raster(cols)] += 1;
        }
    }

    let mut queue = VecDeque::new();
    for index in 0..ldd.len() {
        let cell = Cell::from_index(index, cols);
        if ldd_data_cell(ldd, cell) && in_degree[index] == 0 {
            queue.push_back(cell);
        }
    }

    let mut resolved = 0usize;
    while let Some(cell) = queue.pop_front() {
        resolved += 1;

        let downstream = downstream_cell(ldd, cell);
        resolve(cell, downstream);

        if let Some(next) = downstream {
            let next_index = next.index_in_raster(cols);
            in_degree[next_index] -= 1;
            if in_degree[next_index] == 0 {
                queue.push_back(next);
            }
        }
    }

    if resolved != data_cells {
        return Err(Error::Runtime("Loop detected in ldd".to_string()));
    }

    Ok(())
}

fn flux_result_nodata<T: ArrayNum>(freight: &DenseRaster<T>) -> Option<f64> {
    match freight.metadata().nodata() {
        Some(nod) => crate::nodata::nodata_cast_opt::<f32>(Some(nod)),
        None => Some(f64::NAN),
    }
}

/// Per cell the sum of the freight over every cell whose flow path reaches
/// it, the cell itself included. Nodata freight or drain direction cells
/// propagate nodata downstream.
pub fn accuflux<T: ArrayNum>(ldd: &DenseRaster<u8>, freight: &DenseRaster<T>) -> Result<DenseRaster<f32>> {
    check_dimensions(ldd, freight)?;

    let meta = freight.metadata().with_nodata(flux_result_nodata(freight));
    let mut result = DenseRaster::<f32>::try_filled_with(Some(0.0), meta)?;

    for i in 0..result.len() {
        let cell = Cell::from_index(i, result.columns().count());
        if !ldd_data_cell(ldd, cell) || freight.index_is_nodata(i) {
            result.mark_index_as_nodata(i);
        } else {
            result[i] = freight[i].to_f32().unwrap_or(0.0);
        }
    }

    topological_visit(ldd, |cell, downstream| {
        if let Some(next) = downstream {
            if result.cell_is_nodata(cell) {
                result.mark_as_nodata(next);
            } else if !result.cell_is_nodata(next) {
                let flux = result[cell];
                result[next] += flux;
            }
        }
    })?;

    Ok(result)
}

/// Like [`accuflux`] but every cell sends only `fraction` of its accumulated
/// freight downstream, the reported value is the outgoing flux.
pub fn accufractionflux<T, F>(
    ldd: &DenseRaster<u8>,
    freight: &DenseRaster<T>,
    fraction: &DenseRaster<F>,
) -> Result<DenseRaster<f32>>
where
    T: ArrayNum,
    F: ArrayNum,
{
    check_dimensions(ldd, freight)?;
    check_dimensions(ldd, fraction)?;

    let meta = freight.metadata().with_nodata(flux_result_nodata(freight));
    let mut result = DenseRaster::<f32>::try_filled_with(Some(0.0), meta)?;

    for i in 0..result.len() {
        let cell = Cell::from_index(i, result.columns().count());
        if !ldd_data_cell(ldd, cell) || freight.index_is_nodata(i) || fraction.index_is_nodata(i) {
            result.mark_index_as_nodata(i);
        } else {
            result[i] = freight[i].to_f32().unwrap_or(0.0);
        }
    }

    topological_visit(ldd, |cell, downstream| {
        if !result.cell_is_nodata(cell) {
            // the accumulated inflow is replaced by the outgoing flux
            let fraction_value = fraction[cell].to_f32().unwrap_or(0.0);
            let flux = result[cell] * fraction_value;
            result[cell] = flux;
        }

        if let Some(next) = downstream {
            if result.cell_is_nodata(cell) {
                result.mark_as_nodata(next);
            } else if !result.cell_is_nodata(next) {
                let flux = result[cell];
                result[next] += flux;
            }
        }
    })?;

    Ok(result)
}

/// For every cell: the part of its own freight that reaches the first
/// station on its downstream path, under the fraction recurrence of
/// [`accufractionflux`]. Cells that drain to no station carry 0.
pub fn flux_origin<T, F>(
    ldd: &DenseRaster<u8>,
    freight: &DenseRaster<T>,
    fraction: &DenseRaster<F>,
    station_id: &DenseRaster<i32>,
) -> Result<DenseRaster<f32>>
where
    T: ArrayNum,
    F: ArrayNum,
{
    check_dimensions(ldd, freight)?;
    check_dimensions(ldd, fraction)?;
    check_dimensions(ldd, station_id)?;

    let cols = ldd.columns().count();
    let meta = freight.metadata().with_nodata(Some(f64::NAN));
    let mut result = DenseRaster::<f32>::try_filled_with(Some(0.0), meta)?;

    let is_station = |cell: Cell| station_id.cell_value(cell).is_some_and(|id| id > 0);

    for index in 0..ldd.len() {
        let origin = Cell::from_index(index, cols);
        if !ldd_data_cell(ldd, origin) || freight.index_is_nodata(index) || fraction.index_is_nodata(index) {
            result.mark_index_as_nodata(index);
            continue;
        }

        let mut flux = freight[index].to_f32().unwrap_or(0.0) * fraction[index].to_f32().unwrap_or(0.0);
        if is_station(origin) {
            result[index] = flux;
            continue;
        }

        let mut cur = origin;
        let mut steps = 0usize;
        loop {
            match downstream_cell(ldd, cur) {
                None => break, // drains to no station
                Some(next) => {
                    if is_station(next) {
                        result[index] = flux;
                        break;
                    }

                    if fraction.cell_is_nodata(next) {
                        break;
                    }

                    flux *= fraction[next].to_f32().unwrap_or(0.0);
                    cur = next;
                }
            }

            steps += 1;
            if steps > ldd.len() {
                return Err(Error::Runtime("Loop detected in ldd".to_string()));
            }
        }
    }

    Ok(result)
}

/// The station map's nodata is kept, the drain direction nodata is not
/// inherited: its sentinel is typically 0, which would collide with the
/// "drains to no station" label.
fn station_result_metadata<M: ArrayMetadata>(station_meta: &M) -> M {
    station_meta.with_nodata(crate::nodata::nodata_cast_opt::<i32>(station_meta.nodata()))
}

fn downstream_walk_labels(
    ldd: &DenseRaster<u8>,
    station_id: &DenseRaster<i32>,
    own_station_wins: bool,
) -> Result<DenseRaster<i32>> {
    check_dimensions(ldd, station_id)?;

    let cols = ldd.columns().count();
    let meta = station_result_metadata(station_id.metadata());
    let mut result = DenseRaster::<i32>::try_filled_with(Some(0), meta)?;

    let mut state = vec![WALK_UNSEEN; ldd.len()];
    let mut labels = vec![0i32; ldd.len()];
    let mut path = Vec::new();

    for index in 0..ldd.len() {
        let start = Cell::from_index(index, cols);
        if !ldd_data_cell(ldd, start) {
            if result.metadata().nodata().is_some() {
                result.mark_index_as_nodata(index);
            }
            state[index] = WALK_DONE;
            continue;
        }

        if state[index] == WALK_DONE {
            continue;
        }

        path.clear();
        let mut cell = start;
        let mut down_label = loop {
            let cur = cell.index_in_raster(cols);
            if state[cur] == WALK_DONE {
                break labels[cur];
            }

            if state[cur] == WALK_ON_PATH {
                return Err(Error::Runtime("Loop detected in ldd".to_string()));
            }

            state[cur] = WALK_ON_PATH;
            path.push(cur);

            match downstream_cell(ldd, cell) {
                Some(next) => cell = next,
                None => break 0,
            }
        };

        for &cur in path.iter().rev() {
            let own = station_id.value(cur).filter(|&id| id > 0).unwrap_or(0);
            let label = if own_station_wins {
                // the first station on the downstream path
                if own != 0 {
                    own
                } else {
                    down_label
                }
            } else {
                // the last station before the pit
                if down_label != 0 {
                    down_label
                } else {
                    own
                }
            };

            labels[cur] = label;
            state[cur] = WALK_DONE;
            down_label = label;
        }
    }

    for index in 0..ldd.len() {
        if !result.index_is_nodata(index) {
            result[index] = labels[index];
        }
    }

    Ok(result)
}

/// Label every cell with the station id of the most downstream station on
/// its flow path, the id of the catchment outlet it drains to.
pub fn catchment(ldd: &DenseRaster<u8>, station_id: &DenseRaster<i32>) -> Result<DenseRaster<i32>> {
    downstream_walk_labels(ldd, station_id, false)
}

/// Label every cell with the id of the first station encountered along its
/// downstream path, cells draining to no station carry 0.
pub fn ldd_cluster(ldd: &DenseRaster<u8>, station_id: &DenseRaster<i32>) -> Result<DenseRaster<i32>> {
    downstream_walk_labels(ldd, station_id, true)
}

/// Accumulated friction weighted distance along the flow path to the nearest
/// downstream cell where `points` is positive. Every step adds the step
/// length scaled by the cell size multiplied with the friction of the
/// downstream cell. Paths that cross nodata or reach no point are nodata.
pub fn ldd_dist<TPoints, TFriction>(
    ldd: &DenseRaster<u8>,
    points: &DenseRaster<TPoints>,
    friction: &DenseRaster<TFriction>,
) -> Result<DenseRaster<f32>>
where
    TPoints: ArrayNum,
    TFriction: ArrayNum,
{
    check_dimensions(ldd, points)?;
    check_dimensions(ldd, friction)?;

    let cols = ldd.columns().count();
    let cell_size = ldd.metadata().cell_size_x().abs() as f32;

    let meta = points.metadata().with_nodata(Some(f64::NAN));
    let mut result = DenseRaster::<f32>::try_filled_with(Some(0.0), meta)?;

    let mut state = vec![WALK_UNSEEN; ldd.len()];
    let mut values = vec![0.0f32; ldd.len()];
    let mut path = Vec::new();

    let terminal_value = |cell: Cell, index: usize| -> Option<f32> {
        if !ldd_data_cell(ldd, cell) || points.index_is_nodata(index) || friction.index_is_nodata(index) {
            return Some(f32::NAN);
        }

        if points[index].to_f32().unwrap_or(0.0) > 0.0 {
            return Some(0.0);
        }

        None
    };

    for index in 0..ldd.len() {
        if state[index] == WALK_DONE {
            continue;
        }

        path.clear();
        let mut cell = Cell::from_index(index, cols);
        let mut down_value = loop {
            let cur = cell.index_in_raster(cols);
            if state[cur] == WALK_DONE {
                break values[cur];
            }

            if state[cur] == WALK_ON_PATH {
                return Err(Error::Runtime("Loop detected in ldd".to_string()));
            }

            if let Some(value) = terminal_value(cell, cur) {
                state[cur] = WALK_DONE;
                values[cur] = value;
                break value;
            }

            state[cur] = WALK_ON_PATH;
            path.push(cur);

            match downstream_cell(ldd, cell) {
                Some(next) => cell = next,
                None => break f32::NAN, // pit or dangling path without point
            }
        };

        for &cur in path.iter().rev() {
            let cur_cell = Cell::from_index(cur, cols);
            let value = if down_value.is_nan() {
                f32::NAN
            } else {
                let direction = flow_direction(ldd, cur_cell).expect("walked cells have a direction");
                let next = downstream_cell(ldd, cur_cell).expect("walked cells have a downstream cell");
                let friction_value = friction[next].to_f32().unwrap_or(f32::NAN);
                down_value + direction.step_length() * cell_size * friction_value
            };

            values[cur] = value;
            state[cur] = WALK_DONE;
            down_value = value;
        }
    }

    for index in 0..result.len() {
        if values[index].is_nan() {
            result.mark_index_as_nodata(index);
        } else {
            result[index] = values[index];
        }
    }

    Ok(result)
}

fn longest_upstream_path<TFriction: ArrayNum>(
    ldd: &DenseRaster<u8>,
    friction: Option<&DenseRaster<TFriction>>,
) -> Result<DenseRaster<f32>> {
    let cols = ldd.columns().count();
    let cell_size = ldd.metadata().cell_size_x().abs() as f32;

    let meta = ldd.metadata().with_nodata(Some(f64::NAN));
    let mut result = DenseRaster::<f32>::try_filled_with(Some(0.0), meta)?;

    for index in 0..result.len() {
        let cell = Cell::from_index(index, cols);
        if !ldd_data_cell(ldd, cell) {
            result.mark_index_as_nodata(index);
        }
    }

    topological_visit(ldd, |cell, downstream| {
        let Some(next) = downstream else { return };

        if result.cell_is_nodata(cell) {
            return;
        }

        let weight = match friction {
            None => 1.0,
            Some(friction) => match friction.cell_value(next) {
                Some(f) => f.to_f32().unwrap_or(f32::NAN),
                None => {
                    result.mark_as_nodata(next);
                    return;
                }
            },
        };

        if result.cell_is_nodata(next) {
            return;
        }

        let direction = flow_direction(ldd, cell).expect("resolved cells have a direction");
        let candidate = result[cell] + direction.step_length() * cell_size * weight;
        if candidate > result[next] {
            result[next] = candidate;
        }
    })?;

    Ok(result)
}

/// The longest upstream flow path length per cell, in cell size scaled step
/// units. Source cells without upstream neighbours carry 0.
pub fn max_upstream_dist(ldd: &DenseRaster<u8>) -> Result<DenseRaster<f32>> {
    longest_upstream_path::<f32>(ldd, None)
}

/// The longest accumulated friction cost from any upstream source, every
/// step weighted with the friction of the entered cell.
pub fn slope_length<TFriction: ArrayNum>(
    ldd: &DenseRaster<u8>,
    friction: &DenseRaster<TFriction>,
) -> Result<DenseRaster<f32>> {
    check_dimensions(ldd, friction)?;
    longest_upstream_path(ldd, Some(friction))
}
