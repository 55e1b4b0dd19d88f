use log::warn;

use crate::{Array as _, ArrayMetadata, ArrayNum, Cell, DenseArray, FiLo};

pub(crate) const MARK_TODO: u8 = 0;
pub(crate) const MARK_BORDER: u8 = 1;
pub(crate) const MARK_DONE: u8 = 2;

/// Nodata value of cluster id rasters, cannot clash with an assigned id.
pub(crate) const CLUSTER_NODATA: f64 = -9999.0;

/// Whether diagonally adjacent cells belong to the same cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterDiagonals {
    Include,
    Exclude,
}

pub(crate) fn visit_straight_neighbours(cell: Cell, rows: i32, cols: i32, mut callable: impl FnMut(Cell)) {
    if cell.col < cols - 1 {
        callable(cell.right());
    }

    if cell.col > 0 {
        callable(cell.left());
    }

    if cell.row < rows - 1 {
        callable(cell.below());
    }

    if cell.row > 0 {
        callable(cell.above());
    }
}

pub(crate) fn visit_diagonal_neighbours(cell: Cell, rows: i32, cols: i32, mut callable: impl FnMut(Cell)) {
    let top = cell.row == 0;
    let bottom = cell.row == rows - 1;
    let left = cell.col == 0;
    let right = cell.col == cols - 1;

    if !(bottom || right) {
        callable(cell.below_right());
    }

    if !(top || right) {
        callable(cell.above_right());
    }

    if !(bottom || left) {
        callable(cell.below_left());
    }

    if !(top || left) {
        callable(cell.above_left());
    }
}

pub(crate) fn insert_cell<Metadata: ArrayMetadata>(
    cell: Cell,
    mark: &mut DenseArray<u8, Metadata>,
    border: &mut FiLo<Cell>,
) {
    mark[cell] = MARK_BORDER;
    border.push_back(cell);
}

pub(crate) fn insert_cluster_cell<Metadata: ArrayMetadata>(
    cell: Cell,
    cluster_cells: &mut Vec<Cell>,
    mark: &mut DenseArray<u8, Metadata>,
    border: &mut FiLo<Cell>,
) {
    insert_cell(cell, mark, border);
    cluster_cells.push(cell);
}

/// Grow the cluster with the neighbour when it carries the cluster value and
/// has not been visited yet.
pub(crate) fn handle_cluster_cell<T: ArrayNum, Metadata: ArrayMetadata>(
    cell: Cell,
    cluster_value: T,
    cluster_cells: &mut Vec<Cell>,
    mark: &mut DenseArray<u8, Metadata>,
    border: &mut FiLo<Cell>,
    raster: &DenseArray<T, Metadata>,
) {
    if raster.cell_is_nodata(cell) {
        return;
    }

    if raster[cell] == cluster_value && mark[cell] == MARK_TODO {
        insert_cluster_cell(cell, cluster_cells, mark, border);
    }
}

pub(crate) fn warn_if_clustering_on_floats<T: ArrayNum>() {
    if T::HAS_NAN {
        warn!("Performing cluster operation on floating point raster");
    }
}
