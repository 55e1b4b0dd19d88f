use std::collections::BTreeMap;

use crate::{
    algo::clusterutils::{
        handle_cluster_cell, insert_cell, insert_cluster_cell, visit_diagonal_neighbours, visit_straight_neighbours,
        warn_if_clustering_on_floats, ClusterDiagonals, CLUSTER_NODATA, MARK_BORDER, MARK_DONE, MARK_TODO,
    },
    raster::check_dimensions,
    Array, ArrayMetadata, ArrayNum, Cell, DenseArray, DenseRaster, Error, FiLo, Result,
};

fn cluster_result_metadata<Metadata: ArrayMetadata>(meta: &Metadata) -> Metadata {
    match meta.nodata() {
        Some(_) => meta.with_nodata(Some(CLUSTER_NODATA)),
        None => meta.clone(),
    }
}

fn mark_raster<Metadata: ArrayMetadata>(meta: &Metadata, fill: u8) -> DenseArray<u8, Metadata> {
    DenseArray::filled_with(Some(fill), Metadata::sized_with_nodata(meta.size(), None))
}

/// Label the connected components of cells sharing the same non-zero value.
/// Labels are assigned in scan order starting at 1, zero cells map to 0 and
/// nodata stays nodata.
pub fn cluster_id<T, Metadata>(ras: &DenseArray<T, Metadata>, diagonals: ClusterDiagonals) -> Result<DenseArray<i32, Metadata>>
where
    T: ArrayNum,
    Metadata: ArrayMetadata,
{
    warn_if_clustering_on_floats::<T>();

    let rows = ras.rows().count();
    let cols = ras.columns().count();

    let mut result = DenseArray::<i32, Metadata>::try_filled_with(Some(0), cluster_result_metadata(ras.metadata()))?;
    let mut mark = mark_raster(ras.metadata(), MARK_TODO);
    let mut cluster_cells = Vec::new();
    let mut border = FiLo::sized_for(ras.size());

    let mut cluster_id = 0;
    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if ras.cell_is_nodata(cell) {
                result.mark_as_nodata(cell);
                continue;
            }

            if ras[cell] == T::zero() {
                result[cell] = 0;
            } else if ras[cell] > T::zero() && mark[cell] == MARK_TODO {
                cluster_id += 1;

                cluster_cells.clear();
                border.clear();

                let cluster_value = ras[cell];
                insert_cluster_cell(cell, &mut cluster_cells, &mut mark, &mut border);

                while !border.is_empty() {
                    let cur = border.pop_head();

                    visit_straight_neighbours(cur, rows, cols, |neighbour| {
                        handle_cluster_cell(neighbour, cluster_value, &mut cluster_cells, &mut mark, &mut border, ras);
                    });

                    if diagonals == ClusterDiagonals::Include {
                        visit_diagonal_neighbours(cur, rows, cols, |neighbour| {
                            handle_cluster_cell(neighbour, cluster_value, &mut cluster_cells, &mut mark, &mut border, ras);
                        });
                    }
                }

                for &cluster_cell in &cluster_cells {
                    mark[cluster_cell] = MARK_DONE;
                    result[cluster_cell] = cluster_id;
                }
            }
        }
    }

    Ok(result)
}

/// Fuzzy clustering: two cells belong to the same cluster when they are
/// within the given euclidean distance of each other, even without being
/// direct neighbours.
pub fn fuzzy_cluster_id<T: ArrayNum>(ras: &DenseRaster<T>, radius_in_meter: f32) -> Result<DenseRaster<i32>> {
    warn_if_clustering_on_floats::<T>();

    let rows = ras.rows().count();
    let cols = ras.columns().count();

    let radius = radius_in_meter / ras.metadata().cell_size_x() as f32;
    let radius_in_cells = radius as i32;
    let radius2 = (radius * radius) as i32;

    let mut result = DenseRaster::<i32>::try_filled_with(Some(0), cluster_result_metadata(ras.metadata()))?;
    let mut mark = mark_raster(ras.metadata(), MARK_DONE);

    for i in 0..ras.len() {
        if ras.index_is_nodata(i) {
            mark[i] = MARK_DONE;
            result.mark_index_as_nodata(i);
            continue;
        }

        if ras[i] > T::zero() {
            mark[i] = MARK_TODO;
        } else {
            result[i] = 0;
        }
    }

    let mut cluster_id = 0;
    let mut border = FiLo::sized_for(ras.size());

    for r in 0..rows {
        for c in 0..cols {
            if mark[Cell::from_row_col(r, c)] != MARK_TODO {
                continue;
            }

            cluster_id += 1;
            border.clear();
            border.push_back(Cell::from_row_col(r, c));
            mark[Cell::from_row_col(r, c)] = MARK_BORDER;

            while !border.is_empty() {
                let cell = border.pop_head();
                mark[cell] = MARK_DONE;
                result[cell] = cluster_id;

                let r0 = (cell.row - radius_in_cells).max(0);
                let c0 = (cell.col - radius_in_cells).max(0);
                let r1 = (cell.row + radius_in_cells).min(rows - 1);
                let c1 = (cell.col + radius_in_cells).min(cols - 1);

                for rr in r0..=r1 {
                    let dr = rr - cell.row;
                    let dr2 = dr * dr;

                    for cc in c0..=c1 {
                        let candidate = Cell::from_row_col(rr, cc);
                        if mark[candidate] == MARK_TODO {
                            let dc = cc - cell.col;
                            if dr2 + dc * dc <= radius2 {
                                mark[candidate] = MARK_BORDER;
                                border.push_back(candidate);
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(result)
}

fn handle_obstacle_cell_straight<Metadata: ArrayMetadata>(
    cell: Cell,
    cat_map: &DenseArray<i32, Metadata>,
    cluster_value: i32,
    obstacle_map: &DenseArray<u8, Metadata>,
    mark: &mut DenseArray<u8, Metadata>,
    border: &mut FiLo<Cell>,
) {
    if cat_map[cell] == cluster_value && mark[cell] == MARK_TODO && obstacle_map[cell] == 0 {
        insert_cell(cell, mark, border);
    }
}

/// A diagonal move is allowed only when the wall is not closed: at least one
/// of the two cells across the corner must be free of obstacles.
fn handle_obstacle_cell_diag<Metadata: ArrayMetadata>(
    old_cell: Cell,
    cell: Cell,
    cat_map: &DenseArray<i32, Metadata>,
    cluster_value: i32,
    obstacle_map: &DenseArray<u8, Metadata>,
    mark: &mut DenseArray<u8, Metadata>,
    border: &mut FiLo<Cell>,
) {
    if cat_map[cell] == cluster_value && mark[cell] == MARK_TODO {
        let corner1 = Cell::from_row_col(old_cell.row, cell.col);
        let corner2 = Cell::from_row_col(cell.row, old_cell.col);
        if obstacle_map[cell] == 0 && (obstacle_map[corner1] == 0 || obstacle_map[corner2] == 0) {
            insert_cell(cell, mark, border);
        }
    }
}

/// Assign an obstacle cell to the neighbouring cluster with the most
/// neighbours in the 3x3 neighbourhood. Frequency ties break toward the
/// smallest cluster by cell count. Obstacle cells without clustered
/// neighbour become 0 with data status.
fn compute_cluster_id_of_obstacle_cell<Metadata: ArrayMetadata>(
    cell: Cell,
    cluster_id_map: &mut DenseArray<i32, Metadata>,
    obstacle_map: &DenseArray<u8, Metadata>,
    cluster_size: &mut [i32],
) {
    let rows = cluster_id_map.rows().count();
    let cols = cluster_id_map.columns().count();

    let mut neighbour_counts: BTreeMap<i32, i32> = BTreeMap::new();
    for r in (cell.row - 1)..=(cell.row + 1) {
        for c in (cell.col - 1)..=(cell.col + 1) {
            if r < 0 || r >= rows || c < 0 || c >= cols {
                continue;
            }

            let neighbour = Cell::from_row_col(r, c);
            if obstacle_map.cell_is_nodata(neighbour) || obstacle_map[neighbour] == 0 {
                let cluster_id = cluster_id_map[neighbour];
                if cluster_id > 0 && !cluster_id_map.cell_is_nodata(neighbour) {
                    *neighbour_counts.entry(cluster_id).or_insert(0) += 1;
                }
            }
        }
    }

    let mut best: Option<(i32, i32)> = None; // (cluster id, neighbour count)
    for (&cluster_id, &count) in &neighbour_counts {
        match best {
            None => best = Some((cluster_id, count)),
            Some((best_id, best_count)) => {
                if count > best_count {
                    best = Some((cluster_id, count));
                } else if count == best_count && cluster_size[best_id as usize] > cluster_size[cluster_id as usize] {
                    best = Some((cluster_id, count));
                }
            }
        }
    }

    match best {
        Some((cluster_id, _)) => {
            cluster_id_map[cell] = cluster_id;
            cluster_size[cluster_id as usize] += 1;
        }
        None => {
            if !obstacle_map.cell_is_nodata(cell) && obstacle_map[cell] > 0 {
                cluster_id_map[cell] = 0;
            }
        }
    }
}

/// 8-connected components over the positive category cells that are not
/// obstacles. Diagonal moves through a closed obstacle corner are forbidden.
/// Obstacle cells are retroactively assigned to the neighbouring component
/// with the most neighbours.
pub fn cluster_id_with_obstacles<Metadata: ArrayMetadata>(
    cat_map: &DenseArray<i32, Metadata>,
    obstacle_map: &DenseArray<u8, Metadata>,
) -> Result<DenseArray<i32, Metadata>> {
    check_dimensions(cat_map, obstacle_map).map_err(|_| {
        Error::InvalidArgument("Category and obstacle map dimensions should be the same".to_string())
    })?;

    let rows = cat_map.rows().count();
    let cols = cat_map.columns().count();

    let result_meta = cluster_result_metadata(cat_map.metadata());
    let mut result = DenseArray::<i32, Metadata>::try_filled_with(Some(CLUSTER_NODATA as i32), result_meta)?;
    let mut mark = mark_raster(cat_map.metadata(), MARK_TODO);

    let mut cluster_id = 0;
    let mut border = FiLo::sized_for(cat_map.size());
    let mut cluster_size = vec![0i32; cat_map.len() + 1];

    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if cat_map.cell_is_nodata(cell) || obstacle_map.cell_is_nodata(cell) {
                continue;
            }

            if cat_map[cell] > 0 && mark[cell] == MARK_TODO && obstacle_map[cell] == 0 {
                cluster_id += 1;
                border.clear();
                let cluster_value = cat_map[cell];
                insert_cell(cell, &mut mark, &mut border);

                while !border.is_empty() {
                    let cur = border.pop_head();
                    mark[cur] = MARK_DONE;
                    result[cur] = cluster_id;
                    cluster_size[cluster_id as usize] += 1;

                    visit_straight_neighbours(cur, rows, cols, |neighbour| {
                        handle_obstacle_cell_straight(neighbour, cat_map, cluster_value, obstacle_map, &mut mark, &mut border);
                    });

                    visit_diagonal_neighbours(cur, rows, cols, |neighbour| {
                        handle_obstacle_cell_diag(cur, neighbour, cat_map, cluster_value, obstacle_map, &mut mark, &mut border);
                    });
                }
            }
        }
    }

    // give the cells under obstacles a cluster id
    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if cat_map.cell_is_nodata(cell) || obstacle_map.cell_is_nodata(cell) {
                continue;
            }

            if cat_map[cell] > 0 && obstacle_map[cell] > 0 {
                compute_cluster_id_of_obstacle_cell(cell, &mut result, obstacle_map, &mut cluster_size);
            }
        }
    }

    Ok(result)
}

fn is_blocked<Metadata: ArrayMetadata>(from: Cell, diagonal: bool, to: Cell, obstacles: &DenseArray<u8, Metadata>) -> bool {
    if diagonal {
        obstacles[to] != 0
            || (obstacles[Cell::from_row_col(from.row, to.col)] != 0 && obstacles[Cell::from_row_col(to.row, from.col)] != 0)
    } else {
        obstacles[to] != 0
    }
}

/// Walk the straight path between two cells one row/column step at a time and
/// report whether an obstacle blocks the route.
fn is_blocked_path<Metadata: ArrayMetadata>(from: Cell, to: Cell, obstacles: &DenseArray<u8, Metadata>) -> bool {
    let mut row = from.row;
    let mut col = from.col;

    while row != to.row || col != to.col {
        let dr = (to.row - row).clamp(-1, 1);
        let dc = (to.col - col).clamp(-1, 1);
        let diagonal = dr.abs() + dc.abs() > 1;

        let next = Cell::from_row_col(row + dr, col + dc);
        if next == to {
            return is_blocked(Cell::from_row_col(row, col), diagonal, next, obstacles);
        }

        if is_blocked(Cell::from_row_col(row, col), diagonal, next, obstacles) {
            return true;
        }

        row += dr;
        col += dc;
    }

    false
}

#[allow(clippy::too_many_arguments)]
fn grow_fuzzy_obstacle_cluster(
    seed: Cell,
    items: &DenseRaster<i32>,
    background_id: &DenseRaster<i32>,
    obstacles: &DenseRaster<u8>,
    rows: i32,
    cols: i32,
    radius: f32,
    cluster_id: i32,
    mark: &mut DenseRaster<u8>,
    border: &mut FiLo<Cell>,
    result: &mut DenseRaster<i32>,
) {
    debug_assert!(mark[seed] == MARK_TODO);
    debug_assert!(border.is_empty());
    mark[seed] = MARK_BORDER;
    border.push_back(seed);

    let reach = (radius + 0.5) as i32;
    let radius2 = (radius * radius) as i32;

    while !border.is_empty() {
        let cell = border.pop_head();
        debug_assert!(mark[cell] == MARK_BORDER);
        mark[cell] = MARK_DONE;
        result[cell] = cluster_id;

        let r0 = (cell.row - reach).max(0);
        let c0 = (cell.col - reach).max(0);
        let r1 = (cell.row + reach).min(rows - 1);
        let c1 = (cell.col + reach).min(cols - 1);

        for rr in r0..=r1 {
            for cc in c0..=c1 {
                let dr = rr - cell.row;
                let dc = cc - cell.col;
                if dr * dr + dc * dc > radius2 {
                    continue;
                }

                let candidate = Cell::from_row_col(rr, cc);
                if items[candidate] == items[seed]
                    && background_id[candidate] == background_id[seed]
                    && mark[candidate] == MARK_TODO
                    && !is_blocked_path(cell, candidate, obstacles)
                {
                    // scan order wins: the first cluster that reaches a cell claims it
                    mark[candidate] = MARK_BORDER;
                    border.push_back(candidate);
                }
            }
        }
    }
}

/// Fuzzy clustering with obstacles: cells within the radius belong to the
/// same cluster when the straight path between them is not blocked by an
/// obstacle and both drain from the same obstacle-free background region.
pub fn fuzzy_cluster_id_with_obstacles(
    items: &DenseRaster<i32>,
    obstacles: &DenseRaster<u8>,
    radius_in_meter: f32,
) -> Result<DenseRaster<i32>> {
    check_dimensions(items, obstacles)?;

    let ones = DenseRaster::<i32>::try_filled_with(Some(1), items.metadata().clone())?;
    let background_id = cluster_id_with_obstacles(&ones, obstacles)?;

    let rows = items.rows().count();
    let cols = items.columns().count();
    let radius = radius_in_meter / items.metadata().cell_size_x() as f32;

    let result_meta = cluster_result_metadata(items.metadata());
    let mut result = DenseRaster::<i32>::try_filled_with(Some(CLUSTER_NODATA as i32), result_meta)?;
    let mut mark = mark_raster(items.metadata(), MARK_TODO);
    let mut border = FiLo::sized_for(items.size());

    let mut cluster_id = 1;
    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if items.cell_is_nodata(cell) {
                mark[cell] = MARK_DONE;
                result.mark_as_nodata(cell);
                continue;
            }

            if items[cell] > 0 && mark[cell] == MARK_TODO {
                if obstacles[cell] != 0 {
                    mark[cell] = MARK_DONE;
                    result[cell] = cluster_id;
                } else {
                    grow_fuzzy_obstacle_cluster(
                        cell,
                        items,
                        &background_id,
                        obstacles,
                        rows,
                        cols,
                        radius,
                        cluster_id,
                        &mut mark,
                        &mut border,
                        &mut result,
                    );
                }
                cluster_id += 1;
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{test_georeference, test_metadata};

    #[test_log::test]
    fn cluster_id_labels_are_assigned_in_scan_order() {
        #[rustfmt::skip]
        let raster = DenseArray::<f32>::new(
            test_metadata(5, 4, None),
            vec![
                1.0, 1.0, 1.0, 1.0,
                1.0, 1.0, 2.0, 3.0,
                3.0, 3.0, 3.0, 3.0,
                1.0, 1.0, 5.0, 5.0,
                1.0, 1.0, 5.0, 1.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = DenseArray::<i32>::new(
            test_metadata(5, 4, None),
            vec![
                1, 1, 1, 1,
                1, 1, 2, 3,
                3, 3, 3, 3,
                4, 4, 5, 5,
                4, 4, 5, 6,
            ],
        )
        .unwrap();

        assert_eq!(expected, cluster_id(&raster, ClusterDiagonals::Exclude).unwrap());
    }

    #[test]
    fn cluster_id_border_values() {
        #[rustfmt::skip]
        let raster = DenseArray::<i32>::new(
            test_metadata(5, 4, None),
            vec![
                1, 2, 3, 4,
                2, 9, 9, 5,
                3, 9, 9, 6,
                4, 9, 9, 7,
                5, 6, 7, 8,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = DenseArray::<i32>::new(
            test_metadata(5, 4, None),
            vec![
                1, 2, 3, 4,
                5, 6, 6, 7,
                8, 6, 6, 9,
                10, 6, 6, 11,
                12, 13, 14, 15,
            ],
        )
        .unwrap();

        assert_eq!(expected, cluster_id(&raster, ClusterDiagonals::Exclude).unwrap());
    }

    #[test]
    fn cluster_id_diagonals_included() {
        #[rustfmt::skip]
        let raster = DenseArray::<i32>::new(
            test_metadata(3, 3, None),
            vec![
                1, 0, 1,
                0, 1, 0,
                1, 0, 1,
            ],
        )
        .unwrap();

        let result = cluster_id(&raster, ClusterDiagonals::Include).unwrap();
        assert!(result.as_slice().iter().all(|&v| v <= 1));

        let result = cluster_id(&raster, ClusterDiagonals::Exclude).unwrap();
        #[rustfmt::skip]
        assert_eq!(result.as_slice(), &[
            1, 0, 2,
            0, 3, 0,
            4, 0, 5,
        ]);
    }

    #[test]
    fn nodata_cells_stay_nodata() {
        #[rustfmt::skip]
        let raster = DenseArray::<i32>::new(
            test_metadata(2, 2, Some(-1.0)),
            vec![
                1, -1,
                1, 0,
            ],
        )
        .unwrap();

        let result = cluster_id(&raster, ClusterDiagonals::Exclude).unwrap();
        assert_eq!(result.metadata().nodata(), Some(-9999.0));
        assert_eq!(result.masked_data(), vec![Some(1), None, Some(1), Some(0)]);
    }

    #[test]
    fn fuzzy_clusters_bridge_the_radius() {
        #[rustfmt::skip]
        let raster = DenseRaster::<f32>::new(
            test_georeference(10, 10, None),
            vec![
                1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0,
                1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
                1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0,
                1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
                1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = DenseRaster::<i32>::new(
            raster.metadata().clone(),
            vec![
                1, 1, 1, 1, 1, 0, 0, 0, 0, 0,
                1, 1, 0, 1, 0, 0, 2, 0, 2, 0,
                1, 0, 0, 1, 0, 0, 0, 2, 0, 0,
                1, 0, 1, 1, 0, 0, 2, 0, 2, 0,
                1, 1, 1, 1, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 3,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 4, 0,
                5, 0, 6, 0, 7, 0, 8, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            ],
        )
        .unwrap();

        let result = fuzzy_cluster_id(&raster, 142.0).unwrap();
        assert_eq!(expected, result);
    }

    #[test]
    fn obstacle_cells_are_assigned_to_the_dominant_neighbour_cluster() {
        #[rustfmt::skip]
        let categories = DenseArray::<i32>::new(
            test_metadata(4, 4, Some(-1.0)),
            vec![
                1, 1, 0, 2,
                1, 1, 0, 2,
                0, 0, 0, 2,
                2, 2, 2, 2,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let obstacles = DenseArray::<u8>::new(
            test_metadata(4, 4, Some(255.0)),
            vec![
                0, 0, 0, 0,
                0, 1, 0, 0,
                0, 0, 0, 0,
                0, 0, 0, 0,
            ],
        )
        .unwrap();

        let result = cluster_id_with_obstacles(&categories, &obstacles).unwrap();

        #[rustfmt::skip]
        let expected = DenseArray::<i32>::new(
            result.metadata().clone(),
            vec![
                1, 1, -9999, 2,
                1, 1, -9999, 2,
                -9999, -9999, -9999, 2,
                2, 2, 2, 2,
            ],
        )
        .unwrap();

        assert_eq!(expected, result);
    }

    #[test]
    fn obstacle_tie_breaks_toward_the_smallest_cluster() {
        #[rustfmt::skip]
        let categories = DenseArray::<i32>::new(
            test_metadata(3, 4, Some(-1.0)),
            vec![
                1, 1, 1, 1,
                1, 9, 2, 0,
                2, 2, 2, 0,
            ],
        )
        .unwrap();

        #[rustfmt::skip]
        let obstacles = DenseArray::<u8>::new(
            test_metadata(3, 4, Some(255.0)),
            vec![
                0, 0, 0, 0,
                0, 1, 0, 0,
                0, 0, 0, 0,
            ],
        )
        .unwrap();

        let result = cluster_id_with_obstacles(&categories, &obstacles).unwrap();

        // both clusters touch the obstacle with 4 neighbours, cluster 2 is smaller
        #[rustfmt::skip]
        let expected = DenseArray::<i32>::new(
            result.metadata().clone(),
            vec![
                1, 1, 1, 1,
                1, 2, 2, -9999,
                2, 2, 2, -9999,
            ],
        )
        .unwrap();

        assert_eq!(expected, result);
    }

    #[test]
    fn isolated_obstacle_cells_become_zero_with_data_status() {
        let categories = DenseArray::<i32>::new(test_metadata(1, 1, Some(-1.0)), vec![5]).unwrap();
        let obstacles = DenseArray::<u8>::new(test_metadata(1, 1, Some(255.0)), vec![1]).unwrap();

        let result = cluster_id_with_obstacles(&categories, &obstacles).unwrap();
        assert_eq!(result.masked_data(), vec![Some(0)]);
    }

    #[test]
    fn fuzzy_obstacle_clusters_respect_blocked_paths() {
        let meta = test_georeference(1, 5, Some(-1.0));
        let items = DenseRaster::<i32>::new(meta.clone(), vec![1, 1, 0, 1, 1]).unwrap();
        let obstacles = DenseRaster::<u8>::new(
            test_georeference(1, 5, Some(255.0)),
            vec![0, 0, 1, 0, 0],
        )
        .unwrap();

        let result = fuzzy_cluster_id_with_obstacles(&items, &obstacles, 300.0).unwrap();
        // the obstacle wall separates the two pairs even though they are within the radius,
        // the leftmost cluster claims its cells first
        assert_eq!(result.masked_data(), vec![Some(1), Some(1), None, Some(2), Some(2)]);
    }

    #[test]
    fn fuzzy_obstacle_item_cells_form_their_own_cluster() {
        let items = DenseRaster::<i32>::new(test_georeference(1, 3, Some(-1.0)), vec![1, 1, 1]).unwrap();
        let obstacles = DenseRaster::<u8>::new(test_georeference(1, 3, Some(255.0)), vec![0, 1, 0]).unwrap();

        let result = fuzzy_cluster_id_with_obstacles(&items, &obstacles, 150.0).unwrap();
        assert_eq!(result.masked_data(), vec![Some(1), Some(2), Some(3)]);
    }
}
