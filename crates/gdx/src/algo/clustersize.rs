use num::NumCast;

use crate::{
    algo::clusterutils::{
        handle_cluster_cell, insert_cluster_cell, visit_diagonal_neighbours, visit_straight_neighbours,
        warn_if_clustering_on_floats, ClusterDiagonals, CLUSTER_NODATA, MARK_DONE, MARK_TODO,
    },
    raster::check_dimensions,
    Array, ArrayMetadata, ArrayNum, Cell, DenseArray, FiLo, Result,
};

fn cluster_scan<T, TResult, Metadata>(
    ras: &DenseArray<T, Metadata>,
    diagonals: ClusterDiagonals,
    mut cluster_value_fn: impl FnMut(&[Cell]) -> TResult,
) -> Result<DenseArray<TResult, Metadata>>
where
    T: ArrayNum,
    TResult: ArrayNum,
    Metadata: ArrayMetadata,
{
    warn_if_clustering_on_floats::<T>();

    let rows = ras.rows().count();
    let cols = ras.columns().count();

    let result_meta = match ras.metadata().nodata() {
        Some(_) => ras.metadata().with_nodata(Some(CLUSTER_NODATA)),
        None => ras.metadata().clone(),
    };

    let mut result = DenseArray::<TResult, Metadata>::try_filled_with(Some(TResult::zero()), result_meta)?;
    let mut mark = DenseArray::<u8, Metadata>::filled_with(Some(MARK_TODO), Metadata::sized_with_nodata(ras.size(), None));
    let mut cluster_cells = Vec::new();
    let mut border = FiLo::sized_for(ras.size());

    for r in 0..rows {
        for c in 0..cols {
            let cell = Cell::from_row_col(r, c);
            if ras.cell_is_nodata(cell) {
                result.mark_as_nodata(cell);
                continue;
            }

            if ras[cell] == T::zero() {
                result[cell] = TResult::zero();
            } else if ras[cell] > T::zero() && mark[cell] == MARK_TODO {
                cluster_cells.clear();
                border.clear();

                let cluster_value = ras[cell];
                insert_cluster_cell(cell, &mut cluster_cells, &mut mark, &mut border);

                while !border.is_empty() {
                    let cur = border.pop_head();
                    mark[cur] = MARK_DONE;

                    visit_straight_neighbours(cur, rows, cols, |neighbour| {
                        handle_cluster_cell(neighbour, cluster_value, &mut cluster_cells, &mut mark, &mut border, ras);
                    });

                    if diagonals == ClusterDiagonals::Include {
                        visit_diagonal_neighbours(cur, rows, cols, |neighbour| {
                            handle_cluster_cell(neighbour, cluster_value, &mut cluster_cells, &mut mark, &mut border, ras);
                        });
                    }
                }

                let value = cluster_value_fn(&cluster_cells);
                for &cluster_cell in &cluster_cells {
                    result[cluster_cell] = value;
                }
            }
        }
    }

    Ok(result)
}

/// Per cell the number of cells in the connected component it belongs to.
/// Cells outside of a component keep 0.
pub fn cluster_size<T, Metadata>(ras: &DenseArray<T, Metadata>, diagonals: ClusterDiagonals) -> Result<DenseArray<i32, Metadata>>
where
    T: ArrayNum,
    Metadata: ArrayMetadata,
{
    cluster_scan(ras, diagonals, |cells| cells.len() as i32)
}

/// Per cell the sum of a companion raster over the connected component the
/// cell belongs to, broadcast to every cell of the component.
pub fn cluster_sum<TResult, T, TSum, Metadata>(
    ras: &DenseArray<T, Metadata>,
    value_to_sum: &DenseArray<TSum, Metadata>,
    diagonals: ClusterDiagonals,
) -> Result<DenseArray<TResult, Metadata>>
where
    TResult: ArrayNum,
    T: ArrayNum,
    TSum: ArrayNum,
    Metadata: ArrayMetadata,
{
    check_dimensions(ras, value_to_sum)?;

    cluster_scan(ras, diagonals, |cells| {
        let mut sum = TResult::zero();
        for &cell in cells {
            if let Some(v) = value_to_sum.cell_value(cell) {
                sum = sum + NumCast::from(v).unwrap_or_else(TResult::zero);
            }
        }
        sum
    })
}
