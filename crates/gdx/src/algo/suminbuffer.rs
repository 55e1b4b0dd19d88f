use num::{NumCast, ToPrimitive};

use crate::{algo::nodata::replace_nodata, Array, ArrayMetadata, ArrayNum, Cell, DenseRaster, Error, Result};

/// Shape of the buffer around each cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStyle {
    Circular,
    Square,
}

/// Summed-area table: cell (r, c) holds the sum of all cells above and to
/// the left of it, inclusive. Enables O(1) rectangle sums.
pub fn compute_integral_image<T: ArrayNum>(image: &DenseRaster<T>) -> DenseRaster<f64> {
    let rows = image.rows().count();
    let cols = image.columns().count();

    let mut summed_area = DenseRaster::<f64>::filled_with(Some(0.0), image.metadata().with_nodata(None));
    if image.is_empty() {
        return summed_area;
    }

    let at = |ras: &DenseRaster<T>, r: i32, c: i32| ras[Cell::from_row_col(r, c)].to_f64().unwrap_or(0.0);

    summed_area[Cell::from_row_col(0, 0)] = at(image, 0, 0);

    for c in 1..cols {
        summed_area[Cell::from_row_col(0, c)] = summed_area[Cell::from_row_col(0, c - 1)] + at(image, 0, c);
    }

    for r in 1..rows {
        summed_area[Cell::from_row_col(r, 0)] = summed_area[Cell::from_row_col(r - 1, 0)] + at(image, r, 0);
    }

    for r in 1..rows {
        let mut row_sum = at(image, r, 0);
        for c in 1..cols {
            row_sum += at(image, r, c);
            summed_area[Cell::from_row_col(r, c)] = row_sum + summed_area[Cell::from_row_col(r - 1, c)];
        }
    }

    summed_area
}

/// Sum over the rectangle (r0..r1] x (c0..c1] read from the integral image,
/// the exclusive upper left corner may lie outside of the raster.
fn sum_within_rectangle(mut r0: i32, mut c0: i32, mut r1: i32, mut c1: i32, integral: &DenseRaster<f64>) -> f64 {
    let rows = integral.rows().count();
    let cols = integral.columns().count();

    r0 = r0.min(rows - 1);
    c0 = c0.min(cols - 1);
    r1 = r1.min(rows - 1);
    c1 = c1.min(cols - 1);

    let at = |r: i32, c: i32| {
        if r >= 0 && c >= 0 {
            integral[Cell::from_row_col(r, c)]
        } else {
            0.0
        }
    };

    at(r1, c1) + at(r0, c0) - at(r0, c1) - at(r1, c0)
}

fn sum_within_rectangle_around(r: i32, c: i32, radius: i32, integral: &DenseRaster<f64>) -> f64 {
    sum_within_rectangle(r - radius - 1, c - radius - 1, r + radius, c + radius, integral)
}

/// Relative cell offsets entering and leaving a disk shaped window when it
/// slides one cell to the right or down.
fn circle_border_offsets(radius: i32) -> (Vec<Cell>, Vec<Cell>, Vec<Cell>, Vec<Cell>) {
    let mut plus_right = Vec::new();
    let mut min_left = Vec::new();
    let mut plus_down = Vec::new();
    let mut min_top = Vec::new();

    let radius2 = radius * radius;
    for d in -radius..=radius {
        let width = <f64 as From<i32>>::from(radius2 - d * d).sqrt().floor() as i32;
        plus_right.push(Cell::from_row_col(d, width));
        min_left.push(Cell::from_row_col(d, -width - 1));
        plus_down.push(Cell::from_row_col(width, d));
        min_top.push(Cell::from_row_col(-width - 1, d));
    }

    (plus_right, min_left, plus_down, min_top)
}

fn sum_in_cells<T: ArrayNum>(row: i32, col: i32, src: &DenseRaster<T>, cells: &[Cell]) -> f64 {
    let rows = src.rows().count();
    let cols = src.columns().count();

    let mut result = 0.0;
    for offset in cells {
        let r = row + offset.row;
        let c = col + offset.col;
        if r >= 0 && r < rows && c >= 0 && c < cols {
            result += src[Cell::from_row_col(r, c)].to_f64().unwrap_or(0.0);
        }
    }

    result
}

struct SlidingCircle {
    prev_sum: f64,
    prev_row: i32,
    prev_col: i32,
    plus_right: Vec<Cell>,
    min_left: Vec<Cell>,
    plus_down: Vec<Cell>,
    min_top: Vec<Cell>,
}

impl SlidingCircle {
    fn new(radius: i32) -> Self {
        let (plus_right, min_left, plus_down, min_top) = circle_border_offsets(radius);
        SlidingCircle {
            prev_sum: 0.0,
            prev_row: -radius + 1,
            prev_col: -radius + 1,
            plus_right,
            min_left,
            plus_down,
            min_top,
        }
    }

    /// Sum of the disk around (row, col): incremental when the window moved
    /// one step right or down, a full disk scan otherwise. The integral image
    /// provides a fast reject when the surrounding square holds no values.
    fn sum_within_circle<T: ArrayNum>(
        &mut self,
        row: i32,
        col: i32,
        radius: i32,
        src: &DenseRaster<T>,
        integral: &DenseRaster<f64>,
    ) -> f64 {
        let mut this_sum = 0.0;

        if sum_within_rectangle_around(row, col, radius, integral) == 0.0 {
            // nothing inside the surrounding square
        } else if self.prev_col + 1 == col && self.prev_row == row {
            this_sum = self.prev_sum;
            this_sum += sum_in_cells(row, col, src, &self.plus_right);
            this_sum -= sum_in_cells(row, col, src, &self.min_left);
        } else if self.prev_row + 1 == row && self.prev_col == col {
            this_sum = self.prev_sum;
            this_sum += sum_in_cells(row, col, src, &self.plus_down);
            this_sum -= sum_in_cells(row, col, src, &self.min_top);
        } else {
            let rows = src.rows().count();
            let cols = src.columns().count();
            let radius2 = radius * radius;

            for dr in -radius..=radius {
                let r = row + dr;
                if r < 0 || r >= rows {
                    continue;
                }

                for dc in -radius..=radius {
                    let c = col + dc;
                    if c >= 0 && c < cols && dr * dr + dc * dc <= radius2 {
                        this_sum += src[Cell::from_row_col(r, c)].to_f64().unwrap_or(0.0);
                    }
                }
            }
        }

        self.prev_row = row;
        self.prev_col = col;
        self.prev_sum = this_sum;

        this_sum
    }
}

/// Sum of the cells inside the buffer around every cell. A square buffer is
/// served directly from the integral image, a circular buffer slides a disk
/// shaped window over the raster. Nodata cells count as 0.
pub fn sum_in_buffer<T: ArrayNum>(ras: &DenseRaster<T>, radius_in_meter: f32, style: BufferStyle) -> Result<DenseRaster<T>> {
    let cell_size = ras.metadata().cell_size_x() as f32;
    if cell_size <= 0.0 {
        return Err(Error::InvalidArgument("Buffer radius requires a valid cell size".to_string()));
    }

    let src = replace_nodata(ras, T::zero());

    let radius_in_cells = radius_in_meter / cell_size;
    let mut radius = radius_in_cells as i32;
    if style == BufferStyle::Square {
        // choose the square that covers the same area as the circle with the
        // given radius: pi r^2 = (R+1+R)^2, rounded this gives R = int(r.sqrt(pi)/2)
        radius = (<f64 as From<i32>>::from(radius) * std::f64::consts::PI.sqrt() / 2.0) as i32;
    }

    let rows = ras.rows().count();
    let cols = ras.columns().count();

    let mut result = DenseRaster::<T>::try_filled_with(Some(T::zero()), ras.metadata().clone())?;
    let integral = compute_integral_image(&src);
    let mut window = SlidingCircle::new(radius);

    for r in 0..rows {
        for c in 0..cols {
            let sum = match style {
                BufferStyle::Circular => window.sum_within_circle(r, c, radius, &src, &integral),
                BufferStyle::Square => sum_within_rectangle_around(r, c, radius, &integral),
            };

            result[Cell::from_row_col(r, c)] = NumCast::from(sum).unwrap_or_else(T::zero);
        }
    }

    Ok(result)
}

/// The maximum data value inside the circular buffer around every cell.
pub fn max_in_buffer<T: ArrayNum>(ras: &DenseRaster<T>, radius_in_meter: f32) -> Result<DenseRaster<T>> {
    let cell_size = ras.metadata().cell_size_x() as f32;
    if cell_size <= 0.0 {
        return Err(Error::InvalidArgument("Buffer radius requires a valid cell size".to_string()));
    }

    let radius_in_cells = radius_in_meter / cell_size;
    let radius2 = (radius_in_cells * radius_in_cells).ceil() as i64;
    let reach = radius_in_cells.ceil() as i32;

    let rows = ras.rows().count();
    let cols = ras.columns().count();

    let mut result = DenseRaster::<T>::try_filled_with(Some(T::zero()), ras.metadata().clone())?;

    for row in 0..rows {
        for col in 0..cols {
            let mut value = T::min_value();

            for r in (row - reach).max(0)..=(row + reach).min(rows - 1) {
                for c in (col - reach).max(0)..=(col + reach).min(cols - 1) {
                    let dr = <i64 as From<i32>>::from(r - row);
                    let dc = <i64 as From<i32>>::from(c - col);
                    if dr * dr + dc * dc > radius2 {
                        continue;
                    }

                    if let Some(v) = ras.cell_value(Cell::from_row_col(r, c)) {
                        if value < v {
                            value = v;
                        }
                    }
                }
            }

            result[Cell::from_row_col(row, col)] = value;
        }
    }

    Ok(result)
}
