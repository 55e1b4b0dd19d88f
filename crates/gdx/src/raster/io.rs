//! Raster file I/O.
//!
//! The format support in this crate is deliberately small: an ESRI ASCII grid
//! driver that keeps the round trip and the command line tools working
//! without a native library. Binary formats and reprojection are provided by
//! the GDAL backed I/O collaborator, the reader dispatch happens on the file
//! extension so additional drivers slot in without touching the call sites.

use std::io::{BufWriter, Write as _};
use std::path::Path;

use num::NumCast;

use crate::{
    raster::{AnyDenseRaster, DenseRaster},
    Array, ArrayNum, Cell, CellSize, Columns, Error, GeoReference, Point, RasterSize, Result, Rows,
};

/// Raster file formats recognised by the extension based dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    ArcAscii,
    GeoTiff,
    Unknown,
}

impl RasterFormat {
    pub fn guess_from_path(path: &Path) -> RasterFormat {
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase).as_deref() {
            Some("asc") => RasterFormat::ArcAscii,
            Some("tif" | "tiff") => RasterFormat::GeoTiff,
            _ => RasterFormat::Unknown,
        }
    }
}

fn unsupported_format(path: &Path) -> Error {
    Error::Runtime(format!(
        "No raster driver available for '{}', binary formats require the GDAL backed I/O collaborator",
        path.display()
    ))
}

struct AscContents {
    meta: GeoReference,
    values: Vec<f64>,
}

fn parse_asc(path: &Path) -> Result<AscContents> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| Error::Runtime(format!("Failed to open raster '{}': {err}", path.display())))?;

    let mut tokens = contents.split_whitespace();

    let mut rows = None;
    let mut cols = None;
    let mut xll = None;
    let mut yll = None;
    let mut cell_size = None;
    let mut nodata = None;

    let invalid_header = |msg: &str| Error::Runtime(format!("Invalid ascii raster '{}': {msg}", path.display()));

    let mut first_value = None;
    while let Some(token) = tokens.next() {
        let key = token.to_lowercase();
        let field = match key.as_str() {
            "ncols" => &mut cols,
            "nrows" => &mut rows,
            "xllcorner" => &mut xll,
            "yllcorner" => &mut yll,
            "cellsize" => &mut cell_size,
            "nodata_value" => &mut nodata,
            _ => {
                first_value = Some(token);
                break;
            }
        };

        let value: f64 = tokens
            .next()
            .ok_or_else(|| invalid_header("missing header value"))?
            .parse()
            .map_err(|_| invalid_header("malformed header value"))?;
        *field = Some(value);
    }

    let rows = rows.ok_or_else(|| invalid_header("nrows missing"))? as i32;
    let cols = cols.ok_or_else(|| invalid_header("ncols missing"))? as i32;
    let cell_size = cell_size.ok_or_else(|| invalid_header("cellsize missing"))?;

    let meta = GeoReference::with_origin(
        "",
        RasterSize::with_rows_cols(Rows(rows), Columns(cols)),
        Point::new(xll.unwrap_or(0.0), yll.unwrap_or(0.0)),
        CellSize::square(cell_size),
        nodata,
    );

    let mut values = Vec::with_capacity(meta.raster_size().cell_count());
    for token in first_value.into_iter().chain(tokens) {
        let value: f64 = token
            .parse()
            .map_err(|_| invalid_header("malformed cell value"))?;
        values.push(value);
    }

    if values.len() != meta.raster_size().cell_count() {
        return Err(Error::Runtime(format!(
            "Invalid ascii raster '{}': expected {} values, found {}",
            path.display(),
            meta.raster_size().cell_count(),
            values.len()
        )));
    }

    Ok(AscContents { meta, values })
}

/// Read only the georeferencing metadata of a raster file.
pub fn read_metadata(path: &Path) -> Result<GeoReference> {
    match RasterFormat::guess_from_path(path) {
        RasterFormat::ArcAscii => Ok(parse_asc(path)?.meta),
        _ => Err(unsupported_format(path)),
    }
}

fn raster_from_values<T: ArrayNum>(meta: GeoReference, values: Vec<f64>) -> Result<DenseRaster<T>> {
    let nodata = meta.nodata();
    DenseRaster::from_iter_opt(
        meta,
        values.into_iter().map(|v| {
            if nodata.is_some_and(|nod| v == nod || (nod.is_nan() && v.is_nan())) {
                None
            } else {
                NumCast::from(v)
            }
        }),
    )
}

/// Read a raster file with a caller chosen element type.
pub fn read<T: ArrayNum>(path: &Path) -> Result<DenseRaster<T>> {
    match RasterFormat::guess_from_path(path) {
        RasterFormat::ArcAscii => {
            let contents = parse_asc(path)?;
            raster_from_values(contents.meta, contents.values)
        }
        _ => Err(unsupported_format(path)),
    }
}

/// Read a raster file inferring the element type from the file contents:
/// integral cell values yield an Int32 raster, anything else Float32.
pub fn read_any(path: &Path) -> Result<AnyDenseRaster> {
    match RasterFormat::guess_from_path(path) {
        RasterFormat::ArcAscii => {
            let contents = parse_asc(path)?;
            let integral = contents
                .values
                .iter()
                .chain(contents.meta.nodata().iter())
                .all(|&v| v.is_finite() && v.fract() == 0.0 && v.abs() < <f64 as From<i32>>::from(i32::MAX));

            if integral {
                Ok(AnyDenseRaster::I32(raster_from_values(contents.meta, contents.values)?))
            } else {
                Ok(AnyDenseRaster::F32(raster_from_values(contents.meta, contents.values)?))
            }
        }
        _ => Err(unsupported_format(path)),
    }
}

/// Read a rectangular window of a raster file, rows and columns outside the
/// file are filled with the file's nodata value.
pub fn read_bounds<T: ArrayNum>(path: &Path, bounds: &GeoReference) -> Result<DenseRaster<T>> {
    let src = read::<T>(path)?;
    let src_meta = src.metadata();

    if !src_meta.is_aligned_with(bounds) {
        return Err(Error::InvalidArgument(
            "Window is not aligned with the raster grid".to_string(),
        ));
    }

    let col_offset = ((bounds.top_left().x() - src_meta.top_left().x()) / src_meta.cell_size_x()).round() as i32;
    let row_offset = ((bounds.top_left().y() - src_meta.top_left().y()) / src_meta.cell_size_y()).round() as i32;

    let meta = GeoReference::with_origin(
        src_meta.projection().to_string(),
        bounds.raster_size(),
        bounds.bottom_left(),
        src_meta.cell_size(),
        src_meta.nodata(),
    );

    let mut result = if meta.nodata().is_some() {
        DenseRaster::<T>::filled_with_nodata(meta)
    } else {
        DenseRaster::<T>::try_filled_with(Some(T::zero()), meta)?
    };

    for r in 0..bounds.rows().count() {
        for c in 0..bounds.columns().count() {
            let src_cell = Cell::from_row_col(r + row_offset, c + col_offset);
            if src_meta.is_cell_on_map(src_cell) {
                result.set_cell_value(Cell::from_row_col(r, c), src.cell_value(src_cell));
            }
        }
    }

    Ok(result)
}

fn format_cell(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Write a raster to disk, the driver is picked from the file extension.
/// NaN encoded nodata is collapsed back to the user facing sentinel.
pub fn write<T: ArrayNum>(ras: &DenseRaster<T>, path: &Path) -> Result {
    if RasterFormat::guess_from_path(path) != RasterFormat::ArcAscii {
        return Err(unsupported_format(path));
    }

    let meta = ras.metadata();
    let file = std::fs::File::create(path)
        .map_err(|err| Error::Runtime(format!("Failed to create raster '{}': {err}", path.display())))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "ncols        {}", meta.columns().count())?;
    writeln!(writer, "nrows        {}", meta.rows().count())?;
    writeln!(writer, "xllcorner    {}", meta.bottom_left().x())?;
    writeln!(writer, "yllcorner    {}", meta.bottom_left().y())?;
    writeln!(writer, "cellsize     {}", meta.cell_size_x())?;
    if let Some(nodata) = meta.nodata() {
        writeln!(writer, "NODATA_value {}", format_cell(nodata))?;
    }

    use num::ToPrimitive;
    let nodata = meta.nodata().unwrap_or(f64::NAN);
    for r in 0..meta.rows().count() {
        let mut line = String::new();
        for c in 0..meta.columns().count() {
            if c > 0 {
                line.push(' ');
            }

            // nodata cells are written with the user facing sentinel
            let value = match ras.cell_value(Cell::from_row_col(r, c)) {
                Some(v) => v.to_f64().unwrap_or(nodata),
                None => nodata,
            };
            line.push_str(&format_cell(value));
        }
        writeln!(writer, "{line}")?;
    }

    Ok(())
}

pub fn write_any(ras: &AnyDenseRaster, path: &Path) -> Result {
    crate::anydensearray::dispatch!(ras, raster => write(raster, path))
}

/// Read and write support on the raster types themselves.
pub trait RasterReadWrite: Sized {
    fn read(path: &Path) -> Result<Self>;
    fn read_bounds(path: &Path, bounds: &GeoReference) -> Result<Self>;
    fn write(&self, path: &Path) -> Result;
}

impl<T: ArrayNum> RasterReadWrite for DenseRaster<T> {
    fn read(path: &Path) -> Result<Self> {
        read(path)
    }

    fn read_bounds(path: &Path, bounds: &GeoReference) -> Result<Self> {
        read_bounds(path, bounds)
    }

    fn write(&self, path: &Path) -> Result {
        write(self, path)
    }
}

/// Resampling algorithms for [`resample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleAlgorithm {
    NearestNeighbour,
    Average,
    Minimum,
    Maximum,
}

/// Resample a raster onto a target grid in the same spatial reference.
/// Nearest neighbour picks the source cell under the target cell center, the
/// aggregating algorithms combine the data cells covered by the target cell.
pub fn resample<T: ArrayNum>(ras: &DenseRaster<T>, target: &GeoReference, algorithm: ResampleAlgorithm) -> Result<DenseRaster<T>> {
    let src_meta = ras.metadata();
    if src_meta.projection() != target.projection() {
        return Err(Error::InvalidArgument(
            "Resampling cannot change the spatial reference, use the warp collaborator".to_string(),
        ));
    }

    let mut meta = target.clone();
    meta.set_nodata(src_meta.nodata());

    let mut result = if meta.nodata().is_some() {
        DenseRaster::<T>::filled_with_nodata(meta)
    } else {
        DenseRaster::<T>::try_filled_with(Some(T::zero()), meta)?
    };

    use num::ToPrimitive;

    for r in 0..target.rows().count() {
        for c in 0..target.columns().count() {
            let cell = Cell::from_row_col(r, c);

            let value = match algorithm {
                ResampleAlgorithm::NearestNeighbour => {
                    let src_cell = src_meta.point_to_cell(target.cell_center(cell));
                    if src_meta.is_cell_on_map(src_cell) {
                        ras.cell_value(src_cell)
                    } else {
                        None
                    }
                }
                _ => {
                    // the source cells covered by the target cell
                    let top_left = src_meta.point_to_cell(Point::new(
                        target.cell_center(cell).x() - target.cell_size_x().abs() / 2.0 + src_meta.cell_size_x().abs() / 2.0,
                        target.cell_center(cell).y() + target.cell_size_y().abs() / 2.0 - src_meta.cell_size_y().abs() / 2.0,
                    ));
                    let bottom_right = src_meta.point_to_cell(Point::new(
                        target.cell_center(cell).x() + target.cell_size_x().abs() / 2.0 - src_meta.cell_size_x().abs() / 2.0,
                        target.cell_center(cell).y() - target.cell_size_y().abs() / 2.0 + src_meta.cell_size_y().abs() / 2.0,
                    ));

                    let mut sum = 0.0;
                    let mut count = 0usize;
                    let mut min: Option<T> = None;
                    let mut max: Option<T> = None;

                    for sr in top_left.row.max(0)..=bottom_right.row.min(src_meta.rows().count() - 1) {
                        for sc in top_left.col.max(0)..=bottom_right.col.min(src_meta.columns().count() - 1) {
                            if let Some(v) = ras.cell_value(Cell::from_row_col(sr, sc)) {
                                sum += v.to_f64().unwrap_or(0.0);
                                count += 1;
                                min = Some(min.map_or(v, |m| if v < m { v } else { m }));
                                max = Some(max.map_or(v, |m| if v > m { v } else { m }));
                            }
                        }
                    }

                    match algorithm {
                        ResampleAlgorithm::Average if count > 0 => NumCast::from(sum / count as f64),
                        ResampleAlgorithm::Minimum => min,
                        ResampleAlgorithm::Maximum => max,
                        _ => None,
                    }
                }
            };

            if value.is_some() || result.metadata().nodata().is_some() {
                result.set_cell_value(cell, value);
            }
        }
    }

    Ok(result)
}

/// Reproject a raster into another spatial reference.
/// Reprojection needs the warp collaborator, in-tree only the identity warp
/// is available.
pub fn warp<T: ArrayNum>(ras: &DenseRaster<T>, target_epsg: i32) -> Result<DenseRaster<T>> {
    if ras.metadata().projected_epsg() == Some(target_epsg) {
        return Ok(ras.clone());
    }

    Err(Error::Runtime(
        "No reprojection backend available, warping requires the GDAL backed I/O collaborator".to_string(),
    ))
}
