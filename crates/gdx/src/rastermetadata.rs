use crate::{ArrayMetadata, Columns, RasterSize, Rows};

/// Raster metadata without georeferencing: the size and the optional nodata
/// value. Useful when no geographic context is available.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct RasterMetadata {
    pub raster_size: RasterSize,
    pub nodata: Option<f64>,
}

impl RasterMetadata {
    pub fn sized(raster_size: RasterSize) -> Self {
        RasterMetadata {
            raster_size,
            nodata: None,
        }
    }
}

impl std::fmt::Display for RasterMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, nodata: {:?}", self.raster_size, self.nodata)
    }
}

impl ArrayMetadata for RasterMetadata {
    fn size(&self) -> RasterSize {
        self.raster_size
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn set_nodata(&mut self, nodata: Option<f64>) {
        self.nodata = nodata;
    }

    fn with_rows_cols(rows: Rows, cols: Columns) -> Self {
        Self {
            raster_size: RasterSize::with_rows_cols(rows, cols),
            nodata: None,
        }
    }

    fn sized_with_nodata(raster_size: RasterSize, nodata: Option<f64>) -> Self {
        Self { raster_size, nodata }
    }
}
