use crate::{
    array::{Columns, Rows},
    ArrayMetadata, Cell, Point, RasterSize,
};

/// Cell extents along the x and y axis in map units.
/// A negative y size encodes a north-up raster.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellSize {
    x: f64,
    y: f64,
}

impl CellSize {
    pub const fn new(x: f64, y: f64) -> Self {
        CellSize { x, y }
    }

    pub const fn square(size: f64) -> Self {
        CellSize::new(size, -size)
    }

    pub fn is_valid(&self) -> bool {
        self.x != 0.0 && self.y != 0.0
    }

    pub const fn x(&self) -> f64 {
        self.x
    }

    pub const fn y(&self) -> f64 {
        self.y
    }
}

/// Georeferencing metadata of a raster: size, cell size, lower left origin,
/// optional nodata value and an optional projection descriptor.
#[derive(Clone, Debug, Default)]
pub struct GeoReference {
    /// Projection descriptor: an authority code such as `EPSG:31370` or an
    /// opaque WKT string, empty when no spatial reference is available.
    projection: String,
    size: RasterSize,
    /// Affine transformation from cell space to map space.
    geo_transform: [f64; 6],
    nodata: Option<f64>,
}

impl GeoReference {
    pub fn new<S: Into<String>>(projection: S, size: RasterSize, geo_transform: [f64; 6], nodata: Option<f64>) -> Self {
        GeoReference {
            projection: projection.into(),
            size,
            geo_transform,
            nodata,
        }
    }

    pub fn without_spatial_reference(size: RasterSize, nodata: Option<f64>) -> Self {
        GeoReference {
            size,
            nodata,
            ..Default::default()
        }
    }

    /// Construct a georeference from the coordinate of the bottom left corner
    /// of the bottom left cell.
    pub fn with_origin<S: Into<String>>(
        projection: S,
        size: RasterSize,
        lower_left: Point,
        cell_size: CellSize,
        nodata: Option<f64>,
    ) -> Self {
        let geo_transform = [
            lower_left.x(),
            cell_size.x(),
            0.0,
            lower_left.y() - (cell_size.y() * f64::from(size.rows.count())),
            0.0,
            cell_size.y(),
        ];

        GeoReference {
            projection: projection.into(),
            size,
            geo_transform,
            nodata,
        }
    }

    pub fn raster_size(&self) -> RasterSize {
        self.size
    }

    pub fn rows(&self) -> Rows {
        self.size.rows
    }

    pub fn columns(&self) -> Columns {
        self.size.cols
    }

    pub fn cell_size(&self) -> CellSize {
        CellSize::new(self.cell_size_x(), self.cell_size_y())
    }

    pub fn cell_size_x(&self) -> f64 {
        self.geo_transform[1]
    }

    pub fn cell_size_y(&self) -> f64 {
        self.geo_transform[5]
    }

    pub fn set_cell_size(&mut self, size: f64) {
        self.geo_transform[1] = size;
        self.geo_transform[5] = -size;
    }

    pub fn set_cell_size_xy(&mut self, size: CellSize) {
        self.geo_transform[1] = size.x();
        self.geo_transform[5] = size.y();
    }

    pub fn is_north_up(&self) -> bool {
        self.cell_size_y() < 0.0
    }

    pub fn geo_transform(&self) -> [f64; 6] {
        self.geo_transform
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        self.nodata = nodata;
    }

    pub fn projection(&self) -> &str {
        &self.projection
    }

    pub fn set_projection(&mut self, projection: String) {
        self.projection = projection;
    }

    pub fn set_projection_from_epsg(&mut self, epsg: i32) {
        self.projection = format!("EPSG:{epsg}");
    }

    pub fn projected_epsg(&self) -> Option<i32> {
        self.projection.strip_prefix("EPSG:").and_then(|code| code.parse().ok())
    }

    /// Translate a fractional cell position to a point in map coordinates.
    /// Cell (0, 0) is the top left corner of the raster.
    fn coordinate_for_cell_fraction(&self, col: f64, row: f64) -> Point {
        let x = self.geo_transform[0] + self.geo_transform[1] * col + self.geo_transform[2] * row;
        let y = self.geo_transform[3] + self.geo_transform[4] * col + self.geo_transform[5] * row;

        Point::new(x, y)
    }

    pub fn top_left(&self) -> Point {
        self.coordinate_for_cell_fraction(0.0, 0.0)
    }

    pub fn bottom_left(&self) -> Point {
        self.coordinate_for_cell_fraction(0.0, f64::from(self.size.rows.count()))
    }

    pub fn bottom_right(&self) -> Point {
        self.coordinate_for_cell_fraction(f64::from(self.size.cols.count()), f64::from(self.size.rows.count()))
    }

    pub fn cell_lower_left(&self, cell: Cell) -> Point {
        self.coordinate_for_cell_fraction(f64::from(cell.col), f64::from(cell.row) + 1.0)
    }

    pub fn cell_center(&self, cell: Cell) -> Point {
        self.coordinate_for_cell_fraction(f64::from(cell.col) + 0.5, f64::from(cell.row) + 0.5)
    }

    pub fn x_to_col(&self, x: f64) -> i32 {
        ((x - self.top_left().x()) / self.cell_size_x()).floor() as i32
    }

    pub fn y_to_row(&self, y: f64) -> i32 {
        ((y - self.top_left().y()) / self.cell_size_y()).floor() as i32
    }

    pub fn point_to_cell(&self, p: Point) -> Cell {
        Cell::from_row_col(self.y_to_row(p.y()), self.x_to_col(p.x()))
    }

    pub fn is_cell_on_map(&self, cell: Cell) -> bool {
        cell.row >= 0 && cell.col >= 0 && cell.row < self.size.rows.count() && cell.col < self.size.cols.count()
    }

    /// True when the cell grids of both rasters line up, so cells can be
    /// compared without resampling.
    pub fn is_aligned_with(&self, other: &GeoReference) -> bool {
        if self.cell_size() != other.cell_size() {
            return false;
        }

        let dx = (self.top_left().x() - other.top_left().x()) / self.cell_size_x();
        let dy = (self.top_left().y() - other.top_left().y()) / self.cell_size_y();

        (dx - dx.round()).abs() < 1e-10 && (dy - dy.round()).abs() < 1e-10
    }
}

fn float_field_eq(lhs: f64, rhs: f64) -> bool {
    lhs == rhs || (lhs.is_nan() && rhs.is_nan())
}

/// Georeference equality: row and column counts match exactly, origin, cell
/// sizes and nodata match under 64-bit floating point equality.
impl PartialEq for GeoReference {
    fn eq(&self, other: &Self) -> bool {
        let nodata_eq = match (self.nodata, other.nodata) {
            (None, None) => true,
            (Some(l), Some(r)) => float_field_eq(l, r),
            _ => false,
        };

        self.size == other.size
            && float_field_eq(self.bottom_left().x(), other.bottom_left().x())
            && float_field_eq(self.bottom_left().y(), other.bottom_left().y())
            && float_field_eq(self.cell_size_x(), other.cell_size_x())
            && float_field_eq(self.cell_size_y(), other.cell_size_y())
            && nodata_eq
    }
}

impl std::fmt::Display for GeoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, origin: ({}, {}), cell size: ({}, {}), nodata: {:?}, projection: '{}'",
            self.size,
            self.bottom_left().x(),
            self.bottom_left().y(),
            self.cell_size_x(),
            self.cell_size_y(),
            self.nodata,
            self.projection
        )
    }
}

impl ArrayMetadata for GeoReference {
    fn size(&self) -> RasterSize {
        self.size
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn set_nodata(&mut self, nodata: Option<f64>) {
        self.nodata = nodata;
    }

    fn with_rows_cols(rows: Rows, cols: Columns) -> Self {
        GeoReference::without_spatial_reference(RasterSize::with_rows_cols(rows, cols), None)
    }

    fn sized_with_nodata(size: RasterSize, nodata: Option<f64>) -> Self {
        GeoReference::without_spatial_reference(size, nodata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> GeoReference {
        GeoReference::with_origin(
            "EPSG:31370",
            RasterSize::with_rows_cols(Rows(4), Columns(5)),
            Point::new(10_000.0, 20_000.0),
            CellSize::square(100.0),
            Some(-9999.0),
        )
    }

    #[test]
    fn origin_round_trip() {
        let meta = reference();
        assert_eq!(meta.bottom_left(), Point::new(10_000.0, 20_000.0));
        assert_eq!(meta.top_left(), Point::new(10_000.0, 20_400.0));
        assert!(meta.is_north_up());
    }

    #[test]
    fn cell_point_conversions() {
        let meta = reference();
        assert_eq!(meta.point_to_cell(Point::new(10_050.0, 20_350.0)), Cell::from_row_col(0, 0));
        assert_eq!(meta.point_to_cell(Point::new(10_450.0, 20_050.0)), Cell::from_row_col(3, 4));
        assert_eq!(meta.cell_lower_left(Cell::from_row_col(3, 0)), Point::new(10_000.0, 20_000.0));
        assert_eq!(meta.cell_center(Cell::from_row_col(0, 0)), Point::new(10_050.0, 20_350.0));
    }

    #[test]
    fn equality_ignores_projection() {
        let mut other = reference();
        other.set_projection(String::new());
        assert_eq!(reference(), other);

        other.set_nodata(Some(-1.0));
        assert_ne!(reference(), other);

        let mut nan_meta = reference();
        nan_meta.set_nodata(Some(f64::NAN));
        assert_eq!(nan_meta.clone(), nan_meta);
    }

    #[test]
    fn epsg_projection() {
        let mut meta = reference();
        assert_eq!(meta.projected_epsg(), Some(31370));
        meta.set_projection_from_epsg(4326);
        assert_eq!(meta.projection(), "EPSG:4326");
    }

    #[test]
    fn alignment() {
        let meta = reference();
        let mut shifted = reference();
        assert!(meta.is_aligned_with(&shifted));

        shifted = GeoReference::with_origin(
            "",
            RasterSize::with_rows_cols(Rows(4), Columns(5)),
            Point::new(10_050.0, 20_000.0),
            CellSize::square(100.0),
            Some(-9999.0),
        );
        assert!(!meta.is_aligned_with(&shifted));
    }
}
