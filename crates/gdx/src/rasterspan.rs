use crate::{ArrayMetadata, ArrayNum, Cell};

/// Non owning read-only view on raster data: an external buffer combined with
/// raster metadata, with the same element access contract as the owning
/// container.
pub struct RasterSpan<'a, T: ArrayNum, Metadata: ArrayMetadata> {
    data: &'a [T],
    meta: &'a Metadata,
    nodata: Option<T>,
}

fn span_nodata<T: ArrayNum>(meta_nodata: Option<f64>) -> Option<T> {
    meta_nodata.map(|nod| {
        if T::HAS_NAN {
            T::default_nodata()
        } else {
            crate::nodata::nodata_cast(nod)
        }
    })
}

fn is_nodata_value<T: ArrayNum>(value: T, nodata: Option<T>) -> bool {
    match nodata {
        None => false,
        Some(nod) => {
            if T::HAS_NAN {
                value.is_nan()
            } else {
                value == nod
            }
        }
    }
}

impl<'a, T: ArrayNum, Metadata: ArrayMetadata> RasterSpan<'a, T, Metadata> {
    pub fn new(data: &'a [T], meta: &'a Metadata) -> Self {
        assert_eq!(data.len(), meta.size().cell_count(), "Span data does not match the metadata size");
        RasterSpan {
            data,
            meta,
            nodata: span_nodata(meta.nodata()),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        self.meta
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn as_slice(&self) -> &[T] {
        self.data
    }

    pub fn index_is_nodata(&self, index: usize) -> bool {
        is_nodata_value(self.data[index], self.nodata)
    }

    pub fn cell_is_nodata(&self, cell: Cell) -> bool {
        self.index_is_nodata(cell.index_in_raster(self.meta.size().cols.count()))
    }

    pub fn value(&self, index: usize) -> Option<T> {
        let val = self.data[index];
        if is_nodata_value(val, self.nodata) {
            None
        } else {
            Some(val)
        }
    }

    pub fn cell_value(&self, cell: Cell) -> Option<T> {
        self.value(cell.index_in_raster(self.meta.size().cols.count()))
    }

    pub fn iter_opt(&self) -> impl Iterator<Item = Option<T>> + '_ {
        self.data.iter().map(|&v| if is_nodata_value(v, self.nodata) { None } else { Some(v) })
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::Index<Cell> for RasterSpan<'_, T, Metadata> {
    type Output = T;

    fn index(&self, cell: Cell) -> &T {
        &self.data[cell.index_in_raster(self.meta.size().cols.count())]
    }
}

/// Non owning mutable view on raster data. Writing is allowed because the
/// underlying buffer is mutably borrowed.
pub struct RasterSpanMut<'a, T: ArrayNum, Metadata: ArrayMetadata> {
    data: &'a mut [T],
    meta: &'a Metadata,
    nodata: Option<T>,
}

impl<'a, T: ArrayNum, Metadata: ArrayMetadata> RasterSpanMut<'a, T, Metadata> {
    pub fn new(data: &'a mut [T], meta: &'a Metadata) -> Self {
        assert_eq!(data.len(), meta.size().cell_count(), "Span data does not match the metadata size");
        let nodata = span_nodata(meta.nodata());
        RasterSpanMut { data, meta, nodata }
    }

    pub fn metadata(&self) -> &Metadata {
        self.meta
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn index_is_nodata(&self, index: usize) -> bool {
        is_nodata_value(self.data[index], self.nodata)
    }

    pub fn cell_is_nodata(&self, cell: Cell) -> bool {
        self.index_is_nodata(cell.index_in_raster(self.meta.size().cols.count()))
    }

    pub fn value(&self, index: usize) -> Option<T> {
        let val = self.data[index];
        if is_nodata_value(val, self.nodata) {
            None
        } else {
            Some(val)
        }
    }

    pub fn mark_as_nodata(&mut self, cell: Cell) {
        match self.nodata {
            Some(nod) => {
                let index = cell.index_in_raster(self.meta.size().cols.count());
                self.data[index] = nod;
            }
            None => panic!("mark_as_nodata called on a span without nodata value"),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::Index<Cell> for RasterSpanMut<'_, T, Metadata> {
    type Output = T;

    fn index(&self, cell: Cell) -> &T {
        &self.data[cell.index_in_raster(self.meta.size().cols.count())]
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::IndexMut<Cell> for RasterSpanMut<'_, T, Metadata> {
    fn index_mut(&mut self, cell: Cell) -> &mut T {
        &mut self.data[cell.index_in_raster(self.meta.size().cols.count())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_metadata;

    #[test]
    fn span_on_external_buffer() {
        let meta = test_metadata(2, 2, Some(-1.0));
        let data = vec![1, 2, 3, -1];
        let span = RasterSpan::new(&data, &meta);

        assert_eq!(span.cell_value(Cell::from_row_col(0, 1)), Some(2));
        assert!(span.cell_is_nodata(Cell::from_row_col(1, 1)));
        assert_eq!(span.iter_opt().collect::<Vec<_>>(), vec![Some(1), Some(2), Some(3), None]);
    }

    #[test]
    fn mutable_span_writes_through() {
        let meta = test_metadata(2, 2, Some(-1.0));
        let mut data = vec![1, 2, 3, 4];
        {
            let mut span = RasterSpanMut::new(&mut data, &meta);
            span[Cell::from_row_col(0, 0)] = 9;
            span.mark_as_nodata(Cell::from_row_col(1, 0));
        }

        assert_eq!(data, vec![9, 2, -1, 4]);
    }
}
