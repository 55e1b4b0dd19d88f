use std::marker::PhantomData;

use crate::{array::RasterWindow, Array as _, ArrayMetadata, ArrayNum, Cell, DenseArray};

/// Iterator over every cell of a dense raster, nodata cells are returned as `None`.
pub struct DenseArrayIterator<'a, T: ArrayNum, Metadata: ArrayMetadata> {
    index: usize,
    raster: &'a DenseArray<T, Metadata>,
}

impl<'a, T: ArrayNum, Metadata: ArrayMetadata> DenseArrayIterator<'a, T, Metadata> {
    pub fn new(raster: &'a DenseArray<T, Metadata>) -> Self {
        DenseArrayIterator { index: 0, raster }
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> Iterator for DenseArrayIterator<'_, T, Metadata> {
    type Item = Option<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.raster.len() {
            let result = self.raster.value(self.index);
            self.index += 1;
            Some(result)
        } else {
            None
        }
    }
}

/// Iterator over the data cells of a dense raster, nodata cells are skipped.
pub struct DenseArrayValueIterator<'a, T: ArrayNum, Metadata: ArrayMetadata> {
    index: usize,
    raster: &'a DenseArray<T, Metadata>,
}

impl<'a, T: ArrayNum, Metadata: ArrayMetadata> DenseArrayValueIterator<'a, T, Metadata> {
    pub fn new(raster: &'a DenseArray<T, Metadata>) -> Self {
        DenseArrayValueIterator { index: 0, raster }
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> Iterator for DenseArrayValueIterator<'_, T, Metadata> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.raster.len() {
            let val = self.raster.value(self.index);
            self.index += 1;
            if val.is_some() {
                return val;
            }
        }

        None
    }
}

/// Iterator over a rectangular sub area of a dense raster in row-major order.
/// The window is clipped to the raster extent.
pub struct DenseArrayWindowIterator<'a, T: ArrayNum, Metadata: ArrayMetadata> {
    cell: Cell,
    window: RasterWindow,
    raster: &'a DenseArray<T, Metadata>,
}

impl<'a, T: ArrayNum, Metadata: ArrayMetadata> DenseArrayWindowIterator<'a, T, Metadata> {
    pub fn new(raster: &'a DenseArray<T, Metadata>, window: RasterWindow) -> Self {
        let window = window.clipped_to(raster.size());
        let cell = if window.is_empty() { Cell::invalid() } else { window.top_left };
        DenseArrayWindowIterator { cell, window, raster }
    }

    fn increment(&mut self) {
        let mut cell = self.cell;
        cell.col += 1;
        if cell.col >= self.window.top_left.col + self.window.cols.count() {
            cell.col = self.window.top_left.col;
            cell.row += 1;
        }

        if cell.row >= self.window.top_left.row + self.window.rows.count() {
            self.cell = Cell::invalid();
        } else {
            self.cell = cell;
        }
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> Iterator for DenseArrayWindowIterator<'_, T, Metadata> {
    type Item = Option<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.cell.is_valid() {
            return None;
        }

        let result = self.raster.cell_value(self.cell);
        self.increment();
        Some(result)
    }
}

/// Mutable handle to a single raster cell that exposes the nodata state and
/// allows transitioning the cell between data and nodata.
pub struct ValueProxy<'a, T: ArrayNum> {
    value: *mut T,
    nodata: Option<T>,
    cell: Cell,
    _marker: PhantomData<&'a mut T>,
}

impl<T: ArrayNum> ValueProxy<'_, T> {
    pub fn has_value(&self) -> bool {
        !self.is_nodata()
    }

    pub fn is_nodata(&self) -> bool {
        let val = unsafe { *self.value };
        match self.nodata {
            None => false,
            Some(nod) => {
                if T::HAS_NAN {
                    val.is_nan()
                } else {
                    val == nod
                }
            }
        }
    }

    /// The cell value, `None` when the cell is nodata.
    pub fn get(&self) -> Option<T> {
        if self.is_nodata() {
            None
        } else {
            Some(unsafe { *self.value })
        }
    }

    /// The raw cell value, the nodata sentinel included.
    pub fn raw(&self) -> T {
        unsafe { *self.value }
    }

    /// Assign a value, the cell becomes a data cell.
    pub fn set(&mut self, val: T) {
        unsafe { *self.value = val };
    }

    /// Mark the cell as nodata.
    pub fn reset(&mut self) {
        match self.nodata {
            Some(nod) => unsafe { *self.value = nod },
            None => panic!("reset called on a raster without nodata value"),
        }
    }

    pub fn assign(&mut self, val: Option<T>) {
        match val {
            Some(v) => self.set(v),
            None => self.reset(),
        }
    }

    /// The cell this proxy refers to.
    pub fn cell(&self) -> Cell {
        self.cell
    }
}

/// Iterator handing out a [`ValueProxy`] for every cell in row-major order.
pub struct ProxyIterator<'a, T: ArrayNum> {
    data: *mut T,
    len: usize,
    index: usize,
    cols: i32,
    nodata: Option<T>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T: ArrayNum> ProxyIterator<'a, T> {
    pub(crate) fn new<Metadata: ArrayMetadata>(raster: &'a mut DenseArray<T, Metadata>) -> Self {
        let cols = raster.columns().count();
        let nodata = raster.nodata();
        let data = raster.as_mut_slice();
        ProxyIterator {
            data: data.as_mut_ptr(),
            len: data.len(),
            index: 0,
            cols,
            nodata,
            _marker: PhantomData,
        }
    }
}

impl<'a, T: ArrayNum> Iterator for ProxyIterator<'a, T> {
    type Item = ValueProxy<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }

        // SAFETY: every proxy refers to a distinct cell, the iterator holds
        // the exclusive borrow on the raster for lifetime 'a
        let proxy = ValueProxy {
            value: unsafe { self.data.add(self.index) },
            nodata: self.nodata,
            cell: Cell::from_index(self.index, self.cols),
            _marker: PhantomData,
        };

        self.index += 1;
        Some(proxy)
    }
}
