use crate::{
    array::{ArrayCopy, Columns, RasterWindow, Rows},
    densearrayiterators, densearrayutil, raster, Array, ArrayMetadata, ArrayNum, Cell, Error, RasterMetadata, Result,
};
use approx::{AbsDiffEq, RelativeEq};
use inf::allocate;
use num::{NumCast, ToPrimitive};

/// Raster implementation backed by a dense row-major buffer.
///
/// The nodata value is carried by the metadata. Integral rasters store the
/// sentinel directly in the buffer. Floating point rasters canonicalise the
/// user facing nodata value to quiet NaN in memory so the nodata test is a
/// single NaN check per cell; [`DenseArray::collapse_data`] converts back
/// before serialization.
#[derive(Clone, Debug)]
pub struct DenseArray<T: ArrayNum, Metadata: ArrayMetadata = RasterMetadata> {
    pub(super) meta: Metadata,
    /// The metadata nodata value represented in the element type (NaN for
    /// floating point rasters), kept in sync with the metadata.
    pub(super) nodata: Option<T>,
    pub(super) data: Vec<T>,
}

fn resolve_nodata<T: ArrayNum>(meta_nodata: Option<f64>) -> Result<Option<T>> {
    match meta_nodata {
        None => Ok(None),
        Some(_) if T::HAS_NAN => Ok(Some(T::default_nodata())),
        Some(nod) if nod.is_nan() => Err(Error::InvalidArgument(
            "Nodata value cannot be NaN for integral rasters".to_string(),
        )),
        Some(nod) => match NumCast::from(nod) {
            Some(val) => Ok(Some(val)),
            None => Err(Error::InvalidArgument(format!(
                "Nodata value {nod} does not fit the element type {}",
                T::TYPE
            ))),
        },
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> DenseArray<T, Metadata> {
    pub fn empty() -> Self {
        DenseArray {
            meta: Metadata::with_rows_cols(Rows(0), Columns(0)),
            nodata: None,
            data: allocate::new_aligned_vec(),
        }
    }

    /// Fallible construction of a filled raster, reports allocation failure
    /// for oversized results instead of aborting.
    pub fn try_filled_with(val: Option<T>, meta: Metadata) -> Result<Self> {
        let nodata = resolve_nodata::<T>(meta.nodata())?;
        let fill = match val {
            Some(v) => canonical_value(v, nodata),
            None => nodata.ok_or_else(|| Error::InvalidArgument("Cannot fill with nodata: no nodata value set".to_string()))?,
        };

        let data = allocate::try_aligned_vec_filled_with(fill, meta.size().cell_count())?;
        Ok(DenseArray { meta, nodata, data })
    }

    pub fn into_raw_parts(self) -> (Metadata, Vec<T>) {
        (self.meta, self.data)
    }

    /// Internal constructor for operator and kernel results whose data is
    /// already in the canonical in-memory representation.
    pub(crate) fn from_parts(meta: Metadata, nodata: Option<T>, data: Vec<T>) -> Self {
        debug_assert_eq!(meta.size().cell_count(), data.len());
        DenseArray { meta, nodata, data }
    }

    pub(crate) fn set_nodata_value(&mut self, nodata: Option<f64>) {
        self.meta.set_nodata(nodata);
        self.nodata = nodata.map(|nod| {
            if T::HAS_NAN {
                T::default_nodata()
            } else {
                crate::nodata::nodata_cast(nod)
            }
        });
    }

    /// The nodata test on a raw element value.
    #[inline]
    pub fn is_nodata_value(&self, value: T) -> bool {
        match self.nodata {
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

    pub fn mark_as_nodata(&mut self, cell: Cell) {
        let index = self.cell_index(cell);
        self.mark_index_as_nodata(index);
    }

    pub fn mark_index_as_nodata(&mut self, index: usize) {
        match self.nodata {
            Some(nod) => self.data[index] = nod,
            None => panic!("mark_as_nodata called on a raster without nodata value"),
        }
    }

    /// Replace every nodata cell with the given value and clear the nodata
    /// value from the metadata.
    pub fn replace_nodata(&mut self, new_value: T) {
        if let Some(nod) = self.nodata {
            for v in self.data.iter_mut() {
                let is_nodata = if T::HAS_NAN { v.is_nan() } else { *v == nod };
                if is_nodata {
                    *v = new_value;
                }
            }
        }

        self.meta.set_nodata(None);
        self.nodata = None;
    }

    /// Turn every occurrence of the given value into nodata.
    pub fn turn_value_into_nodata(&mut self, value: T) {
        match self.nodata {
            Some(nod) => {
                for v in self.data.iter_mut() {
                    if *v == value {
                        *v = nod;
                    }
                }
            }
            None => panic!("turn_value_into_nodata called on a raster without nodata value"),
        }
    }

    /// Make every cell nodata.
    pub fn fill_with_nodata(&mut self) {
        if let Some(nod) = self.nodata {
            self.fill(nod);
        }
    }

    /// Rewrite the in-memory NaN representation back to the user facing
    /// nodata value, used before serialization. No-op for integral rasters.
    pub fn collapse_data(&mut self) {
        let user_nodata = inf::cast::option::<T>(self.meta.nodata());
        densearrayutil::restore_nodata(&mut self.data, user_nodata);
    }

    /// Replace the user facing nodata value with the in-memory NaN
    /// representation, the inverse of [`DenseArray::collapse_data`].
    pub fn init_nodata(&mut self) {
        let user_nodata = inf::cast::option::<T>(self.meta.nodata());
        densearrayutil::process_nodata(&mut self.data, user_nodata);
    }

    pub fn contains_only_nodata(&self) -> bool {
        self.nodata.is_some() && self.data.iter().all(|&v| self.is_nodata_value(v))
    }

    /// Add the value to the cell, a nodata cell becomes data with the
    /// provided value.
    pub fn add_to_cell(&mut self, cell: Cell, value: T) {
        let index = self.cell_index(cell);
        if self.index_is_nodata(index) {
            self.data[index] = value;
        } else {
            self.data[index] += value;
        }
    }

    pub fn unary<TDest: ArrayNum>(&self, op: impl Fn(T) -> TDest) -> DenseArray<TDest, Metadata> {
        DenseArray::new(self.meta.clone(), allocate::aligned_vec_from_iter(self.data.iter().map(|&v| op(v))))
            .expect("Raster size bug")
    }

    pub fn binary_inplace<F: Fn(&mut T, T)>(&mut self, other: &Self, op: F) {
        raster::assert_dimensions(self, other);
        self.data.iter_mut().zip(other.data.iter()).for_each(|(a, &b)| op(a, b));
    }

    pub(crate) fn cell_index(&self, cell: Cell) -> usize {
        cell.index_in_raster(self.columns().count())
    }

    /// Iterate every cell through a mutable proxy that exposes the nodata
    /// state and allows transitioning cells between data and nodata.
    pub fn iter_proxy_mut(&mut self) -> densearrayiterators::ProxyIterator<T> {
        densearrayiterators::ProxyIterator::new(self)
    }
}

fn canonical_value<T: ArrayNum>(val: T, nodata: Option<T>) -> T {
    // filling a floating point raster with its user facing nodata value means
    // filling with the in-memory representation of nodata
    if T::HAS_NAN {
        if let Some(nod) = nodata {
            if !nod.is_nan() && val == nod {
                return T::default_nodata();
            }
        }
    }

    val
}

impl<T: ArrayNum, Metadata: ArrayMetadata> AsRef<[T]> for DenseArray<T, Metadata> {
    fn as_ref(&self) -> &[T] {
        &self.data
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> AsMut<[T]> for DenseArray<T, Metadata> {
    fn as_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: ArrayNum, R: Array<Metadata = Metadata>, Metadata: ArrayMetadata> ArrayCopy<T, R> for DenseArray<T, Metadata> {
    fn new_with_dimensions_of(ras: &R, fill: Option<T>) -> Self {
        DenseArray::filled_with(fill, ras.metadata().clone())
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> Array for DenseArray<T, Metadata> {
    type Pixel = T;
    type Metadata = Metadata;
    type WithPixelType<U: ArrayNum> = DenseArray<U, Metadata>;

    fn new(meta: Metadata, data: Vec<T>) -> Result<Self> {
        if meta.size().cell_count() != data.len() {
            return Err(Error::InvalidArgument(format!(
                "Data length does not match the number of cells in the metadata: {} != {}",
                data.len(),
                meta.size().cell_count()
            )));
        }

        let nodata = resolve_nodata::<T>(meta.nodata())?;
        let mut raster = DenseArray { meta, nodata, data };
        raster.init_nodata();
        Ok(raster)
    }

    fn from_iter_opt<Iter>(meta: Metadata, iter: Iter) -> Result<Self>
    where
        Iter: Iterator<Item = Option<T>>,
    {
        let nodata = resolve_nodata::<T>(meta.nodata())?;
        let mut data = allocate::aligned_vec_with_capacity(meta.size().cell_count());
        for val in iter {
            match val {
                Some(v) => data.push(v),
                None => data.push(nodata.ok_or_else(|| {
                    Error::InvalidArgument("Cannot store nodata values in a raster without nodata value".to_string())
                })?),
            }
        }

        Self::new(meta, data)
    }

    fn zeros(meta: Metadata) -> Self {
        DenseArray::filled_with(Some(T::zero()), meta)
    }

    fn filled_with(val: Option<T>, meta: Metadata) -> Self {
        DenseArray::try_filled_with(val, meta).expect("Raster fill bug")
    }

    fn filled_with_nodata(meta: Metadata) -> Self {
        DenseArray::filled_with(None, meta)
    }

    fn metadata(&self) -> &Metadata {
        &self.meta
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn nodata(&self) -> Option<T> {
        self.nodata
    }

    fn as_slice(&self) -> &[T] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    fn value(&self, index: usize) -> Option<T> {
        let val = self.data[index];
        if self.is_nodata_value(val) {
            None
        } else {
            Some(val)
        }
    }

    fn index_has_data(&self, index: usize) -> bool {
        !self.is_nodata_value(self.data[index])
    }

    fn set_cell_value(&mut self, cell: Cell, val: Option<T>) {
        match val {
            Some(v) => {
                let index = self.cell_index(cell);
                self.data[index] = v;
            }
            None => self.mark_as_nodata(cell),
        }
    }

    fn fill(&mut self, val: T) {
        self.data.iter_mut().for_each(|v| *v = val);
    }

    fn fill_values(&mut self, val: T) {
        match self.nodata {
            Some(_) => {
                for i in 0..self.data.len() {
                    if self.index_has_data(i) {
                        self.data[i] = val;
                    }
                }
            }
            None => self.fill(val),
        }
    }

    fn iter(&self) -> std::slice::Iter<T> {
        self.data.iter()
    }

    fn iter_mut(&mut self) -> std::slice::IterMut<T> {
        self.data.iter_mut()
    }

    fn iter_opt(&self) -> impl Iterator<Item = Option<T>> {
        densearrayiterators::DenseArrayIterator::new(self)
    }

    fn iter_values(&self) -> impl Iterator<Item = T> {
        densearrayiterators::DenseArrayValueIterator::new(self)
    }

    fn iter_window(&self, window: RasterWindow) -> impl Iterator<Item = Option<T>> {
        densearrayiterators::DenseArrayWindowIterator::new(self, window)
    }

    fn masked_data(&self) -> Vec<Option<T>> {
        self.data.iter().map(|&v| if self.is_nodata_value(v) { None } else { Some(v) }).collect()
    }

    fn nodata_count(&self) -> usize {
        self.data.iter().filter(|&&v| self.is_nodata_value(v)).count()
    }

    fn sum(&self) -> f64 {
        self.data
            .iter()
            .filter(|&&v| !self.is_nodata_value(v))
            .fold(0.0, |acc, v| acc + v.to_f64().unwrap_or(0.0))
    }

    fn cast_to<U: ArrayNum>(&self) -> DenseArray<U, Metadata> {
        crate::algo::cast(self)
    }
}

impl<'a, T: ArrayNum, Metadata: ArrayMetadata> IntoIterator for &'a DenseArray<T, Metadata> {
    type Item = Option<T>;
    type IntoIter = densearrayiterators::DenseArrayIterator<'a, T, Metadata>;

    fn into_iter(self) -> Self::IntoIter {
        densearrayiterators::DenseArrayIterator::new(self)
    }
}

/// Equality on the data: cells agree on their nodata state and data cells
/// compare equal. Metadata georeferencing is not part of the comparison.
impl<T: ArrayNum, Metadata: ArrayMetadata> PartialEq for DenseArray<T, Metadata> {
    fn eq(&self, other: &Self) -> bool {
        if self.size() != other.size() {
            return false;
        }

        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(&a, &b)| match (self.is_nodata_value(a), other.is_nodata_value(b)) {
                (true, true) => true,
                (false, false) => a == b,
                _ => false,
            })
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> AbsDiffEq for DenseArray<T, Metadata> {
    type Epsilon = T;

    fn default_epsilon() -> Self::Epsilon {
        T::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: T) -> bool {
        if self.size() != other.size() {
            return false;
        }

        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(&a, &b)| match (self.is_nodata_value(a), other.is_nodata_value(b)) {
                (true, true) => true,
                (false, false) => a.abs_diff_eq(&b, epsilon),
                _ => false,
            })
    }
}

impl<T: ArrayNum + RelativeEq, Metadata: ArrayMetadata> RelativeEq for DenseArray<T, Metadata> {
    fn default_max_relative() -> T::Epsilon {
        T::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: T, max_relative: T) -> bool {
        if self.size() != other.size() {
            return false;
        }

        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(&a, &b)| match (self.is_nodata_value(a), other.is_nodata_value(b)) {
                (true, true) => true,
                (false, false) => a.relative_eq(&b, epsilon, max_relative),
                _ => false,
            })
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::Index<Cell> for DenseArray<T, Metadata> {
    type Output = T;

    fn index(&self, cell: Cell) -> &T {
        &self.data[cell.index_in_raster(self.columns().count())]
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::IndexMut<Cell> for DenseArray<T, Metadata> {
    fn index_mut(&mut self, cell: Cell) -> &mut T {
        let index = self.cell_index(cell);
        &mut self.data[index]
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::Index<usize> for DenseArray<T, Metadata> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::IndexMut<usize> for DenseArray<T, Metadata> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_metadata;

    #[test]
    fn float_nodata_is_canonicalized_on_construction() {
        let meta = test_metadata(2, 2, Some(-9999.0));
        let ras = DenseArray::<f32, _>::new(meta, vec![1.0, -9999.0, 3.0, 4.0]).unwrap();

        assert!(ras[1].is_nan());
        assert!(ras.index_is_nodata(1));
        assert_eq!(ras.value(1), None);
        assert_eq!(ras.value(0), Some(1.0));
        assert_eq!(ras.nodata_count(), 1);
    }

    #[test]
    fn collapse_data_restores_the_user_facing_sentinel() {
        let meta = test_metadata(1, 3, Some(-9999.0));
        let mut ras = DenseArray::<f32, _>::new(meta, vec![1.0, -9999.0, f32::NAN]).unwrap();
        assert_eq!(ras.nodata_count(), 2);

        ras.collapse_data();
        assert_eq!(ras.as_slice(), &[1.0, -9999.0, -9999.0]);
    }

    #[test]
    fn integral_nodata_must_fit_the_element_type() {
        let meta = test_metadata(1, 2, Some(300.0));
        assert!(matches!(
            DenseArray::<u8, _>::new(meta, vec![1, 2]),
            Err(Error::InvalidArgument(_))
        ));

        let meta = test_metadata(1, 2, Some(f64::NAN));
        assert!(DenseArray::<i32, _>::new(meta, vec![1, 2]).is_err());
    }

    #[test]
    fn fill_with_the_nodata_value_fills_with_nan() {
        let meta = test_metadata(1, 2, Some(-9999.0));
        let ras = DenseArray::<f32, _>::filled_with(Some(-9999.0), meta);
        assert!(ras.contains_only_nodata());
    }

    #[test]
    fn fill_values_leaves_nodata_intact() {
        let meta = test_metadata(1, 3, Some(255.0));
        let mut ras = DenseArray::<u8, _>::new(meta, vec![1, 255, 3]).unwrap();
        ras.fill_values(9);
        assert_eq!(ras.as_slice(), &[9, 255, 9]);
    }

    #[test]
    fn replace_nodata_clears_the_nodata_value() {
        let meta = test_metadata(1, 3, Some(255.0));
        let mut ras = DenseArray::<u8, _>::new(meta, vec![1, 255, 3]).unwrap();
        ras.replace_nodata(0);
        assert_eq!(ras.as_slice(), &[1, 0, 3]);
        assert_eq!(ras.metadata().nodata(), None);
        assert_eq!(ras.nodata_count(), 0);
    }

    #[test]
    fn nodata_aware_equality() {
        let meta = test_metadata(1, 3, Some(-9999.0));
        let a = DenseArray::<f32, _>::new(meta.clone(), vec![1.0, -9999.0, 3.0]).unwrap();
        let b = DenseArray::<f32, _>::new(meta.clone(), vec![1.0, -9999.0, 3.0]).unwrap();
        let c = DenseArray::<f32, _>::new(meta, vec![1.0, 2.0, 3.0]).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn cast_preserves_nodata_cells() {
        let meta = test_metadata(2, 2, Some(-1.0));
        let ras = DenseArray::<i32, _>::new(meta, vec![1, 2, -1, 4]).unwrap();

        let f64_ras = ras.cast_to::<f64>();
        assert_eq!(f64_ras.value(0), Some(1.0));
        assert_eq!(f64_ras.value(2), None);
        assert!(f64_ras[2].is_nan());
    }
}
