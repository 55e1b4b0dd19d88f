//! Element wise operators on dense rasters.
//!
//! Binary arithmetic propagates nodata: a cell is nodata in the result when it
//! is nodata in either input. The result inherits the left operand's nodata
//! value when it has one, the right operand's otherwise. Divisions always
//! produce a floating point raster with NaN nodata, a zero divisor yields
//! nodata. Comparisons produce a `u8` raster with 255 as nodata sentinel.

use inf::allocate;
use num::{NumCast, ToPrimitive};

use crate::{nodata::derived_nodata, raster::assert_dimensions, Array, ArrayMetadata, ArrayNum, DenseArray};

fn resolved_nodata<T: ArrayNum>(nodata: Option<f64>) -> Option<T> {
    nodata.map(|nod| if T::HAS_NAN { T::default_nodata() } else { crate::nodata::nodata_cast(nod) })
}

fn binary_nodata_aware<T: ArrayNum, Metadata: ArrayMetadata>(
    lhs: &DenseArray<T, Metadata>,
    rhs: &DenseArray<T, Metadata>,
    op: impl Fn(T, T) -> T,
) -> DenseArray<T, Metadata> {
    assert_dimensions(lhs, rhs);

    let out_nodata = derived_nodata::<T>(lhs.metadata().nodata(), rhs.metadata().nodata());
    let meta = lhs.metadata().with_nodata(out_nodata);
    let nodata = resolved_nodata::<T>(out_nodata);

    let data = allocate::aligned_vec_from_iter(lhs.as_slice().iter().zip(rhs.as_slice().iter()).map(|(&a, &b)| {
        if lhs.is_nodata_value(a) || rhs.is_nodata_value(b) {
            nodata.unwrap_or(b)
        } else {
            op(a, b)
        }
    }));

    DenseArray::from_parts(meta, nodata, data)
}

fn binary_assign_nodata_aware<T: ArrayNum, Metadata: ArrayMetadata>(
    lhs: &mut DenseArray<T, Metadata>,
    rhs: &DenseArray<T, Metadata>,
    op: impl Fn(T, T) -> T,
) {
    assert_dimensions(lhs, rhs);

    let out_nodata = derived_nodata::<T>(lhs.metadata().nodata(), rhs.metadata().nodata());
    lhs.set_nodata_value(out_nodata);
    let nodata = lhs.nodata();

    for (a, &b) in lhs.as_mut_slice().iter_mut().zip(rhs.as_slice().iter()) {
        let lhs_nodata = match nodata {
            None => false,
            Some(nod) => {
                if T::HAS_NAN {
                    a.is_nan()
                } else {
                    *a == nod
                }
            }
        };

        if lhs_nodata || rhs.is_nodata_value(b) {
            if let Some(nod) = nodata {
                *a = nod;
            }
        } else {
            *a = op(*a, b);
        }
    }
}

fn scalar_inplace<T: ArrayNum, Metadata: ArrayMetadata>(ras: &mut DenseArray<T, Metadata>, scalar: T, op: impl Fn(T, T) -> T) {
    for i in 0..ras.len() {
        if ras.index_has_data(i) {
            ras[i] = op(ras[i], scalar);
        }
    }
}

macro_rules! dense_raster_arith_op {
    ($op_trait:ident, $op_assign_trait:ident, $op_fn:ident, $op_assign_fn:ident, $wrap_fn:ident) => {
        impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::$op_trait for &DenseArray<T, Metadata> {
            type Output = DenseArray<T, Metadata>;

            fn $op_fn(self, other: &DenseArray<T, Metadata>) -> DenseArray<T, Metadata> {
                binary_nodata_aware(self, other, |a, b| a.$wrap_fn(b))
            }
        }

        impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::$op_trait for DenseArray<T, Metadata> {
            type Output = DenseArray<T, Metadata>;

            fn $op_fn(mut self, other: DenseArray<T, Metadata>) -> DenseArray<T, Metadata> {
                binary_assign_nodata_aware(&mut self, &other, |a, b| a.$wrap_fn(b));
                self
            }
        }

        impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::$op_assign_trait<&DenseArray<T, Metadata>>
            for DenseArray<T, Metadata>
        {
            fn $op_assign_fn(&mut self, other: &DenseArray<T, Metadata>) {
                binary_assign_nodata_aware(self, other, |a, b| a.$wrap_fn(b));
            }
        }

        impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::$op_assign_trait<DenseArray<T, Metadata>>
            for DenseArray<T, Metadata>
        {
            fn $op_assign_fn(&mut self, other: DenseArray<T, Metadata>) {
                binary_assign_nodata_aware(self, &other, |a, b| a.$wrap_fn(b));
            }
        }

        impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::$op_trait<T> for DenseArray<T, Metadata> {
            type Output = DenseArray<T, Metadata>;

            fn $op_fn(mut self, scalar: T) -> DenseArray<T, Metadata> {
                scalar_inplace(&mut self, scalar, |a, b| a.$wrap_fn(b));
                self
            }
        }

        impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::$op_trait<T> for &DenseArray<T, Metadata> {
            type Output = DenseArray<T, Metadata>;

            fn $op_fn(self, scalar: T) -> DenseArray<T, Metadata> {
                let mut result = self.clone();
                scalar_inplace(&mut result, scalar, |a, b| a.$wrap_fn(b));
                result
            }
        }

        impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::$op_assign_trait<T> for DenseArray<T, Metadata> {
            fn $op_assign_fn(&mut self, scalar: T) {
                scalar_inplace(self, scalar, |a, b| a.$wrap_fn(b));
            }
        }
    };
}

dense_raster_arith_op!(Add, AddAssign, add, add_assign, add_wrap);
dense_raster_arith_op!(Sub, SubAssign, sub, sub_assign, sub_wrap);
dense_raster_arith_op!(Mul, MulAssign, mul, mul_assign, mul_wrap);

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::Div<&DenseArray<T, Metadata>> for &DenseArray<T, Metadata> {
    type Output = DenseArray<T::DivOutput, Metadata>;

    fn div(self, other: &DenseArray<T, Metadata>) -> Self::Output {
        assert_dimensions(self, other);

        let meta = self.metadata().with_nodata(Some(f64::NAN));
        let nodata = <T::DivOutput as ArrayNum>::default_nodata();

        let data = allocate::aligned_vec_from_iter(self.as_slice().iter().zip(other.as_slice().iter()).map(|(&a, &b)| {
            if self.is_nodata_value(a) || other.is_nodata_value(b) || b == T::zero() {
                nodata
            } else {
                let num: T::DivOutput = NumCast::from(a).unwrap_or(nodata);
                let den: T::DivOutput = NumCast::from(b).unwrap_or(nodata);
                num / den
            }
        }));

        DenseArray::from_parts(meta, Some(nodata), data)
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::Div<DenseArray<T, Metadata>> for DenseArray<T, Metadata> {
    type Output = DenseArray<T::DivOutput, Metadata>;

    fn div(self, other: DenseArray<T, Metadata>) -> Self::Output {
        &self / &other
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::DivAssign<&DenseArray<T, Metadata>> for DenseArray<T, Metadata> {
    fn div_assign(&mut self, other: &DenseArray<T, Metadata>) {
        assert_dimensions(self, other);

        // a zero divisor produces nodata, make sure a nodata value is available
        if self.metadata().nodata().is_none() {
            let nodata = derived_nodata::<T>(other.metadata().nodata(), None)
                .unwrap_or_else(|| T::default_nodata().to_f64().unwrap_or(f64::NAN));
            self.set_nodata_value(Some(nodata));
        }

        let nodata = self.nodata().expect("nodata value bug");
        for (a, &b) in self.data.iter_mut().zip(other.as_slice().iter()) {
            let lhs_nodata = if T::HAS_NAN { a.is_nan() } else { *a == nodata };
            if lhs_nodata || other.is_nodata_value(b) || b == T::zero() {
                *a = nodata;
            } else {
                *a = *a / b;
            }
        }
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::DivAssign<DenseArray<T, Metadata>> for DenseArray<T, Metadata> {
    fn div_assign(&mut self, other: DenseArray<T, Metadata>) {
        *self /= &other;
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::Div<T> for DenseArray<T, Metadata> {
    type Output = DenseArray<T, Metadata>;

    fn div(mut self, scalar: T) -> DenseArray<T, Metadata> {
        if scalar == T::zero() {
            panic!("Division by zero");
        }

        scalar_inplace(&mut self, scalar, |a, b| a / b);
        self
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::Div<T> for &DenseArray<T, Metadata> {
    type Output = DenseArray<T, Metadata>;

    fn div(self, scalar: T) -> DenseArray<T, Metadata> {
        self.clone() / scalar
    }
}

impl<T: ArrayNum, Metadata: ArrayMetadata> std::ops::DivAssign<T> for DenseArray<T, Metadata> {
    fn div_assign(&mut self, scalar: T) {
        if scalar == T::zero() {
            panic!("Division by zero");
        }

        scalar_inplace(self, scalar, |a, b| a / b);
    }
}

/// Unary negation, only available for signed element types. Negating an
/// unsigned raster is rejected at the type erased layer.
impl<T: ArrayNum + std::ops::Neg<Output = T>, Metadata: ArrayMetadata> std::ops::Neg for DenseArray<T, Metadata> {
    type Output = DenseArray<T, Metadata>;

    fn neg(mut self) -> DenseArray<T, Metadata> {
        for i in 0..self.len() {
            if self.index_has_data(i) {
                self[i] = -self[i];
            }
        }

        self
    }
}

impl<T: ArrayNum + std::ops::Neg<Output = T>, Metadata: ArrayMetadata> std::ops::Neg for &DenseArray<T, Metadata> {
    type Output = DenseArray<T, Metadata>;

    fn neg(self) -> DenseArray<T, Metadata> {
        -self.clone()
    }
}

const COMPARISON_NODATA: u8 = u8::MAX;

impl<T: ArrayNum, Metadata: ArrayMetadata> DenseArray<T, Metadata> {
    /// Add the other raster: nodata cells in this raster take the other
    /// raster's value instead of staying nodata. Used to build accumulators
    /// starting from an empty raster.
    pub fn add_or_assign(&mut self, other: &DenseArray<T, Metadata>) -> &mut Self {
        assert_dimensions(self, other);

        for i in 0..self.len() {
            if other.index_is_nodata(i) {
                continue;
            }

            let val = other[i];
            if self.index_is_nodata(i) {
                self[i] = val;
            } else {
                self[i] = self[i].add_wrap(val);
            }
        }

        self
    }

    pub fn add_or_assign_scalar(&mut self, value: T) -> &mut Self {
        for i in 0..self.len() {
            if self.index_is_nodata(i) {
                self[i] = value;
            } else {
                self[i] = self[i].add_wrap(value);
            }
        }

        self
    }

    fn comparison(&self, other: &DenseArray<T, Metadata>, pred: impl Fn(T, T) -> bool) -> DenseArray<u8, Metadata> {
        assert_dimensions(self, other);

        let has_nodata = self.metadata().nodata().is_some() || other.metadata().nodata().is_some();
        let meta = self.metadata().with_nodata(has_nodata.then_some(<f64 as From<u8>>::from(COMPARISON_NODATA)));

        let data = allocate::aligned_vec_from_iter(self.as_slice().iter().zip(other.as_slice().iter()).map(|(&a, &b)| {
            if self.is_nodata_value(a) || other.is_nodata_value(b) {
                COMPARISON_NODATA
            } else {
                <u8 as From<bool>>::from(pred(a, b))
            }
        }));

        DenseArray::from_parts(meta, has_nodata.then_some(COMPARISON_NODATA), data)
    }

    fn comparison_scalar(&self, value: T, pred: impl Fn(T, T) -> bool) -> DenseArray<u8, Metadata> {
        let has_nodata = self.metadata().nodata().is_some();
        let meta = self.metadata().with_nodata(has_nodata.then_some(<f64 as From<u8>>::from(COMPARISON_NODATA)));

        let data = allocate::aligned_vec_from_iter(self.as_slice().iter().map(|&a| {
            if self.is_nodata_value(a) {
                COMPARISON_NODATA
            } else {
                <u8 as From<bool>>::from(pred(a, value))
            }
        }));

        DenseArray::from_parts(meta, has_nodata.then_some(COMPARISON_NODATA), data)
    }

    pub fn equal_to(&self, other: &DenseArray<T, Metadata>) -> DenseArray<u8, Metadata> {
        self.comparison(other, |a, b| a == b)
    }

    pub fn not_equal_to(&self, other: &DenseArray<T, Metadata>) -> DenseArray<u8, Metadata> {
        self.comparison(other, |a, b| a != b)
    }

    pub fn greater_than(&self, other: &DenseArray<T, Metadata>) -> DenseArray<u8, Metadata> {
        self.comparison(other, |a, b| a > b)
    }

    pub fn greater_or_equal(&self, other: &DenseArray<T, Metadata>) -> DenseArray<u8, Metadata> {
        self.comparison(other, |a, b| a >= b)
    }

    pub fn less_than(&self, other: &DenseArray<T, Metadata>) -> DenseArray<u8, Metadata> {
        self.comparison(other, |a, b| a < b)
    }

    pub fn less_or_equal(&self, other: &DenseArray<T, Metadata>) -> DenseArray<u8, Metadata> {
        self.comparison(other, |a, b| a <= b)
    }

    pub fn equal_to_value(&self, value: T) -> DenseArray<u8, Metadata> {
        self.comparison_scalar(value, |a, b| a == b)
    }

    pub fn not_equal_to_value(&self, value: T) -> DenseArray<u8, Metadata> {
        self.comparison_scalar(value, |a, b| a != b)
    }

    pub fn greater_than_value(&self, value: T) -> DenseArray<u8, Metadata> {
        self.comparison_scalar(value, |a, b| a > b)
    }

    pub fn greater_or_equal_value(&self, value: T) -> DenseArray<u8, Metadata> {
        self.comparison_scalar(value, |a, b| a >= b)
    }

    pub fn less_than_value(&self, value: T) -> DenseArray<u8, Metadata> {
        self.comparison_scalar(value, |a, b| a < b)
    }

    pub fn less_or_equal_value(&self, value: T) -> DenseArray<u8, Metadata> {
        self.comparison_scalar(value, |a, b| a <= b)
    }

    pub fn logical_and(&self, other: &DenseArray<T, Metadata>) -> DenseArray<u8, Metadata> {
        self.comparison(other, |a, b| a != T::zero() && b != T::zero())
    }

    pub fn logical_or(&self, other: &DenseArray<T, Metadata>) -> DenseArray<u8, Metadata> {
        self.comparison(other, |a, b| a != T::zero() || b != T::zero())
    }

    pub fn logical_not(&self) -> DenseArray<u8, Metadata> {
        self.comparison_scalar(T::zero(), |a, zero| a == zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{nan, test_metadata};

    fn int_raster(data: Vec<i32>) -> DenseArray<i32> {
        DenseArray::new(test_metadata(2, 2, Some(-1.0)), data).unwrap()
    }

    #[test]
    fn addition_propagates_nodata() {
        let lhs = int_raster(vec![1, 2, -1, 4]);
        let rhs = int_raster(vec![10, -1, 30, 40]);

        let result = &lhs + &rhs;
        assert_eq!(result.masked_data(), vec![Some(11), None, None, Some(44)]);
        assert_eq!(result.metadata().nodata(), Some(-1.0));
    }

    #[test]
    fn nodata_value_is_inherited_from_the_right_operand_when_the_left_has_none() {
        let lhs = DenseArray::<i32>::new(test_metadata(2, 2, None), vec![1, 2, 3, 4]).unwrap();
        let rhs = int_raster(vec![10, -1, 30, 40]);

        let result = &lhs + &rhs;
        assert_eq!(result.metadata().nodata(), Some(-1.0));
        assert_eq!(result.masked_data(), vec![Some(11), None, Some(33), Some(44)]);
    }

    #[test]
    fn compound_assignment_keeps_the_left_side_nodata() {
        let mut lhs = int_raster(vec![1, -1, 3, 4]);
        let rhs = int_raster(vec![10, 20, 30, 40]);

        lhs += &rhs;
        assert_eq!(lhs.masked_data(), vec![Some(11), None, Some(33), Some(44)]);
    }

    #[test]
    fn add_or_assign_overwrites_the_left_side_nodata() {
        let mut lhs = int_raster(vec![1, -1, 3, 4]);
        let rhs = int_raster(vec![10, 20, -1, 40]);

        lhs.add_or_assign(&rhs);
        assert_eq!(lhs.masked_data(), vec![Some(11), Some(20), Some(3), Some(44)]);
    }

    #[test]
    fn division_produces_float_with_nan_nodata() {
        let lhs = int_raster(vec![10, 9, -1, 8]);
        let rhs = int_raster(vec![2, 0, 4, -1]);

        let result = &lhs / &rhs;
        assert_eq!(result.value(0), Some(5.0));
        assert!(result[1usize].is_nan()); // division by zero
        assert!(result[2usize].is_nan());
        assert!(result[3usize].is_nan());
        assert!(result.metadata().nodata().unwrap().is_nan());
    }

    #[test]
    fn float_division_stays_in_the_same_width() {
        let meta = test_metadata(1, 2, Some(nan()));
        let lhs = DenseArray::<f32, _>::new(meta.clone(), vec![1.0, 3.0]).unwrap();
        let rhs = DenseArray::<f32, _>::new(meta, vec![2.0, 0.0]).unwrap();

        let result: DenseArray<f32, _> = &lhs / &rhs;
        assert_eq!(result.value(0), Some(0.5));
        assert_eq!(result.value(1), None);
    }

    #[test]
    fn scalar_operations_skip_nodata() {
        let ras = int_raster(vec![1, -1, 3, 4]);
        let result = &ras * 2;
        assert_eq!(result.masked_data(), vec![Some(2), None, Some(6), Some(8)]);
    }

    #[test]
    #[should_panic(expected = "Division by zero")]
    fn scalar_division_by_zero_panics() {
        let _ = int_raster(vec![1, 2, 3, 4]) / 0;
    }

    #[test]
    fn negation_preserves_nodata() {
        let ras = int_raster(vec![1, -1, 3, -4]);
        let result = -ras;
        assert_eq!(result.masked_data(), vec![Some(-1), None, Some(-3), Some(4)]);
    }

    #[test]
    fn comparisons_use_the_byte_nodata_sentinel() {
        let lhs = int_raster(vec![1, 2, -1, 4]);
        let rhs = int_raster(vec![2, 2, 3, -1]);

        let result = lhs.less_than(&rhs);
        assert_eq!(result.as_slice(), &[1, 0, 255, 255]);
        assert_eq!(result.metadata().nodata(), Some(255.0));
        assert_eq!(result.masked_data(), vec![Some(1), Some(0), None, None]);

        let result = lhs.greater_than_value(1);
        assert_eq!(result.as_slice(), &[0, 1, 255, 1]);
    }

    #[test]
    fn comparison_without_nodata_has_no_sentinel() {
        let meta = test_metadata(2, 2, None);
        let lhs = DenseArray::<i32>::new(meta.clone(), vec![1, 2, 3, 4]).unwrap();
        let rhs = DenseArray::<i32>::new(meta, vec![2, 2, 2, 2]).unwrap();

        let result = lhs.greater_or_equal(&rhs);
        assert_eq!(result.metadata().nodata(), None);
        assert_eq!(result.as_slice(), &[0, 1, 1, 1]);
    }

    #[test]
    fn logical_operators() {
        let lhs = int_raster(vec![0, 2, -1, 4]);
        let rhs = int_raster(vec![1, 0, 3, 4]);

        assert_eq!(lhs.logical_and(&rhs).as_slice(), &[0, 0, 255, 1]);
        assert_eq!(lhs.logical_or(&rhs).as_slice(), &[1, 1, 255, 1]);
        assert_eq!(lhs.logical_not().as_slice(), &[1, 0, 255, 0]);
    }
}
