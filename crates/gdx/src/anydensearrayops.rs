//! Arithmetic and comparison operators on the type erased raster handle.
//! Binary operations cast both operands to the promoted result type and run
//! the strongly typed kernel; divisions promote to floating point.

use crate::{anydensearray::dispatch, AnyDenseArray, ArrayDataType, ArrayMetadata, DenseArray};

fn promoted_operands<Metadata: ArrayMetadata>(
    lhs: &AnyDenseArray<Metadata>,
    rhs: &AnyDenseArray<Metadata>,
    output_type: ArrayDataType,
) -> (AnyDenseArray<Metadata>, AnyDenseArray<Metadata>) {
    (lhs.cast(output_type), rhs.cast(output_type))
}

macro_rules! any_dense_array_arith_op {
    ($op_trait:ident, $op_fn:ident) => {
        impl<Metadata: ArrayMetadata> std::ops::$op_trait for &AnyDenseArray<Metadata> {
            type Output = AnyDenseArray<Metadata>;

            fn $op_fn(self, other: &AnyDenseArray<Metadata>) -> AnyDenseArray<Metadata> {
                let output_type = ArrayDataType::promote(self.data_type(), other.data_type());
                let (lhs, rhs) = promoted_operands(self, other, output_type);

                match (lhs, rhs) {
                    (AnyDenseArray::U8(l), AnyDenseArray::U8(r)) => AnyDenseArray::U8((&l).$op_fn(&r)),
                    (AnyDenseArray::U16(l), AnyDenseArray::U16(r)) => AnyDenseArray::U16((&l).$op_fn(&r)),
                    (AnyDenseArray::U32(l), AnyDenseArray::U32(r)) => AnyDenseArray::U32((&l).$op_fn(&r)),
                    (AnyDenseArray::I16(l), AnyDenseArray::I16(r)) => AnyDenseArray::I16((&l).$op_fn(&r)),
                    (AnyDenseArray::I32(l), AnyDenseArray::I32(r)) => AnyDenseArray::I32((&l).$op_fn(&r)),
                    (AnyDenseArray::I64(l), AnyDenseArray::I64(r)) => AnyDenseArray::I64((&l).$op_fn(&r)),
                    (AnyDenseArray::F32(l), AnyDenseArray::F32(r)) => AnyDenseArray::F32((&l).$op_fn(&r)),
                    (AnyDenseArray::F64(l), AnyDenseArray::F64(r)) => AnyDenseArray::F64((&l).$op_fn(&r)),
                    _ => unreachable!("both operands are cast to the promoted type"),
                }
            }
        }

        impl<Metadata: ArrayMetadata> std::ops::$op_trait for AnyDenseArray<Metadata> {
            type Output = AnyDenseArray<Metadata>;

            fn $op_fn(self, other: AnyDenseArray<Metadata>) -> AnyDenseArray<Metadata> {
                (&self).$op_fn(&other)
            }
        }
    };
}

any_dense_array_arith_op!(Add, add);
any_dense_array_arith_op!(Sub, sub);
any_dense_array_arith_op!(Mul, mul);

impl<Metadata: ArrayMetadata> std::ops::Div for &AnyDenseArray<Metadata> {
    type Output = AnyDenseArray<Metadata>;

    fn div(self, other: &AnyDenseArray<Metadata>) -> AnyDenseArray<Metadata> {
        let output_type = ArrayDataType::promote_division(self.data_type(), other.data_type());

        match output_type {
            ArrayDataType::Float32 => AnyDenseArray::F32(&self.cast_to::<f32>() / &other.cast_to::<f32>()),
            _ => AnyDenseArray::F64(&self.cast_to::<f64>() / &other.cast_to::<f64>()),
        }
    }
}

impl<Metadata: ArrayMetadata> std::ops::Div for AnyDenseArray<Metadata> {
    type Output = AnyDenseArray<Metadata>;

    fn div(self, other: AnyDenseArray<Metadata>) -> AnyDenseArray<Metadata> {
        &self / &other
    }
}

macro_rules! any_dense_array_comparison {
    ($method:ident) => {
        impl<Metadata: ArrayMetadata> AnyDenseArray<Metadata> {
            pub fn $method(&self, other: &AnyDenseArray<Metadata>) -> DenseArray<u8, Metadata> {
                let output_type = ArrayDataType::promote(self.data_type(), other.data_type());
                let (lhs, rhs) = promoted_operands(self, other, output_type);

                match (&lhs, &rhs) {
                    (AnyDenseArray::U8(l), AnyDenseArray::U8(r)) => l.$method(r),
                    (AnyDenseArray::U16(l), AnyDenseArray::U16(r)) => l.$method(r),
                    (AnyDenseArray::U32(l), AnyDenseArray::U32(r)) => l.$method(r),
                    (AnyDenseArray::I16(l), AnyDenseArray::I16(r)) => l.$method(r),
                    (AnyDenseArray::I32(l), AnyDenseArray::I32(r)) => l.$method(r),
                    (AnyDenseArray::I64(l), AnyDenseArray::I64(r)) => l.$method(r),
                    (AnyDenseArray::F32(l), AnyDenseArray::F32(r)) => l.$method(r),
                    (AnyDenseArray::F64(l), AnyDenseArray::F64(r)) => l.$method(r),
                    _ => unreachable!("both operands are cast to the promoted type"),
                }
            }
        }
    };
}

any_dense_array_comparison!(equal_to);
any_dense_array_comparison!(not_equal_to);
any_dense_array_comparison!(greater_than);
any_dense_array_comparison!(greater_or_equal);
any_dense_array_comparison!(less_than);
any_dense_array_comparison!(less_or_equal);

impl<Metadata: ArrayMetadata> AnyDenseArray<Metadata> {
    /// Sum of two rasters where nodata on one side takes the other side's
    /// value, dispatched on the left operand's element type.
    pub fn add_or_assign(&mut self, other: &AnyDenseArray<Metadata>) {
        let other = other.cast(self.data_type());
        dispatch!(self, raster => {
            raster.add_or_assign((&other).try_into().expect("operand was cast to the matching type"));
        });
    }
}
