use inf::cast;

use crate::{algo, Array, ArrayDataType, ArrayMetadata, ArrayNum, Cell, DenseArray, Error, RasterMetadata, RasterSize, Result};

/// Type erased dense raster over the eight supported element types.
/// Used where the element type is only known at runtime: file I/O and the
/// command line tools. Dispatch happens once per operation, never per cell.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyDenseArray<Metadata: ArrayMetadata = RasterMetadata> {
    U8(DenseArray<u8, Metadata>),
    U16(DenseArray<u16, Metadata>),
    U32(DenseArray<u32, Metadata>),
    I16(DenseArray<i16, Metadata>),
    I32(DenseArray<i32, Metadata>),
    I64(DenseArray<i64, Metadata>),
    F32(DenseArray<f32, Metadata>),
    F64(DenseArray<f64, Metadata>),
}

macro_rules! dispatch {
    ($self:expr, $raster:ident => $action:expr) => {
        match $self {
            $crate::anydensearray::AnyDenseArray::U8($raster) => $action,
            $crate::anydensearray::AnyDenseArray::U16($raster) => $action,
            $crate::anydensearray::AnyDenseArray::U32($raster) => $action,
            $crate::anydensearray::AnyDenseArray::I16($raster) => $action,
            $crate::anydensearray::AnyDenseArray::I32($raster) => $action,
            $crate::anydensearray::AnyDenseArray::I64($raster) => $action,
            $crate::anydensearray::AnyDenseArray::F32($raster) => $action,
            $crate::anydensearray::AnyDenseArray::F64($raster) => $action,
        }
    };
}

pub(crate) use dispatch;

impl<Metadata: ArrayMetadata> AnyDenseArray<Metadata> {
    pub fn filled_with(fill: Option<f64>, metadata: Metadata, datatype: ArrayDataType) -> Self {
        match datatype {
            ArrayDataType::Uint8 => AnyDenseArray::U8(DenseArray::filled_with(cast::option::<u8>(fill), metadata)),
            ArrayDataType::Uint16 => AnyDenseArray::U16(DenseArray::filled_with(cast::option::<u16>(fill), metadata)),
            ArrayDataType::Uint32 => AnyDenseArray::U32(DenseArray::filled_with(cast::option::<u32>(fill), metadata)),
            ArrayDataType::Int16 => AnyDenseArray::I16(DenseArray::filled_with(cast::option::<i16>(fill), metadata)),
            ArrayDataType::Int32 => AnyDenseArray::I32(DenseArray::filled_with(cast::option::<i32>(fill), metadata)),
            ArrayDataType::Int64 => AnyDenseArray::I64(DenseArray::filled_with(cast::option::<i64>(fill), metadata)),
            ArrayDataType::Float32 => AnyDenseArray::F32(DenseArray::filled_with(cast::option::<f32>(fill), metadata)),
            ArrayDataType::Float64 => AnyDenseArray::F64(DenseArray::filled_with(cast::option::<f64>(fill), metadata)),
        }
    }

    pub fn data_type(&self) -> ArrayDataType {
        match self {
            AnyDenseArray::U8(_) => ArrayDataType::Uint8,
            AnyDenseArray::U16(_) => ArrayDataType::Uint16,
            AnyDenseArray::U32(_) => ArrayDataType::Uint32,
            AnyDenseArray::I16(_) => ArrayDataType::Int16,
            AnyDenseArray::I32(_) => ArrayDataType::Int32,
            AnyDenseArray::I64(_) => ArrayDataType::Int64,
            AnyDenseArray::F32(_) => ArrayDataType::Float32,
            AnyDenseArray::F64(_) => ArrayDataType::Float64,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        dispatch!(self, raster => raster.metadata())
    }

    pub fn size(&self) -> RasterSize {
        dispatch!(self, raster => raster.size())
    }

    pub fn len(&self) -> usize {
        dispatch!(self, raster => raster.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nodata_count(&self) -> usize {
        dispatch!(self, raster => raster.nodata_count())
    }

    /// The value at the given cell as double precision, `None` for nodata.
    pub fn cell_value(&self, cell: Cell) -> Option<f64> {
        use num::ToPrimitive;
        dispatch!(self, raster => raster.cell_value(cell).and_then(|v| v.to_f64()))
    }

    pub fn sum(&self) -> f64 {
        dispatch!(self, raster => raster.sum())
    }

    pub fn min_max(&self) -> Result<std::ops::Range<f64>> {
        Ok(dispatch!(self, raster => cast::range::<f64, _>(algo::min_max(raster))?))
    }

    /// Rewrite the in-memory NaN nodata representation to the user facing
    /// sentinel, used before serialization.
    pub fn collapse_data(&mut self) {
        dispatch!(self, raster => raster.collapse_data());
    }

    pub fn cast_to<T: ArrayNum>(&self) -> DenseArray<T, Metadata> {
        dispatch!(self, raster => algo::cast::<T, _>(raster))
    }

    pub fn cast(&self, data_type: ArrayDataType) -> AnyDenseArray<Metadata> {
        match data_type {
            ArrayDataType::Uint8 => AnyDenseArray::U8(self.cast_to::<u8>()),
            ArrayDataType::Uint16 => AnyDenseArray::U16(self.cast_to::<u16>()),
            ArrayDataType::Uint32 => AnyDenseArray::U32(self.cast_to::<u32>()),
            ArrayDataType::Int16 => AnyDenseArray::I16(self.cast_to::<i16>()),
            ArrayDataType::Int32 => AnyDenseArray::I32(self.cast_to::<i32>()),
            ArrayDataType::Int64 => AnyDenseArray::I64(self.cast_to::<i64>()),
            ArrayDataType::Float32 => AnyDenseArray::F32(self.cast_to::<f32>()),
            ArrayDataType::Float64 => AnyDenseArray::F64(self.cast_to::<f64>()),
        }
    }

    /// Keep only the cells carrying one of the listed values, every other
    /// cell becomes nodata.
    pub fn filter(&mut self, values_to_include: &[f64]) -> Result {
        match self {
            AnyDenseArray::U8(raster) => algo::filter_in_place(raster, &cast::slice::<u8>(values_to_include)?),
            AnyDenseArray::U16(raster) => algo::filter_in_place(raster, &cast::slice::<u16>(values_to_include)?),
            AnyDenseArray::U32(raster) => algo::filter_in_place(raster, &cast::slice::<u32>(values_to_include)?),
            AnyDenseArray::I16(raster) => algo::filter_in_place(raster, &cast::slice::<i16>(values_to_include)?),
            AnyDenseArray::I32(raster) => algo::filter_in_place(raster, &cast::slice::<i32>(values_to_include)?),
            AnyDenseArray::I64(raster) => algo::filter_in_place(raster, &cast::slice::<i64>(values_to_include)?),
            AnyDenseArray::F32(raster) => algo::filter_in_place(raster, &cast::slice::<f32>(values_to_include)?),
            AnyDenseArray::F64(raster) => algo::filter_in_place(raster, &cast::slice::<f64>(values_to_include)?),
        }

        Ok(())
    }

    /// Replace every occurrence of a value by another value.
    pub fn replace_value(&mut self, old_value: f64, new_value: f64) -> Result {
        match self {
            AnyDenseArray::U8(raster) => algo::replace_value_in_place(raster, cast::checked(old_value)?, cast::checked(new_value)?),
            AnyDenseArray::U16(raster) => algo::replace_value_in_place(raster, cast::checked(old_value)?, cast::checked(new_value)?),
            AnyDenseArray::U32(raster) => algo::replace_value_in_place(raster, cast::checked(old_value)?, cast::checked(new_value)?),
            AnyDenseArray::I16(raster) => algo::replace_value_in_place(raster, cast::checked(old_value)?, cast::checked(new_value)?),
            AnyDenseArray::I32(raster) => algo::replace_value_in_place(raster, cast::checked(old_value)?, cast::checked(new_value)?),
            AnyDenseArray::I64(raster) => algo::replace_value_in_place(raster, cast::checked(old_value)?, cast::checked(new_value)?),
            AnyDenseArray::F32(raster) => algo::replace_value_in_place(raster, cast::checked(old_value)?, cast::checked(new_value)?),
            AnyDenseArray::F64(raster) => algo::replace_value_in_place(raster, cast::checked(old_value)?, cast::checked(new_value)?),
        }

        Ok(())
    }

    /// Rescale the data values onto the byte range [0, 254], 255 stays
    /// reserved for nodata.
    pub fn normalise_to_byte(&self) -> DenseArray<u8, Metadata> {
        dispatch!(self, raster => algo::normalise_min_max::<u8, _, _>(raster, 0, 254))
    }

    /// Unary negation: an argument error for unsigned element types, the
    /// signed element types negate in place with nodata preserved.
    pub fn neg(&self) -> Result<AnyDenseArray<Metadata>> {
        match self {
            AnyDenseArray::U8(_) | AnyDenseArray::U16(_) | AnyDenseArray::U32(_) => Err(Error::Runtime(
                "Minus operator applied to an unsigned raster".to_string(),
            )),
            AnyDenseArray::I16(raster) => Ok(AnyDenseArray::I16(-raster)),
            AnyDenseArray::I32(raster) => Ok(AnyDenseArray::I32(-raster)),
            AnyDenseArray::I64(raster) => Ok(AnyDenseArray::I64(-raster)),
            AnyDenseArray::F32(raster) => Ok(AnyDenseArray::F32(-raster)),
            AnyDenseArray::F64(raster) => Ok(AnyDenseArray::F64(-raster)),
        }
    }
}

macro_rules! any_dense_array_try_from {
    ($t:ty, $variant:ident) => {
        impl<'a, Metadata: ArrayMetadata> TryFrom<&'a AnyDenseArray<Metadata>> for &'a DenseArray<$t, Metadata> {
            type Error = Error;

            fn try_from(value: &'a AnyDenseArray<Metadata>) -> Result<&'a DenseArray<$t, Metadata>> {
                match value {
                    AnyDenseArray::$variant(raster) => Ok(raster),
                    _ => Err(Error::InvalidArgument(format!(
                        "Raster does not contain {} data",
                        <$t as ArrayNum>::TYPE
                    ))),
                }
            }
        }

        impl<Metadata: ArrayMetadata> TryFrom<AnyDenseArray<Metadata>> for DenseArray<$t, Metadata> {
            type Error = Error;

            fn try_from(value: AnyDenseArray<Metadata>) -> Result<DenseArray<$t, Metadata>> {
                match value {
                    AnyDenseArray::$variant(raster) => Ok(raster),
                    _ => Err(Error::InvalidArgument(format!(
                        "Raster does not contain {} data",
                        <$t as ArrayNum>::TYPE
                    ))),
                }
            }
        }

        impl<Metadata: ArrayMetadata> From<DenseArray<$t, Metadata>> for AnyDenseArray<Metadata> {
            fn from(raster: DenseArray<$t, Metadata>) -> Self {
                AnyDenseArray::$variant(raster)
            }
        }
    };
}

any_dense_array_try_from!(u8, U8);
any_dense_array_try_from!(u16, U16);
any_dense_array_try_from!(u32, U32);
any_dense_array_try_from!(i16, I16);
any_dense_array_try_from!(i32, I32);
any_dense_array_try_from!(i64, I64);
any_dense_array_try_from!(f32, F32);
any_dense_array_try_from!(f64, F64);
