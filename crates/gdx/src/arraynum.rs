use crate::ArrayDataType;

/// Type requirements for raster elements.
pub trait ArrayNum:
    Copy
    + PartialEq
    + PartialOrd
    + std::fmt::Debug
    + std::fmt::Display
    + num::Num
    + num::NumCast
    + num::Bounded
    + num::traits::NumAssignOps
    + approx::AbsDiffEq<Epsilon = Self>
    + 'static
{
    const TYPE: ArrayDataType;
    const IS_SIGNED: bool;
    const HAS_NAN: bool;

    /// Element type of a division result, always floating point.
    type DivOutput: ArrayNum;

    fn is_nan(self) -> bool;

    /// The sentinel used when a nodata value cannot be represented in this
    /// type: the maximum value for integral types, NaN for floating point.
    fn default_nodata() -> Self;

    fn add_wrap(self, other: Self) -> Self;
    fn sub_wrap(self, other: Self) -> Self;
    fn mul_wrap(self, other: Self) -> Self;
}

macro_rules! arraynum_int_impl {
    ($t:ty, $raster_type:ident, $signed:expr) => {
        impl ArrayNum for $t {
            const TYPE: ArrayDataType = ArrayDataType::$raster_type;
            const IS_SIGNED: bool = $signed;
            const HAS_NAN: bool = false;

            type DivOutput = f64;

            #[inline]
            fn is_nan(self) -> bool {
                false
            }

            #[inline]
            fn default_nodata() -> Self {
                <$t>::MAX
            }

            #[inline]
            fn add_wrap(self, other: Self) -> Self {
                self.wrapping_add(other)
            }

            #[inline]
            fn sub_wrap(self, other: Self) -> Self {
                self.wrapping_sub(other)
            }

            #[inline]
            fn mul_wrap(self, other: Self) -> Self {
                self.wrapping_mul(other)
            }
        }
    };
}

macro_rules! arraynum_fp_impl {
    ($t:ty, $raster_type:ident) => {
        impl ArrayNum for $t {
            const TYPE: ArrayDataType = ArrayDataType::$raster_type;
            const IS_SIGNED: bool = true;
            const HAS_NAN: bool = true;

            type DivOutput = $t;

            #[inline]
            fn is_nan(self) -> bool {
                <$t>::is_nan(self)
            }

            #[inline]
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            #[inline]
            fn add_wrap(self, other: Self) -> Self {
                self + other
            }

            #[inline]
            fn sub_wrap(self, other: Self) -> Self {
                self - other
            }

            #[inline]
            fn mul_wrap(self, other: Self) -> Self {
                self * other
            }
        }
    };
}

arraynum_int_impl!(u8, Uint8, false);
arraynum_int_impl!(u16, Uint16, false);
arraynum_int_impl!(u32, Uint32, false);
arraynum_int_impl!(i16, Int16, true);
arraynum_int_impl!(i32, Int32, true);
arraynum_int_impl!(i64, Int64, true);

arraynum_fp_impl!(f32, Float32);
arraynum_fp_impl!(f64, Float64);
