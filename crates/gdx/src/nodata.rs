//! Rules for carrying nodata values across element types.

use num::{NumCast, ToPrimitive};

use crate::ArrayNum;

/// Cast a nodata value to the given element type.
/// When the value is not representable the type sentinel is used instead:
/// the maximum value for integral types, NaN for floating point types.
pub fn nodata_cast<T: ArrayNum>(nodata: f64) -> T {
    if nodata.is_nan() && !T::HAS_NAN {
        return T::max_value();
    }

    match NumCast::from(nodata) {
        Some(val) => val,
        None => T::default_nodata(),
    }
}

/// [`nodata_cast`] on the metadata representation of a nodata value.
pub fn nodata_cast_opt<T: ArrayNum>(nodata: Option<f64>) -> Option<f64> {
    nodata.map(|nod| nodata_cast::<T>(nod).to_f64().unwrap_or(f64::NAN))
}

/// Nodata value for the result of a binary operation with element type `T`:
/// the left operand's nodata when present, otherwise the right operand's,
/// cast to the result type when representable.
pub(crate) fn derived_nodata<T: ArrayNum>(lhs: Option<f64>, rhs: Option<f64>) -> Option<f64> {
    match (lhs, rhs) {
        (Some(nod), _) => nodata_cast_opt::<T>(Some(nod)),
        (None, Some(nod)) => nodata_cast_opt::<T>(Some(nod)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn representable_values_are_kept() {
        assert_eq!(nodata_cast::<u8>(255.0), 255);
        assert_eq!(nodata_cast::<i32>(-9999.0), -9999);
        assert_eq!(nodata_cast::<f32>(-9999.0), -9999.0);
    }

    #[test]
    fn unrepresentable_values_use_the_type_sentinel() {
        assert_eq!(nodata_cast::<u8>(-9999.0), u8::MAX);
        assert_eq!(nodata_cast::<i16>(1e9), i16::MAX);
        assert_eq!(nodata_cast::<u32>(f64::NAN), u32::MAX);
        assert!(nodata_cast::<f32>(f64::NAN).is_nan());
    }

    #[test]
    fn derived_nodata_prefers_the_left_operand() {
        assert_eq!(derived_nodata::<i32>(Some(-1.0), Some(-2.0)), Some(-1.0));
        assert_eq!(derived_nodata::<i32>(None, Some(-2.0)), Some(-2.0));
        assert_eq!(derived_nodata::<i32>(None, None), None);
        assert_eq!(derived_nodata::<u8>(Some(-1.0), None), Some(<f64 as From<u8>>::from(u8::MAX)));
    }
}
