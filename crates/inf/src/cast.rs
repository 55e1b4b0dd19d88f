//! Checked numeric conversions used throughout the raster code.

use num::{NumCast, ToPrimitive};

use crate::{Error, Result};

/// Cast an optional value, `None` stays `None`.
/// Values that are not representable in the destination type also become `None`.
pub fn option<T: NumCast>(value: Option<f64>) -> Option<T> {
    value.and_then(|v| NumCast::from(v))
}

/// Cast a value to the destination type, fails when the value is not representable.
pub fn checked<T: NumCast>(value: f64) -> Result<T> {
    NumCast::from(value).ok_or_else(|| Error::InvalidCast(format!("Value {value} is not representable in the destination type")))
}

pub fn fits_in_type<T: NumCast>(value: f64) -> bool {
    <T as NumCast>::from(value).is_some()
}

/// Cast both ends of a range, fails when one of the ends is not representable.
pub fn range<TDest: NumCast, TSrc: ToPrimitive + Copy>(r: std::ops::Range<TSrc>) -> Result<std::ops::Range<TDest>> {
    let start: TDest = r
        .start
        .to_f64()
        .and_then(|v| NumCast::from(v))
        .ok_or_else(|| Error::InvalidCast("Range start is not representable in the destination type".to_string()))?;
    let end: TDest = r
        .end
        .to_f64()
        .and_then(|v| NumCast::from(v))
        .ok_or_else(|| Error::InvalidCast("Range end is not representable in the destination type".to_string()))?;

    Ok(start..end)
}

/// Cast every element of a slice, fails when an element is not representable.
pub fn slice<T: NumCast>(values: &[f64]) -> Result<Vec<T>> {
    values.iter().map(|&v| checked(v)).collect()
}
