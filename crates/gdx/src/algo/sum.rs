use num::{ToPrimitive, Zero};

use crate::Array;

/// Sum of the data values accumulated in double precision.
pub fn sum<R: Array>(ras: &R) -> f64 {
    ras.sum()
}

/// Sum of the data values accumulated in the element type.
pub fn ssum<R: Array>(ras: &R) -> f64 {
    let mut acc = R::Pixel::zero();
    for v in ras.iter_values() {
        acc = acc + v;
    }

    acc.to_f64().unwrap_or(f64::NAN)
}
