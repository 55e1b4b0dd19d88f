//! Slice level helpers for the nodata dual representation of floating point
//! rasters: the user facing sentinel on disk, quiet NaN in memory.

use crate::ArrayNum;

/// Replace the user facing nodata value with the in-memory NaN representation.
/// No-op for integral element types, they store the sentinel directly.
pub fn process_nodata<T: ArrayNum>(data: &mut [T], nodata: Option<T>) {
    if !T::HAS_NAN {
        return;
    }

    if let Some(nod) = nodata {
        if nod.is_nan() {
            return;
        }

        for v in data.iter_mut() {
            if *v == nod {
                *v = T::default_nodata();
            }
        }
    }
}

/// Replace the in-memory NaN representation with the user facing nodata value,
/// used before serialization. No-op for integral element types.
pub fn restore_nodata<T: ArrayNum>(data: &mut [T], nodata: Option<T>) {
    if !T::HAS_NAN {
        return;
    }

    if let Some(nod) = nodata {
        if nod.is_nan() {
            return;
        }

        for v in data.iter_mut() {
            if v.is_nan() {
                *v = nod;
            }
        }
    }
}

#[cfg(feature = "simd")]
pub mod simd {
    //! Vectorised variants of the nodata canonicalisation for the floating
    //! point element types. The head of the slice that does not fill a full
    //! vector is handled by the scalar path, observable behaviour matches the
    //! scalar functions exactly.

    use std::simd::{cmp::SimdPartialEq, num::SimdFloat, Simd};

    const LANES: usize = inf::simd::LANES;

    macro_rules! nodata_simd_impl {
        ($process:ident, $restore:ident, $t:ty) => {
            pub fn $process(data: &mut [$t], nodata: Option<$t>) {
                let Some(nod) = nodata else { return };
                if nod.is_nan() {
                    return;
                }

                let (head, chunks) = as_simd_chunks::<$t>(data);
                super::process_nodata(head, nodata);

                let nodata_vec = Simd::<$t, LANES>::splat(nod);
                let nan_vec = Simd::<$t, LANES>::splat(<$t>::NAN);
                for chunk in chunks {
                    let v = Simd::<$t, LANES>::from_slice(chunk);
                    v.simd_eq(nodata_vec).select(nan_vec, v).copy_to_slice(chunk);
                }
            }

            pub fn $restore(data: &mut [$t], nodata: Option<$t>) {
                let Some(nod) = nodata else { return };
                if nod.is_nan() {
                    return;
                }

                let (head, chunks) = as_simd_chunks::<$t>(data);
                super::restore_nodata(head, nodata);

                let nodata_vec = Simd::<$t, LANES>::splat(nod);
                for chunk in chunks {
                    let v = Simd::<$t, LANES>::from_slice(chunk);
                    v.is_nan().select(nodata_vec, v).copy_to_slice(chunk);
                }
            }
        };
    }

    fn as_simd_chunks<T>(data: &mut [T]) -> (&mut [T], std::slice::ChunksExactMut<T>) {
        let rem = data.len() % LANES;
        let (head, tail) = data.split_at_mut(rem);
        (head, tail.chunks_exact_mut(LANES))
    }

    nodata_simd_impl!(process_nodata_f32, restore_nodata_f32, f32);
    nodata_simd_impl!(process_nodata_f64, restore_nodata_f64, f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_nodata_is_canonicalized_to_nan() {
        let mut data = vec![1.0f32, -9999.0, 2.0, -9999.0];
        process_nodata(&mut data, Some(-9999.0));
        assert_eq!(data[0], 1.0);
        assert!(data[1].is_nan());
        assert_eq!(data[2], 2.0);
        assert!(data[3].is_nan());

        restore_nodata(&mut data, Some(-9999.0));
        assert_eq!(data, vec![1.0, -9999.0, 2.0, -9999.0]);
    }

    #[test]
    fn integral_data_is_untouched() {
        let mut data = vec![1i32, -9999, 2];
        process_nodata(&mut data, Some(-9999));
        assert_eq!(data, vec![1, -9999, 2]);
    }

    #[cfg(feature = "simd")]
    #[test]
    fn simd_path_matches_the_scalar_contract() {
        let mut scalar: Vec<f32> = (0..37).map(|v| if v % 5 == 0 { -9999.0 } else { v as f32 }).collect();
        let mut vectorised = scalar.clone();

        process_nodata(&mut scalar, Some(-9999.0));
        super::simd::process_nodata_f32(&mut vectorised, Some(-9999.0));
        assert!(scalar.iter().zip(vectorised.iter()).all(|(a, b)| (a.is_nan() && b.is_nan()) || a == b));

        restore_nodata(&mut scalar, Some(-9999.0));
        super::simd::restore_nodata_f32(&mut vectorised, Some(-9999.0));
        assert_eq!(scalar, vectorised);
    }
}
