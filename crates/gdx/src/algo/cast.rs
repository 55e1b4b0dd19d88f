use num::NumCast;

use crate::{nodata::nodata_cast_opt, Array, ArrayMetadata, ArrayNum};

/// Cast the raster to another element type.
/// The nodata value is carried over when it is representable in the
/// destination type, otherwise the destination type sentinel is used.
/// Data values that do not fit the destination type become nodata.
pub fn cast<TDest: ArrayNum, R: Array>(ras: &R) -> R::WithPixelType<TDest> {
    let meta = ras.metadata().with_nodata(nodata_cast_opt::<TDest>(ras.metadata().nodata()));

    R::WithPixelType::<TDest>::from_iter_opt(meta, ras.iter_opt().map(|v| v.and_then(|v| NumCast::from(v))))
        .expect("Raster cast bug")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testutils::test_metadata, DenseArray};

    #[test]
    fn cast_carries_the_nodata_value_when_representable() {
        let ras = DenseArray::<i32>::new(test_metadata(1, 3, Some(-1.0)), vec![1, -1, 3]).unwrap();

        let result = cast::<f32, _>(&ras);
        assert_eq!(result.metadata().nodata(), Some(-1.0));
        assert_eq!(result.masked_data(), vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn cast_uses_the_type_sentinel_when_not_representable() {
        let ras = DenseArray::<i32>::new(test_metadata(1, 3, Some(-1.0)), vec![1, -1, 3]).unwrap();

        let result = cast::<u8, _>(&ras);
        assert_eq!(result.metadata().nodata(), Some(<f64 as From<u8>>::from(u8::MAX)));
        assert_eq!(result.masked_data(), vec![Some(1), None, Some(3)]);
    }

    #[test]
    fn cast_is_the_identity_on_representable_values() {
        let ras = DenseArray::<i32>::new(test_metadata(1, 4, Some(-1.0)), vec![0, 250, -1, 3]).unwrap();

        let round_trip = cast::<i32, _>(&cast::<u8, _>(&ras));
        // -1 is not representable in u8, the nodata status survives through the sentinel
        assert_eq!(round_trip.masked_data(), vec![Some(0), Some(250), None, Some(3)]);
    }
}
