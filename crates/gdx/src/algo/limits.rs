use std::ops::Range;

use itertools::Itertools;
use itertools::MinMaxResult::{MinMax, NoElements, OneElement};
use num::Zero;

use crate::{Array, Error, Result};

/// Minimum and maximum of the data values, `0..0` when the raster contains no data.
pub fn min_max<R: Array>(ras: &R) -> Range<R::Pixel> {
    match ras.iter_values().minmax() {
        NoElements => R::Pixel::zero()..R::Pixel::zero(),
        OneElement(x) => x..x,
        MinMax(x, y) => x..y,
    }
}

/// Smallest data value, fails when the raster contains no data values.
pub fn minimum<R: Array>(ras: &R) -> Result<R::Pixel> {
    ras.iter_values()
        .fold(None, |acc: Option<R::Pixel>, v| match acc {
            Some(min) if min <= v => Some(min),
            _ => Some(v),
        })
        .ok_or_else(|| Error::InvalidArgument("Minimum of a raster without data values".to_string()))
}

/// Largest data value, fails when the raster contains no data values.
pub fn maximum<R: Array>(ras: &R) -> Result<R::Pixel> {
    ras.iter_values()
        .fold(None, |acc: Option<R::Pixel>, v| match acc {
            Some(max) if max >= v => Some(max),
            _ => Some(v),
        })
        .ok_or_else(|| Error::InvalidArgument("Maximum of a raster without data values".to_string()))
}

#[cfg(test)]
#[generic_tests::define]
mod generictests {
    use super::*;
    use crate::{testutils::test_metadata, Array, DenseArray, RasterMetadata};

    #[test]
    fn min_max_with_nodata<R: Array<Pixel = i32, Metadata = RasterMetadata>>() -> Result<()> {
        #[rustfmt::skip]
        let raster = R::new(
            test_metadata(3, 3, Some(-1.0)),
            vec![
                -1,  0, -10,
                 0, -1,   0,
                 1, 21,  -1,
            ],
        )?;

        assert_eq!(min_max(&raster), -10..21);
        assert_eq!(minimum(&raster)?, -10);
        assert_eq!(maximum(&raster)?, 21);

        Ok(())
    }

    #[test]
    fn min_max_all_nodata<R: Array<Pixel = i32, Metadata = RasterMetadata>>() -> Result<()> {
        let raster = R::filled_with_nodata(test_metadata(2, 2, Some(-1.0)));

        assert_eq!(min_max(&raster), 0..0);
        assert!(minimum(&raster).is_err());
        assert!(maximum(&raster).is_err());

        Ok(())
    }

    #[test]
    fn min_max_single_element<R: Array<Pixel = i32, Metadata = RasterMetadata>>() -> Result<()> {
        let raster = R::new(test_metadata(1, 1, None), vec![5])?;
        assert_eq!(min_max(&raster), 5..5);
        Ok(())
    }

    #[instantiate_tests(<DenseArray<i32>>)]
    mod densearray {}
}
