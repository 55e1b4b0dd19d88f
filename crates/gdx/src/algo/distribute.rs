use num::{NumCast, ToPrimitive};

use crate::{algo, nodata::nodata_cast_opt, raster::check_dimensions, Array, ArrayMetadata, ArrayNum, DenseArray, Error, Result};

/// Distribute an amount over the data cells proportional to the cell values.
/// When no total is provided the sum of the raster is used, so distributing
/// against the raster itself scales the total to `amount`.
pub fn value_distribution<TDest, T, Metadata>(
    amount: f64,
    ras: &DenseArray<T, Metadata>,
    total: Option<f64>,
) -> Result<DenseArray<TDest, Metadata>>
where
    TDest: ArrayNum,
    T: ArrayNum,
    Metadata: ArrayMetadata,
{
    let total = match total {
        Some(total) => total,
        None => algo::sum(ras),
    };

    if total == 0.0 {
        return Err(Error::InvalidArgument("Cannot distribute a value over a raster with sum 0".to_string()));
    }

    let meta = ras.metadata().with_nodata(nodata_cast_opt::<TDest>(ras.metadata().nodata()));
    DenseArray::from_iter_opt(
        meta,
        ras.iter_opt()
            .map(|v| v.and_then(|v| NumCast::from(v.to_f64().unwrap_or(0.0) * amount / total))),
    )
}

pub struct RasterDistributionResult<T: ArrayNum, Metadata: ArrayMetadata> {
    pub fraction: DenseArray<T, Metadata>,
    pub remainder: DenseArray<T, Metadata>,
}

/// Split every cell into a fraction and a remainder part.
/// A nodata fraction counts as zero, fractions outside [0, 1] are an argument
/// error.
pub fn raster_distribution<TDest, T, TFraction, Metadata>(
    ras: &DenseArray<T, Metadata>,
    fractions: &DenseArray<TFraction, Metadata>,
) -> Result<RasterDistributionResult<TDest, Metadata>>
where
    TDest: ArrayNum,
    T: ArrayNum,
    TFraction: ArrayNum,
    Metadata: ArrayMetadata,
{
    check_dimensions(ras, fractions)?;

    let nodata = nodata_cast_opt::<TDest>(ras.metadata().nodata()).unwrap_or_else(|| TDest::TYPE.default_nodata_value());
    let meta = ras.metadata().with_nodata(Some(nodata));
    let mut fraction = DenseArray::<TDest, Metadata>::filled_with_nodata(meta.clone());
    let mut remainder = DenseArray::<TDest, Metadata>::filled_with_nodata(meta);

    for i in 0..ras.len() {
        let Some(value) = ras.value(i) else {
            continue;
        };

        let frac = fractions.value(i).and_then(|f| f.to_f64()).unwrap_or(0.0);
        if !(0.0..=1.0).contains(&frac) {
            return Err(Error::InvalidArgument("Fractions must be in the range [0.0, 1.0]".to_string()));
        }

        let value = value.to_f64().unwrap_or(0.0);
        fraction[i] = NumCast::from(value * frac).unwrap_or_else(TDest::default_nodata);
        remainder[i] = NumCast::from(value * (1.0 - frac)).unwrap_or_else(TDest::default_nodata);
    }

    Ok(RasterDistributionResult { fraction, remainder })
}
