use num::{NumCast, ToPrimitive};

use crate::{
    algo::{self, nodata::make_nodata},
    nodata::nodata_cast_opt,
    Array, ArrayMetadata, ArrayNum, DenseArray,
};

fn remap_to_float(value: f64, min_in: f64, max_in: f64, map_start: f64, map_end: f64) -> f64 {
    let range_width = max_in - min_in;
    let pos = (value - min_in) / range_width;
    map_start + (map_end - map_start) * pos
}

/// Byte remapping clips input outside of [start, end] to 0 instead of to the
/// nearer endpoint, downstream colour mapping relies on this.
fn remap_to_byte(value: f64, start: f64, end: f64, map_start: u8, map_end: u8) -> u8 {
    if value < start || value > end {
        return 0;
    }

    if map_start == map_end {
        return map_start;
    }

    let pos = (value - start) / (end - start);
    let map_width = <f64 as From<u8>>::from(map_end) - <f64 as From<u8>>::from(map_start);
    (<f64 as From<u8>>::from(map_start) + map_width * pos).round() as u8
}

fn normalise_range<TDest, T, Metadata>(
    input: &DenseArray<T, Metadata>,
    min_in: f64,
    max_in: f64,
    map_start: TDest,
    map_end: TDest,
) -> DenseArray<TDest, Metadata>
where
    TDest: ArrayNum,
    T: ArrayNum,
    Metadata: ArrayMetadata,
{
    let meta = input.metadata().with_nodata(nodata_cast_opt::<TDest>(input.metadata().nodata()));

    if TDest::TYPE.is_floating_point() {
        let map_start = map_start.to_f64().unwrap_or(0.0);
        let map_end = map_end.to_f64().unwrap_or(1.0);
        DenseArray::from_iter_opt(
            meta,
            input.iter_opt().map(|v| {
                v.and_then(|v| {
                    let val = v.to_f64().unwrap_or(f64::NAN);
                    NumCast::from(remap_to_float(val, min_in, max_in, map_start, map_end))
                })
            }),
        )
        .expect("Raster size bug")
    } else {
        let map_start = map_start.to_u8().unwrap_or(0);
        let map_end = map_end.to_u8().unwrap_or(u8::MAX - 1);
        DenseArray::from_iter_opt(
            meta,
            input.iter_opt().map(|v| {
                v.and_then(|v| {
                    let val = v.to_f64().unwrap_or(f64::NAN);
                    NumCast::from(remap_to_byte(val, min_in, max_in, map_start, map_end))
                })
            }),
        )
        .expect("Raster size bug")
    }
}

/// Rescale the data values: maps the range [min, max] of the input onto
/// [map_start, map_end]. A raster containing only nodata yields a raster
/// containing only nodata.
pub fn normalise_min_max<TDest, T, Metadata>(
    input: &DenseArray<T, Metadata>,
    map_start: TDest,
    map_end: TDest,
) -> DenseArray<TDest, Metadata>
where
    TDest: ArrayNum,
    T: ArrayNum,
    Metadata: ArrayMetadata,
{
    match (algo::minimum(input), algo::maximum(input)) {
        (Ok(min), Ok(max)) => normalise_range(
            input,
            min.to_f64().unwrap_or(0.0),
            max.to_f64().unwrap_or(0.0),
            map_start,
            map_end,
        ),
        _ => {
            let meta = input.metadata().with_nodata(nodata_cast_opt::<TDest>(input.metadata().nodata()));
            let mut result = DenseArray::filled_with(Some(TDest::zero()), meta);
            make_nodata(&mut result);
            result
        }
    }
}

/// Rescale the data values: maps the range [0, max] of the input onto
/// [map_start, map_end].
pub fn normalise_max<TDest, T, Metadata>(
    input: &DenseArray<T, Metadata>,
    map_start: TDest,
    map_end: TDest,
) -> DenseArray<TDest, Metadata>
where
    TDest: ArrayNum,
    T: ArrayNum,
    Metadata: ArrayMetadata,
{
    match algo::maximum(input) {
        Ok(max) => normalise_range(input, 0.0, max.to_f64().unwrap_or(0.0), map_start, map_end),
        Err(_) => {
            let meta = input.metadata().with_nodata(nodata_cast_opt::<TDest>(input.metadata().nodata()));
            let mut result = DenseArray::filled_with(Some(TDest::zero()), meta);
            make_nodata(&mut result);
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_metadata;

    #[test]
    fn normalise_to_byte_range() {
        #[rustfmt::skip]
        let ras = DenseArray::<f64>::new(
            test_metadata(3, 3, None),
            vec![
                0.0, 32.0, 32.0,
                64.0, 64.0, 64.0,
                96.0, 96.0, 128.0,
            ],
        )
        .unwrap();

        let result = normalise_min_max::<u8, _, _>(&ras, 0, 254);

        #[rustfmt::skip]
        assert_eq!(result.as_slice(), &[
            0, 64, 64,
            127, 127, 127,
            191, 191, 254,
        ]);
    }

    #[test]
    fn byte_remap_clips_out_of_range_to_zero() {
        assert_eq!(remap_to_byte(-1.0, 0.0, 10.0, 10, 250), 0);
        assert_eq!(remap_to_byte(11.0, 0.0, 10.0, 10, 250), 0);
        assert_eq!(remap_to_byte(0.0, 0.0, 10.0, 10, 250), 10);
        assert_eq!(remap_to_byte(10.0, 0.0, 10.0, 10, 250), 250);
    }

    #[test]
    fn normalise_to_unit_range() {
        let ras = DenseArray::<i32>::new(test_metadata(1, 3, Some(-1.0)), vec![0, 5, 10]).unwrap();
        let result = normalise_min_max::<f32, _, _>(&ras, 0.0, 1.0);
        assert_eq!(result.as_slice(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn normalise_only_nodata_yields_nodata() {
        let ras = DenseArray::<f32>::filled_with_nodata(test_metadata(2, 2, Some(-9999.0)));
        let result = normalise_min_max::<f32, _, _>(&ras, 0.0, 1.0);
        assert!(result.contains_only_nodata());
    }
}
