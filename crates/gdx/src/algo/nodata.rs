use crate::{Array, ArrayMetadata, ArrayNum, DenseArray};

/// Byte raster with 1 for every data cell, 0 for every nodata cell.
pub fn is_data<R: Array>(ras: &R) -> R::WithPixelType<u8> {
    let meta = ras.metadata().with_nodata(None);
    R::WithPixelType::<u8>::from_iter_opt(meta, ras.iter_opt().map(|v| Some(u8::from(v.is_some())))).expect("Raster size bug")
}

/// Byte raster with 1 for every nodata cell, 0 for every data cell.
pub fn is_nodata<R: Array>(ras: &R) -> R::WithPixelType<u8> {
    let meta = ras.metadata().with_nodata(None);
    R::WithPixelType::<u8>::from_iter_opt(meta, ras.iter_opt().map(|v| Some(u8::from(v.is_none())))).expect("Raster size bug")
}

/// Turn every cell into nodata.
pub fn make_nodata<T: ArrayNum, Metadata: ArrayMetadata>(ras: &mut DenseArray<T, Metadata>) {
    ras.fill_with_nodata();
}

/// Assign the given value to every nodata cell, the nodata value stays part
/// of the metadata.
pub fn replace_nodata_in_place<T: ArrayNum, Metadata: ArrayMetadata>(ras: &mut DenseArray<T, Metadata>, new_value: T) {
    for mut proxy in ras.iter_proxy_mut() {
        if proxy.is_nodata() {
            proxy.set(new_value);
        }
    }
}

pub fn replace_nodata<T: ArrayNum, Metadata: ArrayMetadata>(
    ras: &DenseArray<T, Metadata>,
    new_value: T,
) -> DenseArray<T, Metadata> {
    let mut result = ras.clone();
    replace_nodata_in_place(&mut result, new_value);
    result
}

/// Turn every occurrence of the given value into nodata.
/// The raster must have a nodata value configured.
pub fn turn_value_into_nodata<T: ArrayNum, Metadata: ArrayMetadata>(ras: &mut DenseArray<T, Metadata>, value: T) {
    ras.turn_value_into_nodata(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_metadata;

    #[test]
    fn data_predicates() {
        let ras = DenseArray::<i32>::new(test_metadata(1, 3, Some(-1.0)), vec![1, -1, 0]).unwrap();

        assert_eq!(is_data(&ras).as_slice(), &[1, 0, 1]);
        assert_eq!(is_nodata(&ras).as_slice(), &[0, 1, 0]);
    }

    #[test]
    fn replacing_nodata_keeps_the_nodata_value() {
        let ras = DenseArray::<f32>::new(test_metadata(1, 3, Some(-9999.0)), vec![1.0, -9999.0, 3.0]).unwrap();

        let result = replace_nodata(&ras, 0.0);
        assert_eq!(result.as_slice(), &[1.0, 0.0, 3.0]);
        assert_eq!(result.metadata().nodata(), Some(-9999.0));
        assert_eq!(result.nodata_count(), 0);
    }
}
