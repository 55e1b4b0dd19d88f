use crate::{Array, ArrayMetadata, ArrayNum, DenseArray};

/// Replace every occurrence of a value by another value, nodata cells are untouched.
pub fn replace_value_in_place<T: ArrayNum, Metadata: ArrayMetadata>(ras: &mut DenseArray<T, Metadata>, old_value: T, new_value: T) {
    for i in 0..ras.len() {
        if ras.index_has_data(i) && ras[i] == old_value {
            ras[i] = new_value;
        }
    }
}

pub fn replace_value<T: ArrayNum, Metadata: ArrayMetadata>(
    ras: &DenseArray<T, Metadata>,
    old_value: T,
    new_value: T,
) -> DenseArray<T, Metadata> {
    let mut result = ras.clone();
    replace_value_in_place(&mut result, old_value, new_value);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::test_metadata;

    #[test]
    fn replace_skips_nodata() {
        let ras = DenseArray::<i32>::new(test_metadata(1, 4, Some(-1.0)), vec![1, -1, 1, 2]).unwrap();

        let result = replace_value(&ras, 1, 9);
        assert_eq!(result.masked_data(), vec![Some(9), None, Some(9), Some(2)]);
    }
}
