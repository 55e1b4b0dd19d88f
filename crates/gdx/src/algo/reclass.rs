use std::collections::HashMap;
use std::hash::Hash;

use crate::{Array, ArrayMetadata, ArrayNum, DenseArray};

/// Map every cell value through a lookup table. Values that are not present
/// in the table become nodata, nodata stays nodata.
pub fn reclass<TDest, T, Metadata>(
    ras: &DenseArray<T, Metadata>,
    mapping: &HashMap<T, TDest>,
) -> DenseArray<TDest, Metadata>
where
    TDest: ArrayNum,
    T: ArrayNum + Eq + Hash,
    Metadata: ArrayMetadata,
{
    let nodata = ras
        .metadata()
        .nodata()
        .map_or(TDest::TYPE.default_nodata_value(), |nod| {
            crate::nodata::nodata_cast_opt::<TDest>(Some(nod)).unwrap_or(f64::NAN)
        });

    let meta = ras.metadata().with_nodata(Some(nodata));
    DenseArray::from_iter_opt(meta, ras.iter_opt().map(|v| v.and_then(|v| mapping.get(&v).copied())))
        .expect("Raster size bug")
}
