#![cfg_attr(feature = "simd", feature(portable_simd))]

pub type Result<T = ()> = std::result::Result<T, Error>;

pub mod algo;
mod anydensearray;
mod anydensearrayops;
mod array;
mod arraydatatype;
mod arraynum;
mod cell;
mod densearray;
mod densearrayiterators;
mod densearrayops;
pub(crate) mod densearrayutil;
mod error;
mod filo;
mod georeference;
mod nodata;
mod point;
pub mod raster;
mod rastermetadata;
mod rasterspan;
mod rastersize;

#[cfg(test)]
pub(crate) mod testutils;

#[doc(inline)]
pub use {
    anydensearray::AnyDenseArray, array::Array, array::ArrayCopy, array::ArrayMetadata, array::Columns, array::RasterWindow,
    array::Rows, arraydatatype::ArrayDataType, arraynum::ArrayNum, cell::Cell, cell::CellIterator, densearray::DenseArray,
    densearrayiterators::ValueProxy, error::Error, filo::FiLo, georeference::CellSize, georeference::GeoReference, nodata::nodata_cast,
    point::Point, rastermetadata::RasterMetadata, rasterspan::RasterSpan, rasterspan::RasterSpanMut, rastersize::RasterSize,
};

#[doc(inline)]
pub use raster::{AnyDenseRaster, DenseRaster};
