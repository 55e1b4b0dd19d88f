#![cfg_attr(feature = "simd", feature(portable_simd))]

pub mod allocate;
pub mod cast;
pub mod duration;
mod error;
#[cfg(feature = "simd")]
pub mod simd;

pub use error::Error;

pub type Result<T = ()> = std::result::Result<T, Error>;
