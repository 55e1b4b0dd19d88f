use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Raster dimensions do not match ({}x{}) <-> ({}x{})", .size1.0, .size1.1, .size2.0, .size2.1)]
    SizeMismatch {
        size1: (usize, usize),
        size2: (usize, usize),
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

impl From<inf::Error> for Error {
    fn from(err: inf::Error) -> Self {
        match err {
            inf::Error::InvalidArgument(msg) => Error::InvalidArgument(msg),
            inf::Error::InvalidCast(msg) => Error::InvalidArgument(msg),
            inf::Error::Runtime(msg) => Error::Runtime(msg),
            inf::Error::OutOfMemory => Error::OutOfMemory,
            inf::Error::IOError(err) => Error::IOError(err),
        }
    }
}
