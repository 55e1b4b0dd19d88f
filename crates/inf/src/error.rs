use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid cast: {0}")]
    InvalidCast(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}
