use thiserror::Error;

#[derive(Error, Debug)]
pub enum PixelfyError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Invalid dimension: {what}={value}")]
    InvalidDimension { what: &'static str, value: u64 },

    #[error("Buffer length mismatch: expected {expected} bytes, got {actual}")]
    BufferLengthMismatch { expected: usize, actual: usize },

    #[error("Mask has no fully transparent or no fully opaque sample")]
    DegenerateMask,

    #[error("Invalid chroma key tolerance: {0}")]
    InvalidTolerance(f64),

    #[error("Unknown pixelation method: {0}")]
    UnknownMethod(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PixelfyError>;
