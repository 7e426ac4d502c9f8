//! Image encoding module
//!
//! This module provides PNG and TIFF writing for pixelated rasters, plus the
//! configuration shared by the whole pipeline.

mod standard_writer;
pub mod types;
mod writer;

pub use standard_writer::StandardRasterWriter;
pub use types::{
    OutputFormat, PipelineConfig, PipelineConfigBuilder, TiffCompression, DEFAULT_MAX_DIMENSION,
    DEFAULT_PIXEL_SIZE,
};
pub use writer::RasterWriter;
