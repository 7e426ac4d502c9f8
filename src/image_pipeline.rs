//! Image processing pipeline module
//!
//! The raster transformation engine: pixelation transforms, chroma-key and
//! mask matting, plus the decode and encode stages that wrap them for files.

pub mod common;
pub mod conversions;
pub mod encode;
pub mod matte;
pub mod pixelate;
pub mod raster;

pub use common::{
    PipelineTimings,
    PixelfyError,
    Result,
};

pub use raster::{
    PngReader,
    RasterBuffer,
    RasterReader,
    Rgb,
};

pub use pixelate::{
    pixelate,
    PixelationMethod,
    PixelationSpec,
};

pub use matte::{
    BackgroundOutcome,
    BackgroundRemover,
    ChromaKeySpec,
    FileMaskProvider,
    MaskProvider,
    OpacityMask,
};

pub use encode::{
    OutputFormat,
    PipelineConfig,
    PipelineConfigBuilder,
    RasterWriter,
    StandardRasterWriter,
    TiffCompression,
};

pub use conversions::PixelationPipeline;
