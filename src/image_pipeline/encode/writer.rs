use std::io::Write;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::encode::types::PipelineConfig;
use crate::image_pipeline::raster::types::RasterBuffer;

/// Encodes an RGBA raster into the configured file format.
pub trait RasterWriter {
    fn write_raster(&self, image: &RasterBuffer, output: &mut dyn Write, config: &PipelineConfig) -> Result<()>;
}
