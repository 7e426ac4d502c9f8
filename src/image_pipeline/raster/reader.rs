use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raster::types::RasterBuffer;

/// Decodes an encoded image file into an RGBA raster.
pub trait RasterReader {
    fn read_raster(&self, data: &[u8]) -> Result<RasterBuffer>;
}
