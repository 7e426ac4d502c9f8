//! PNG decoding into RGBA8 rasters.
//!
//! Every PNG color type is normalized to 8-bit RGBA: palettes and low bit
//! depths are expanded, 16-bit samples are stripped to their high byte, and
//! images without an alpha channel become fully opaque.

use std::io::Cursor;

use tracing::debug;

use crate::image_pipeline::common::error::{PixelfyError, Result};
use crate::image_pipeline::raster::reader::RasterReader;
use crate::image_pipeline::raster::types::RasterBuffer;

pub struct PngReader;

impl RasterReader for PngReader {
    fn read_raster(&self, data: &[u8]) -> Result<RasterBuffer> {
        debug!("Decoding PNG image, {} bytes", data.len());

        let mut decoder = png::Decoder::new(Cursor::new(data));
        decoder.set_transformations(png::Transformations::normalize_to_color8());

        let mut reader = decoder
            .read_info()
            .map_err(|e| PixelfyError::DecodeError(e.to_string()))?;
        let mut frame = vec![0u8; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut frame)
            .map_err(|e| PixelfyError::DecodeError(e.to_string()))?;
        frame.truncate(info.buffer_size());

        debug!(
            "Decoded image: {}x{} {:?}",
            info.width, info.height, info.color_type
        );

        let rgba = match info.color_type {
            png::ColorType::Rgba => frame,
            png::ColorType::Rgb => frame
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], u8::MAX])
                .collect(),
            png::ColorType::GrayscaleAlpha => frame
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            png::ColorType::Grayscale => frame.iter().flat_map(|&v| [v, v, v, u8::MAX]).collect(),
            png::ColorType::Indexed => {
                return Err(PixelfyError::DecodeError(
                    "palette was not expanded".to_string(),
                ));
            }
        };

        RasterBuffer::from_rgba(info.width, info.height, rgba)
    }
}
