use std::io::{Cursor, Write};
use tracing::debug;
use crate::image_pipeline::common::error::{PixelfyError, Result};
use crate::image_pipeline::encode::types::{OutputFormat, PipelineConfig, TiffCompression};
use crate::image_pipeline::encode::writer::RasterWriter;
use crate::image_pipeline::raster::types::RasterBuffer;

/// Writes RGBA8 PNG or TIFF depending on `config.output_format`.
pub struct StandardRasterWriter;

impl StandardRasterWriter {
    fn encode_png(image: &RasterBuffer) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buffer, image.width(), image.height());
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| PixelfyError::EncodeError(e.to_string()))?;
            writer
                .write_image_data(image.as_bytes())
                .map_err(|e| PixelfyError::EncodeError(e.to_string()))?;
            writer
                .finish()
                .map_err(|e| PixelfyError::EncodeError(e.to_string()))?;
        }
        Ok(buffer)
    }

    fn encode_tiff(image: &RasterBuffer, compression: TiffCompression) -> Result<Vec<u8>> {
        let compression = match compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::DeflateFast => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Balanced),
            TiffCompression::DeflateBest => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Best),
        };

        let mut buffer = Vec::new();
        let mut encoder = tiff::encoder::TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| PixelfyError::EncodeError(e.to_string()))?
            .with_compression(compression);

        encoder.write_image::<tiff::encoder::colortype::RGBA8>(
            image.width(),
            image.height(),
            image.as_bytes(),
        ).map_err(|e| PixelfyError::EncodeError(e.to_string()))?;
        drop(encoder);

        Ok(buffer)
    }
}

impl RasterWriter for StandardRasterWriter {
    fn write_raster(&self, image: &RasterBuffer, output: &mut dyn Write, config: &PipelineConfig) -> Result<()> {
        debug!("Encoding {:?} image: {}x{}", config.output_format, image.width(), image.height());

        let encoded = match config.output_format {
            OutputFormat::Png => Self::encode_png(image)?,
            OutputFormat::Tiff => Self::encode_tiff(image, config.compression)?,
        };

        output.write_all(&encoded)?;

        debug!("Encoding complete, {} bytes", encoded.len());
        Ok(())
    }
}
