use tracing::{info, instrument};
use std::io::Write;
use std::path::Path;

use crate::image_pipeline::{
    common::{PipelineTimings, PixelfyError, Result},
    encode::{PipelineConfig, RasterWriter, StandardRasterWriter},
    matte::{matte, BackgroundRemover},
    pixelate::{pixelate, PixelationSpec},
    raster::{PngReader, RasterBuffer, RasterReader},
};

pub struct PixelationPipeline<R: RasterReader, W: RasterWriter> {
    reader: R,
    writer: W,
    config: PipelineConfig,
    background: Option<BackgroundRemover>,
}

impl PixelationPipeline<PngReader, StandardRasterWriter> {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            reader: PngReader,
            writer: StandardRasterWriter,
            config,
            background: None,
        }
    }
}

impl<R: RasterReader, W: RasterWriter> PixelationPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: PipelineConfig) -> Self {
        Self {
            reader,
            writer,
            config,
            background: None,
        }
    }

    /// Runs `remover` on every image before pixelation.
    pub fn with_background_remover(mut self, remover: BackgroundRemover) -> Self {
        self.background = Some(remover);
        self
    }

    fn validate_dimensions(&self, width: u32, height: u32) -> Result<()> {
        self.check_max_dimension(("width", width), ("height", height))
    }

    fn check_max_dimension(
        &self,
        (width_name, width): (&'static str, u32),
        (height_name, height): (&'static str, u32),
    ) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if let Some(max) = self.config.max_dimension {
            if width > max {
                return Err(PixelfyError::InvalidDimension { what: width_name, value: width as u64 });
            }
            if height > max {
                return Err(PixelfyError::InvalidDimension { what: height_name, value: height as u64 });
            }
        }

        Ok(())
    }

    fn pixelation_spec(&self, image: &RasterBuffer) -> Result<PixelationSpec> {
        let (width, height) = self
            .config
            .output_size
            .unwrap_or((image.width(), image.height()));
        self.check_max_dimension(("output_width", width), ("output_height", height))?;
        PixelationSpec::new(self.config.method, self.config.pixel_size, width, height)
    }

    fn run(&self, image: RasterBuffer, timings: &mut PipelineTimings) -> Result<RasterBuffer> {
        let spec = self.pixelation_spec(&image)?;

        let image = match &self.config.chroma_key {
            Some(key) => {
                let _span = tracing::info_span!("chroma_key").entered();
                timings.time("chroma_key", || matte(&image, key))
            }
            None => image,
        };

        let image = match &self.background {
            Some(remover) => {
                let _span = tracing::info_span!("background").entered();
                let (image, outcome) = timings.time("background", || remover.remove(&image))?;
                info!(?outcome, "Background removal finished");
                image
            }
            None => image,
        };

        let _span = tracing::info_span!("pixelate",
            method = %spec.method,
            pixel_size = spec.pixel_size
        ).entered();
        timings.time("pixelate", || pixelate(&image, &spec))
    }

    /// Background handling and pixelation on an already decoded image.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn process(&self, image: RasterBuffer) -> Result<RasterBuffer> {
        self.validate_dimensions(image.width(), image.height())?;
        self.run(image, &mut PipelineTimings::new())
    }

    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], output: &mut dyn Write) -> Result<PipelineTimings> {
        info!("Starting pixelation");
        let mut timings = PipelineTimings::new();

        let image = {
            let _span = tracing::info_span!("decode").entered();
            timings.time("decode", || self.reader.read_raster(input_data))?
        };

        {
            let _span = tracing::info_span!("validate_dimensions",
                width = image.width(),
                height = image.height()
            ).entered();
            self.validate_dimensions(image.width(), image.height())?;
        }

        let (source_width, source_height) = (image.width(), image.height());
        let pixelated = self.run(image, &mut timings)?;

        {
            let _span = tracing::info_span!("encode").entered();
            timings.time("encode", || self.writer.write_raster(&pixelated, output, &self.config))?;
        }

        info!(
            source_width,
            source_height,
            width = pixelated.width(),
            height = pixelated.height(),
            "Pixelation complete"
        );
        Ok(timings)
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<PipelineTimings> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Converting file"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                PixelfyError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        // Nothing touches the output path until encoding succeeded.
        let mut encoded = Vec::new();
        let timings = self.convert(&input_data, &mut encoded)?;

        {
            let _span = tracing::info_span!("write_output_file", bytes = encoded.len()).entered();
            std::fs::write(output_path, &encoded).map_err(|e| {
                PixelfyError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?;
        }

        Ok(timings)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PipelineConfig) {
        self.config = config;
    }
}
