//! Output and pipeline configuration types

use crate::image_pipeline::matte::ChromaKeySpec;
use crate::image_pipeline::pixelate::PixelationMethod;

/// Largest width or height accepted when dimension validation is on.
pub const DEFAULT_MAX_DIMENSION: u32 = 16384;

/// Block size used when none is configured.
pub const DEFAULT_PIXEL_SIZE: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Tiff,
}

impl OutputFormat {
    /// Guesses the format from a file extension, defaulting to PNG.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "tif" | "tiff" => OutputFormat::Tiff,
            _ => OutputFormat::Png,
        }
    }
}

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced (default)
    #[default]
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

/// Configuration for one decode, pixelate, encode run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub method: PixelationMethod,
    pub pixel_size: u32,
    /// Output width and height; `None` keeps the source size
    pub output_size: Option<(u32, u32)>,
    /// Chroma key applied before pixelation
    pub chroma_key: Option<ChromaKeySpec>,
    pub output_format: OutputFormat,
    /// Only used for TIFF output
    pub compression: TiffCompression,
    /// Whether to check decoded and output dimensions against `max_dimension`
    pub validate_dimensions: bool,
    pub max_dimension: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            method: PixelationMethod::Standard,
            pixel_size: DEFAULT_PIXEL_SIZE,
            output_size: None,
            chroma_key: None,
            output_format: OutputFormat::Png,
            compression: TiffCompression::DeflateBalanced,
            validate_dimensions: true,
            max_dimension: Some(DEFAULT_MAX_DIMENSION),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    method: Option<PixelationMethod>,
    pixel_size: Option<u32>,
    output_size: Option<Option<(u32, u32)>>,
    chroma_key: Option<Option<ChromaKeySpec>>,
    output_format: Option<OutputFormat>,
    compression: Option<TiffCompression>,
    validate_dimensions: Option<bool>,
    max_dimension: Option<Option<u32>>,
}

impl PipelineConfigBuilder {
    pub fn method(mut self, method: PixelationMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn pixel_size(mut self, pixel_size: u32) -> Self {
        self.pixel_size = Some(pixel_size);
        self
    }

    pub fn output_size(mut self, size: Option<(u32, u32)>) -> Self {
        self.output_size = Some(size);
        self
    }

    pub fn chroma_key(mut self, spec: Option<ChromaKeySpec>) -> Self {
        self.chroma_key = Some(spec);
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn max_dimension(mut self, max: Option<u32>) -> Self {
        self.max_dimension = Some(max);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            method: self.method.unwrap_or(default.method),
            pixel_size: self.pixel_size.unwrap_or(default.pixel_size),
            output_size: self.output_size.unwrap_or(default.output_size),
            chroma_key: self.chroma_key.unwrap_or(default.chroma_key),
            output_format: self.output_format.unwrap_or(default.output_format),
            compression: self.compression.unwrap_or(default.compression),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            max_dimension: self.max_dimension.unwrap_or(default.max_dimension),
        }
    }
}
