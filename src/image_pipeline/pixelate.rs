//! Pixelation module
//!
//! Turns a full resolution RGBA raster into a resolution-reduced, stylized
//! one. [`PixelationMethod`] selects one of three transform families:
//!
//! - [`resample`]: shrink then nearest-neighbor enlarge (`Standard`,
//!   `NearestNeighborExact`, `Bilinear`)
//! - [`quantize`]: a `Standard` resample followed by color reduction
//!   (`Dithered`, `Posterized`)
//! - [`mosaic`]: true per-block averaging (`Mosaic`)

mod mosaic;
mod quantize;
mod resample;

use std::fmt;
use std::str::FromStr;

use tracing::{debug, instrument};

use crate::image_pipeline::common::error::{PixelfyError, Result};
use crate::image_pipeline::raster::types::{validate_dimension, RasterBuffer};

pub use mosaic::mosaic;
pub use quantize::{quantize, QuantizeMode, POSTERIZE_LEVELS};
pub use resample::{intermediate_size, resample, ResampleVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelationMethod {
    #[default]
    Standard,
    NearestNeighborExact,
    /// Smoothed shrink. The `bicubic` and `lanczos` tags are accepted as
    /// aliases and run this same filter.
    Bilinear,
    Dithered,
    Posterized,
    Mosaic,
}

impl PixelationMethod {
    pub const ALL: [PixelationMethod; 6] = [
        PixelationMethod::Standard,
        PixelationMethod::NearestNeighborExact,
        PixelationMethod::Bilinear,
        PixelationMethod::Dithered,
        PixelationMethod::Posterized,
        PixelationMethod::Mosaic,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            PixelationMethod::Standard => "standard",
            PixelationMethod::NearestNeighborExact => "nearest-neighbor",
            PixelationMethod::Bilinear => "bilinear",
            PixelationMethod::Dithered => "dithered",
            PixelationMethod::Posterized => "posterized",
            PixelationMethod::Mosaic => "mosaic",
        }
    }
}

impl fmt::Display for PixelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PixelationMethod {
    type Err = PixelfyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(PixelationMethod::Standard),
            "nearest-neighbor" | "nearest" => Ok(PixelationMethod::NearestNeighborExact),
            "bilinear" | "bicubic" | "lanczos" => Ok(PixelationMethod::Bilinear),
            "dithered" => Ok(PixelationMethod::Dithered),
            "posterized" => Ok(PixelationMethod::Posterized),
            "mosaic" => Ok(PixelationMethod::Mosaic),
            _ => Err(PixelfyError::UnknownMethod(s.to_string())),
        }
    }
}

/// One pixelation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelationSpec {
    pub method: PixelationMethod,
    pub pixel_size: u32,
    pub output_width: u32,
    pub output_height: u32,
}

impl PixelationSpec {
    /// Fails with [`PixelfyError::InvalidDimension`] if any size is zero.
    pub fn new(
        method: PixelationMethod,
        pixel_size: u32,
        output_width: u32,
        output_height: u32,
    ) -> Result<Self> {
        let spec = Self {
            method,
            pixel_size,
            output_width,
            output_height,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        validate_dimension("pixel_size", self.pixel_size)?;
        validate_dimension("output_width", self.output_width)?;
        validate_dimension("output_height", self.output_height)
    }
}

/// Runs the transform selected by `spec.method` and returns a new buffer.
#[instrument(skip(source), fields(width = source.width(), height = source.height()))]
pub fn pixelate(source: &RasterBuffer, spec: &PixelationSpec) -> Result<RasterBuffer> {
    spec.validate()?;

    let PixelationSpec {
        method,
        pixel_size,
        output_width: w,
        output_height: h,
    } = *spec;

    let out = match method {
        PixelationMethod::Standard => resample(source, pixel_size, w, h, ResampleVariant::Standard)?,
        PixelationMethod::NearestNeighborExact => {
            resample(source, pixel_size, w, h, ResampleVariant::NearestNeighborExact)?
        }
        PixelationMethod::Bilinear => resample(source, pixel_size, w, h, ResampleVariant::Bilinear)?,
        PixelationMethod::Dithered => quantize(
            resample(source, pixel_size, w, h, ResampleVariant::Standard)?,
            QuantizeMode::Dithered,
        ),
        PixelationMethod::Posterized => quantize(
            resample(source, pixel_size, w, h, ResampleVariant::Standard)?,
            QuantizeMode::Posterized,
        ),
        PixelationMethod::Mosaic => mosaic(source, pixel_size, w, h)?,
    };

    debug!("Pixelated with {} to {}x{}", method, out.width(), out.height());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_tags_round_trip() {
        for method in PixelationMethod::ALL {
            assert_eq!(method.tag().parse::<PixelationMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_bicubic_and_lanczos_alias_bilinear() {
        assert_eq!("bicubic".parse::<PixelationMethod>().unwrap(), PixelationMethod::Bilinear);
        assert_eq!("Lanczos".parse::<PixelationMethod>().unwrap(), PixelationMethod::Bilinear);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = "oil-paint".parse::<PixelationMethod>().unwrap_err();
        assert!(matches!(err, PixelfyError::UnknownMethod(tag) if tag == "oil-paint"));
    }

    #[test]
    fn test_spec_rejects_zero_sizes() {
        assert!(PixelationSpec::new(PixelationMethod::Standard, 0, 4, 4).is_err());
        assert!(PixelationSpec::new(PixelationMethod::Mosaic, 2, 0, 4).is_err());
        assert!(PixelationSpec::new(PixelationMethod::Mosaic, 2, 4, 0).is_err());
    }

    #[test]
    fn test_white_square_stays_white() {
        let source = RasterBuffer::filled(4, 4, [255, 255, 255, 255]).unwrap();
        let spec = PixelationSpec::new(PixelationMethod::Standard, 2, 4, 4).unwrap();
        assert_eq!(intermediate_size(&source, 2), (2, 2));

        let out = pixelate(&source, &spec).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_every_method_produces_requested_size() {
        let data = (0..12 * 9).flat_map(|i| [(i * 3) as u8, (i * 7) as u8, (i * 11) as u8, 255]).collect();
        let source = RasterBuffer::from_rgba(12, 9, data).unwrap();
        for method in PixelationMethod::ALL {
            let spec = PixelationSpec::new(method, 3, 20, 7).unwrap();
            let out = pixelate(&source, &spec).unwrap();
            assert_eq!(out.as_bytes().len(), 20 * 7 * 4, "{}", method);
        }
    }

    #[test]
    fn test_posterized_runs_after_standard_resample() {
        let data = (0..16).flat_map(|i| [i * 16, 200, 10, 255]).collect();
        let source = RasterBuffer::from_rgba(4, 4, data).unwrap();

        let standard = pixelate(&source, &PixelationSpec::new(PixelationMethod::Standard, 2, 4, 4).unwrap()).unwrap();
        let posterized = pixelate(&source, &PixelationSpec::new(PixelationMethod::Posterized, 2, 4, 4).unwrap()).unwrap();

        assert_eq!(posterized, quantize(standard, QuantizeMode::Posterized));
    }
}
