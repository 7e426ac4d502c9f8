//! Color-distance alpha matting against a reference color.

use rayon::prelude::*;
use tracing::debug;

use crate::image_pipeline::common::error::{PixelfyError, Result};
use crate::image_pipeline::raster::types::{RasterBuffer, Rgb, CHANNELS};

/// Tolerance used when none is given.
pub const DEFAULT_TOLERANCE: f64 = 30.0;

/// Pixels between `tolerance` and `tolerance * FALLOFF` fade out linearly.
const FALLOFF: f64 = 1.5;

/// Key color plus the Euclidean RGB distance below which pixels turn
/// transparent. The tolerance is a distance, not a percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaKeySpec {
    reference: Rgb,
    tolerance: f64,
}

impl ChromaKeySpec {
    pub fn new(reference: Rgb, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(PixelfyError::InvalidTolerance(tolerance));
        }
        Ok(Self {
            reference,
            tolerance,
        })
    }

    /// Keys on the color found at `(x, y)` in `buffer`.
    pub fn from_pixel(buffer: &RasterBuffer, x: u32, y: u32, tolerance: f64) -> Result<Self> {
        let reference = buffer.rgb_at(x, y).ok_or(PixelfyError::InvalidDimension {
            what: "pick coordinate",
            value: if x >= buffer.width() { x as u64 } else { y as u64 },
        })?;
        Self::new(reference, tolerance)
    }

    pub fn reference(&self) -> Rgb {
        self.reference
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// New alpha for a pixel `distance` away from the key, or `None` to keep it.
    fn alpha_for(&self, distance: f64) -> Option<u8> {
        let tolerance = self.tolerance;
        if distance < tolerance {
            Some(0)
        } else if distance < tolerance * FALLOFF {
            let fade = 1.0 - (distance - tolerance) / (tolerance * (FALLOFF - 1.0));
            Some((255.0 * fade).round().clamp(0.0, 255.0) as u8)
        } else {
            None
        }
    }
}

/// Returns a copy of `source` with alpha lowered near the key color.
///
/// RGB is never touched, so partially transparent edge pixels keep their
/// original (un-premultiplied) color.
pub fn matte(source: &RasterBuffer, spec: &ChromaKeySpec) -> RasterBuffer {
    debug!(
        "Chroma keying {}x{} against {:?} (tolerance {})",
        source.width(),
        source.height(),
        spec.reference,
        spec.tolerance
    );

    let mut out = source.clone();
    let key = spec.reference;
    out.as_bytes_mut()
        .par_chunks_exact_mut(CHANNELS)
        .for_each(|pixel| {
            let dr = pixel[0] as f64 - key.r as f64;
            let dg = pixel[1] as f64 - key.g as f64;
            let db = pixel[2] as f64 - key.b as f64;
            let distance = (dr * dr + dg * dg + db * db).sqrt();
            if let Some(alpha) = spec.alpha_for(distance) {
                pixel[3] = alpha;
            }
        });
    out
}
