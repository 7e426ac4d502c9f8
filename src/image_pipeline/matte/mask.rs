//! Opacity masks from a segmentation collaborator and how they are merged
//! into an image's alpha channel.

use tracing::debug;

use crate::image_pipeline::common::error::{PixelfyError, Result};
use crate::image_pipeline::raster::types::{byte_len, RasterBuffer, CHANNELS};

/// Border share that must already be transparent for an image to count as matted.
pub const BORDER_TRANSPARENCY_THRESHOLD: f64 = 0.85;

/// Per-pixel opacity in RGBA layout. Only every fourth (alpha) byte matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpacityMask {
    data: Vec<u8>,
}

impl OpacityMask {
    /// Wraps RGBA-layout mask bytes as produced by a segmentation model.
    pub fn from_rgba(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Builds a mask from one opacity byte per pixel.
    pub fn from_alpha(alpha: &[u8]) -> Self {
        let data = alpha.iter().flat_map(|&a| [0, 0, 0, a]).collect();
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn alpha(&self) -> impl Iterator<Item = u8> + '_ {
        self.data.iter().skip(3).step_by(CHANNELS).copied()
    }

    pub fn is_usable(&self) -> bool {
        is_mask_usable(&self.data)
    }

    /// Same as [`is_usable`](Self::is_usable) but as a `Result` for `?` chains.
    pub fn require_usable(self) -> Result<Self> {
        if self.is_usable() {
            Ok(self)
        } else {
            Err(PixelfyError::DegenerateMask)
        }
    }
}

/// True when more than 85% of the outermost ring of pixels has alpha 0.
///
/// Images narrower or shorter than 2 pixels have no usable border and always
/// report false.
pub fn is_border_already_transparent(buffer: &RasterBuffer) -> bool {
    let (width, height) = (buffer.width(), buffer.height());
    if width <= 1 || height <= 1 {
        return false;
    }

    let transparent = |x: u32, y: u32| buffer.as_bytes()[buffer.offset(x, y) + 3] == 0;

    let mut total = 0u64;
    let mut clear = 0u64;
    for x in 0..width {
        clear += transparent(x, 0) as u64 + transparent(x, height - 1) as u64;
        total += 2;
    }
    // Corners were counted with the top and bottom rows.
    for y in 1..height - 1 {
        clear += transparent(0, y) as u64 + transparent(width - 1, y) as u64;
        total += 2;
    }

    let ratio = clear as f64 / total as f64;
    debug!("Border transparency ratio: {:.3}", ratio);
    ratio > BORDER_TRANSPARENCY_THRESHOLD
}

/// True iff the alpha samples include at least one 0 and at least one 255.
pub fn is_mask_usable(mask: &[u8]) -> bool {
    let mut has_transparent = false;
    let mut has_opaque = false;
    for &alpha in mask.iter().skip(3).step_by(CHANNELS) {
        match alpha {
            0 => has_transparent = true,
            u8::MAX => has_opaque = true,
            _ => {}
        }
        if has_transparent && has_opaque {
            return true;
        }
    }
    false
}

/// Copies the mask's alpha into a copy of `buffer`, leaving RGB as is.
///
/// The mask must be exactly as long as the buffer's RGBA bytes; anything else
/// is [`PixelfyError::BufferLengthMismatch`]. Callers wanting a fallback must
/// check before calling.
pub fn composite(buffer: &RasterBuffer, mask: &OpacityMask) -> Result<RasterBuffer> {
    let expected = byte_len(buffer.width(), buffer.height())?;
    if mask.len() != expected {
        return Err(PixelfyError::BufferLengthMismatch {
            expected,
            actual: mask.len(),
        });
    }

    let mut out = buffer.clone();
    for (pixel, alpha) in out.as_bytes_mut().chunks_exact_mut(CHANNELS).zip(mask.alpha()) {
        pixel[3] = alpha;
    }
    Ok(out)
}
