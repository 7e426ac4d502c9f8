//! In-memory RGBA raster types

use crate::image_pipeline::common::error::{PixelfyError, Result};

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// An 8-bit RGB triple, used for reference colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Decoded RGBA8 image, row-major with the origin at the top-left.
///
/// The buffer always holds exactly `width * height * 4` bytes and both
/// dimensions are at least 1. Transforms borrow a source buffer and return a
/// freshly allocated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterBuffer {
    /// Wraps interleaved RGBA bytes.
    ///
    /// Fails with [`PixelfyError::InvalidDimension`] for a zero width or height
    /// or an area too large to address, and with
    /// [`PixelfyError::BufferLengthMismatch`] when `data` is not
    /// `width * height * 4` bytes long.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        validate_dimension("width", width)?;
        validate_dimension("height", height)?;

        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(PixelfyError::BufferLengthMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer where every pixel is `color`.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Result<Self> {
        validate_dimension("width", width)?;
        validate_dimension("height", height)?;
        Self::repeat(width, height, color)
    }

    /// Fully transparent black buffer. Callers guarantee non-zero dimensions.
    pub(crate) fn transparent(width: u32, height: u32) -> Result<Self> {
        Self::repeat(width, height, [0, 0, 0, 0])
    }

    fn repeat(width: u32, height: u32, color: [u8; 4]) -> Result<Self> {
        let data = color
            .iter()
            .copied()
            .cycle()
            .take(byte_len(width, height)?)
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Interleaved RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Bytes in one row.
    pub fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// RGBA at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// RGB at `(x, y)`, the "picked" color for chroma keying.
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<Rgb> {
        self.pixel(x, y).map(|[r, g, b, _]| Rgb::new(r, g, b))
    }

    pub(crate) fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

/// `width * height * 4`, or `InvalidDimension` when that many bytes cannot
/// be held in one allocation.
pub(crate) fn byte_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(CHANNELS))
        .filter(|&len| len <= isize::MAX as usize)
        .ok_or(PixelfyError::InvalidDimension {
            what: "pixel_area",
            value: width as u64 * height as u64,
        })
}

pub(crate) fn validate_dimension(what: &'static str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(PixelfyError::InvalidDimension {
            what,
            value: value as u64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_rejects_wrong_length() {
        let err = RasterBuffer::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            PixelfyError::BufferLengthMismatch {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn test_from_rgba_rejects_zero_dimension() {
        let err = RasterBuffer::from_rgba(0, 3, Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            PixelfyError::InvalidDimension { what: "width", .. }
        ));
    }

    #[test]
    fn test_pixel_access_is_row_major() {
        let data: Vec<u8> = (0..24).collect();
        let buffer = RasterBuffer::from_rgba(3, 2, data).unwrap();

        assert_eq!(buffer.pixel(0, 0), Some([0, 1, 2, 3]));
        assert_eq!(buffer.pixel(2, 0), Some([8, 9, 10, 11]));
        assert_eq!(buffer.pixel(0, 1), Some([12, 13, 14, 15]));
        assert_eq!(buffer.pixel(3, 0), None);
        assert_eq!(buffer.rgb_at(1, 1), Some(Rgb::new(16, 17, 18)));
    }

    #[test]
    fn test_unaddressable_area_is_rejected() {
        let side = 1u32 << 31;
        let err = RasterBuffer::filled(side, side, [0, 0, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            PixelfyError::InvalidDimension { what: "pixel_area", value } if value == 1u64 << 62
        ));

        let err = RasterBuffer::from_rgba(side, side, Vec::new()).unwrap_err();
        assert!(matches!(err, PixelfyError::InvalidDimension { what: "pixel_area", .. }));

        assert!(RasterBuffer::transparent(side, side).is_err());
    }

    #[test]
    fn test_filled() {
        let buffer = RasterBuffer::filled(2, 3, [1, 2, 3, 4]).unwrap();
        assert_eq!(buffer.as_bytes().len(), 24);
        assert!(buffer.as_bytes().chunks_exact(4).all(|p| p == [1, 2, 3, 4]));
    }
}
