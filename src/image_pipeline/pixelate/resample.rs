//! Two-stage shrink-then-enlarge pixelation.
//!
//! The source is shrunk to `floor(size / pixel_size)` (at least 1) in each
//! axis and the small image is blown back up to the requested output size with
//! nearest-neighbor sampling. Only the shrink filter differs between variants;
//! the enlarge step is always point sampled, which is what makes the blocks.

use rayon::prelude::*;
use tracing::debug;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raster::types::{byte_len, validate_dimension, RasterBuffer, CHANNELS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleVariant {
    /// Nearest-neighbor shrink sampling each target pixel's center.
    Standard,
    /// Nearest-neighbor shrink with the explicit `x * pixel_size` mapping.
    NearestNeighborExact,
    /// Smoothing (triangle filter) shrink.
    Bilinear,
}

pub fn resample(
    source: &RasterBuffer,
    pixel_size: u32,
    output_width: u32,
    output_height: u32,
    variant: ResampleVariant,
) -> Result<RasterBuffer> {
    validate_dimension("pixel_size", pixel_size)?;
    validate_dimension("output_width", output_width)?;
    validate_dimension("output_height", output_height)?;
    byte_len(output_width, output_height)?;

    let (small_width, small_height) = intermediate_size(source, pixel_size);
    debug!(
        "Resampling {}x{} -> {}x{} -> {}x{} ({:?})",
        source.width(),
        source.height(),
        small_width,
        small_height,
        output_width,
        output_height,
        variant
    );

    let small = match variant {
        ResampleVariant::Standard => scale_nearest(source, small_width, small_height)?,
        ResampleVariant::NearestNeighborExact => {
            shrink_exact(source, pixel_size, small_width, small_height)?
        }
        ResampleVariant::Bilinear => shrink_smooth(source, small_width, small_height)?,
    };

    scale_nearest(&small, output_width, output_height)
}

/// Size of the shrunken image for `pixel_size`, never below 1x1.
pub fn intermediate_size(source: &RasterBuffer, pixel_size: u32) -> (u32, u32) {
    let pixel_size = pixel_size.max(1);
    (
        (source.width() / pixel_size).max(1),
        (source.height() / pixel_size).max(1),
    )
}

/// Nearest-neighbor scale to `width` x `height`, sampling at pixel centers.
pub(crate) fn scale_nearest(source: &RasterBuffer, width: u32, height: u32) -> Result<RasterBuffer> {
    let columns: Vec<u32> = (0..width)
        .map(|x| nearest_index(x, width, source.width()))
        .collect();
    let rows: Vec<u32> = (0..height)
        .map(|y| nearest_index(y, height, source.height()))
        .collect();
    gather(source, &columns, &rows)
}

/// Output `(x, y)` takes source `(min(x * pixel_size, w - 1), min(y * pixel_size, h - 1))`.
fn shrink_exact(
    source: &RasterBuffer,
    pixel_size: u32,
    width: u32,
    height: u32,
) -> Result<RasterBuffer> {
    let exact = |i: u32, len: u32| (i as u64 * pixel_size as u64).min(len as u64 - 1) as u32;
    let columns: Vec<u32> = (0..width).map(|x| exact(x, source.width())).collect();
    let rows: Vec<u32> = (0..height).map(|y| exact(y, source.height())).collect();
    gather(source, &columns, &rows)
}

/// Source index whose cell contains the center of destination cell `dst`.
fn nearest_index(dst: u32, dst_len: u32, src_len: u32) -> u32 {
    let center = (2 * dst as u64 + 1) * src_len as u64 / (2 * dst_len as u64);
    (center as u32).min(src_len - 1)
}

/// Copies source pixel `(columns[x], rows[y])` to every output `(x, y)`.
fn gather(source: &RasterBuffer, columns: &[u32], rows: &[u32]) -> Result<RasterBuffer> {
    let mut out = RasterBuffer::transparent(columns.len() as u32, rows.len() as u32)?;
    let stride = out.stride();
    let src_stride = source.stride();
    let src = source.as_bytes();

    out.as_bytes_mut()
        .par_chunks_mut(stride)
        .zip(rows.par_iter())
        .for_each(|(row, &sy)| {
            let src_row = &src[sy as usize * src_stride..(sy as usize + 1) * src_stride];
            for (dst, &sx) in row.chunks_exact_mut(CHANNELS).zip(columns) {
                let i = sx as usize * CHANNELS;
                dst.copy_from_slice(&src_row[i..i + CHANNELS]);
            }
        });

    Ok(out)
}

struct Contribution {
    start: usize,
    weights: Vec<f32>,
}

fn triangle(x: f32) -> f32 {
    (1.0 - x.abs()).max(0.0)
}

/// Filter taps for each destination index along one axis. The kernel is
/// widened by the downscale ratio so every source sample contributes.
fn contributions(src_len: u32, dst_len: u32) -> Vec<Contribution> {
    let ratio = src_len as f32 / dst_len as f32;
    let scale = ratio.max(1.0);

    (0..dst_len)
        .map(|i| {
            let center = (i as f32 + 0.5) * ratio;
            let left = ((center - scale).floor().max(0.0)) as usize;
            let right = ((center + scale).ceil() as usize).min(src_len as usize).max(left + 1);

            let mut weights: Vec<f32> = (left..right)
                .map(|j| triangle((j as f32 + 0.5 - center) / scale))
                .collect();
            let sum: f32 = weights.iter().sum();
            if sum > 0.0 {
                weights.iter_mut().for_each(|w| *w /= sum);
            } else {
                weights.iter_mut().for_each(|w| *w = 0.0);
                weights[0] = 1.0;
            }

            Contribution {
                start: left,
                weights,
            }
        })
        .collect()
}

/// Smoothing shrink: separable triangle filter over premultiplied alpha,
/// so fully transparent pixels do not bleed their color into neighbors.
fn shrink_smooth(source: &RasterBuffer, width: u32, height: u32) -> Result<RasterBuffer> {
    let src_w = source.width() as usize;
    let src_h = source.height() as usize;
    let dst_w = width as usize;

    let premultiplied: Vec<f32> = source
        .as_bytes()
        .chunks_exact(CHANNELS)
        .flat_map(|p| {
            let a = p[3] as f32;
            let k = a / 255.0;
            [p[0] as f32 * k, p[1] as f32 * k, p[2] as f32 * k, a]
        })
        .collect();

    let horizontal = contributions(source.width(), width);
    let mut rows = vec![0.0f32; dst_w * src_h * CHANNELS];
    rows.par_chunks_mut(dst_w * CHANNELS)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &premultiplied[y * src_w * CHANNELS..(y + 1) * src_w * CHANNELS];
            for (dst, tap) in row.chunks_exact_mut(CHANNELS).zip(&horizontal) {
                for (k, w) in tap.weights.iter().enumerate() {
                    let i = (tap.start + k) * CHANNELS;
                    for c in 0..CHANNELS {
                        dst[c] += src_row[i + c] * w;
                    }
                }
            }
        });

    let vertical = contributions(source.height(), height);
    let mut out = RasterBuffer::transparent(width, height)?;
    let stride = out.stride();
    out.as_bytes_mut()
        .par_chunks_mut(stride)
        .zip(vertical.par_iter())
        .for_each(|(row, tap)| {
            for (x, dst) in row.chunks_exact_mut(CHANNELS).enumerate() {
                let mut acc = [0.0f32; CHANNELS];
                for (k, w) in tap.weights.iter().enumerate() {
                    let i = ((tap.start + k) * dst_w + x) * CHANNELS;
                    for c in 0..CHANNELS {
                        acc[c] += rows[i + c] * w;
                    }
                }
                dst.copy_from_slice(&unpremultiply(acc));
            }
        });

    Ok(out)
}

fn unpremultiply([r, g, b, a]: [f32; 4]) -> [u8; 4] {
    let alpha = a.round().clamp(0.0, 255.0);
    if alpha == 0.0 {
        return [0, 0, 0, 0];
    }
    let k = 255.0 / a;
    let channel = |v: f32| (v * k).round().clamp(0.0, 255.0) as u8;
    [channel(r), channel(g), channel(b), alpha as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RasterBuffer {
        let data = (0..height)
            .flat_map(|y| {
                (0..width).flat_map(move |x| [(x * 10) as u8, (y * 10) as u8, 7, (100 + x + y) as u8])
            })
            .collect();
        RasterBuffer::from_rgba(width, height, data).unwrap()
    }

    #[test]
    fn test_identity_at_pixel_size_one() {
        let source = gradient(7, 5);
        let out = resample(&source, 1, 7, 5, ResampleVariant::Standard).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_output_length_matches_requested_size() {
        let source = gradient(9, 6);
        for variant in [
            ResampleVariant::Standard,
            ResampleVariant::NearestNeighborExact,
            ResampleVariant::Bilinear,
        ] {
            let out = resample(&source, 3, 13, 4, variant).unwrap();
            assert_eq!(out.as_bytes().len(), 13 * 4 * 4);
        }
    }

    #[test]
    fn test_point_sampling_never_invents_alpha() {
        let source = gradient(10, 10);
        let source_alphas: Vec<u8> = source.as_bytes().chunks_exact(4).map(|p| p[3]).collect();
        for variant in [ResampleVariant::Standard, ResampleVariant::NearestNeighborExact] {
            let out = resample(&source, 3, 17, 11, variant).unwrap();
            for p in out.as_bytes().chunks_exact(4) {
                assert!(source_alphas.contains(&p[3]));
            }
        }
    }

    #[test]
    fn test_exact_mapping_takes_block_origin() {
        let source = gradient(8, 8);
        // 8 / 4 = 2x2 intermediate, enlarged back to 2x2 keeps it untouched.
        let out = resample(&source, 4, 2, 2, ResampleVariant::NearestNeighborExact).unwrap();
        assert_eq!(out.pixel(0, 0), source.pixel(0, 0));
        assert_eq!(out.pixel(1, 0), source.pixel(4, 0));
        assert_eq!(out.pixel(0, 1), source.pixel(0, 4));
        assert_eq!(out.pixel(1, 1), source.pixel(4, 4));
    }

    #[test]
    fn test_standard_samples_block_centers() {
        let source = gradient(8, 8);
        let out = resample(&source, 4, 2, 2, ResampleVariant::Standard).unwrap();
        assert_eq!(out.pixel(0, 0), source.pixel(2, 2));
        assert_eq!(out.pixel(1, 1), source.pixel(6, 6));
    }

    #[test]
    fn test_oversized_pixel_collapses_to_single_color() {
        let source = gradient(5, 3);
        let out = resample(&source, 50, 6, 6, ResampleVariant::Standard).unwrap();
        let first = out.pixel(0, 0).unwrap();
        assert!(out.as_bytes().chunks_exact(4).all(|p| p == first));
    }

    #[test]
    fn test_white_survives_every_variant() {
        let source = RasterBuffer::filled(4, 4, [255, 255, 255, 255]).unwrap();
        for variant in [
            ResampleVariant::Standard,
            ResampleVariant::NearestNeighborExact,
            ResampleVariant::Bilinear,
        ] {
            let out = resample(&source, 2, 4, 4, variant).unwrap();
            assert_eq!(out, source, "{:?}", variant);
        }
    }

    #[test]
    fn test_bilinear_averages_and_ignores_transparent_color() {
        // Left half opaque black, right half transparent red.
        let data = (0..4)
            .flat_map(|_| {
                [[0, 0, 0, 255], [0, 0, 0, 255], [255, 0, 0, 0], [255, 0, 0, 0]]
                    .into_iter()
                    .flatten()
            })
            .collect();
        let source = RasterBuffer::from_rgba(4, 4, data).unwrap();
        let out = resample(&source, 4, 1, 1, ResampleVariant::Bilinear).unwrap();
        let [r, g, b, a] = out.pixel(0, 0).unwrap();

        assert_eq!((r, g, b), (0, 0, 0));
        assert!((100..=155).contains(&a), "alpha {}", a);
    }

    #[test]
    fn test_rejects_zero_parameters() {
        let source = gradient(4, 4);
        assert!(resample(&source, 0, 4, 4, ResampleVariant::Standard).is_err());
        assert!(resample(&source, 1, 0, 4, ResampleVariant::Standard).is_err());
        assert!(resample(&source, 1, 4, 0, ResampleVariant::Bilinear).is_err());
    }

    #[test]
    fn test_unaddressable_output_is_an_error() {
        use crate::image_pipeline::common::error::PixelfyError;

        let source = gradient(2, 2);
        let side = 1u32 << 31;
        for variant in [ResampleVariant::Standard, ResampleVariant::Bilinear] {
            let err = resample(&source, 1, side, side, variant).unwrap_err();
            assert!(matches!(err, PixelfyError::InvalidDimension { what: "pixel_area", .. }));
        }
    }
}
