//! Color reduction passes applied to an already pixelated buffer.

use rayon::prelude::*;
use tracing::debug;

use crate::image_pipeline::raster::types::{RasterBuffer, CHANNELS};

/// Levels per channel for posterization.
pub const POSTERIZE_LEVELS: u32 = 5;

/// Channel values snap to multiples of this before the dither bias.
const DITHER_STEP: u16 = 64;

/// Added on the diagonal of each 4x4 tile.
const DITHER_BIAS: u16 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizeMode {
    Dithered,
    Posterized,
}

/// Quantizes RGB in place and hands the buffer back. Alpha is left alone.
///
/// Both modes are pure functions of the pixel value and its `(x, y)`, so rows
/// can be processed in any order.
pub fn quantize(mut buffer: RasterBuffer, mode: QuantizeMode) -> RasterBuffer {
    debug!(
        "Quantizing {}x{} ({:?})",
        buffer.width(),
        buffer.height(),
        mode
    );

    let posterize_lut = posterize_table();
    let stride = buffer.stride();

    buffer
        .as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.chunks_exact_mut(CHANNELS).enumerate() {
                match mode {
                    QuantizeMode::Posterized => {
                        for c in &mut pixel[..3] {
                            *c = posterize_lut[*c as usize];
                        }
                    }
                    QuantizeMode::Dithered => {
                        let bias = ordered_bias(x, y);
                        for c in &mut pixel[..3] {
                            *c = dither_channel(*c, bias);
                        }
                    }
                }
            }
        });

    buffer
}

/// `round(round(v / step) * step)` with `step = 255 / (levels - 1)`.
fn posterize_table() -> [u8; 256] {
    let step = 255.0 / (POSTERIZE_LEVELS - 1) as f64;
    let mut table = [0u8; 256];
    for (v, slot) in table.iter_mut().enumerate() {
        *slot = ((v as f64 / step).round() * step).round().min(255.0) as u8;
    }
    table
}

fn ordered_bias(x: usize, y: usize) -> u16 {
    if x % 4 == y % 4 { DITHER_BIAS } else { 0 }
}

fn dither_channel(v: u8, bias: u16) -> u8 {
    let snapped = (v as u16 + DITHER_STEP / 2) / DITHER_STEP * DITHER_STEP;
    (snapped + bias).min(u8::MAX as u16) as u8
}
