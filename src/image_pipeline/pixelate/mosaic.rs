//! Block-averaging mosaic.
//!
//! The source is cut into `block_w x block_h` tiles (clipped at the right and
//! bottom edges). Each tile's mean RGBA fills the tile's footprint in the
//! output, scaled by `output / source` per axis with sizes rounded up so
//! neighboring rectangles leave no gaps.

use rayon::prelude::*;
use tracing::debug;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raster::types::{validate_dimension, RasterBuffer, CHANNELS};

/// Smallest block edge in source pixels.
const MIN_BLOCK: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

pub fn mosaic(
    source: &RasterBuffer,
    pixel_size: u32,
    output_width: u32,
    output_height: u32,
) -> Result<RasterBuffer> {
    validate_dimension("pixel_size", pixel_size)?;
    validate_dimension("output_width", output_width)?;
    validate_dimension("output_height", output_height)?;
    let mut out = RasterBuffer::transparent(output_width, output_height)?;

    let (src_w, src_h) = (source.width(), source.height());
    let (block_w, block_h) = block_size(source, pixel_size, output_width, output_height);
    debug!(
        "Mosaic {}x{} -> {}x{} with {}x{} blocks",
        src_w, src_h, output_width, output_height, block_w, block_h
    );

    let block_xs: Vec<u32> = (0..src_w).step_by(block_w as usize).collect();
    let block_ys: Vec<u32> = (0..src_h).step_by(block_h as usize).collect();

    // Means only read the source, so whole block rows are computed in parallel.
    let means: Vec<Vec<[u8; 4]>> = block_ys
        .par_iter()
        .map(|&y| {
            let height = block_h.min(src_h - y);
            block_xs
                .iter()
                .map(|&x| block_mean(source, x, y, block_w.min(src_w - x), height))
                .collect()
        })
        .collect();

    // Rounded-up rectangles can overlap their neighbors by a pixel; painting
    // in scan order lets the later block win.
    let scale_x = output_width as f64 / src_w as f64;
    let scale_y = output_height as f64 / src_h as f64;
    for (row, &y) in means.iter().zip(&block_ys) {
        let height = block_h.min(src_h - y);
        for (&color, &x) in row.iter().zip(&block_xs) {
            let width = block_w.min(src_w - x);
            let rect = Rect {
                left: (x as f64 * scale_x).round() as u32,
                top: (y as f64 * scale_y).round() as u32,
                width: (width as f64 * scale_x).ceil() as u32,
                height: (height as f64 * scale_y).ceil() as u32,
            };
            fill_rect(&mut out, rect, color);
        }
    }

    Ok(out)
}

/// `max(2, floor(source / (output / pixel_size)))` per axis.
fn block_size(
    source: &RasterBuffer,
    pixel_size: u32,
    output_width: u32,
    output_height: u32,
) -> (u32, u32) {
    let edge = |src: u32, out: u32| {
        (src as u64 * pixel_size as u64 / out as u64).clamp(MIN_BLOCK, u32::MAX as u64) as u32
    };
    (
        edge(source.width(), output_width),
        edge(source.height(), output_height),
    )
}

/// Per-channel arithmetic mean, rounded half up.
fn block_mean(source: &RasterBuffer, x: u32, y: u32, width: u32, height: u32) -> [u8; 4] {
    let mut totals = [0u64; CHANNELS];
    let bytes = source.as_bytes();
    for row in y..y + height {
        let start = source.offset(x, row);
        for pixel in bytes[start..start + width as usize * CHANNELS].chunks_exact(CHANNELS) {
            for (total, &v) in totals.iter_mut().zip(pixel) {
                *total += v as u64;
            }
        }
    }

    let count = width as u64 * height as u64;
    totals.map(|total| ((2 * total + count) / (2 * count)) as u8)
}

fn fill_rect(out: &mut RasterBuffer, rect: Rect, color: [u8; 4]) {
    let right = rect.left.saturating_add(rect.width).min(out.width());
    let bottom = rect.top.saturating_add(rect.height).min(out.height());
    if rect.left >= right || rect.top >= bottom {
        return;
    }

    for y in rect.top..bottom {
        let start = out.offset(rect.left, y);
        let end = out.offset(right - 1, y) + CHANNELS;
        for pixel in out.as_bytes_mut()[start..end].chunks_exact_mut(CHANNELS) {
            pixel.copy_from_slice(&color);
        }
    }
}
