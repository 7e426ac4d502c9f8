//! Pipeline conversions module
//!
//! This module contains the orchestration that turns an encoded input image
//! into an encoded, pixelated output image.

mod pixelate_image;


pub use pixelate_image::PixelationPipeline;
