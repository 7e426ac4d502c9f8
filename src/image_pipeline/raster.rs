//! Raster input module
//!
//! This module holds the shared RGBA pixel model and format decoders.

mod png_reader;
mod reader;
pub mod types;

pub use png_reader::PngReader;
pub use reader::RasterReader;
pub use types::{RasterBuffer, Rgb};
