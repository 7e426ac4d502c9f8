//! Matting module
//!
//! Turns backgrounds into transparency, either by color distance to a key
//! color or by merging an externally produced opacity mask.

mod background;
mod chroma_key;
mod mask;

pub use background::{BackgroundOutcome, BackgroundRemover, FileMaskProvider, MaskProvider};
pub use chroma_key::{matte, ChromaKeySpec, DEFAULT_TOLERANCE};
pub use mask::{
    composite, is_border_already_transparent, is_mask_usable, OpacityMask,
    BORDER_TRANSPARENCY_THRESHOLD,
};
