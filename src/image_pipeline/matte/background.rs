//! Background removal strategy chain.
//!
//! Segmentation collaborators are asked for a mask one after the other. The
//! first usable mask wins; if none is usable the image is chroma keyed
//! against its top-left corner color instead. Images whose border is already
//! transparent skip the chain entirely.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::image_pipeline::common::error::{PixelfyError, Result};
use crate::image_pipeline::matte::chroma_key::{matte, ChromaKeySpec, DEFAULT_TOLERANCE};
use crate::image_pipeline::matte::mask::{composite, is_border_already_transparent, OpacityMask};
use crate::image_pipeline::raster::types::{byte_len, RasterBuffer, CHANNELS};
use crate::image_pipeline::raster::{PngReader, RasterReader};

/// Something that can produce an opacity mask for an image, typically a
/// segmentation model. `Ok(None)` means it found nothing.
pub trait MaskProvider {
    fn name(&self) -> &str;
    fn provide_mask(&self, image: &RasterBuffer) -> Result<Option<OpacityMask>>;
}

/// Which step of the chain produced the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundOutcome {
    AlreadyTransparent,
    Masked { provider: String },
    ChromaKeyFallback,
}

pub struct BackgroundRemover {
    providers: Vec<Box<dyn MaskProvider + Send + Sync>>,
    fallback_tolerance: f64,
}

impl Default for BackgroundRemover {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            fallback_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl BackgroundRemover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: impl MaskProvider + Send + Sync + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn with_fallback_tolerance(mut self, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(PixelfyError::InvalidTolerance(tolerance));
        }
        self.fallback_tolerance = tolerance;
        Ok(self)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn remove(&self, image: &RasterBuffer) -> Result<(RasterBuffer, BackgroundOutcome)> {
        if is_border_already_transparent(image) {
            info!("Border already transparent, skipping background removal");
            return Ok((image.clone(), BackgroundOutcome::AlreadyTransparent));
        }

        let expected = byte_len(image.width(), image.height())?;
        for provider in &self.providers {
            let mask = match provider.provide_mask(image) {
                Ok(Some(mask)) => mask,
                Ok(None) => {
                    debug!(provider = provider.name(), "No mask produced");
                    continue;
                }
                Err(e) => {
                    warn!(provider = provider.name(), "Mask provider failed: {}", e);
                    continue;
                }
            };

            if mask.len() != expected {
                warn!(
                    provider = provider.name(),
                    expected,
                    actual = mask.len(),
                    "Mask size does not match image"
                );
                continue;
            }
            if !mask.is_usable() {
                debug!(provider = provider.name(), "Mask is degenerate");
                continue;
            }

            info!(provider = provider.name(), "Applying segmentation mask");
            let out = composite(image, &mask)?;
            return Ok((
                out,
                BackgroundOutcome::Masked {
                    provider: provider.name().to_string(),
                },
            ));
        }

        let spec = ChromaKeySpec::from_pixel(image, 0, 0, self.fallback_tolerance)?;
        warn!(
            "No usable mask, chroma keying corner color {:?}",
            spec.reference()
        );
        Ok((matte(image, &spec), BackgroundOutcome::ChromaKeyFallback))
    }
}

/// Reads a mask from an image file.
///
/// The file's alpha channel is the opacity. A file with no transparency at
/// all (grayscale or RGB masks, as most segmentation tools write them) uses
/// its luminance instead, white being foreground.
pub struct FileMaskProvider<R: RasterReader> {
    path: PathBuf,
    reader: R,
}

impl FileMaskProvider<PngReader> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reader: PngReader,
        }
    }
}

impl<R: RasterReader> FileMaskProvider<R> {
    pub fn with_reader(path: impl Into<PathBuf>, reader: R) -> Self {
        Self {
            path: path.into(),
            reader,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: RasterReader> MaskProvider for FileMaskProvider<R> {
    fn name(&self) -> &str {
        "file"
    }

    fn provide_mask(&self, _image: &RasterBuffer) -> Result<Option<OpacityMask>> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            PixelfyError::InputReadError(format!("{}: {}", self.path.display(), e))
        })?;
        let raster = self.reader.read_raster(&bytes)?;

        if raster.as_bytes().chunks_exact(CHANNELS).all(|p| p[3] == u8::MAX) {
            warn!(
                path = %self.path.display(),
                "Mask has no transparency, using its luminance as opacity"
            );
            return Ok(Some(OpacityMask::from_alpha(&luminance(&raster))));
        }
        Ok(Some(OpacityMask::from_rgba(raster.into_bytes())))
    }
}

/// Rec. 601 luma per pixel. Gray pixels map to their own value.
fn luminance(raster: &RasterBuffer) -> Vec<u8> {
    raster
        .as_bytes()
        .chunks_exact(CHANNELS)
        .map(|p| {
            let weighted = 299 * p[0] as u32 + 587 * p[1] as u32 + 114 * p[2] as u32;
            ((weighted + 500) / 1000) as u8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedMask {
        name: &'static str,
        mask: Option<Vec<u8>>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl FixedMask {
        fn new(name: &'static str, alpha: Option<&[u8]>) -> Self {
            Self {
                name,
                mask: alpha.map(|a| OpacityMask::from_alpha(a).as_bytes().to_vec()),
                fail: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl MaskProvider for FixedMask {
        fn name(&self) -> &str {
            self.name
        }

        fn provide_mask(&self, _image: &RasterBuffer) -> Result<Option<OpacityMask>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PixelfyError::DecodeError("model unavailable".to_string()));
            }
            Ok(self.mask.clone().map(OpacityMask::from_rgba))
        }
    }

    /// 2x2 with a green corner and opaque pixels elsewhere.
    fn image() -> RasterBuffer {
        RasterBuffer::from_rgba(
            2,
            2,
            vec![
                0, 255, 0, 255, //
                200, 10, 10, 255, //
                10, 200, 10, 255, //
                0, 250, 0, 255,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_transparent_border_short_circuits() {
        let spy = FixedMask::new("spy", Some(&[0, 255, 255, 0]));
        let calls = spy.calls.clone();
        let remover = BackgroundRemover::new().with_provider(spy);

        let input = RasterBuffer::filled(4, 4, [1, 2, 3, 0]).unwrap();
        let (out, outcome) = remover.remove(&input).unwrap();

        assert_eq!(outcome, BackgroundOutcome::AlreadyTransparent);
        assert_eq!(out, input);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_first_usable_mask_wins() {
        let remover = BackgroundRemover::new()
            .with_provider(FixedMask::new("empty", None))
            .with_provider(FixedMask::new("all-foreground", Some(&[255, 255, 255, 255])))
            .with_provider(FixedMask::new("wrong-size", Some(&[0, 255])))
            .with_provider(FixedMask::new("good", Some(&[0, 255, 255, 0])))
            .with_provider(FixedMask::new("later", Some(&[255, 0, 0, 255])));

        let (out, outcome) = remover.remove(&image()).unwrap();

        assert_eq!(
            outcome,
            BackgroundOutcome::Masked {
                provider: "good".to_string()
            }
        );
        let alphas: Vec<u8> = out.as_bytes().chunks_exact(4).map(|p| p[3]).collect();
        assert_eq!(alphas, vec![0, 255, 255, 0]);
    }

    #[test]
    fn test_failing_provider_falls_through() {
        let mut broken = FixedMask::new("broken", None);
        broken.fail = true;
        let remover = BackgroundRemover::new()
            .with_provider(broken)
            .with_provider(FixedMask::new("good", Some(&[255, 0, 0, 255])));

        let (_, outcome) = remover.remove(&image()).unwrap();
        assert!(matches!(outcome, BackgroundOutcome::Masked { provider } if provider == "good"));
    }

    #[test]
    fn test_chroma_key_fallback_uses_corner_color() {
        let remover = BackgroundRemover::new().with_fallback_tolerance(10.0).unwrap();
        let (out, outcome) = remover.remove(&image()).unwrap();

        assert_eq!(outcome, BackgroundOutcome::ChromaKeyFallback);
        // Corner and its near twin go transparent, the others stay.
        assert_eq!(out.pixel(0, 0).unwrap()[3], 0);
        assert_eq!(out.pixel(1, 1).unwrap()[3], 0);
        assert_eq!(out.pixel(1, 0).unwrap()[3], 255);
        assert_eq!(out.pixel(0, 1).unwrap()[3], 255);
    }

    #[test]
    fn test_rejects_negative_fallback_tolerance() {
        assert!(BackgroundRemover::new().with_fallback_tolerance(-3.0).is_err());
    }

    /// Ignores the file contents and hands back a fixed raster.
    struct StaticReader(RasterBuffer);

    impl RasterReader for StaticReader {
        fn read_raster(&self, _data: &[u8]) -> Result<RasterBuffer> {
            Ok(self.0.clone())
        }
    }

    fn mask_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        std::fs::write(&path, b"not decoded").unwrap();
        (dir, path)
    }

    #[test]
    fn test_opaque_mask_file_uses_luminance() {
        let (_dir, path) = mask_file();
        let gray = RasterBuffer::from_rgba(
            2,
            2,
            vec![
                0, 0, 0, 255, //
                255, 255, 255, 255, //
                128, 128, 128, 255, //
                255, 0, 0, 255,
            ],
        )
        .unwrap();
        let provider = FileMaskProvider::with_reader(&path, StaticReader(gray));
        assert_eq!(provider.path(), path.as_path());

        let mask = provider.provide_mask(&image()).unwrap().unwrap();
        assert_eq!(mask.alpha().collect::<Vec<_>>(), vec![0, 255, 128, 76]);
        assert!(mask.is_usable());
    }

    #[test]
    fn test_mask_file_alpha_wins_when_present() {
        let (_dir, path) = mask_file();
        let rgba = RasterBuffer::from_rgba(
            2,
            2,
            vec![
                255, 255, 255, 0, //
                0, 0, 0, 255, //
                0, 0, 0, 255, //
                255, 255, 255, 0,
            ],
        )
        .unwrap();
        let remover = BackgroundRemover::new()
            .with_provider(FileMaskProvider::with_reader(&path, StaticReader(rgba)));

        let (out, outcome) = remover.remove(&image()).unwrap();

        assert!(matches!(outcome, BackgroundOutcome::Masked { provider } if provider == "file"));
        let alphas: Vec<u8> = out.as_bytes().chunks_exact(4).map(|p| p[3]).collect();
        assert_eq!(alphas, vec![0, 255, 255, 0]);
    }
}
