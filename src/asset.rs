//! Image handles submitted for analysis.
//!
//! An `ImageAsset` is the encoded image exactly as captured or picked. The
//! pipeline never decodes it for inference; only the overlay export does.

use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Upper bound on a submitted image.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Encoded image plus a label naming where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAsset {
    source: String,
    bytes: Vec<u8>,
}

impl ImageAsset {
    pub fn new(source: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let source = source.into();
        if bytes.is_empty() {
            return Err(anyhow!("image {} is empty", source));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(anyhow!(
                "image {} is {} bytes; limit is {}",
                source,
                bytes.len(),
                MAX_IMAGE_BYTES
            ));
        }
        Ok(Self { source, bytes })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image {}", path.display()))?;
        Self::new(path.display().to_string(), bytes)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes the image for drawing.
    pub fn decode_rgb(&self) -> Result<image::RgbImage> {
        let decoded = image::load_from_memory(&self.bytes)
            .with_context(|| format!("decode image {}", self.source))?;
        Ok(decoded.into_rgb8())
    }
}
