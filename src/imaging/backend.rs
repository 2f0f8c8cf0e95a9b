//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines what the compression engine needs from
//! an image library: identify the source, render it once (orientation and
//! resize applied), encode the rendered pixels at a given quality, and read
//! back the encoded size. Rendering is separate from encoding so a quality
//! ladder decodes and resamples the source only once.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust on top of the
//! `image` crate. Tests use a recording mock so ladder decisions can be
//! checked without encoding pixels.

use super::params::{EncodeParams, ResizeAction};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of a decoded or encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can serve parallel compressions on a rayon pool.
pub trait ImageBackend: Sync {
    /// Decoded, oriented, and resized pixels ready for encoding.
    type Rendered;

    /// Read enough of the source to report its dimensions as displayed,
    /// i.e. after any orientation metadata is applied.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the source, apply its orientation, then the resize action.
    fn render(&self, source: &Path, resize: ResizeAction) -> Result<Self::Rendered, BackendError>;

    /// Write the rendered image as a JPEG at the requested quality.
    /// Returns the dimensions of the written image.
    fn encode(
        &self,
        rendered: &Self::Rendered,
        params: &EncodeParams,
    ) -> Result<Dimensions, BackendError>;

    /// Byte size of an encoded artifact, or `None` when it cannot be read.
    fn read_size(&self, path: &Path) -> Result<Option<u64>, BackendError>;
}
