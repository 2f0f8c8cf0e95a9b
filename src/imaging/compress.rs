//! Budgeted JPEG compression.
//!
//! Turns a captured or picked photo into a JPEG that fits both a maximum
//! long-side dimension and a maximum byte size, using a fixed descending
//! quality ladder:
//!
//! ```text
//! identify ─► resolve resize ─► render ─► q=0.8 ─► fits? ─► done
//!                                            │ no
//!                                            ▼
//!                                          q=0.6 ─► fits? ─► done
//!                                            │ no
//!                                           ...
//!                                            ▼
//!                                          q=0.2 ─► done (best effort)
//! ```
//!
//! The source is decoded, oriented, and resampled once; each ladder step only
//! re-encodes those pixels.
//!
//! The first step under budget wins, so images near the budget keep as much
//! quality as possible. The last step is accepted whatever its size, so the
//! loop always terminates with a usable image.
//!
//! Any decode or encode failure, or an encoded file whose size can't be read,
//! aborts the whole run with a single [`CompressionError`]. Over-budget
//! intermediates are deleted as the ladder advances; the caller only ever
//! sees the accepted file.

use super::backend::{BackendError, ImageBackend};
use super::calculations::resolve_resize_action;
use super::params::{EncodeParams, Quality};
use crate::config::SnapLogConfig;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Quality ladder is empty")]
    EmptyLadder,
    #[error("Failed to prepare output directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read source image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Encoding at quality {quality} failed: {source}")]
    Encode {
        quality: Quality,
        #[source]
        source: BackendError,
    },
    #[error("Compressed image {} has no readable size", path.display())]
    UnreadableSize { path: PathBuf },
}

/// Limits and ladder for one compression run.
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Longest allowed side in pixels.
    pub max_dimension: u32,
    /// Byte budget for the encoded file.
    pub max_file_size: u64,
    /// Qualities to try, highest first.
    pub quality_ladder: Vec<Quality>,
}

impl CompressionConfig {
    /// Build a CompressionConfig from the loaded configuration.
    pub fn from_config(config: &SnapLogConfig) -> Self {
        let compression = &config.compression;
        Self {
            max_dimension: compression.max_dimension,
            max_file_size: compression.max_file_size,
            quality_ladder: compression
                .quality_ladder
                .iter()
                .copied()
                .map(Quality::new)
                .collect(),
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self::from_config(&SnapLogConfig::default())
    }
}

/// The accepted output of a compression run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    /// Ladder step that produced this file.
    pub quality: Quality,
}

impl CompressionResult {
    pub fn within_budget(&self, config: &CompressionConfig) -> bool {
        self.file_size <= config.max_file_size
    }
}

/// Compress `source` into `output_dir` under the configured budget.
///
/// Returns the first ladder result that fits, or the lowest-quality result
/// when none does.
pub fn compress(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    config: &CompressionConfig,
) -> Result<CompressionResult, CompressionError> {
    let Some((&last, earlier)) = config.quality_ladder.split_last() else {
        return Err(CompressionError::EmptyLadder);
    };

    let original = backend
        .identify(source)
        .map_err(|e| CompressionError::Decode {
            path: source.to_path_buf(),
            source: e,
        })?;
    let resize = resolve_resize_action((original.width, original.height), config.max_dimension);
    debug!(
        source = %source.display(),
        width = original.width,
        height = original.height,
        ?resize,
        "compressing"
    );

    // Decode and resample once; every ladder step encodes the same pixels
    let rendered = backend
        .render(source, resize)
        .map_err(|e| CompressionError::Decode {
            path: source.to_path_buf(),
            source: e,
        })?;

    std::fs::create_dir_all(output_dir)?;
    let stem = output_stem(source);

    for &quality in earlier {
        let result = encode_step(backend, &rendered, output_dir, &stem, quality)?;
        if result.within_budget(config) {
            return Ok(accept(result));
        }
        debug!(
            quality = %quality,
            file_size = result.file_size,
            budget = config.max_file_size,
            "over budget, stepping down"
        );
        discard(&result.path);
    }

    let result = encode_step(backend, &rendered, output_dir, &stem, last)?;
    if !result.within_budget(config) {
        debug!(
            file_size = result.file_size,
            budget = config.max_file_size,
            "ladder exhausted, keeping lowest quality"
        );
    }
    Ok(accept(result))
}

/// Compress several sources in parallel.
///
/// Each run is independent and owns its own output files. Results come back
/// in input order.
pub fn compress_all(
    backend: &impl ImageBackend,
    sources: &[PathBuf],
    output_dir: &Path,
    config: &CompressionConfig,
) -> Vec<Result<CompressionResult, CompressionError>> {
    sources
        .par_iter()
        .map(|source| compress(backend, source, output_dir, config))
        .collect()
}

/// Run one ladder step: encode the rendered image and measure it.
fn encode_step<B: ImageBackend>(
    backend: &B,
    rendered: &B::Rendered,
    output_dir: &Path,
    stem: &str,
    quality: Quality,
) -> Result<CompressionResult, CompressionError> {
    let output = output_dir.join(format!("{}-q{:02}.jpg", stem, quality.jpeg_quality()));
    let params = EncodeParams {
        output: output.clone(),
        quality,
    };

    let dims = backend.encode(rendered, &params).map_err(|e| {
        discard(&output);
        CompressionError::Encode { quality, source: e }
    })?;

    let file_size = match backend.read_size(&output) {
        Ok(Some(bytes)) if bytes > 0 => bytes,
        Ok(_) => {
            discard(&output);
            return Err(CompressionError::UnreadableSize { path: output });
        }
        Err(e) => {
            discard(&output);
            return Err(CompressionError::Encode { quality, source: e });
        }
    };

    Ok(CompressionResult {
        path: output,
        width: dims.width,
        height: dims.height,
        file_size,
        quality,
    })
}

fn accept(result: CompressionResult) -> CompressionResult {
    info!(
        path = %result.path.display(),
        width = result.width,
        height = result.height,
        file_size = result.file_size,
        quality = %result.quality,
        "compressed"
    );
    result
}

/// Unique per-run file stem: `<source stem>-<8 hex>`.
fn output_stem(source: &Path) -> String {
    let base = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", base, &token[..8])
}

/// Remove an artifact the caller will never see. Missing files are fine.
fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove intermediate"),
    }
}
