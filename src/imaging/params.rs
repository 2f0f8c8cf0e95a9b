//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`compress`](super::compress) engine (which decides
//! what to render and which encodes to attempt) and the
//! [`backend`](super::backend) (which does the actual pixel work). Keeping
//! them apart lets tests swap in a mock backend without touching the ladder
//! logic.
//!
//! ## Types
//!
//! - [`Quality`]: Normalized lossy quality factor in (0, 1]. Clamped on construction.
//! - [`ResizeAction`]: Which side (if any) to pin to the maximum dimension.
//! - [`EncodeParams`]: Output path and quality for one ladder step.

use std::fmt;
use std::path::PathBuf;

/// Smallest quality factor a step may request.
const MIN_QUALITY: f32 = 0.01;

/// Normalized JPEG quality factor (0.01–1.0).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Quality(f32);

impl Quality {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(MIN_QUALITY);
        }
        Self(value.clamp(MIN_QUALITY, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on the 1–100 scale used by JPEG encoders.
    pub fn jpeg_quality(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.8)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// How to bring an image within the maximum dimension.
///
/// Only the long side is pinned; the short side is derived so the aspect
/// ratio is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAction {
    /// Both sides already fit.
    Keep,
    /// Landscape or square: width becomes this value.
    Width(u32),
    /// Portrait: height becomes this value.
    Height(u32),
}

/// Parameters for encoding one ladder step from an already rendered image.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub output: PathBuf,
    pub quality: Quality,
}
