//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | Content-sniffed decoder header, EXIF orientation applied |
//! | **Render** | Decode, orient, Lanczos3 resize (once per source) |
//! | **Encode → JPEG** | `JpegEncoder` at a ladder quality (once per step) |
//! | **Measure** | encoded file size on disk |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Compress**: The quality-ladder engine combining calculations + backend

pub mod backend;
mod calculations;
pub mod compress;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{resized_dimensions, resolve_resize_action};
pub use compress::{CompressionConfig, CompressionError, CompressionResult, compress, compress_all};
pub use params::{EncodeParams, Quality, ResizeAction};
pub use rust_backend::{RustBackend, is_supported_image, supported_input_extensions};
