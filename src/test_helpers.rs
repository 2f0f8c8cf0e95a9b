//! Shared test utilities for the snaplog test suite.
//!
//! Provides synthetic image writers, draft builders, and a storage double
//! that can be told to fail.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! create_noisy_jpeg(&tmp.path().join("noise.jpg"), 320, 240);
//!
//! let storage = FailingStore::new();
//! storage.fail_writes(true);
//! ```

use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::storage::{KeyValueStore, MemoryStore, StorageError};
use crate::types::{Draft, DraftItem};

// =========================================================================
// Synthetic images
// =========================================================================

fn write_jpeg(path: &Path, img: &RgbImage) {
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new_with_quality(writer, 95)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgb8,
        )
        .unwrap();
}

/// Smooth gradient JPEG: compresses very well at any quality.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    write_jpeg(path, &img);
}

/// Pseudo-random noise JPEG: file size drops sharply as quality drops.
pub fn create_noisy_jpeg(path: &Path, width: u32, height: u32) {
    let mut state: u32 = 0x2545_f491;
    let img = RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        image::Rgb([next(), next(), next()])
    });
    write_jpeg(path, &img);
}

/// JPEG carrying an EXIF Orientation tag, stored `width`x`height`.
///
/// The leftmost eighth of the stored pixels is red, the rest blue, so tests
/// can tell where the left edge ended up after orientation is applied.
pub fn create_oriented_jpeg(path: &Path, width: u32, height: u32, orientation: u16) {
    let img = RgbImage::from_fn(width, height, |x, _| {
        if x < width / 8 {
            image::Rgb([255, 0, 0])
        } else {
            image::Rgb([0, 0, 255])
        }
    });
    let mut encoded = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, 95)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();

    // APP1 segment: big-endian TIFF header, one IFD entry (0x0112, SHORT, 1)
    let [hi, lo] = orientation.to_be_bytes();
    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(b"MM\0*\0\0\0\x08");
    app1.extend_from_slice(&[0x00, 0x01]);
    app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, hi, lo, 0x00, 0x00]);
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    assert_eq!(&encoded[..2], &[0xFF, 0xD8]);
    let mut bytes = encoded[..2].to_vec();
    bytes.extend_from_slice(&app1);
    bytes.extend_from_slice(&encoded[2..]);
    std::fs::write(path, bytes).unwrap();
}

/// Small PNG, for checking non-JPEG sources re-encode to JPEG.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 4 % 256) as u8, (y * 4 % 256) as u8, 64])
    });
    img.save(path).unwrap();
}

/// Regular files directly inside `dir`, sorted. Empty when `dir` is missing.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

// =========================================================================
// Drafts
// =========================================================================

/// Pending draft with a fixed id and a title derived from it.
pub fn draft_with_id(local_id: &str) -> Draft {
    let mut draft = Draft::new(
        DraftItem {
            title: Some(format!("item {local_id}")),
            ..DraftItem::default()
        },
        format!("/captures/{local_id}.jpg"),
    );
    draft.local_id = local_id.to_string();
    draft
}

// =========================================================================
// Storage double
// =========================================================================

/// In-memory store whose reads or writes can be switched to fail.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn injected(op: &str) -> StorageError {
        StorageError::Io(std::io::Error::other(format!("injected {op} failure")))
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::injected("read"));
        }
        self.inner.get(name)
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected("write"));
        }
        self.inner.set(name, value)
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected("remove"));
        }
        self.inner.remove(name)
    }
}
