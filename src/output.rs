//! CLI output formatting.
//!
//! Every command prints a short inventory: one header line per entity
//! (positional index plus its name), followed by indented context lines.
//!
//! # Output Format
//!
//! ## Compress
//!
//! ```text
//! 001 IMG_0042.jpg
//!     Output: out/IMG_0042-1a2b3c4d-q60.jpg
//!     1920x1440, 412.3 KB at quality 0.60
//! 002 broken.jpg
//!     Failed: Failed to read source image in/broken.jpg: ...
//!
//! Compressed 1 of 2 images
//! ```
//!
//! ## Drafts
//!
//! ```text
//! 001 Desk lamp [pending]
//!     Id: 6f1c...
//!     Image: .snaplog/captures/lamp-1a2b3c4d-q80.jpg
//! 002 (untitled) [error, 2 retries]
//!     Id: 90ab...
//!     Image: ...
//! ```
//!
//! ## Items
//!
//! ```text
//! 001 Desk lamp
//!     Id: 3c9e...
//!     Category: Lighting, condition: Good
//!     Tags: brass, vintage
//!     Image: images/3c9e....jpg
//! ```
//!
//! ## Sync
//!
//! ```text
//! Committed Desk lamp → 3c9e...
//! Failed 90ab... (attempt 3): Backend rejected draft: title is required
//!
//! 1 committed, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::{CompressionError, CompressionResult};
use crate::sync::SyncReport;
use crate::types::{Draft, Item};
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Decimal byte size, the unit budgets are written in.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1_000 {
        format!("{} B", bytes)
    } else if bytes < 1_000_000 {
        format!("{:.1} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1_000_000.0)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn result_lines(result: &CompressionResult, budget: u64) -> Vec<String> {
    let mut lines = vec![
        format!("{}Output: {}", indent(1), result.path.display()),
        format!(
            "{}{}x{}, {} at quality {}",
            indent(1),
            result.width,
            result.height,
            format_bytes(result.file_size),
            result.quality
        ),
    ];
    if result.file_size > budget {
        lines.push(format!(
            "{}Over budget ({}), kept lowest quality",
            indent(1),
            format_bytes(budget)
        ));
    }
    lines
}

// ============================================================================
// Compress
// ============================================================================

/// Format per-source compression outcomes, in input order.
pub fn format_compression_results(
    sources: &[PathBuf],
    results: &[Result<CompressionResult, CompressionError>],
    budget: u64,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut succeeded = 0;

    for (i, (source, result)) in sources.iter().zip(results).enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), file_name(source)));
        match result {
            Ok(r) => {
                succeeded += 1;
                lines.extend(result_lines(r, budget));
            }
            Err(e) => lines.push(format!("{}Failed: {}", indent(1), e)),
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Compressed {} of {} images",
        succeeded,
        results.len()
    ));
    lines
}

pub fn print_compression_results(
    sources: &[PathBuf],
    results: &[Result<CompressionResult, CompressionError>],
    budget: u64,
) {
    for line in format_compression_results(sources, results, budget) {
        println!("{}", line);
    }
}

// ============================================================================
// Capture
// ============================================================================

/// Format a freshly queued capture.
///
/// ```text
/// Queued Desk lamp
///     Id: 6f1c...
///     Output: .snaplog/captures/lamp-1a2b3c4d-q80.jpg
///     1920x1440, 412.3 KB at quality 0.80
/// ```
pub fn format_capture(draft: &Draft, result: &CompressionResult, budget: u64) -> Vec<String> {
    let mut lines = vec![
        format!("Queued {}", draft_title(draft)),
        format!("{}Id: {}", indent(1), draft.local_id),
    ];
    lines.extend(result_lines(result, budget));
    lines
}

pub fn print_capture(draft: &Draft, result: &CompressionResult, budget: u64) {
    for line in format_capture(draft, result, budget) {
        println!("{}", line);
    }
}

// ============================================================================
// Drafts
// ============================================================================

fn draft_title(draft: &Draft) -> &str {
    match draft.item.title.as_deref() {
        Some(t) if !t.trim().is_empty() => t,
        _ => "(untitled)",
    }
}

fn draft_state(draft: &Draft) -> String {
    match draft.retry_count {
        0 => draft.sync_status.to_string(),
        1 => format!("{}, 1 retry", draft.sync_status),
        n => format!("{}, {} retries", draft.sync_status, n),
    }
}

/// Format the queued drafts in queue order.
pub fn format_draft_list(drafts: &[Draft]) -> Vec<String> {
    if drafts.is_empty() {
        return vec!["No drafts queued".to_string()];
    }

    let mut lines = Vec::new();
    for (i, draft) in drafts.iter().enumerate() {
        lines.push(format!(
            "{} {} [{}]",
            format_index(i + 1),
            draft_title(draft),
            draft_state(draft)
        ));
        lines.push(format!("{}Id: {}", indent(1), draft.local_id));
        lines.push(format!("{}Image: {}", indent(1), draft.local_image_uri));
    }
    lines
}

pub fn print_draft_list(drafts: &[Draft]) {
    for line in format_draft_list(drafts) {
        println!("{}", line);
    }
}

// ============================================================================
// Items
// ============================================================================

/// Format committed items, one block each, in the order given.
pub fn format_item_list(items: &[Item]) -> Vec<String> {
    if items.is_empty() {
        return vec!["No items".to_string()];
    }

    let mut lines = Vec::new();
    for (i, item) in items.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), item.title));
        lines.push(format!("{}Id: {}", indent(1), item.id));
        if item.category.is_empty() {
            lines.push(format!("{}Condition: {}", indent(1), item.condition));
        } else {
            lines.push(format!(
                "{}Category: {}, condition: {}",
                indent(1),
                item.category,
                item.condition
            ));
        }
        if !item.tags.is_empty() {
            lines.push(format!("{}Tags: {}", indent(1), item.tags.join(", ")));
        }
        lines.push(format!("{}Image: {}", indent(1), item.image_path));
    }
    lines
}

pub fn print_item_list(items: &[Item]) {
    for line in format_item_list(items) {
        println!("{}", line);
    }
}

// ============================================================================
// Sync
// ============================================================================

/// Format what a sync run did, ending with the one-line summary.
pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();

    for item in &report.committed {
        lines.push(format!("Committed {} → {}", item.title, item.id));
    }
    for failed in &report.failed {
        lines.push(format!(
            "Failed {} (attempt {}): {}",
            failed.local_id, failed.retry_count, failed.reason
        ));
    }
    for local_id in &report.exhausted {
        lines.push(format!("Skipped {} (retry limit reached)", local_id));
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(report.to_string());
    lines
}

pub fn print_sync_report(report: &SyncReport) {
    for line in format_sync_report(report) {
        println!("{}", line);
    }
}
