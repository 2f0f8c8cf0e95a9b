//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::ResizeAction;

/// Decide how to bring an image within `max_dimension`.
///
/// Images whose sides both fit are left alone. Otherwise the longer side is
/// pinned to `max_dimension`; ties (square images) pin the width.
///
/// # Examples
/// ```
/// # use snaplog::imaging::{ResizeAction, resolve_resize_action};
/// assert_eq!(resolve_resize_action((4000, 3000), 1920), ResizeAction::Width(1920));
/// assert_eq!(resolve_resize_action((3000, 4000), 1920), ResizeAction::Height(1920));
/// assert_eq!(resolve_resize_action((1200, 900), 1920), ResizeAction::Keep);
/// ```
pub fn resolve_resize_action(original: (u32, u32), max_dimension: u32) -> ResizeAction {
    let (width, height) = original;

    if width <= max_dimension && height <= max_dimension {
        return ResizeAction::Keep;
    }

    if width >= height {
        ResizeAction::Width(max_dimension)
    } else {
        ResizeAction::Height(max_dimension)
    }
}

/// Output dimensions after applying a resize action.
///
/// The pinned side takes the action's value; the other side is scaled by the
/// same ratio and rounded, never dropping below 1px.
pub fn resized_dimensions(original: (u32, u32), action: ResizeAction) -> (u32, u32) {
    let (width, height) = original;

    match action {
        ResizeAction::Keep => original,
        ResizeAction::Width(target) => {
            let ratio = target as f64 / width as f64;
            (target, scale_side(height, ratio))
        }
        ResizeAction::Height(target) => {
            let ratio = target as f64 / height as f64;
            (scale_side(width, ratio), target)
        }
    }
}

fn scale_side(side: u32, ratio: f64) -> u32 {
    ((side as f64 * ratio).round() as u32).max(1)
}
