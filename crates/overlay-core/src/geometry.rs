//! Document-space / view-space conversion
//!
//! Annotation geometry is always stored in document space (PDF points,
//! top-left origin). View space is document space multiplied by the current
//! zoom factor. Nothing in this module writes back into the store; a zoom
//! change only affects how stored geometry is displayed.

use serde::{Deserialize, Serialize};

/// A point in document space (unscaled PDF points, top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

/// A point in view space (pixels at the current zoom factor)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewPoint {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned rectangle in document space, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Rectangle in view space, used only for on-screen placement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DocPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl ViewPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl DocRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Scale a document point into view space
pub fn to_view(p: DocPoint, scale: f64) -> ViewPoint {
    ViewPoint {
        x: p.x * scale,
        y: p.y * scale,
    }
}

/// Map a view point back into document space
pub fn to_doc(p: ViewPoint, scale: f64) -> DocPoint {
    DocPoint {
        x: p.x / scale,
        y: p.y / scale,
    }
}

pub fn rect_to_view(r: &DocRect, scale: f64) -> ViewRect {
    ViewRect {
        x: r.x * scale,
        y: r.y * scale,
        width: r.width * scale,
        height: r.height * scale,
    }
}

/// Convert a screen-space pointer delta into a document-space delta.
///
/// The scale must be the one captured when the gesture started.
pub fn delta_to_doc(dx: f64, dy: f64, scale: f64) -> (f64, f64) {
    (dx / scale, dy / scale)
}

/// Clamp a zoom factor into `[min, max]`. Non-finite input falls back to `min`.
///
/// Never panics: with `min > max` the result is `max`.
pub fn clamp_zoom(factor: f64, min: f64, max: f64) -> f64 {
    if !factor.is_finite() {
        return min;
    }
    factor.max(min).min(max)
}

/// Bottom-left origin of a top-left rectangle on a page of height `page_height`
pub fn bottom_left_origin(r: &DocRect, page_height: f64) -> (f64, f64) {
    (r.x, page_height - r.y - r.height)
}
