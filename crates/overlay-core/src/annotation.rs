//! Text box annotation model
//!
//! Geometry is stored unscaled in document space with a top-left origin.
//! The serde shape is the flat camelCase object exchanged with the UI layer.

use crate::config::AnnotationDefaults;
use crate::geometry::DocRect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier, stable for the lifetime of the annotation.
///
/// New ids are uuid v4 strings, but any string is accepted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AnnotationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Font sizes the editor offers. Anything else renders as [`FALLBACK_FONT_SIZE`].
pub const ALLOWED_FONT_SIZES: [f64; 11] = [
    6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 24.0, 28.0, 32.0,
];

pub const FALLBACK_FONT_SIZE: f64 = 14.0;

/// Background value meaning "no fill"
pub const TRANSPARENT: &str = "transparent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    pub background_color: String,
    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,
    /// 1-based page index
    pub page: u32,
}

impl Annotation {
    /// Build a new annotation at `(x, y)` on `page` using the configured defaults
    pub fn with_defaults(x: f64, y: f64, page: u32, defaults: &AnnotationDefaults) -> Self {
        Self {
            id: AnnotationId::generate(),
            x,
            y,
            width: defaults.width,
            height: defaults.height,
            text: defaults.text.clone(),
            font_size: defaults.font_size,
            font_family: defaults.font_family.clone(),
            color: defaults.color.clone(),
            background_color: defaults.background_color.clone(),
            text_align: defaults.text_align,
            vertical_align: defaults.vertical_align,
            page,
        }
    }

    pub fn rect(&self) -> DocRect {
        DocRect::new(self.x, self.y, self.width, self.height)
    }

    /// Font size actually used for drawing
    pub fn effective_font_size(&self) -> f64 {
        normalize_font_size(self.font_size)
    }

    /// Whether a background rectangle should be drawn
    pub fn has_background(&self) -> bool {
        let bg = self.background_color.trim();
        !bg.is_empty() && !bg.eq_ignore_ascii_case(TRANSPARENT)
    }

    /// Apply every field present in `patch`
    pub fn apply(&mut self, patch: &AnnotationPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size;
        }
        if let Some(font_family) = &patch.font_family {
            self.font_family = font_family.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(background_color) = &patch.background_color {
            self.background_color = background_color.clone();
        }
        if let Some(text_align) = patch.text_align {
            self.text_align = text_align;
        }
        if let Some(vertical_align) = patch.vertical_align {
            self.vertical_align = vertical_align;
        }
        if let Some(page) = patch.page {
            self.page = page;
        }
    }
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnotationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<VerticalAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl AnnotationPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn geometry(rect: DocRect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Map a requested font size to one the editor allows
pub fn normalize_font_size(size: f64) -> f64 {
    if ALLOWED_FONT_SIZES.contains(&size) {
        size
    } else {
        FALLBACK_FONT_SIZE
    }
}

/// Parse hex color string (e.g., "#FF0000" or "FF0000") to RGB floats (0-1 range)
pub fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() >= 6 && hex.is_ascii() {
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0) as f32 / 255.0;
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0) as f32 / 255.0;
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0) as f32 / 255.0;
        (r, g, b)
    } else {
        (0.0, 0.0, 0.0) // Default to black
    }
}
