//! Editor configuration
//!
//! Every field has a default matching the stock editor, so an empty TOML
//! document (or `EditorConfig::default()`) gives the standard behaviour.

use crate::annotation::{TextAlign, VerticalAlign};
use crate::error::OverlayError;
use serde::{Deserialize, Serialize};

/// Top-level editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Allowed zoom range
    #[serde(default)]
    pub zoom: ZoomLimits,
    /// Field values for newly created annotations
    #[serde(default)]
    pub defaults: AnnotationDefaults,
    /// Offset applied to both axes of a duplicated annotation
    #[serde(default = "default_duplicate_offset")]
    pub duplicate_offset: f64,
    /// Drag/resize constraints
    #[serde(default)]
    pub gesture: GestureLimits,
}

fn default_duplicate_offset() -> f64 {
    10.0
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomLimits::default(),
            defaults: AnnotationDefaults::default(),
            duplicate_offset: default_duplicate_offset(),
            gesture: GestureLimits::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    #[serde(default = "default_min_zoom")]
    pub min: f64,
    #[serde(default = "default_max_zoom")]
    pub max: f64,
}

fn default_min_zoom() -> f64 {
    0.5
}

fn default_max_zoom() -> f64 {
    3.0
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: default_min_zoom(),
            max: default_max_zoom(),
        }
    }
}

impl ZoomLimits {
    /// Narrowest and widest range a configuration may ask for
    pub const BOUNDS: (f64, f64) = (0.5, 3.0);

    /// Both limits finite, `min <= max`, and inside [`ZoomLimits::BOUNDS`]
    pub fn validate(&self) -> Result<(), OverlayError> {
        let (lowest, highest) = Self::BOUNDS;
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(OverlayError::InvalidConfig(format!(
                "zoom limits must be finite (min {}, max {})",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(OverlayError::InvalidConfig(format!(
                "zoom min {} is greater than max {}",
                self.min, self.max
            )));
        }
        if self.min < lowest || self.max > highest {
            return Err(OverlayError::InvalidConfig(format!(
                "zoom limits must lie within [{}, {}]",
                lowest, highest
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnotationDefaults {
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    pub background_color: String,
    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,
}

impl Default for AnnotationDefaults {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 60.0,
            text: "Type here...".to_string(),
            font_size: 14.0,
            font_family: "Arial".to_string(),
            color: "#000000".to_string(),
            background_color: "#ffffff".to_string(),
            text_align: TextAlign::Left,
            vertical_align: VerticalAlign::Top,
        }
    }
}

/// Smallest box a resize gesture may produce, in document units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureLimits {
    #[serde(default = "default_min_width")]
    pub min_width: f64,
    #[serde(default = "default_min_height")]
    pub min_height: f64,
}

fn default_min_width() -> f64 {
    50.0
}

fn default_min_height() -> f64 {
    20.0
}

impl Default for GestureLimits {
    fn default() -> Self {
        Self {
            min_width: default_min_width(),
            min_height: default_min_height(),
        }
    }
}

/// Process-wide rasterizer settings, installed once with
/// [`crate::render::configure_rasterizer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterizerConfig {
    /// Largest bitmap edge, in pixels, a render job may request
    #[serde(default = "default_max_surface_dimension")]
    pub max_surface_dimension: u32,
}

fn default_max_surface_dimension() -> u32 {
    8192
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            max_surface_dimension: default_max_surface_dimension(),
        }
    }
}
