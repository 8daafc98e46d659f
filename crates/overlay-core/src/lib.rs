//! Text box overlays for PDF documents
//!
//! This crate holds the editing core behind the overlay editor:
//! - `store` / `history`: annotation list with linear undo/redo and a single selection
//! - `geometry` / `gesture`: document-space geometry and zoom-independent drag/resize
//! - `session`: loaded document, page and zoom, render orchestration
//! - `export`: flattening annotations into page content with lopdf
//!
//! Page rasterization is external; see [`render::Rasterizer`].

pub mod annotation;
pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod fonts;
pub mod geometry;
pub mod gesture;
pub mod history;
pub mod render;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use annotation::{Annotation, AnnotationId, AnnotationPatch, TextAlign, VerticalAlign};
pub use backend::{DocumentBackend, LopdfBackend, PageCanvas};
pub use config::{EditorConfig, RasterizerConfig};
pub use error::OverlayError;
pub use export::{export_document, export_file_name, ExportOutput};
pub use geometry::{to_doc, to_view, DocPoint, DocRect, ViewPoint};
pub use gesture::{Gesture, GestureKind, Handle};
pub use render::{configure_rasterizer, BlankRasterizer, Rasterizer};
pub use session::{inspect, DocumentInfo, DocumentSession};
pub use store::AnnotationStore;

/// Parse an annotation list from its JSON wire form
pub fn annotations_from_json(json: &str) -> Result<Vec<Annotation>, OverlayError> {
    Ok(serde_json::from_str(json)?)
}
