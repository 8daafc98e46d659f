//! Export engine: flattens annotations into page content
//!
//! Layout is a pure function from an annotation and its page height to a
//! list of [`DrawCommand`]s in bottom-left-origin page space. Flattening
//! replays those commands onto any [`DocumentBackend`].
//!
//! Horizontal alignment is positional only. Without font metrics, `center`
//! starts the text at the box centre and `right` starts it 5 units inside the
//! right edge.

use crate::annotation::{parse_hex_color, Annotation, TextAlign, VerticalAlign};
use crate::backend::{DocumentBackend, FilledRect, LopdfBackend, PageCanvas, TextLine};
use crate::error::OverlayError;
use crate::fonts::standard_font_for;
use crate::geometry::bottom_left_origin;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Line height as a multiple of the font size
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Horizontal inset for left and right aligned text
pub const TEXT_PADDING: f64 = 5.0;

/// Bottom padding for bottom aligned text, as a multiple of the font size
pub const BOTTOM_PADDING_FACTOR: f64 = 0.2;

const EXPORT_SUFFIX: &str = "_annotated";
const DEFAULT_EXTENSION: &str = "pdf";

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rect(FilledRect),
    Text(TextLine),
}

/// Result of an export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    /// Suggested download name, e.g. `report_annotated.pdf`
    pub file_name: String,
}

/// Counts reported by [`flatten_into`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenSummary {
    pub flattened: usize,
    pub skipped: usize,
}

/// Lay out one annotation on a page of height `page_height`
pub fn layout_annotation(annotation: &Annotation, page_height: f64) -> Vec<DrawCommand> {
    let mut commands = Vec::new();
    let (origin_x, origin_y) = bottom_left_origin(&annotation.rect(), page_height);

    if annotation.has_background() {
        commands.push(DrawCommand::Rect(FilledRect {
            x: origin_x,
            y: origin_y,
            width: annotation.width,
            height: annotation.height,
            color: parse_hex_color(&annotation.background_color),
        }));
    }

    if annotation.text.trim().is_empty() {
        return commands;
    }

    let font_size = annotation.effective_font_size();
    let line_height = font_size * LINE_HEIGHT_FACTOR;
    let lines = split_lines(&annotation.text);
    let total_height = lines.len() as f64 * line_height;
    let offset = vertical_offset(
        annotation.vertical_align,
        annotation.height,
        total_height,
        line_height,
        font_size,
    );
    let x = line_start(annotation.text_align, origin_x, annotation.width);
    let font = standard_font_for(&annotation.font_family);
    let color = parse_hex_color(&annotation.color);

    for (index, line) in lines.iter().enumerate() {
        // blank lines still take up a line slot
        if line.trim().is_empty() {
            continue;
        }
        commands.push(DrawCommand::Text(TextLine {
            text: (*line).to_string(),
            x,
            y: origin_y + offset - index as f64 * line_height,
            size: font_size,
            font,
            color,
        }));
    }
    commands
}

/// Split on `\n`, tolerating `\r\n`
fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Baseline of the first line, measured upward from the box's bottom edge
pub fn vertical_offset(
    align: VerticalAlign,
    box_height: f64,
    total_height: f64,
    line_height: f64,
    font_size: f64,
) -> f64 {
    match align {
        VerticalAlign::Top => box_height - line_height,
        VerticalAlign::Middle => box_height / 2.0 + total_height / 2.0 - line_height,
        VerticalAlign::Bottom => total_height - BOTTOM_PADDING_FACTOR * font_size,
    }
}

pub fn line_start(align: TextAlign, origin_x: f64, box_width: f64) -> f64 {
    match align {
        TextAlign::Left => origin_x + TEXT_PADDING,
        TextAlign::Center => origin_x + box_width / 2.0,
        TextAlign::Right => origin_x + box_width - TEXT_PADDING,
    }
}

/// Draw every annotation onto its page. Annotations pointing at pages the
/// document does not have are skipped.
pub fn flatten_into<B: DocumentBackend>(
    backend: &mut B,
    annotations: &[Annotation],
) -> FlattenSummary {
    let mut summary = FlattenSummary::default();
    let page_count = backend.page_count();

    for annotation in annotations {
        let Some(mut page) = backend.page(annotation.page) else {
            warn!(
                id = %annotation.id,
                page = annotation.page,
                page_count,
                "Skipping annotation on missing page"
            );
            summary.skipped += 1;
            continue;
        };

        let (_, page_height) = page.size();
        for command in layout_annotation(annotation, page_height) {
            match command {
                DrawCommand::Rect(rect) => page.draw_rectangle(&rect),
                DrawCommand::Text(line) => page.draw_text(&line),
            }
        }
        summary.flattened += 1;
    }
    summary
}

/// Produce a new PDF with `annotations` drawn permanently into its pages
pub fn export_document(
    source: &[u8],
    annotations: &[Annotation],
    source_name: &str,
) -> Result<ExportOutput, OverlayError> {
    let mut backend = LopdfBackend::load(source).map_err(|e| match e {
        OverlayError::LoadError(msg) => {
            OverlayError::ExportError(format!("Could not reopen source document: {}", msg))
        }
        other => other,
    })?;

    let summary = flatten_into(&mut backend, annotations);
    debug!(?summary, "Flattened annotations");

    let bytes = backend.save()?;
    let file_name = export_file_name(source_name);
    info!(
        file_name = %file_name,
        flattened = summary.flattened,
        skipped = summary.skipped,
        size = bytes.len(),
        "Exported annotated document"
    );
    Ok(ExportOutput { bytes, file_name })
}

/// `report.pdf` becomes `report_annotated.pdf`. Directory components are
/// dropped and a name without an extension gets `.pdf`.
pub fn export_file_name(source_name: &str) -> String {
    let name = source_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_name)
        .trim();
    let name = if name.is_empty() { "document" } else { name };

    match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.is_empty() => {
            format!("{}{}.{}", base, EXPORT_SUFFIX, ext)
        }
        _ => format!(
            "{}{}.{}",
            name.trim_end_matches('.'),
            EXPORT_SUFFIX,
            DEFAULT_EXTENSION
        ),
    }
}
