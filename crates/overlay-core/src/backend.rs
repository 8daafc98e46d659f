//! Editable document contract and the lopdf implementation
//!
//! The export engine only needs a page count, per-page size, filled
//! rectangles, single lines of text and a final serialization. Drawing is
//! buffered per page and written out on [`DocumentBackend::save`]:
//!
//! ```text
//! Contents = [ "q", <original streams...>, "Q <overlay drawing>" ]
//! ```
//!
//! so whatever graphics state the original page leaves behind cannot shift
//! or recolour the overlay.
//!
//! Encrypted files are opened with the empty user password, which covers
//! documents protected only by an owner password. The saved output is
//! unencrypted.

use crate::error::OverlayError;
use crate::fonts::encode_win_ansi;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use tracing::debug;

/// US Letter, used when a page has no readable MediaBox
pub const DEFAULT_PAGE_SIZE: (f64, f64) = (612.0, 792.0);

const FONT_RESOURCE_PREFIX: &str = "OvlF";

/// Guard against cyclic `Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// A solid filled rectangle, bottom-left origin
#[derive(Debug, Clone, PartialEq)]
pub struct FilledRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: (f32, f32, f32),
}

/// One line of text; `(x, y)` is the baseline start, bottom-left origin
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    /// Standard 14 base font name
    pub font: &'static str,
    pub color: (f32, f32, f32),
}

/// Drawing surface for a single page
pub trait PageCanvas {
    /// Page width and height in points
    fn size(&self) -> (f64, f64);

    fn draw_rectangle(&mut self, rect: &FilledRect);

    fn draw_text(&mut self, line: &TextLine);
}

/// An editable in-memory document
pub trait DocumentBackend: Sized {
    type Page<'a>: PageCanvas
    where
        Self: 'a;

    fn load(bytes: &[u8]) -> Result<Self, OverlayError>;

    fn page_count(&self) -> u32;

    /// 1-based page access; `None` when the page does not exist
    fn page(&mut self, number: u32) -> Option<Self::Page<'_>>;

    fn save(self) -> Result<Vec<u8>, OverlayError>;
}

/// lopdf-backed implementation of [`DocumentBackend`]
pub struct LopdfBackend {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    overlays: BTreeMap<u32, PageOverlay>,
}

#[derive(Debug, Default)]
struct PageOverlay {
    operations: Vec<Operation>,
    /// Base fonts in first-use order
    fonts: Vec<&'static str>,
    /// Resource name number of `fonts[0]`
    first_font_number: u32,
}

impl PageOverlay {
    fn font_resource(&mut self, base_font: &'static str) -> String {
        let index = match self.fonts.iter().position(|f| *f == base_font) {
            Some(index) => index,
            None => {
                self.fonts.push(base_font);
                self.fonts.len() - 1
            }
        };
        font_resource_name(self.first_font_number + index as u32)
    }
}

fn font_resource_name(number: u32) -> String {
    format!("{}{}", FONT_RESOURCE_PREFIX, number)
}

pub struct LopdfPage<'a> {
    overlay: &'a mut PageOverlay,
    size: (f64, f64),
}

impl PageCanvas for LopdfPage<'_> {
    fn size(&self) -> (f64, f64) {
        self.size
    }

    fn draw_rectangle(&mut self, rect: &FilledRect) {
        let (r, g, b) = rect.color;
        self.overlay.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new(
                "re",
                vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn draw_text(&mut self, line: &TextLine) {
        let font = self.overlay.font_resource(line.font);
        let (r, g, b) = line.color;
        self.overlay.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font.into_bytes()), real(line.size)],
            ),
            Operation::new("Td", vec![real(line.x), real(line.y)]),
            Operation::new(
                "Tj",
                vec![Object::String(
                    encode_win_ansi(&line.text),
                    StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }
}

impl DocumentBackend for LopdfBackend {
    type Page<'a> = LopdfPage<'a>
    where
        Self: 'a;

    fn load(bytes: &[u8]) -> Result<Self, OverlayError> {
        let mut doc =
            Document::load_mem(bytes).map_err(|e| OverlayError::LoadError(e.to_string()))?;
        if doc.is_encrypted() {
            doc.decrypt("").map_err(|e| {
                OverlayError::LoadError(format!("Encrypted PDF requires a password: {}", e))
            })?;
            debug!("opened encrypted document with the empty user password");
        }
        let pages = doc.get_pages();
        Ok(Self {
            doc,
            pages,
            overlays: BTreeMap::new(),
        })
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page(&mut self, number: u32) -> Option<LopdfPage<'_>> {
        let page_id = *self.pages.get(&number)?;
        let size = page_size(&self.doc, page_id);
        let doc = &self.doc;
        let overlay = self.overlays.entry(number).or_insert_with(|| PageOverlay {
            first_font_number: next_font_number(doc, page_id),
            ..Default::default()
        });
        Some(LopdfPage { overlay, size })
    }

    fn save(mut self) -> Result<Vec<u8>, OverlayError> {
        let overlays = std::mem::take(&mut self.overlays);
        for (number, overlay) in overlays {
            if overlay.operations.is_empty() {
                continue;
            }
            let Some(page_id) = self.pages.get(&number).copied() else {
                continue;
            };
            write_overlay(&mut self.doc, page_id, overlay)?;
        }

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| OverlayError::ExportError(e.to_string()))?;
        Ok(output)
    }
}

impl LopdfBackend {
    /// Width and height of every page, in page order
    pub fn page_sizes(&self) -> Vec<(f64, f64)> {
        self.pages
            .values()
            .map(|id| page_size(&self.doc, *id))
            .collect()
    }

    pub fn version(&self) -> &str {
        &self.doc.version
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(f64::from(*v)),
        _ => None,
    }
}

/// Look up a page attribute, following the `Parent` chain for inherited
/// attributes such as `MediaBox` and `Resources`.
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn page_size(doc: &Document, page_id: ObjectId) -> (f64, f64) {
    let media_box = match inherited_attribute(doc, page_id, b"MediaBox") {
        Some(Object::Reference(id)) => doc.get_object(id).ok().cloned(),
        other => other,
    };

    if let Some(Object::Array(items)) = media_box {
        let values: Vec<f64> = items.iter().filter_map(number).collect();
        if values.len() == 4 {
            return ((values[2] - values[0]).abs(), (values[3] - values[1]).abs());
        }
    }
    DEFAULT_PAGE_SIZE
}

fn resolve_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    match inherited_attribute(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict,
        Some(Object::Reference(id)) => doc
            .get_dictionary(id)
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    }
}

fn resolve_fonts(doc: &Document, resources: &Dictionary) -> Dictionary {
    match resources.get(b"Font") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc
            .get_dictionary(*id)
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    }
}

/// First resource number above any overlay font already on the page, so a
/// document can be annotated and exported repeatedly.
fn next_font_number(doc: &Document, page_id: ObjectId) -> u32 {
    let resources = resolve_resources(doc, page_id);
    let fonts = resolve_fonts(doc, &resources);
    fonts
        .iter()
        .filter_map(|(key, _)| {
            std::str::from_utf8(key)
                .ok()?
                .strip_prefix(FONT_RESOURCE_PREFIX)?
                .parse::<u32>()
                .ok()
        })
        .max()
        .map_or(1, |n| n + 1)
}

fn existing_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(_) => vec![Object::Reference(*id)],
            Err(_) => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn encode(operations: Vec<Operation>) -> Result<Vec<u8>, OverlayError> {
    Content { operations }
        .encode()
        .map_err(|e| OverlayError::ExportError(format!("Content encoding failed: {}", e)))
}

fn is_symbolic(base_font: &str) -> bool {
    matches!(base_font, "Symbol" | "ZapfDingbats")
}

fn write_overlay(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: PageOverlay,
) -> Result<(), OverlayError> {
    // The page gets its own Resources so shared dictionaries stay untouched
    let mut resources = resolve_resources(doc, page_id);
    let mut fonts = resolve_fonts(doc, &resources);
    for (index, base_font) in overlay.fonts.iter().enumerate() {
        let mut font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        };
        // symbolic fonts use their built-in encoding
        if !is_symbolic(base_font) {
            font.set("Encoding", "WinAnsiEncoding");
        }
        let font_id = doc.add_object(font);
        let name = font_resource_name(overlay.first_font_number + index as u32);
        fonts.set(name, Object::Reference(font_id));
    }
    resources.set("Font", Object::Dictionary(fonts));

    // Streams are concatenated without separators, and the source may not
    // end in whitespace, so both overlay streams pad their own boundaries.
    let prefix = b"q\n".to_vec();
    let mut body = b"\nQ\n".to_vec();
    body.extend(encode(overlay.operations)?);
    body.push(b'\n');

    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), prefix));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), body));

    let mut contents = vec![Object::Reference(prefix_id)];
    contents.extend(existing_contents(doc, page_id));
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| OverlayError::ExportError(e.to_string()))?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}
