//! Document session
//!
//! Holds the loaded source document, the current page and zoom, the
//! annotation store and the render coordinator. The source bytes are kept
//! as one authoritative copy; every consumer (rasterizer, export) receives
//! its own copy.

use crate::annotation::{Annotation, AnnotationId};
use crate::backend::{DocumentBackend, LopdfBackend};
use crate::config::{EditorConfig, RasterizerConfig};
use crate::error::OverlayError;
use crate::export::{export_document, ExportOutput};
use crate::geometry::{clamp_zoom, rect_to_view, to_doc, ViewPoint, ViewRect};
use crate::gesture::{Gesture, GestureKind};
use crate::render::{
    rasterizer_config, JobId, RasterError, RasterRequest, RasterSurface, Rasterizer,
    RenderCoordinator, RenderJob, RenderTarget, Viewport,
};
use crate::store::AnnotationStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Smallest input worth handing to the parser
const MIN_PDF_SIZE: usize = 8;

/// Summary returned by a successful load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub name: String,
    pub page_count: u32,
    /// Width and height in points, in page order
    pub page_sizes: Vec<(f64, f64)>,
    pub version: String,
}

#[derive(Debug)]
struct LoadedDocument {
    info: DocumentInfo,
    bytes: Vec<u8>,
}

pub struct DocumentSession {
    config: EditorConfig,
    raster_config: RasterizerConfig,
    rasterizer: Arc<dyn Rasterizer>,
    document: Option<LoadedDocument>,
    store: AnnotationStore,
    current_page: u32,
    zoom: f64,
    renders: RenderCoordinator,
    /// Bumped on every successful load
    generation: u64,
}

impl DocumentSession {
    /// Create an empty session. Fails unless
    /// [`crate::render::configure_rasterizer`] has run.
    pub fn new(config: EditorConfig, rasterizer: Arc<dyn Rasterizer>) -> Result<Self, OverlayError> {
        config.zoom.validate()?;
        let raster_config = rasterizer_config()
            .cloned()
            .ok_or(OverlayError::RasterizerNotConfigured)?;
        Ok(Self {
            store: AnnotationStore::new(config.clone()),
            config,
            raster_config,
            rasterizer,
            document: None,
            current_page: 1,
            zoom: 1.0,
            renders: RenderCoordinator::new(),
            generation: 0,
        })
    }

    /// Parse and adopt a new document.
    ///
    /// On failure the session is left exactly as it was. On success all
    /// annotations and history are discarded, the page resets to 1 and the
    /// zoom to 1.0.
    pub fn load(&mut self, name: &str, bytes: &[u8]) -> Result<DocumentInfo, OverlayError> {
        let info = inspect(name, bytes)?;

        self.renders.cancel_in_flight();
        self.generation += 1;
        self.store.reset();
        self.current_page = 1;
        self.zoom = 1.0;
        self.document = Some(LoadedDocument {
            info: info.clone(),
            bytes: bytes.to_vec(),
        });

        info!(
            name = %info.name,
            pages = info.page_count,
            size = bytes.len(),
            "Loaded document"
        );
        Ok(info)
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn info(&self) -> Option<&DocumentInfo> {
        self.document.as_ref().map(|d| &d.info)
    }

    pub fn page_count(&self) -> u32 {
        self.info().map_or(0, |i| i.page_count)
    }

    pub fn page_sizes(&self) -> &[(f64, f64)] {
        self.info().map_or(&[], |i| i.page_sizes.as_slice())
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Fresh copy of the source document
    pub fn source_bytes(&self) -> Result<Vec<u8>, OverlayError> {
        self.document
            .as_ref()
            .map(|d| d.bytes.clone())
            .ok_or(OverlayError::NoDocument)
    }

    /// Move to page `n`, clamped into the document. Returns the new page.
    pub fn set_page(&mut self, n: u32) -> u32 {
        let page = n.clamp(1, self.page_count().max(1));
        if page != self.current_page {
            self.renders.cancel_in_flight();
            self.current_page = page;
        }
        page
    }

    /// Set the zoom factor, clamped to the configured limits. Stored
    /// annotation geometry is not touched.
    pub fn set_zoom(&mut self, factor: f64) -> f64 {
        let zoom = clamp_zoom(factor, self.config.zoom.min, self.config.zoom.max);
        if zoom != self.zoom {
            self.renders.cancel_in_flight();
            self.zoom = zoom;
        }
        zoom
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AnnotationStore {
        &mut self.store
    }

    /// Create an annotation where the user clicked on the current page
    pub fn add_annotation_at(&mut self, click: ViewPoint) -> Result<Annotation, OverlayError> {
        if self.document.is_none() {
            return Err(OverlayError::NoDocument);
        }
        let point = to_doc(click, self.zoom);
        Ok(self.store.create(point.x, point.y, self.current_page))
    }

    /// Annotations on the current page
    pub fn visible_annotations(&self) -> Vec<&Annotation> {
        self.store.annotations_for_page(self.current_page)
    }

    /// On-screen placement of an annotation at the current zoom
    pub fn view_rect(&self, id: &AnnotationId) -> Option<ViewRect> {
        self.store.get(id).map(|a| rect_to_view(&a.rect(), self.zoom))
    }

    /// Start a drag or resize at the current zoom
    pub fn begin_gesture(
        &self,
        id: &AnnotationId,
        kind: GestureKind,
        pointer: ViewPoint,
    ) -> Option<Gesture> {
        Gesture::begin(&self.store, id, kind, pointer, self.zoom)
    }

    fn render_target(&self) -> RenderTarget {
        RenderTarget {
            generation: self.generation,
            page: self.current_page,
            zoom: self.zoom,
        }
    }

    /// Prepare a render of the current page and zoom.
    ///
    /// Returns `Ok(None)` when that exact render is already in flight. Any
    /// render for another target is cancelled.
    pub fn request_render(&mut self) -> Result<Option<RenderJob>, OverlayError> {
        let doc = self.document.as_ref().ok_or(OverlayError::NoDocument)?;
        let page_size = doc
            .info
            .page_sizes
            .get(self.current_page as usize - 1)
            .copied()
            .ok_or_else(|| {
                OverlayError::RenderError(format!("Page {} out of range", self.current_page))
            })?;
        let viewport =
            Viewport::for_page(page_size, self.zoom, self.raster_config.max_surface_dimension)?;

        let target = self.render_target();
        let Some(ticket) = self.renders.begin(target) else {
            debug!(page = self.current_page, zoom = self.zoom, "Suppressed duplicate render");
            return Ok(None);
        };
        let request = RasterRequest {
            bytes: doc.bytes.clone(),
            page: self.current_page,
            zoom: self.zoom,
            viewport,
        };
        Ok(Some(RenderJob::new(ticket, request)))
    }

    /// Hand back the outcome of a job from [`Self::request_render`]
    pub fn complete_render(
        &mut self,
        job: JobId,
        result: Result<RasterSurface, RasterError>,
    ) -> Result<Option<RasterSurface>, OverlayError> {
        self.renders.finish(job, result)
    }

    /// Render the current page synchronously on the session's rasterizer
    pub fn render_current(&mut self) -> Result<Option<RasterSurface>, OverlayError> {
        let Some(job) = self.request_render()? else {
            return Ok(None);
        };
        let result = job.run(self.rasterizer.as_ref());
        self.complete_render(job.id(), result)
    }

    /// Flatten the committed annotations into a copy of the source document
    pub fn export(&self) -> Result<ExportOutput, OverlayError> {
        let doc = self.document.as_ref().ok_or(OverlayError::NoDocument)?;
        let source = doc.bytes.clone();
        let annotations = self.store.snapshot();
        export_document(&source, &annotations, &doc.info.name)
    }
}

/// Validate `bytes` and read page information without keeping the parse
pub fn inspect(name: &str, bytes: &[u8]) -> Result<DocumentInfo, OverlayError> {
    if bytes.len() < MIN_PDF_SIZE {
        return Err(OverlayError::LoadError(
            "File too small to be a valid PDF".to_string(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(OverlayError::LoadError(
            "Not a valid PDF file (missing %PDF- header)".to_string(),
        ));
    }

    let backend = LopdfBackend::load(bytes)?;
    let page_count = backend.page_count();
    if page_count == 0 {
        return Err(OverlayError::LoadError("PDF has no pages".to_string()));
    }

    Ok(DocumentInfo {
        name: name.to_string(),
        page_count,
        page_sizes: backend.page_sizes(),
        version: backend.version().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationPatch;
    use crate::config::RasterizerConfig;
    use crate::render::{configure_rasterizer, BlankRasterizer, CancellationToken};
    use crate::testing::{create_encrypted_test_pdf, create_test_pdf, create_test_pdf_with_sizes};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session() -> DocumentSession {
        configure_rasterizer(RasterizerConfig::default()).unwrap();
        DocumentSession::new(EditorConfig::default(), Arc::new(BlankRasterizer)).unwrap()
    }

    fn loaded(pages: u32) -> DocumentSession {
        let mut s = session();
        s.load("report.pdf", &create_test_pdf(pages)).unwrap();
        s
    }

    #[test]
    fn test_load_reports_pages() {
        let mut s = session();
        let info = s
            .load("mixed.pdf", &create_test_pdf_with_sizes(&[(612.0, 792.0), (595.0, 842.0)]))
            .unwrap();
        assert_eq!(info.page_count, 2);
        assert_eq!(info.page_sizes[1], (595.0, 842.0));
        assert_eq!(info.version, "1.7");
        assert_eq!(s.current_page(), 1);
        assert_eq!(s.zoom(), 1.0);
    }

    #[test]
    fn test_failed_load_keeps_previous_state() {
        let mut s = loaded(3);
        s.set_page(2);
        s.set_zoom(2.0);
        s.add_annotation_at(ViewPoint::new(100.0, 100.0)).unwrap();

        let err = s.load("broken.pdf", b"%PDF-1.7 garbage that will not parse").unwrap_err();
        assert!(matches!(err, OverlayError::LoadError(_)));
        assert_eq!(s.info().unwrap().name, "report.pdf");
        assert_eq!(s.current_page(), 2);
        assert_eq!(s.zoom(), 2.0);
        assert_eq!(s.store().len(), 1);
    }

    #[test]
    fn test_load_rejects_non_pdf() {
        let mut s = session();
        let err = s.load("notes.txt", b"just some plain text").unwrap_err();
        assert_eq!(
            err,
            OverlayError::LoadError("Not a valid PDF file (missing %PDF- header)".to_string())
        );
        assert!(!s.is_loaded());
    }

    #[test]
    fn test_new_rejects_invalid_zoom_limits() {
        configure_rasterizer(RasterizerConfig::default()).unwrap();
        let mut config = EditorConfig::default();
        config.zoom.min = 2.0;
        config.zoom.max = 1.0;
        let err = DocumentSession::new(config, Arc::new(BlankRasterizer)).err().unwrap();
        assert!(matches!(err, OverlayError::InvalidConfig(_)));

        let mut config = EditorConfig::default();
        config.zoom.max = 4.0;
        assert!(DocumentSession::new(config, Arc::new(BlankRasterizer)).is_err());
    }

    #[test]
    fn test_set_zoom_within_narrowed_limits() {
        configure_rasterizer(RasterizerConfig::default()).unwrap();
        let mut config = EditorConfig::default();
        config.zoom.min = 0.75;
        config.zoom.max = 2.0;
        let mut s = DocumentSession::new(config, Arc::new(BlankRasterizer)).unwrap();
        s.load("report.pdf", &create_test_pdf(1)).unwrap();
        s.set_zoom(0.5);
        assert_eq!(s.zoom(), 0.75);
        s.set_zoom(2.5);
        assert_eq!(s.zoom(), 2.0);
    }

    #[test]
    fn test_load_owner_password_only_pdf() {
        let mut s = session();
        let info = s.load("locked.pdf", &create_encrypted_test_pdf(true)).unwrap();
        assert_eq!(info.page_count, 1);

        let err = s.load("secret.pdf", &create_encrypted_test_pdf(false)).unwrap_err();
        assert!(matches!(err, OverlayError::LoadError(_)));
        assert_eq!(s.info().unwrap().name, "locked.pdf");
    }

    #[test]
    fn test_reload_discards_annotations_and_history() {
        let mut s = loaded(2);
        s.add_annotation_at(ViewPoint::new(10.0, 10.0)).unwrap();
        s.set_page(2);
        s.set_zoom(1.5);

        s.load("other.pdf", &create_test_pdf(1)).unwrap();
        assert!(s.store().is_empty());
        assert!(!s.store().can_undo());
        assert_eq!(s.current_page(), 1);
        assert_eq!(s.zoom(), 1.0);
    }

    #[test]
    fn test_set_page_clamps() {
        let mut s = loaded(3);
        assert_eq!(s.set_page(0), 1);
        assert_eq!(s.set_page(9), 3);
        assert_eq!(s.set_page(2), 2);
    }

    #[test]
    fn test_set_zoom_clamps_without_touching_geometry() {
        let mut s = loaded(1);
        let a = s.add_annotation_at(ViewPoint::new(100.0, 100.0)).unwrap();
        assert_eq!(s.set_zoom(10.0), 3.0);
        assert_eq!(s.set_zoom(0.1), 0.5);
        assert_eq!(s.set_zoom(f64::NAN), 0.5);

        let stored = s.store().get(&a.id).unwrap();
        assert_eq!((stored.x, stored.y, stored.width), (100.0, 100.0, 200.0));
        let view = s.view_rect(&a.id).unwrap();
        assert_eq!(view.width, 100.0);
    }

    #[test]
    fn test_click_to_create_converts_to_document_space() {
        let mut s = loaded(2);
        s.set_page(2);
        s.set_zoom(2.0);
        let a = s.add_annotation_at(ViewPoint::new(200.0, 300.0)).unwrap();
        assert_eq!((a.x, a.y, a.page), (100.0, 150.0, 2));
    }

    #[test]
    fn test_add_without_document() {
        let mut s = session();
        assert_eq!(
            s.add_annotation_at(ViewPoint::new(0.0, 0.0)).unwrap_err(),
            OverlayError::NoDocument
        );
    }

    #[test]
    fn test_visible_annotations_follow_page() {
        let mut s = loaded(2);
        let first = s.add_annotation_at(ViewPoint::new(10.0, 10.0)).unwrap();
        s.set_page(2);
        let second = s.add_annotation_at(ViewPoint::new(20.0, 20.0)).unwrap();

        let ids: Vec<_> = s.visible_annotations().iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids, vec![second.id.clone()]);

        s.set_page(1);
        let ids: Vec<_> = s.visible_annotations().iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids, vec![first.id.clone()]);
        assert_eq!(s.store().get(&second.id).unwrap().page, 2);
    }

    #[test]
    fn test_render_current_page() {
        let mut s = loaded(1);
        s.set_zoom(0.5);
        let surface = s.render_current().unwrap().unwrap();
        assert_eq!((surface.width, surface.height), (306, 396));
    }

    #[test]
    fn test_duplicate_render_is_suppressed() {
        let mut s = loaded(1);
        let job = s.request_render().unwrap().unwrap();
        assert!(s.request_render().unwrap().is_none());

        let done = s.complete_render(job.id(), job.run(&BlankRasterizer)).unwrap();
        assert!(done.is_some());
        // finished jobs no longer block the same target
        assert!(s.request_render().unwrap().is_some());
    }

    #[test]
    fn test_page_change_cancels_in_flight_render() {
        let mut s = loaded(2);
        let job = s.request_render().unwrap().unwrap();
        s.set_page(2);
        assert!(job.token().is_cancelled());

        let outcome = s.complete_render(job.id(), job.run(&BlankRasterizer));
        assert_eq!(outcome, Ok(None));
    }

    #[test]
    fn test_render_failure_is_reported() {
        struct Failing;
        impl Rasterizer for Failing {
            fn rasterize(
                &self,
                _: &RasterRequest,
                _: &CancellationToken,
            ) -> Result<RasterSurface, RasterError> {
                Err(RasterError::Failed("corrupt page".to_string()))
            }
        }

        configure_rasterizer(RasterizerConfig::default()).unwrap();
        let mut s = DocumentSession::new(EditorConfig::default(), Arc::new(Failing)).unwrap();
        s.load("report.pdf", &create_test_pdf(1)).unwrap();
        let a = s.add_annotation_at(ViewPoint::new(1.0, 1.0)).unwrap();

        assert_eq!(
            s.render_current(),
            Err(OverlayError::RenderError("corrupt page".to_string()))
        );
        assert!(s.store().get(&a.id).is_some());
    }

    #[test]
    fn test_rasterizer_receives_private_copy() {
        struct Counting(AtomicUsize);
        impl Rasterizer for Counting {
            fn rasterize(
                &self,
                request: &RasterRequest,
                _: &CancellationToken,
            ) -> Result<RasterSurface, RasterError> {
                assert!(request.bytes.starts_with(b"%PDF-"));
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(RasterError::Cancelled)
            }
        }

        configure_rasterizer(RasterizerConfig::default()).unwrap();
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        let mut s = DocumentSession::new(EditorConfig::default(), counting.clone()).unwrap();
        s.load("report.pdf", &create_test_pdf(1)).unwrap();

        let mut job = s.request_render().unwrap().unwrap();
        // cancellation from inside the rasterizer is swallowed
        assert_eq!(s.complete_render(job.id(), job.run(counting.as_ref())), Ok(None));
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);

        job = s.request_render().unwrap().unwrap();
        assert_eq!(job.request().bytes, s.source_bytes().unwrap());
    }

    #[test]
    fn test_export_uses_committed_state() {
        let mut s = loaded(1);
        let a = s.add_annotation_at(ViewPoint::new(100.0, 100.0)).unwrap();
        s.store_mut().update(&a.id, &AnnotationPatch::text("Committed"));
        s.store_mut().update_transient(&a.id, &AnnotationPatch::text("Transient"));

        let out = s.export().unwrap();
        assert_eq!(out.file_name, "report_annotated.pdf");
        let doc = lopdf::Document::load_mem(&out.bytes).unwrap();
        let page_id = doc.get_pages()[&1];
        let content = doc.get_page_content(page_id).unwrap();
        let shown: Vec<Vec<u8>> = lopdf::content::Content::decode(&content)
            .unwrap()
            .operations
            .into_iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands[0].as_str().ok().map(|s| s.to_vec()))
            .collect();
        assert!(shown.contains(&b"Committed".to_vec()));
        assert!(!shown.contains(&b"Transient".to_vec()));
    }

    #[test]
    fn test_export_without_document() {
        let s = session();
        assert_eq!(s.export().unwrap_err(), OverlayError::NoDocument);
    }

    #[test]
    fn test_gesture_through_session_scale() {
        let mut s = loaded(1);
        let a = s.add_annotation_at(ViewPoint::new(100.0, 100.0)).unwrap();
        s.set_zoom(2.0);
        let gesture = s
            .begin_gesture(&a.id, GestureKind::Drag, ViewPoint::new(200.0, 200.0))
            .unwrap();
        gesture.end(s.store_mut(), ViewPoint::new(300.0, 240.0));
        let moved = s.store().get(&a.id).unwrap();
        assert_eq!((moved.x, moved.y), (150.0, 120.0));
    }
}
