//! Annotation store
//!
//! Owns the live annotation list, the undo/redo history and the single
//! selection. Structural operations (create, update, delete, duplicate)
//! commit a history checkpoint; `update_transient` changes only the live
//! list so a drag does not flood the undo stack.
//!
//! Operations addressed at an unknown id are no-ops and leave both the
//! list and the history untouched.

use crate::annotation::{Annotation, AnnotationId, AnnotationPatch};
use crate::config::EditorConfig;
use crate::history::{History, Snapshot};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    history: History,
    selected: Option<AnnotationId>,
    config: EditorConfig,
}

impl AnnotationStore {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Drop every annotation, the history and the selection
    pub fn reset(&mut self) {
        self.annotations.clear();
        self.history.clear();
        self.selected = None;
    }

    /// Add a default text box at `(x, y)` on `page`
    pub fn create(&mut self, x: f64, y: f64, page: u32) -> Annotation {
        let annotation = Annotation::with_defaults(x, y, page, &self.config.defaults);
        self.annotations.push(annotation.clone());
        self.commit();
        debug!(id = %annotation.id, page, "created annotation");
        annotation
    }

    /// Merge `patch` into the annotation and commit a checkpoint
    pub fn update(&mut self, id: &AnnotationId, patch: &AnnotationPatch) -> &[Annotation] {
        if self.merge(id, patch) {
            self.commit();
        }
        &self.annotations
    }

    /// Merge `patch` into the live list only. A later `update` with the
    /// final values is required for the change to reach history.
    pub fn update_transient(
        &mut self,
        id: &AnnotationId,
        patch: &AnnotationPatch,
    ) -> &[Annotation] {
        self.merge(id, patch);
        &self.annotations
    }

    pub fn delete(&mut self, id: &AnnotationId) -> &[Annotation] {
        let Some(pos) = self.position(id) else {
            return &self.annotations;
        };
        self.annotations.remove(pos);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        self.commit();
        debug!(%id, "deleted annotation");
        &self.annotations
    }

    /// Copy the selected annotation, offset it and select the copy.
    /// Returns `None` (and changes nothing) when there is no selection.
    pub fn duplicate(&mut self) -> Option<Annotation> {
        let selected = self.selected.clone()?;
        let source = self.get(&selected)?;

        let mut copy = source.clone();
        copy.id = AnnotationId::generate();
        copy.x += self.config.duplicate_offset;
        copy.y += self.config.duplicate_offset;

        self.annotations.push(copy.clone());
        self.commit();
        debug!(source = %selected, copy = %copy.id, "duplicated annotation");
        self.selected = Some(copy.id.clone());
        Some(copy)
    }

    pub fn select(&mut self, id: Option<AnnotationId>) {
        self.selected = id;
    }

    pub fn selected(&self) -> Option<&AnnotationId> {
        self.selected.as_ref()
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    pub fn undo(&mut self) -> &[Annotation] {
        if let Some(snapshot) = self.history.undo() {
            self.restore(&snapshot);
        }
        &self.annotations
    }

    pub fn redo(&mut self) -> &[Annotation] {
        if let Some(snapshot) = self.history.redo() {
            self.restore(&snapshot);
        }
        &self.annotations
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Live list, including any uncommitted transient changes
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Last committed list
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::clone(self.history.present())
    }

    pub fn annotations_for_page(&self, page: u32) -> Vec<&Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.page == page)
            .collect()
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| &a.id == id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Replace the live list wholesale as one structural commit
    pub fn replace_all(&mut self, annotations: Vec<Annotation>) -> &[Annotation] {
        self.annotations = annotations;
        if let Some(id) = &self.selected {
            if self.get(id).is_none() {
                self.selected = None;
            }
        }
        self.commit();
        &self.annotations
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self.history.present().as_slice())
    }

    fn merge(&mut self, id: &AnnotationId, patch: &AnnotationPatch) -> bool {
        match self.annotations.iter_mut().find(|a| &a.id == id) {
            Some(annotation) => {
                annotation.apply(patch);
                true
            }
            None => false,
        }
    }

    fn position(&self, id: &AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|a| &a.id == id)
    }

    fn commit(&mut self) {
        self.history.commit(self.annotations.clone());
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        self.annotations = (**snapshot).clone();
    }
}
