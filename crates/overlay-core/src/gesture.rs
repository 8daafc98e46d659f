//! Interactive drag and resize
//!
//! A gesture captures the annotation's geometry, the pointer position and the
//! zoom scale when it starts. Every move recomputes the geometry from that
//! reference and the total pointer delta, so nothing accumulates between
//! moves. Moves go through [`AnnotationStore::update_transient`]; only
//! [`Gesture::end`] records history.

use crate::annotation::{AnnotationId, AnnotationPatch};
use crate::config::GestureLimits;
use crate::geometry::{delta_to_doc, DocRect, ViewPoint};
use crate::store::AnnotationStore;
use serde::{Deserialize, Serialize};

/// Corner handle of a resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Nw,
    Ne,
    Sw,
    Se,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Drag,
    Resize(Handle),
}

#[derive(Debug, Clone)]
pub struct Gesture {
    id: AnnotationId,
    kind: GestureKind,
    reference: DocRect,
    start: ViewPoint,
    scale: f64,
    limits: GestureLimits,
}

impl Gesture {
    /// Start a gesture on `id`. Returns `None` if no such annotation exists.
    pub fn begin(
        store: &AnnotationStore,
        id: &AnnotationId,
        kind: GestureKind,
        pointer: ViewPoint,
        scale: f64,
    ) -> Option<Self> {
        let reference = store.get(id)?.rect();
        Some(Self {
            id: id.clone(),
            kind,
            reference,
            start: pointer,
            scale,
            limits: store.config().gesture,
        })
    }

    pub fn id(&self) -> &AnnotationId {
        &self.id
    }

    pub fn kind(&self) -> GestureKind {
        self.kind
    }

    /// Geometry captured at start
    pub fn reference(&self) -> DocRect {
        self.reference
    }

    /// Geometry for the pointer at `pointer`, in document space
    pub fn geometry_at(&self, pointer: ViewPoint) -> DocRect {
        let (dx, dy) = delta_to_doc(pointer.x - self.start.x, pointer.y - self.start.y, self.scale);
        match self.kind {
            GestureKind::Drag => drag(self.reference, dx, dy),
            GestureKind::Resize(handle) => resize(self.reference, handle, dx, dy, &self.limits),
        }
    }

    /// Apply a pointer move without touching history
    pub fn update(&self, store: &mut AnnotationStore, pointer: ViewPoint) -> DocRect {
        let rect = self.geometry_at(pointer);
        store.update_transient(&self.id, &AnnotationPatch::geometry(rect));
        rect
    }

    /// Finish with one committing update at the final pointer position
    pub fn end(self, store: &mut AnnotationStore, pointer: ViewPoint) -> DocRect {
        let rect = self.geometry_at(pointer);
        store.update(&self.id, &AnnotationPatch::geometry(rect));
        rect
    }

    /// Drop the gesture and put the reference geometry back
    pub fn abandon(self, store: &mut AnnotationStore) {
        store.update_transient(&self.id, &AnnotationPatch::geometry(self.reference));
    }
}

fn drag(reference: DocRect, dx: f64, dy: f64) -> DocRect {
    DocRect {
        x: (reference.x + dx).max(0.0),
        y: (reference.y + dy).max(0.0),
        ..reference
    }
}

/// The corner opposite `handle` stays fixed
fn resize(reference: DocRect, handle: Handle, dx: f64, dy: f64, limits: &GestureLimits) -> DocRect {
    let (moves_left, moves_top) = match handle {
        Handle::Nw => (true, true),
        Handle::Ne => (false, true),
        Handle::Sw => (true, false),
        Handle::Se => (false, false),
    };

    let (x, width) = if moves_left {
        let width = (reference.width - dx).max(limits.min_width);
        (reference.right() - width, width)
    } else {
        (reference.x, (reference.width + dx).max(limits.min_width))
    };
    let (y, height) = if moves_top {
        let height = (reference.height - dy).max(limits.min_height);
        (reference.bottom() - height, height)
    } else {
        (reference.y, (reference.height + dy).max(limits.min_height))
    };

    DocRect::new(x, y, width, height)
}
