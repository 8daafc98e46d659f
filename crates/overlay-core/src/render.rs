//! Page rasterization contract and render orchestration
//!
//! Rasterization itself is done by an external [`Rasterizer`]. This module
//! decides when a render should run: at most one job is in flight, a request
//! for the target already being rendered is suppressed, and a request for a
//! different target cancels the stale job first. Cancellation is routine and
//! never surfaces as an error.

use crate::config::RasterizerConfig;
use crate::error::OverlayError;
use once_cell::sync::OnceCell;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use thiserror::Error;
use tracing::debug;

static RASTERIZER_CONFIG: OnceCell<RasterizerConfig> = OnceCell::new();

/// Install the process-wide rasterizer configuration.
///
/// Must run before any [`crate::session::DocumentSession`] is created.
/// Calling it again with an identical configuration is accepted; a different
/// configuration is rejected.
pub fn configure_rasterizer(config: RasterizerConfig) -> Result<(), OverlayError> {
    let installed = RASTERIZER_CONFIG.get_or_init(|| config.clone());
    if *installed == config {
        Ok(())
    } else {
        Err(OverlayError::RasterizerAlreadyConfigured)
    }
}

pub fn rasterizer_config() -> Option<&'static RasterizerConfig> {
    RASTERIZER_CONFIG.get()
}

/// Cooperative cancellation flag shared between the coordinator and a job
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; every clone observes it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("Render cancelled")]
    Cancelled,

    #[error("Rasterization failed: {0}")]
    Failed(String),
}

/// Bitmap size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport for a page of `page_size` points at `zoom`
    pub fn for_page(
        page_size: (f64, f64),
        zoom: f64,
        max_dimension: u32,
    ) -> Result<Self, OverlayError> {
        let width = (page_size.0 * zoom).ceil();
        let height = (page_size.1 * zoom).ceil();
        let max = f64::from(max_dimension);
        if !(width >= 1.0 && height >= 1.0 && width <= max && height <= max) {
            return Err(OverlayError::RenderError(format!(
                "Viewport {}x{} outside 1..={} pixels",
                width, height, max_dimension
            )));
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }
}

/// Everything a rasterizer needs for one page
#[derive(Debug, Clone, PartialEq)]
pub struct RasterRequest {
    /// Private copy of the source document
    pub bytes: Vec<u8>,
    /// 1-based
    pub page: u32,
    pub zoom: f64,
    pub viewport: Viewport,
}

/// RGBA8 bitmap, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterSurface {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// External page renderer
pub trait Rasterizer: Send + Sync {
    /// Render one page. Implementations should poll `cancel` and return
    /// [`RasterError::Cancelled`] once it fires.
    fn rasterize(
        &self,
        request: &RasterRequest,
        cancel: &CancellationToken,
    ) -> Result<RasterSurface, RasterError>;
}

/// Produces a white surface of the requested size. Used where no real
/// renderer is attached, such as headless export.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankRasterizer;

impl Rasterizer for BlankRasterizer {
    fn rasterize(
        &self,
        request: &RasterRequest,
        cancel: &CancellationToken,
    ) -> Result<RasterSurface, RasterError> {
        if cancel.is_cancelled() {
            return Err(RasterError::Cancelled);
        }
        let Viewport { width, height } = request.viewport;
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| RasterError::Failed("Surface too large".to_string()))?;
        Ok(RasterSurface {
            width,
            height,
            pixels: vec![0xFF; len],
        })
    }
}

/// What is being rendered. `generation` changes on every document load, so
/// the same page and zoom of a new document is a new target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    pub generation: u64,
    pub page: u32,
    pub zoom: f64,
}

pub type JobId = u64;

/// Handle to a render started by [`RenderCoordinator::begin`]
#[derive(Debug, Clone)]
pub struct RenderTicket {
    pub id: JobId,
    pub target: RenderTarget,
    pub token: CancellationToken,
}

/// A render ready to hand to a rasterizer
#[derive(Debug, Clone)]
pub struct RenderJob {
    ticket: RenderTicket,
    request: RasterRequest,
}

impl RenderJob {
    pub fn new(ticket: RenderTicket, request: RasterRequest) -> Self {
        Self { ticket, request }
    }

    pub fn id(&self) -> JobId {
        self.ticket.id
    }

    pub fn target(&self) -> RenderTarget {
        self.ticket.target
    }

    pub fn request(&self) -> &RasterRequest {
        &self.request
    }

    pub fn token(&self) -> &CancellationToken {
        &self.ticket.token
    }

    pub fn run(&self, rasterizer: &dyn Rasterizer) -> Result<RasterSurface, RasterError> {
        if self.ticket.token.is_cancelled() {
            return Err(RasterError::Cancelled);
        }
        rasterizer.rasterize(&self.request, &self.ticket.token)
    }
}

#[derive(Debug, Default)]
pub struct RenderCoordinator {
    next_id: JobId,
    in_flight: Option<RenderTicket>,
}

impl RenderCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a render for `target`. Returns `None` when that target is
    /// already in flight. A job for any other target is cancelled first.
    pub fn begin(&mut self, target: RenderTarget) -> Option<RenderTicket> {
        if let Some(current) = &self.in_flight {
            if current.target == target {
                debug!(job = current.id, page = target.page, "Render already in flight");
                return None;
            }
        }
        self.cancel_in_flight();

        self.next_id += 1;
        let ticket = RenderTicket {
            id: self.next_id,
            target,
            token: CancellationToken::new(),
        };
        self.in_flight = Some(ticket.clone());
        Some(ticket)
    }

    /// Cancel the in-flight job, if any. Returns whether one was cancelled.
    pub fn cancel_in_flight(&mut self) -> bool {
        match self.in_flight.take() {
            Some(ticket) => {
                ticket.token.cancel();
                debug!(job = ticket.id, page = ticket.target.page, "Cancelled stale render");
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> Option<&RenderTicket> {
        self.in_flight.as_ref()
    }

    /// Settle a finished job.
    ///
    /// `Ok(Some(surface))` for the current job's output; `Ok(None)` for
    /// cancelled or superseded jobs. Only a failure of the current job is an
    /// error.
    pub fn finish(
        &mut self,
        job: JobId,
        result: Result<RasterSurface, RasterError>,
    ) -> Result<Option<RasterSurface>, OverlayError> {
        let current = match &self.in_flight {
            Some(ticket) if ticket.id == job => !ticket.token.is_cancelled(),
            _ => false,
        };
        if current {
            self.in_flight = None;
        }

        match result {
            Ok(surface) if current => Ok(Some(surface)),
            Ok(_) => {
                debug!(job, "Dropping output of superseded render");
                Ok(None)
            }
            Err(RasterError::Cancelled) => {
                debug!(job, "Render cancelled");
                Ok(None)
            }
            Err(RasterError::Failed(msg)) if current => Err(OverlayError::RenderError(msg)),
            Err(RasterError::Failed(msg)) => {
                debug!(job, error = %msg, "Superseded render failed");
                Ok(None)
            }
        }
    }
}
