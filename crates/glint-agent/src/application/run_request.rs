//! RunRequestUseCase: the background worker behind one capture request.
//!
//! Runs the capture → inference pipeline for a [`RequestTicket`] and reports
//! each stage back to the dispatcher as a [`LifecycleEvent`].  The worker
//! never touches lifecycle state directly; the dispatcher decides whether a
//! completion is still wanted.
//!
//! # Stages
//!
//! 1. Capture and PNG encoding (blocking GDI calls and CPU-bound
//!    compression, so both run on `spawn_blocking`).  Either failing sends
//!    `CaptureFailed` and stops; no API key is tried.  The image is encoded
//!    once per request, not once per key.
//! 2. `CaptureCompleted`.
//! 3. If the ticket was aborted in the meantime, stop without calling the
//!    model.
//! 4. Inference through [`CredentialRotation`], then `InferenceCompleted`.

use std::io::Cursor;
use std::sync::Arc;

use glint_core::{AgentEvent, CaptureTarget, LifecycleEvent, RequestTicket, SelectionRect};
use image::{ImageFormat, RgbaImage};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::application::rotate_credentials::CredentialRotation;

/// Error type for screen capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no capturable window at ({x}, {y})")]
    NoWindowAtPoint { x: i32, y: i32 },

    #[error("capture area is empty ({width}x{height})")]
    EmptyArea { width: i32, height: i32 },

    #[error("platform error: {0}")]
    Platform(String),

    #[error("failed to encode screenshot: {0}")]
    Encode(String),

    #[error("screen capture is not supported on this platform")]
    UnsupportedPlatform,
}

/// A captured screenshot as tightly packed 8-bit RGBA rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl CapturedImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rgba,
        }
    }

    /// Compresses the pixels into PNG bytes for upload.
    pub fn into_png(self) -> Result<EncodedImage, CaptureError> {
        let Self {
            width,
            height,
            rgba,
        } = self;
        let len = rgba.len();
        let buffer = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
            CaptureError::Encode(format!(
                "pixel buffer of {len} bytes does not match {width}x{height}"
            ))
        })?;
        let mut png = Vec::new();
        buffer
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
        Ok(EncodedImage { width, height, png })
    }
}

/// A screenshot ready to send: PNG bytes plus the source dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Grabs pixels from the screen.
///
/// Implementations are synchronous; the use case moves them onto the
/// blocking thread pool.
pub trait CaptureProvider: Send + Sync {
    /// Captures the top-level window under the given screen point.
    fn capture_window_at(&self, x: i32, y: i32) -> Result<CapturedImage, CaptureError>;

    /// Captures an arbitrary screen rectangle.
    fn capture_region(&self, rect: SelectionRect) -> Result<CapturedImage, CaptureError>;
}

pub struct RunRequestUseCase {
    capture: Arc<dyn CaptureProvider>,
    inference: Arc<CredentialRotation>,
}

impl RunRequestUseCase {
    pub fn new(capture: Arc<dyn CaptureProvider>, inference: Arc<CredentialRotation>) -> Self {
        Self { capture, inference }
    }

    /// Runs the request to completion, reporting stages on `events`.
    pub async fn run(&self, ticket: RequestTicket, events: &mpsc::Sender<AgentEvent>) {
        let span = tracing::info_span!("request", request = %ticket.id);
        self.run_stages(ticket, events).instrument(span).await
    }

    async fn run_stages(&self, ticket: RequestTicket, events: &mpsc::Sender<AgentEvent>) {
        let request = ticket.id;
        let image = match self.capture(ticket.target).await {
            Ok(image) => image,
            Err(reason) => {
                tracing::warn!(error = %reason, "capture failed");
                report(
                    events,
                    LifecycleEvent::CaptureFailed {
                        request,
                        reason: reason.to_string(),
                    },
                )
                .await;
                return;
            }
        };
        tracing::debug!(
            width = image.width,
            height = image.height,
            png_bytes = image.png.len(),
            "captured"
        );
        report(events, LifecycleEvent::CaptureCompleted { request }).await;

        if ticket.abort.is_aborted() {
            tracing::debug!("aborted after capture, skipping inference");
            return;
        }

        let outcome = self.inference.infer(&image, &ticket.history).await;
        report(events, LifecycleEvent::InferenceCompleted { request, outcome }).await;
    }

    async fn capture(&self, target: CaptureTarget) -> Result<EncodedImage, CaptureError> {
        let capture = Arc::clone(&self.capture);
        tokio::task::spawn_blocking(move || {
            let image = match target {
                CaptureTarget::WindowAt { x, y } => capture.capture_window_at(x, y),
                CaptureTarget::Region(rect) => capture.capture_region(rect),
            }?;
            image.into_png()
        })
        .await
        .unwrap_or_else(|e| Err(CaptureError::Platform(format!("capture task failed: {e}"))))
    }
}

async fn report(events: &mpsc::Sender<AgentEvent>, event: LifecycleEvent) {
    if events.send(AgentEvent::Lifecycle(event)).await.is_err() {
        tracing::debug!("dispatcher gone, dropping worker report");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
