//! Screen capture implementations.
//!
//! The Windows backend copies pixels out of the screen DC with GDI.  Other
//! platforms get [`UnsupportedCapture`], which fails every request with
//! [`CaptureError::UnsupportedPlatform`] so the lifecycle shows
//! "Capture failed." instead of crashing.

use std::sync::Arc;

use glint_core::SelectionRect;

use crate::application::run_request::{CaptureError, CaptureProvider, CapturedImage};

#[cfg(target_os = "windows")]
pub mod windows;

pub struct UnsupportedCapture;

impl CaptureProvider for UnsupportedCapture {
    fn capture_window_at(&self, _x: i32, _y: i32) -> Result<CapturedImage, CaptureError> {
        Err(CaptureError::UnsupportedPlatform)
    }

    fn capture_region(&self, _rect: SelectionRect) -> Result<CapturedImage, CaptureError> {
        Err(CaptureError::UnsupportedPlatform)
    }
}

/// Returns the screen capture backend for the current OS.
pub fn platform_capture() -> Arc<dyn CaptureProvider> {
    #[cfg(target_os = "windows")]
    {
        Arc::new(windows::GdiCapture::new())
    }
    #[cfg(not(target_os = "windows"))]
    {
        Arc::new(UnsupportedCapture)
    }
}

/// Converts GDI's BGRA pixel order to RGBA in place and forces full alpha
/// (the screen DC leaves the alpha byte undefined).
pub fn bgra_to_rgba(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
        px[3] = 0xFF;
    }
}

/// Validates a capture size, turning a non-positive side into
/// [`CaptureError::EmptyArea`].
pub fn checked_size(width: i32, height: i32) -> Result<(u32, u32), CaptureError> {
    if width <= 0 || height <= 0 {
        return Err(CaptureError::EmptyArea { width, height });
    }
    Ok((width as u32, height as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgra_to_rgba_swaps_channels_and_sets_alpha() {
        // Arrange: one blue pixel, one red pixel, alpha garbage
        let mut pixels = vec![0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x12];

        // Act
        bgra_to_rgba(&mut pixels);

        // Assert
        assert_eq!(pixels, vec![0x00, 0x00, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn test_checked_size_rejects_non_positive_sides() {
        assert!(matches!(
            checked_size(0, 10),
            Err(CaptureError::EmptyArea { width: 0, height: 10 })
        ));
        assert!(checked_size(5, -1).is_err());
        assert_eq!(checked_size(3, 4).unwrap(), (3, 4));
    }

    #[test]
    fn test_unsupported_capture_always_fails() {
        let capture = UnsupportedCapture;
        assert!(matches!(
            capture.capture_window_at(0, 0),
            Err(CaptureError::UnsupportedPlatform)
        ));
    }
}
