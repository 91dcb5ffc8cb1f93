//! Windows screen capture via GDI.
//!
//! Both capture modes copy a rectangle of the *screen* DC, so what the
//! model sees is exactly what the user sees (including overlapping
//! windows), and then read it back as a top-down 32-bit DIB.
//!
//! # Safety
//!
//! All `unsafe` blocks are GDI/User32 FFI calls.  Handles are released by
//! the RAII guards below on every exit path.

#![cfg(target_os = "windows")]

use std::ffi::c_void;

use glint_core::SelectionRect;
use windows::Win32::Foundation::{HWND, POINT, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HDC,
    HGDIOBJ, SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetAncestor, GetWindowRect, IsWindowVisible, WindowFromPoint, GA_ROOT,
};

use super::{bgra_to_rgba, checked_size};
use crate::application::run_request::{CaptureError, CaptureProvider, CapturedImage};

#[derive(Default)]
pub struct GdiCapture;

impl GdiCapture {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureProvider for GdiCapture {
    fn capture_window_at(&self, x: i32, y: i32) -> Result<CapturedImage, CaptureError> {
        // SAFETY: plain User32 queries on a window handle we only read.
        let rect = unsafe {
            let hwnd = WindowFromPoint(POINT { x, y });
            if hwnd.is_invalid() {
                return Err(CaptureError::NoWindowAtPoint { x, y });
            }
            let root = GetAncestor(hwnd, GA_ROOT);
            let hwnd = if root.is_invalid() { hwnd } else { root };
            if !IsWindowVisible(hwnd).as_bool() {
                return Err(CaptureError::NoWindowAtPoint { x, y });
            }
            let mut rect = RECT::default();
            GetWindowRect(hwnd, &mut rect)
                .map_err(|e| CaptureError::Platform(format!("GetWindowRect: {e}")))?;
            rect
        };
        tracing::debug!(?rect, "capturing window");
        grab_screen(rect.left, rect.top, rect.right - rect.left, rect.bottom - rect.top)
    }

    fn capture_region(&self, rect: SelectionRect) -> Result<CapturedImage, CaptureError> {
        grab_screen(rect.x, rect.y, rect.width as i32, rect.height as i32)
    }
}

// ── GDI plumbing ──────────────────────────────────────────────────────────────

struct ScreenDc(HDC);

impl Drop for ScreenDc {
    fn drop(&mut self) {
        // SAFETY: obtained from GetDC(None) and released exactly once.
        unsafe {
            ReleaseDC(None, self.0);
        }
    }
}

struct MemoryDc(HDC);

impl Drop for MemoryDc {
    fn drop(&mut self) {
        // SAFETY: created by CreateCompatibleDC and deleted exactly once.
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

struct Bitmap(HBITMAP);

impl Drop for Bitmap {
    fn drop(&mut self) {
        // SAFETY: created by CreateCompatibleBitmap; deselected before drop.
        unsafe {
            let _ = DeleteObject(self.0.into());
        }
    }
}

fn grab_screen(left: i32, top: i32, width: i32, height: i32) -> Result<CapturedImage, CaptureError> {
    let (w, h) = checked_size(width, height)?;

    // SAFETY: every handle is checked before use and owned by a guard; the
    // pixel buffer is sized for `height` rows of `width` 32-bit pixels,
    // matching the BITMAPINFOHEADER passed to GetDIBits.
    unsafe {
        let screen = ScreenDc(GetDC(None::<HWND>));
        if screen.0.is_invalid() {
            return Err(CaptureError::Platform("GetDC failed".to_string()));
        }
        let memory = MemoryDc(CreateCompatibleDC(Some(screen.0)));
        if memory.0.is_invalid() {
            return Err(CaptureError::Platform("CreateCompatibleDC failed".to_string()));
        }
        let bitmap = Bitmap(CreateCompatibleBitmap(screen.0, width, height));
        if bitmap.0.is_invalid() {
            return Err(CaptureError::Platform("CreateCompatibleBitmap failed".to_string()));
        }

        let previous: HGDIOBJ = SelectObject(memory.0, bitmap.0.into());
        let blit = BitBlt(memory.0, 0, 0, width, height, Some(screen.0), left, top, SRCCOPY);
        SelectObject(memory.0, previous);
        blit.map_err(|e| CaptureError::Platform(format!("BitBlt: {e}")))?;

        let mut info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // Negative height asks for a top-down DIB.
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut pixels = vec![0u8; w as usize * h as usize * 4];
        let lines = GetDIBits(
            memory.0,
            bitmap.0,
            0,
            h,
            Some(pixels.as_mut_ptr() as *mut c_void),
            &mut info,
            DIB_RGB_COLORS,
        );
        if lines != height {
            return Err(CaptureError::Platform(format!(
                "GetDIBits copied {lines} of {height} rows"
            )));
        }

        bgra_to_rgba(&mut pixels);
        Ok(CapturedImage::new(w, h, pixels))
    }
}
