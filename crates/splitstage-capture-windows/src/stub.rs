//! Non-Windows stub (CI + cross-compilation). Enumeration yields nothing and
//! sampling reports a capture failure, so the app runs with an empty
//! directory instead of failing to build.

use splitstage_core::{CaptureError, CaptureRect, PixelBuffer};

/// Opaque handle to a live top-level window (token-valued on this target).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandle(isize);

impl WindowHandle {
    pub fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> isize {
        self.0
    }
}

pub fn list_windows() -> Vec<(String, WindowHandle)> {
    tracing::debug!("list_windows stub (non-Windows): no capture targets");
    Vec::new()
}

pub fn is_window_visible(_handle: WindowHandle) -> bool {
    false
}

pub fn window_rect(_handle: WindowHandle) -> Option<CaptureRect> {
    None
}

pub fn capture_region(_rect: CaptureRect) -> Result<PixelBuffer, CaptureError> {
    Err(CaptureError::CaptureFailed {
        reason: "screen sampling is only implemented on Windows".to_owned(),
    })
}
