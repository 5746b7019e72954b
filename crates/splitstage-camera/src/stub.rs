//! Non-Windows stub (CI + cross-compilation). Enumeration yields no devices,
//! so `CameraSession::start` reports `NoCameraDevice`, the same path a
//! camera-less Windows machine takes.

use splitstage_core::{CameraDevice, CaptureError, PixelBuffer};

pub fn query_devices() -> Result<Vec<CameraDevice>, CaptureError> {
    tracing::debug!("query_devices stub (non-Windows): no camera devices");
    Ok(Vec::new())
}

pub struct CameraStream;

pub fn open_stream(_index: u32) -> Result<CameraStream, CaptureError> {
    Err(CaptureError::CameraOpen {
        reason: "camera capture is only implemented on Windows".to_owned(),
    })
}

impl CameraStream {
    pub fn resolution(&self) -> (u32, u32) {
        (0, 0)
    }

    pub fn next_frame(&mut self) -> Result<PixelBuffer, CaptureError> {
        Err(CaptureError::FrameFailed { reason: "no stream".to_owned() })
    }

    pub fn close(self) {}
}
