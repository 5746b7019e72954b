//! Media Foundation backend via nokhwa.

use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use splitstage_core::{CameraDevice, CaptureError, PixelBuffer};

/// Fresh device enumeration. Indices are not stable across runs, so this is
/// called on every camera start.
pub fn query_devices() -> Result<Vec<CameraDevice>, CaptureError> {
    let cameras = nokhwa::query(ApiBackend::Auto).map_err(|e| CaptureError::CameraOpen {
        reason: format!("device enumeration: {e}"),
    })?;

    Ok(cameras
        .iter()
        .enumerate()
        .map(|(position, info)| CameraDevice {
            index: match info.index() {
                CameraIndex::Index(i) => *i,
                CameraIndex::String(_) => position as u32,
            },
            name: info.human_name(),
        })
        .collect())
}

pub struct CameraStream {
    camera: Camera,
}

/// Open the device and start its stream. Any format is accepted; frames are
/// decoded to RGBA on our side.
pub fn open_stream(index: u32) -> Result<CameraStream, CaptureError> {
    let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::None);
    let mut camera = Camera::new(CameraIndex::Index(index), requested)
        .map_err(|e| CaptureError::CameraOpen { reason: e.to_string() })?;
    camera
        .open_stream()
        .map_err(|e| CaptureError::CameraOpen { reason: e.to_string() })?;
    Ok(CameraStream { camera })
}

impl CameraStream {
    pub fn resolution(&self) -> (u32, u32) {
        let res = self.camera.resolution();
        (res.width(), res.height())
    }

    /// Block for the next frame and decode it into an owned RGBA buffer.
    /// The decode allocates, so the returned frame never aliases the
    /// driver's internal buffer.
    pub fn next_frame(&mut self) -> Result<PixelBuffer, CaptureError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::FrameFailed { reason: e.to_string() })?;
        let image = buffer
            .decode_image::<RgbAFormat>()
            .map_err(|e| CaptureError::FrameFailed { reason: e.to_string() })?;
        Ok(PixelBuffer::new(image.width(), image.height(), image.into_raw()))
    }

    pub fn close(mut self) {
        let _ = self.camera.stop_stream();
    }
}
