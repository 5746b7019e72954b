use thiserror::Error;

/// Failure taxonomy for both capture sessions.
///
/// Everything here is handled at the session boundary: transient variants are
/// logged and skipped, terminal variants end the session and surface as
/// status text. Nothing propagates into the sink.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The captured window closed or became invisible mid-session.
    #[error("Capture target is no longer visible")]
    TargetLost,

    /// One-off screen sampling failure; the next tick retries.
    #[error("Screen capture failed: {reason}")]
    CaptureFailed { reason: String },

    /// Camera enumeration found no devices.
    #[error("No camera device found")]
    NoCameraDevice,

    /// A camera device exists but could not be opened.
    #[error("Camera open failed: {reason}")]
    CameraOpen { reason: String },

    /// One-off camera frame acquisition/decode failure; the frame is dropped.
    #[error("Camera frame failed: {reason}")]
    FrameFailed { reason: String },

    #[error("Configuration invalid: {reason}")]
    ConfigInvalid { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
