//! splitstage-camera — camera device capture on a driver-owned thread.
//!
//! The camera pushes frames asynchronously: the capture thread loops on the
//! device, decodes each frame into an owned RGBA buffer, and hands it to the
//! caller's `on_frame` callback. The callback runs on the capture thread, so
//! callers marshal frames to their own context (SplitStage posts them into
//! the sink's frame channel).
//!
//! ```text
//! CameraSession::start(index, on_frame)
//!   │ enumerate devices (fresh every start; zero devices is an error)
//!   │ spawn "camera-capture" thread ── open device ── confirm ready
//!   ▼
//! loop: camera.frame() → decode RGBA (owned copy) → on_frame(pixels)
//!   ▲
//! CameraSession::stop(): set stop flag, then JOIN the thread; stop never
//! returns before the device loop has confirmed exit and closed the stream.
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use splitstage_core::{CameraDevice, CaptureError, PixelBuffer};

// ── Platform split ─────────────────────────────────────────────────────────────

#[cfg(target_os = "windows")]
mod msmf;
#[cfg(target_os = "windows")]
use msmf as platform;

#[cfg(not(target_os = "windows"))]
mod stub;
#[cfg(not(target_os = "windows"))]
use stub as platform;

/// Consecutive frame errors tolerated before the capture loop gives up.
const MAX_CONSECUTIVE_FRAME_ERRORS: u32 = 30;

/// Delay before retrying after a failed frame, so a wedged device does not
/// spin the thread.
const ERROR_RETRY_DELAY: Duration = Duration::from_millis(100);

// ── CameraSession ─────────────────────────────────────────────────────────────

/// A running camera capture session. Exactly one should be active at a time;
/// the lifecycle controller enforces that.
pub struct CameraSession {
    stop:   Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
    device: CameraDevice,
}

impl CameraSession {
    /// Enumerate devices and start capturing from `preferred_index` (falling
    /// back to the first enumerated device).
    ///
    /// Returns without transitioning to running when no device exists
    /// (`NoCameraDevice`) or the device cannot be opened (`CameraOpen`);
    /// both leave no thread behind. On success the capture thread is live
    /// and the first `on_frame` call signals true readiness.
    pub fn start<F>(preferred_index: u32, on_frame: F) -> Result<Self, CaptureError>
    where
        F: FnMut(PixelBuffer) + Send + 'static,
    {
        let devices = platform::query_devices()?;
        if devices.is_empty() {
            return Err(CaptureError::NoCameraDevice);
        }
        let device = devices
            .iter()
            .find(|d| d.index == preferred_index)
            .unwrap_or(&devices[0])
            .clone();
        tracing::info!("Starting camera {device}");

        let stop = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CaptureError>>();

        let thread = thread::Builder::new()
            .name("camera-capture".to_owned())
            .spawn({
                let stop = Arc::clone(&stop);
                let frames = Arc::clone(&frames);
                let device = device.clone();
                let mut on_frame = on_frame;
                move || {
                    // The device is opened on its own thread; start() blocks
                    // on the ready channel until open succeeds or fails.
                    let mut stream = match platform::open_stream(device.index) {
                        Ok(stream) => {
                            let _ = ready_tx.send(Ok(()));
                            stream
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };

                    let (width, height) = stream.resolution();
                    tracing::info!("Camera stream open: {} ({width}x{height})", device.name);

                    run_frame_loop(
                        &stop,
                        &frames,
                        ERROR_RETRY_DELAY,
                        || stream.next_frame(),
                        |pixels| on_frame(pixels),
                    );

                    stream.close();
                    tracing::info!("Camera stream closed: {}", device.name);
                }
            })
            .map_err(|e| CaptureError::CameraOpen {
                reason: format!("failed to spawn capture thread: {e}"),
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { stop, frames, thread: Some(thread), device }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CaptureError::CameraOpen {
                    reason: "capture thread exited before opening the device".to_owned(),
                })
            }
        }
    }

    /// Signal the capture loop to stop, then block until the thread has
    /// confirmed exit and released the device. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            tracing::debug!("Stopping camera capture thread…");
            let _ = thread.join();
            tracing::debug!("Camera capture thread stopped");
        }
    }

    /// Total frames delivered to `on_frame` so far.
    pub fn frames_delivered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Capture loop ──────────────────────────────────────────────────────────────

/// Pull frames until the stop flag is raised or the device fails
/// [`MAX_CONSECUTIVE_FRAME_ERRORS`] times in a row. A single bad frame is
/// logged and skipped; a good frame resets the error streak.
fn run_frame_loop<N, D>(
    stop: &AtomicBool,
    frames: &AtomicU64,
    retry_delay: Duration,
    mut next_frame: N,
    mut deliver: D,
) where
    N: FnMut() -> Result<PixelBuffer, CaptureError>,
    D: FnMut(PixelBuffer),
{
    let mut consecutive_errors = 0u32;

    while !stop.load(Ordering::SeqCst) {
        match next_frame() {
            Ok(pixels) => {
                consecutive_errors = 0;
                frames.fetch_add(1, Ordering::Relaxed);
                deliver(pixels);
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_FRAME_ERRORS {
                    tracing::error!(
                        "Camera capture failed after {consecutive_errors} consecutive errors: {e}"
                    );
                    break;
                }
                // Log the first error and every 10th after that
                if consecutive_errors == 1 || consecutive_errors % 10 == 0 {
                    tracing::warn!(
                        "Camera frame error ({consecutive_errors}/{MAX_CONSECUTIVE_FRAME_ERRORS}): {e}"
                    );
                }
                thread::sleep(retry_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn pixels() -> PixelBuffer {
        PixelBuffer::new(1, 1, vec![0, 0, 0, 255])
    }

    #[test]
    fn frame_loop_forwards_frames_until_stopped() {
        let stop = Arc::new(AtomicBool::new(false));
        let frames = AtomicU64::new(0);
        let mut delivered = 0u32;

        let stop_flag = Arc::clone(&stop);
        run_frame_loop(
            &stop,
            &frames,
            Duration::ZERO,
            || Ok(pixels()),
            |_| {
                delivered += 1;
                if delivered == 5 {
                    stop_flag.store(true, Ordering::SeqCst);
                }
            },
        );

        assert_eq!(delivered, 5);
        assert_eq!(frames.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn transient_errors_do_not_end_the_loop() {
        let stop = Arc::new(AtomicBool::new(false));
        let frames = AtomicU64::new(0);
        let attempts = AtomicU32::new(0);

        let stop_flag = Arc::clone(&stop);
        run_frame_loop(
            &stop,
            &frames,
            Duration::ZERO,
            || {
                // Two bad frames, then a good one
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CaptureError::FrameFailed { reason: "hiccup".into() })
                } else {
                    Ok(pixels())
                }
            },
            |_| stop_flag.store(true, Ordering::SeqCst),
        );

        assert_eq!(frames.load(Ordering::Relaxed), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn loop_gives_up_at_the_consecutive_error_cap() {
        let stop = AtomicBool::new(false);
        let frames = AtomicU64::new(0);
        let attempts = AtomicU32::new(0);

        run_frame_loop(
            &stop,
            &frames,
            Duration::ZERO,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(CaptureError::FrameFailed { reason: "dead device".into() })
            },
            |_| panic!("no frame should be delivered"),
        );

        assert_eq!(attempts.load(Ordering::SeqCst), MAX_CONSECUTIVE_FRAME_ERRORS);
        assert_eq!(frames.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn no_frames_are_delivered_after_stop_returns() {
        let stop = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));
        let delivered = Arc::new(AtomicU64::new(0));

        let handle = thread::spawn({
            let stop = Arc::clone(&stop);
            let frames = Arc::clone(&frames);
            let delivered = Arc::clone(&delivered);
            move || {
                run_frame_loop(
                    &stop,
                    &frames,
                    Duration::ZERO,
                    || {
                        thread::sleep(Duration::from_millis(1));
                        Ok(pixels())
                    },
                    |_| {
                        delivered.fetch_add(1, Ordering::SeqCst);
                    },
                );
            }
        });

        thread::sleep(Duration::from_millis(10));

        // Same ordering CameraSession::stop uses: flag, then join
        stop.store(true, Ordering::SeqCst);
        handle.join().expect("capture thread must exit cleanly");

        let after_stop = delivered.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(delivered.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn rapid_start_stop_cycles_leave_no_loop_behind() {
        // Ten on/off cycles of the capture loop, stopped the way
        // CameraSession::stop stops it: flag, then join
        for _ in 0..10 {
            let stop = Arc::new(AtomicBool::new(false));
            let frames = Arc::new(AtomicU64::new(0));

            let handle = thread::spawn({
                let stop = Arc::clone(&stop);
                let frames = Arc::clone(&frames);
                move || {
                    run_frame_loop(&stop, &frames, Duration::ZERO, || Ok(pixels()), |_| {});
                }
            });

            stop.store(true, Ordering::SeqCst);
            handle.join().expect("loop thread must exit on stop");
        }
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn start_without_devices_reports_unavailable() {
        let result = CameraSession::start(0, |_| {});
        assert!(matches!(result, Err(CaptureError::NoCameraDevice)));
    }
}
