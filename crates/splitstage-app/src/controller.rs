//! `CaptureController` — owns the lifecycle of both capture sessions.
//!
//! Exactly one window session and one camera session may be active at a
//! time; starting a new one of the same kind always tears the previous one
//! down first. The controller also owns the per-source generation counters
//! behind the no-delivery-after-stop guarantee: every stop bumps the
//! source's generation, and the sink only applies frames whose generation is
//! still current (see [`accepts`](CaptureController::accepts)).

use std::sync::Arc;

use splitstage_camera::CameraSession;
use splitstage_capture_windows::WindowHandle;
use splitstage_core::{AppConfig, CaptureError, Frame, FrameSource};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::info;

use crate::session::{LiveWindowProbe, SessionConfig, WindowSession, WindowStatus};

pub struct CaptureController {
    rt:     Handle,
    config: AppConfig,
    frame_tx:         mpsc::Sender<Frame>,
    window_status_tx: mpsc::Sender<WindowStatus>,
    window_session: Option<WindowSession>,
    camera_session: Option<CameraSession>,
    window_generation: u64,
    camera_generation: u64,
}

impl CaptureController {
    pub fn new(
        rt: Handle,
        config: AppConfig,
        frame_tx: mpsc::Sender<Frame>,
        window_status_tx: mpsc::Sender<WindowStatus>,
    ) -> Self {
        Self {
            rt,
            config,
            frame_tx,
            window_status_tx,
            window_session: None,
            camera_session: None,
            window_generation: 0,
            camera_generation: 0,
        }
    }

    // ── Window session ────────────────────────────────────────────────────

    /// Start capturing `handle`. A running session is always stopped first,
    /// so at most one periodic trigger exists.
    pub fn select_window(&mut self, title: &str, handle: WindowHandle) {
        self.stop_window_session();

        self.window_generation += 1;
        let session_config = SessionConfig {
            title:         title.to_owned(),
            generation:    self.window_generation,
            tick_interval: self.config.tick_interval(),
            max_consecutive_failures: self.config.max_capture_failures,
        };
        info!("Starting window capture: '{title}'");
        let session = WindowSession::spawn(
            Arc::new(LiveWindowProbe::new(handle)),
            session_config,
            self.frame_tx.clone(),
            self.window_status_tx.clone(),
            &self.rt,
        );
        self.window_session = Some(session);
    }

    /// "No target": stop any running window session.
    pub fn deselect_window(&mut self) {
        self.stop_window_session();
    }

    fn stop_window_session(&mut self) {
        if let Some(session) = self.window_session.take() {
            info!("Stopping window capture: '{}'", session.title());
            session.stop();
            // In-flight frames from the stopped session are now stale
            self.window_generation += 1;
        }
    }

    /// A session reported target-lost and has already ended. Discards the
    /// handle and invalidates in-flight frames, but only if the report is
    /// from the current session; a report from a replaced session is stale.
    /// Returns whether the current session was torn down.
    pub fn on_target_lost(&mut self, generation: u64) -> bool {
        let current = self.window_session.as_ref().map(WindowSession::generation);
        if current != Some(generation) {
            return false;
        }
        self.window_session = None;
        self.window_generation += 1;
        true
    }

    pub fn window_capturing(&self) -> bool {
        self.window_session.is_some()
    }

    // ── Camera session ────────────────────────────────────────────────────

    /// Toggle the camera. Returns the new enabled state; a device failure on
    /// enable leaves the camera stopped and is surfaced to the caller.
    pub fn toggle_camera(&mut self) -> Result<bool, CaptureError> {
        if let Some(mut camera) = self.camera_session.take() {
            info!(
                "Stopping camera: {} after {} frames",
                camera.device(),
                camera.frames_delivered()
            );
            camera.stop(); // blocks until the device confirms full stop
            self.camera_generation += 1;
            return Ok(false);
        }

        self.camera_generation += 1;
        let generation = self.camera_generation;
        let frame_tx = self.frame_tx.clone();
        let camera = CameraSession::start(self.config.camera_index, move |pixels| {
            // Driver-thread context: hand the owned frame off and return.
            // Sink state is never touched from here.
            let _ = frame_tx.try_send(Frame::new(FrameSource::Camera, generation, pixels));
        })?;
        self.camera_session = Some(camera);
        Ok(true)
    }

    pub fn camera_enabled(&self) -> bool {
        self.camera_session.is_some()
    }

    // ── Sink gate ─────────────────────────────────────────────────────────

    /// Whether a frame still belongs to the current generation of its
    /// source. Frames queued before a stop fail this check once the stop has
    /// been processed, so nothing is applied after a stop is acknowledged.
    pub fn accepts(&self, frame: &Frame) -> bool {
        let current = match frame.source {
            FrameSource::Window => self.window_generation,
            FrameSource::Camera => self.camera_generation,
        };
        frame.generation == current
    }

    // ── Teardown ──────────────────────────────────────────────────────────

    /// Stop both sessions before the process tears down: the camera stop
    /// waits for the device thread, the window stop cancels the periodic
    /// task. No capture work survives this call.
    pub fn shutdown(&mut self) {
        if let Some(mut camera) = self.camera_session.take() {
            camera.stop();
        }
        self.stop_window_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitstage_core::PixelBuffer;

    fn controller() -> (CaptureController, mpsc::Receiver<Frame>) {
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let (status_tx, _status_rx) = mpsc::channel(8);
        let controller =
            CaptureController::new(Handle::current(), AppConfig::default(), frame_tx, status_tx);
        (controller, frame_rx)
    }

    fn window_frame(generation: u64) -> Frame {
        Frame::new(FrameSource::Window, generation, PixelBuffer::new(1, 1, vec![0; 4]))
    }

    #[tokio::test]
    async fn frames_from_a_stopped_generation_are_rejected() {
        let (mut controller, _frame_rx) = controller();

        controller.select_window("Notepad", WindowHandle::from_raw(1));
        let live = window_frame(1);
        assert!(controller.accepts(&live));

        controller.deselect_window();
        assert!(!controller.accepts(&live), "queued frames must not apply after stop");
        assert!(!controller.window_capturing());
    }

    #[tokio::test]
    async fn reselecting_replaces_the_session_and_its_generation() {
        let (mut controller, _frame_rx) = controller();

        controller.select_window("Notepad", WindowHandle::from_raw(1));
        let first = window_frame(1);
        assert!(controller.accepts(&first));

        // Restart for a new target: the old session's frames are stale, the
        // new session's frames are current
        controller.select_window("Calculator", WindowHandle::from_raw(2));
        assert!(!controller.accepts(&first));
        assert!(controller.accepts(&window_frame(3)));
        assert!(controller.window_capturing());
    }

    #[tokio::test]
    async fn target_lost_invalidates_in_flight_frames_once() {
        let (mut controller, _frame_rx) = controller();

        controller.select_window("Notepad", WindowHandle::from_raw(1));
        assert!(controller.on_target_lost(1));
        assert!(!controller.window_capturing());
        assert!(!controller.accepts(&window_frame(1)));

        // A repeated loss report (already stopped) must not shift generations
        assert!(!controller.on_target_lost(1));
        assert!(controller.accepts(&window_frame(2)));
    }

    #[tokio::test]
    async fn stale_target_lost_report_cannot_kill_the_successor_session() {
        let (mut controller, _frame_rx) = controller();

        controller.select_window("Notepad", WindowHandle::from_raw(1)); // generation 1
        controller.select_window("Calculator", WindowHandle::from_raw(2)); // generation 3

        // The first session's loss report arrives late
        assert!(!controller.on_target_lost(1));
        assert!(controller.window_capturing(), "the replacement session must survive");
        assert!(controller.accepts(&window_frame(3)));
    }

    #[cfg(not(target_os = "windows"))]
    #[tokio::test]
    async fn camera_toggle_without_devices_reports_and_stays_stopped() {
        let (mut controller, _frame_rx) = controller();

        let result = controller.toggle_camera();
        assert!(matches!(result, Err(CaptureError::NoCameraDevice)));
        assert!(!controller.camera_enabled());

        // Failed enable leaves the toggle consistent: next toggle tries to
        // enable again rather than "disabling" a session that never started
        let result = controller.toggle_camera();
        assert!(matches!(result, Err(CaptureError::NoCameraDevice)));
        assert!(!controller.camera_enabled());
    }

    #[tokio::test]
    async fn shutdown_stops_everything() {
        let (mut controller, _frame_rx) = controller();

        controller.select_window("Notepad", WindowHandle::from_raw(1));
        controller.shutdown();
        assert!(!controller.window_capturing());
        assert!(!controller.camera_enabled());
    }
}
