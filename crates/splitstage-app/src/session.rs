//! `WindowSession` — one selected window's periodic capture loop.
//!
//! ```text
//! tokio interval (100 ms, skip missed)
//!   │ every tick
//!   ▼
//! probe.is_visible()? ── no ──► TargetLost status, task ends
//!   │ yes
//! probe.rect() ── empty ──► skip tick (minimised / mid-animation)
//!   │ non-empty
//!   ▼
//! spawn_blocking(probe.sample(rect))      ← sampling never runs on the
//!   │                                       sink thread
//!   ▼
//! frame_tx.try_send(Frame)                ← dropped if the sink is behind;
//!                                           only the latest frame matters
//! ```
//!
//! # Status channel
//!
//! [`WindowSession::spawn`] takes a [`WindowStatus`] sender that the egui UI
//! polls with `try_recv` for the window-status line. Transient tick failures
//! keep the session alive; only a lost target (or a run of
//! `max_consecutive_failures` failed ticks) ends it.

use std::sync::Arc;
use std::time::Duration;

use splitstage_core::{CaptureError, CaptureRect, Frame, FrameSource, PixelBuffer};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

// ── WindowProbe ───────────────────────────────────────────────────────────────

/// OS boundary for one capture target: visibility, geometry, and pixel
/// sampling by opaque handle. A window can close between any two calls, so
/// every tick revalidates from scratch.
pub trait WindowProbe: Send + Sync + 'static {
    fn is_visible(&self) -> bool;
    fn rect(&self) -> Option<CaptureRect>;
    fn sample(&self, rect: CaptureRect) -> Result<PixelBuffer, CaptureError>;
}

/// Probe over a live window handle.
pub struct LiveWindowProbe {
    handle: splitstage_capture_windows::WindowHandle,
}

impl LiveWindowProbe {
    pub fn new(handle: splitstage_capture_windows::WindowHandle) -> Self {
        Self { handle }
    }
}

impl WindowProbe for LiveWindowProbe {
    fn is_visible(&self) -> bool {
        splitstage_capture_windows::is_window_visible(self.handle)
    }

    fn rect(&self) -> Option<CaptureRect> {
        splitstage_capture_windows::window_rect(self.handle)
    }

    fn sample(&self, rect: CaptureRect) -> Result<PixelBuffer, CaptureError> {
        splitstage_capture_windows::capture_region(rect)
    }
}

// ── Status ────────────────────────────────────────────────────────────────────

/// Live status update sent by the session task to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowStatus {
    /// Ticking normally (also sent after recovering from a failed tick).
    Capturing { title: String },
    /// One tick failed; the session keeps retrying.
    TickFailed { title: String },
    /// The window closed or hid mid-session; the session has ended. Carries
    /// the session generation so a report from an already-replaced session
    /// cannot tear down its successor.
    TargetLost { title: String, generation: u64 },
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub title:         String,
    /// Generation stamp for every frame this session produces; the sink
    /// rejects frames whose generation is no longer current.
    pub generation:    u64,
    pub tick_interval: Duration,
    /// Consecutive failed ticks tolerated before escalating to target-lost.
    pub max_consecutive_failures: u32,
}

// ── WindowSession ─────────────────────────────────────────────────────────────

/// Handle to a running window-capture task. At most one exists at a time;
/// the lifecycle controller stops the previous session before spawning.
pub struct WindowSession {
    stop_tx:    mpsc::Sender<()>,
    title:      String,
    generation: u64,
}

impl WindowSession {
    /// Spawn the capture task onto the runtime and return a handle to it.
    pub fn spawn(
        probe: Arc<dyn WindowProbe>,
        config: SessionConfig,
        frame_tx: mpsc::Sender<Frame>,
        status_tx: mpsc::Sender<WindowStatus>,
        rt: &Handle,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let title = config.title.clone();
        let generation = config.generation;

        rt.spawn(run_session(probe, config, frame_tx, status_tx, stop_rx));

        Self { stop_tx, title, generation }
    }

    /// Request graceful stop (non-blocking, idempotent).
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ── Session task ──────────────────────────────────────────────────────────────

enum TickOutcome {
    Frame(PixelBuffer),
    Skip,
    Failed(CaptureError),
    Lost,
}

async fn run_session(
    probe: Arc<dyn WindowProbe>,
    config: SessionConfig,
    frame_tx: mpsc::Sender<Frame>,
    status_tx: mpsc::Sender<WindowStatus>,
    mut stop_rx: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut consecutive_failures = 0u32;

    debug!("Window session started: '{}' (generation {})", config.title, config.generation);
    let _ = status_tx.try_send(WindowStatus::Capturing { title: config.title.clone() });

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                debug!("Window session stop requested: '{}'", config.title);
                break;
            }

            _ = ticker.tick() => match tick(&probe).await {
                TickOutcome::Lost => {
                    debug!("Window session target lost: '{}'", config.title);
                    let _ = status_tx.try_send(WindowStatus::TargetLost {
                        title:      config.title.clone(),
                        generation: config.generation,
                    });
                    break;
                }
                TickOutcome::Skip => {}
                TickOutcome::Frame(pixels) => {
                    if consecutive_failures > 0 {
                        consecutive_failures = 0;
                        let _ = status_tx.try_send(WindowStatus::Capturing {
                            title: config.title.clone(),
                        });
                    }
                    let frame = Frame::new(FrameSource::Window, config.generation, pixels);
                    let _ = frame_tx.try_send(frame);
                }
                TickOutcome::Failed(e) => {
                    consecutive_failures += 1;
                    warn!(
                        "Window capture tick failed ({}/{}): {e}",
                        consecutive_failures, config.max_consecutive_failures
                    );
                    if consecutive_failures >= config.max_consecutive_failures {
                        warn!(
                            "Giving up on '{}' after {consecutive_failures} consecutive failures",
                            config.title
                        );
                        let _ = status_tx.try_send(WindowStatus::TargetLost {
                            title:      config.title.clone(),
                            generation: config.generation,
                        });
                        break;
                    }
                    let _ = status_tx.try_send(WindowStatus::TickFailed {
                        title: config.title.clone(),
                    });
                }
            }
        }
    }

    debug!("Window session ended: '{}'", config.title);
}

async fn tick(probe: &Arc<dyn WindowProbe>) -> TickOutcome {
    if !probe.is_visible() {
        return TickOutcome::Lost;
    }

    let Some(rect) = probe.rect() else {
        // Window destroyed between the visibility check and the rect fetch
        return TickOutcome::Failed(CaptureError::CaptureFailed {
            reason: "window rect query failed".to_owned(),
        });
    };
    if rect.is_empty() {
        return TickOutcome::Skip;
    }

    let worker = Arc::clone(probe);
    match tokio::task::spawn_blocking(move || worker.sample(rect)).await {
        Ok(Ok(pixels)) => TickOutcome::Frame(pixels),
        Ok(Err(e)) => TickOutcome::Failed(e),
        Err(e) => TickOutcome::Failed(CaptureError::CaptureFailed {
            reason: format!("sampling task: {e}"),
        }),
    }
}
