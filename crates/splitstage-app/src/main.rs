//! SplitStage — side-by-side window + camera compositor.
//!
//! Captures an arbitrary on-screen window at 10 Hz and a local camera on its
//! own device thread, and composites both into one egui surface for
//! streaming/presentation use.
//!
//! # Architecture
//!
//! ```text
//! WindowDirectory (EnumWindows) ──► title → handle map ──► user selection
//!                                                              │
//! tokio task: WindowSession ── 100 ms ticks ── GDI sample ──┐  │
//!                                                           ▼  ▼
//! camera thread: CameraSession ── frame callback ──► mpsc<Frame>
//!                                                           │
//!                                                           ▼
//!                     egui update() ── FrameSink (the only mutator of
//!                                      display state, one texture/source)
//! ```
//!
//! Capture work never runs on the egui thread: window sampling happens under
//! `spawn_blocking` on the runtime built here, camera decoding on the device
//! thread. The sink drains one bounded frame channel per update pass.

mod controller;
mod session;
mod sink;
mod ui;

use splitstage_core::AppConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Window title, also used to exclude this app from its own directory.
const APP_TITLE: &str = "SplitStage";

fn main() -> eframe::Result<()> {
    // ── Logging ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    info!("SplitStage v{}", env!("CARGO_PKG_VERSION"));

    // ── Configuration ─────────────────────────────────────────────────────
    let config = match AppConfig::load("splitstage.json") {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring splitstage.json: {e} — using defaults");
            AppConfig::default()
        }
    };
    info!(
        "Capture: tick={}ms, camera index={}, frame queue={}",
        config.window_tick_ms, config.camera_index, config.frame_queue
    );

    // ── Capture runtime ───────────────────────────────────────────────────
    // Session tasks and blocking GDI sampling run here, never on the egui
    // thread. Kept on the main stack so it outlives the event loop.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");
    let rt_handle = runtime.handle().clone();

    // ── Window options ────────────────────────────────────────────────────
    let window_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([760.0, 480.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        APP_TITLE,
        window_options,
        Box::new(move |_cc| {
            Ok(Box::new(ui::SplitStageApp::new(
                rt_handle,
                config,
                APP_TITLE.to_owned(),
            )))
        }),
    )
}
