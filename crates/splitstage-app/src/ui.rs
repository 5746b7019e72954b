//! egui UI for SplitStage.
//!
//! Layout mirrors the classic streaming split view:
//!
//! ```
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Window [Select a window...▼] [⟳ Refresh]   [Enable Camera]  │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │                              │                               │
//! │      window capture pane     │         camera pane           │
//! │                              │                               │
//! ├──────────────────────────────┴───────────────────────────────┤
//! │ Capturing: Notepad                    Camera active           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `update()` is the sink's execution context: it is the only place frames
//! and status updates are drained and the only place display state mutates.

use std::time::Duration;

use eframe::egui::{self, Color32, RichText};
use splitstage_capture_windows::{WindowDirectory, NO_SELECTION};
use splitstage_core::{AppConfig, Frame, FrameSource};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::controller::CaptureController;
use crate::session::WindowStatus;
use crate::sink::FrameSink;

const TEXT_DIM: Color32 = Color32::from_rgb(140, 145, 155);

// ── SplitStageApp ─────────────────────────────────────────────────────────────

pub struct SplitStageApp {
    own_title: String,

    // ── Directory / selection ──
    directory:      WindowDirectory,
    selected_title: String,

    // ── Capture plumbing ──
    controller: CaptureController,
    sink:       FrameSink,
    frame_rx:         mpsc::Receiver<Frame>,
    window_status_rx: mpsc::Receiver<WindowStatus>,

    // ── Status lines ──
    window_status: String,
    camera_status: String,
    camera_error:  Option<String>,
}

impl SplitStageApp {
    pub fn new(rt_handle: Handle, config: AppConfig, own_title: String) -> Self {
        let (frame_tx, frame_rx) = mpsc::channel::<Frame>(config.frame_queue);
        let (window_status_tx, window_status_rx) = mpsc::channel::<WindowStatus>(16);

        let controller =
            CaptureController::new(rt_handle, config, frame_tx, window_status_tx);

        let mut directory = WindowDirectory::new();
        directory.refresh(&own_title);

        Self {
            own_title,
            directory,
            selected_title: NO_SELECTION.to_owned(),
            controller,
            sink: FrameSink::new(),
            frame_rx,
            window_status_rx,
            window_status: "Select a window from the dropdown".to_owned(),
            camera_status: "Camera disabled".to_owned(),
            camera_error:  None,
        }
    }

    // ── Event handlers ────────────────────────────────────────────────────

    fn refresh_directory(&mut self) {
        self.directory.refresh(&self.own_title);
        // A previously selected window that is gone from the directory is
        // "no target" now
        if self.selected_title != NO_SELECTION
            && self.directory.handle(&self.selected_title).is_none()
        {
            self.apply_selection(NO_SELECTION.to_owned());
        }
    }

    fn apply_selection(&mut self, title: String) {
        self.selected_title = title;
        match self.directory.handle(&self.selected_title) {
            Some(handle) => {
                self.controller.select_window(&self.selected_title, handle);
            }
            None => {
                // Sentinel or unknown title: stop capture, clear the pane
                self.controller.deselect_window();
                self.sink.clear(FrameSource::Window);
                self.window_status = "Select a window from the dropdown".to_owned();
            }
        }
    }

    fn toggle_camera(&mut self) {
        match self.controller.toggle_camera() {
            Ok(true) => {
                self.camera_status = "Initializing camera...".to_owned();
            }
            Ok(false) => {
                self.camera_status = "Camera disabled".to_owned();
                self.sink.clear(FrameSource::Camera);
            }
            Err(e) => {
                // Device-open failure is the one modal error
                self.camera_error = Some(e.to_string());
                self.camera_status = "Camera disabled".to_owned();
            }
        }
    }

    // ── Channel draining (sink thread only) ───────────────────────────────

    fn poll_window_status(&mut self) {
        while let Ok(status) = self.window_status_rx.try_recv() {
            match status {
                WindowStatus::Capturing { title } => {
                    self.window_status = format!("Capturing: {title}");
                }
                WindowStatus::TickFailed { .. } => {
                    self.window_status = "Error capturing window".to_owned();
                }
                WindowStatus::TargetLost { generation, .. } => {
                    if self.controller.on_target_lost(generation) {
                        self.sink.clear(FrameSource::Window);
                        self.window_status = "Window no longer exists".to_owned();
                    }
                }
            }
        }
    }

    fn drain_frames(&mut self, ctx: &egui::Context) {
        while let Ok(frame) = self.frame_rx.try_recv() {
            if !self.controller.accepts(&frame) {
                continue; // queued before its session stopped
            }
            if frame.source == FrameSource::Camera {
                // First arriving frame is the camera's real readiness signal
                self.camera_status = "Camera active".to_owned();
            }
            self.sink.apply(ctx, frame);
        }
    }

    // ── Rendering helpers ─────────────────────────────────────────────────

    fn frame_pane(
        ui: &mut egui::Ui,
        sink: &FrameSink,
        source: FrameSource,
        placeholder: &str,
    ) {
        egui::Frame::none()
            .stroke(egui::Stroke::new(1.0, Color32::from_rgb(60, 63, 75)))
            .inner_margin(egui::Margin::same(4.0))
            .show(ui, |ui| {
                let available = ui.available_size();
                ui.set_min_size(available);
                match sink.texture(source) {
                    Some(texture) => {
                        ui.centered_and_justified(|ui| {
                            ui.add(
                                egui::Image::new(texture)
                                    .max_size(available)
                                    .maintain_aspect_ratio(true),
                            );
                        });
                    }
                    None => {
                        ui.centered_and_justified(|ui| {
                            ui.label(RichText::new(placeholder).color(TEXT_DIM));
                        });
                    }
                }
            });
    }
}

// ── eframe::App implementation ────────────────────────────────────────────────

impl eframe::App for SplitStageApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_window_status();
        self.drain_frames(ctx);
        // Frames arrive from other threads; keep repainting at display rate
        ctx.request_repaint_after(Duration::from_millis(33));

        let modal_open = self.camera_error.is_some();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_enabled_ui(!modal_open, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Window:");

                    let mut clicked_title: Option<String> = None;
                    egui::ComboBox::from_id_salt("window-select")
                        .selected_text(self.selected_title.clone())
                        .width(280.0)
                        .show_ui(ui, |ui| {
                            for title in self.directory.titles() {
                                let selected = *title == self.selected_title;
                                if ui.selectable_label(selected, title.as_str()).clicked()
                                    && !selected
                                {
                                    clicked_title = Some(title.clone());
                                }
                            }
                        });
                    if let Some(title) = clicked_title {
                        self.apply_selection(title);
                    }

                    if ui.button("⟳ Refresh Windows").clicked() {
                        self.refresh_directory();
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let label = if self.controller.camera_enabled() {
                            "Disable Camera"
                        } else {
                            "Enable Camera"
                        };
                        if ui.button(label).clicked() {
                            self.toggle_camera();
                        }
                    });
                });
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.columns(2, |columns| {
                columns[0].horizontal(|ui| {
                    ui.label(RichText::new(&self.window_status).color(TEXT_DIM));
                    let frames = self.sink.frames_applied(FrameSource::Window);
                    if frames > 0 {
                        ui.label(RichText::new(format!("{frames} frames")).weak());
                    }
                });
                columns[1].with_layout(
                    egui::Layout::right_to_left(egui::Align::Center),
                    |ui| {
                        ui.label(RichText::new(&self.camera_status).color(TEXT_DIM));
                        let frames = self.sink.frames_applied(FrameSource::Camera);
                        if frames > 0 {
                            ui.label(RichText::new(format!("{frames} frames")).weak());
                        }
                    },
                );
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let window_placeholder = if self.controller.window_capturing() {
                "Waiting for frames..."
            } else {
                "No window selected"
            };
            ui.columns(2, |columns| {
                Self::frame_pane(
                    &mut columns[0],
                    &self.sink,
                    FrameSource::Window,
                    window_placeholder,
                );
                Self::frame_pane(
                    &mut columns[1],
                    &self.sink,
                    FrameSource::Camera,
                    "Camera off",
                );
            });
        });

        // ── Camera error modal ────────────────────────────────────────────
        if let Some(message) = self.camera_error.clone() {
            egui::Window::new("Camera Error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(&message);
                    ui.add_space(8.0);
                    ui.vertical_centered(|ui| {
                        if ui.button("OK").clicked() {
                            self.camera_error = None;
                        }
                    });
                });
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        // Both sessions must be fully stopped before teardown proceeds
        self.controller.shutdown();
    }
}
