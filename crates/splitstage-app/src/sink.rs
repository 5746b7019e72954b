//! `FrameSink` — the single-threaded home of display-visible frame state.
//!
//! Both capture sessions post owned [`Frame`]s into one bounded channel; the
//! egui update pass drains it and calls [`FrameSink::apply`] here. Nothing
//! else mutates the textures, so all display state changes happen on the
//! egui thread. Each source owns its own texture; window and camera frames
//! composite independently.

use egui::{ColorImage, TextureHandle, TextureOptions};
use splitstage_core::{Frame, FrameSource};
use tracing::warn;

#[derive(Default)]
pub struct FrameSink {
    window_texture: Option<TextureHandle>,
    camera_texture: Option<TextureHandle>,
    window_frames:  u64,
    camera_frames:  u64,
}

impl FrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the displayed image for the frame's source. Only called from
    /// the egui update pass.
    pub fn apply(&mut self, ctx: &egui::Context, frame: Frame) {
        let width = frame.pixels.width as usize;
        let height = frame.pixels.height as usize;
        if frame.pixels.byte_len() != width * height * 4 {
            // A malformed frame must not take the sink down
            warn!(
                "Dropping malformed {} frame: {}x{} with {} bytes",
                frame.source, width, height, frame.pixels.byte_len()
            );
            return;
        }

        let image = ColorImage::from_rgba_unmultiplied([width, height], &frame.pixels.data);
        let (texture, frames, name) = match frame.source {
            FrameSource::Window => {
                (&mut self.window_texture, &mut self.window_frames, "window-frame")
            }
            FrameSource::Camera => {
                (&mut self.camera_texture, &mut self.camera_frames, "camera-frame")
            }
        };

        *frames += 1;
        match texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => *texture = Some(ctx.load_texture(name, image, TextureOptions::LINEAR)),
        }
    }

    /// Drop the displayed image for a source (session stopped or target
    /// lost); the pane falls back to its placeholder and the frame counter
    /// restarts with the next session.
    pub fn clear(&mut self, source: FrameSource) {
        match source {
            FrameSource::Window => {
                self.window_texture = None;
                self.window_frames = 0;
            }
            FrameSource::Camera => {
                self.camera_texture = None;
                self.camera_frames = 0;
            }
        }
    }

    pub fn texture(&self, source: FrameSource) -> Option<&TextureHandle> {
        match source {
            FrameSource::Window => self.window_texture.as_ref(),
            FrameSource::Camera => self.camera_texture.as_ref(),
        }
    }

    pub fn frames_applied(&self, source: FrameSource) -> u64 {
        match source {
            FrameSource::Window => self.window_frames,
            FrameSource::Camera => self.camera_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitstage_core::PixelBuffer;

    fn frame(source: FrameSource, width: u32, height: u32) -> Frame {
        let len = width as usize * height as usize * 4;
        Frame::new(source, 1, PixelBuffer::new(width, height, vec![128; len]))
    }

    #[test]
    fn sources_composite_independently() {
        let ctx = egui::Context::default();
        let mut sink = FrameSink::new();

        sink.apply(&ctx, frame(FrameSource::Window, 8, 6));
        assert!(sink.texture(FrameSource::Window).is_some());
        assert!(sink.texture(FrameSource::Camera).is_none());

        sink.apply(&ctx, frame(FrameSource::Camera, 4, 4));
        let window = sink.texture(FrameSource::Window).expect("window texture");
        assert_eq!(window.size(), [8, 6]);
        let camera = sink.texture(FrameSource::Camera).expect("camera texture");
        assert_eq!(camera.size(), [4, 4]);
    }

    #[test]
    fn clear_only_drops_the_given_source() {
        let ctx = egui::Context::default();
        let mut sink = FrameSink::new();
        sink.apply(&ctx, frame(FrameSource::Window, 2, 2));
        sink.apply(&ctx, frame(FrameSource::Camera, 2, 2));

        sink.clear(FrameSource::Window);
        assert!(sink.texture(FrameSource::Window).is_none());
        assert!(sink.texture(FrameSource::Camera).is_some());
    }

    #[test]
    fn malformed_frame_is_dropped_not_applied() {
        let ctx = egui::Context::default();
        let mut sink = FrameSink::new();

        let bad = Frame::new(FrameSource::Window, 1, PixelBuffer {
            width:  16,
            height: 16,
            data:   vec![0; 8], // wrong length
        });
        sink.apply(&ctx, bad);

        assert!(sink.texture(FrameSource::Window).is_none());
        assert_eq!(sink.frames_applied(FrameSource::Window), 0);
    }
}
