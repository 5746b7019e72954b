//! splitstage-capture-windows — window discovery + screen-region sampling.
//!
//! Captures the on-screen pixels of an arbitrary top-level window by sampling
//! its current screen rectangle from the GDI screen DC. On non-Windows
//! targets a stub is compiled for CI compatibility.
//!
//! # Windows pipeline
//!
//! ```text
//! EnumWindows ──► visible, titled HWNDs ──► WindowDirectory (title → handle)
//!                                               │ user selects a title
//!                                               ▼
//! GetWindowRect(hwnd) ──► CaptureRect (virtual-screen coords)
//!                                               │ every tick
//!                                               ▼
//! GetDC(screen) → CreateDIBSection → BitBlt → BGRA bits → PixelBuffer (RGBA)
//! ```
//!
//! Window handles are not owned by this crate: a window can close at any
//! moment, so callers revalidate with [`is_window_visible`] before every use.

use std::collections::HashMap;

// ── Platform split ─────────────────────────────────────────────────────────────

#[cfg(target_os = "windows")]
mod win;
#[cfg(target_os = "windows")]
pub use win::{capture_region, is_window_visible, list_windows, window_rect, WindowHandle};

#[cfg(not(target_os = "windows"))]
mod stub;
#[cfg(not(target_os = "windows"))]
pub use stub::{capture_region, is_window_visible, list_windows, window_rect, WindowHandle};

// ── WindowDirectory ───────────────────────────────────────────────────────────

/// Combo-box entry meaning "no target selected". Always first in
/// [`WindowDirectory::titles`]; selecting it stops window capture.
pub const NO_SELECTION: &str = "Select a window...";

/// Title → handle mapping over the currently enumerable top-level windows.
///
/// Rebuilt wholesale on every [`refresh`](Self::refresh); stale entries are
/// discarded, never patched. Titles are display strings, not identifiers:
/// when two windows share a title the last-enumerated handle wins.
#[derive(Debug, Default)]
pub struct WindowDirectory {
    titles:  Vec<String>,
    handles: HashMap<String, WindowHandle>,
}

impl WindowDirectory {
    pub fn new() -> Self {
        let mut dir = Self::default();
        dir.rebuild(Vec::new(), "");
        dir
    }

    /// Re-enumerate top-level windows, keeping only visible, titled ones and
    /// excluding this application's own window.
    pub fn refresh(&mut self, own_title: &str) {
        self.rebuild(list_windows(), own_title);
        tracing::debug!("Window directory refreshed: {} capture targets", self.handles.len());
    }

    fn rebuild(&mut self, windows: Vec<(String, WindowHandle)>, own_title: &str) {
        self.titles.clear();
        self.handles.clear();
        self.titles.push(NO_SELECTION.to_owned());

        for (title, handle) in windows {
            if title.is_empty() || title == own_title || title == NO_SELECTION {
                continue;
            }
            if self.handles.insert(title.clone(), handle).is_none() {
                self.titles.push(title);
            }
        }
    }

    /// Titles in enumeration order, sentinel first.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Handle for a title; `None` for the sentinel or any unknown title,
    /// both of which mean "no target".
    pub fn handle(&self, title: &str) -> Option<WindowHandle> {
        self.handles.get(title).copied()
    }

    /// Number of selectable capture targets (sentinel excluded).
    pub fn target_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{WindowDirectory, WindowHandle, NO_SELECTION};

    fn entry(title: &str, raw: isize) -> (String, WindowHandle) {
        (title.to_owned(), WindowHandle::from_raw(raw))
    }

    #[test]
    fn refresh_excludes_own_window_and_empty_titles() {
        let mut dir = WindowDirectory::new();
        dir.rebuild(
            vec![
                entry("Notepad", 1),
                entry("", 2),
                entry("App", 3),
                entry("Calculator", 4),
            ],
            "App",
        );

        assert_eq!(dir.titles(), &[NO_SELECTION, "Notepad", "Calculator"]);
        assert!(dir.handle("App").is_none());
        assert!(dir.handle("").is_none());
        assert_eq!(dir.handle("Notepad"), Some(WindowHandle::from_raw(1)));
    }

    #[test]
    fn duplicate_titles_keep_the_last_handle() {
        let mut dir = WindowDirectory::new();
        dir.rebuild(vec![entry("Terminal", 10), entry("Terminal", 20)], "App");

        // One combo entry, most recently enumerated handle
        assert_eq!(dir.titles(), &[NO_SELECTION, "Terminal"]);
        assert_eq!(dir.handle("Terminal"), Some(WindowHandle::from_raw(20)));
    }

    #[test]
    fn empty_enumeration_leaves_only_the_sentinel() {
        let mut dir = WindowDirectory::new();
        dir.rebuild(vec![entry("Notepad", 1)], "App");
        dir.rebuild(Vec::new(), "App");

        assert_eq!(dir.titles(), &[NO_SELECTION]);
        assert_eq!(dir.target_count(), 0);
        assert!(dir.handle("Notepad").is_none(), "stale entries must not survive a rebuild");
    }

    #[test]
    fn sentinel_maps_to_no_target() {
        let dir = WindowDirectory::new();
        assert!(dir.handle(NO_SELECTION).is_none());
    }
}
