//! Win32 implementation: `EnumWindows` directory + GDI screen sampling.

use splitstage_core::{CaptureError, CaptureRect, PixelBuffer};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDC, ReleaseDC,
    SelectObject, BITMAPINFO, BITMAPINFOHEADER, DIB_RGB_COLORS, SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowRect, GetWindowTextLengthW, GetWindowTextW, IsWindowVisible,
};

// ── WindowHandle ──────────────────────────────────────────────────────────────

/// Opaque handle to a live top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandle(HWND);

// An HWND is a plain window identifier, not a pointer we dereference; the OS
// revalidates it on every call.
unsafe impl Send for WindowHandle {}
unsafe impl Sync for WindowHandle {}

impl WindowHandle {
    pub fn from_raw(raw: isize) -> Self {
        Self(HWND(raw as *mut core::ffi::c_void))
    }

    pub fn raw(&self) -> isize {
        self.0 .0 as isize
    }
}

// ── Directory enumeration ─────────────────────────────────────────────────────

/// Enumerate all visible, titled top-level windows, in z-order.
pub fn list_windows() -> Vec<(String, WindowHandle)> {
    unsafe extern "system" fn enum_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let list = lparam.0 as *mut Vec<(String, WindowHandle)>;
        if unsafe { IsWindowVisible(hwnd) }.as_bool() {
            let title = window_title(hwnd);
            if !title.is_empty() {
                unsafe { (*list).push((title, WindowHandle(hwnd))) };
            }
        }
        BOOL(1)
    }

    let mut list: Vec<(String, WindowHandle)> = Vec::new();
    unsafe {
        let _ = EnumWindows(Some(enum_proc), LPARAM(&mut list as *mut _ as isize));
    }
    list
}

fn window_title(hwnd: HWND) -> String {
    let len = unsafe { GetWindowTextLengthW(hwnd) };
    if len <= 0 {
        return String::new();
    }
    let mut buf = vec![0u16; len as usize + 1];
    let copied = unsafe { GetWindowTextW(hwnd, &mut buf) };
    if copied <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buf[..copied as usize])
}

// ── Per-tick queries ──────────────────────────────────────────────────────────

/// Whether the window still exists and is visible. Checked before every tick;
/// external processes can close windows at any time.
pub fn is_window_visible(handle: WindowHandle) -> bool {
    unsafe { IsWindowVisible(handle.0) }.as_bool()
}

/// Current screen-space rectangle of the window, or `None` if the query fails
/// (window destroyed between visibility check and rect fetch).
pub fn window_rect(handle: WindowHandle) -> Option<CaptureRect> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(handle.0, &mut rect) }.ok()?;
    Some(CaptureRect::new(rect.left, rect.top, rect.right, rect.bottom))
}

// ── Screen sampling ───────────────────────────────────────────────────────────

/// Sample the pixel contents of `rect` from the screen compositor into an
/// owned buffer. The rect must be non-empty (callers skip empty rects).
pub fn capture_region(rect: CaptureRect) -> Result<PixelBuffer, CaptureError> {
    let width = rect.width();
    let height = rect.height();
    if rect.is_empty() {
        return Err(CaptureError::CaptureFailed { reason: format!("degenerate rect {rect}") });
    }

    unsafe {
        let screen_dc = GetDC(None);
        if screen_dc.is_invalid() {
            return Err(gdi_failed("GetDC"));
        }

        let mem_dc = CreateCompatibleDC(screen_dc);
        if mem_dc.is_invalid() {
            ReleaseDC(None, screen_dc);
            return Err(gdi_failed("CreateCompatibleDC"));
        }

        // 32-bit top-down DIB: rows are tightly packed at width * 4 bytes
        let bitmap_info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: 0,
                ..Default::default()
            },
            bmiColors: [Default::default()],
        };

        let mut bits: *mut std::ffi::c_void = std::ptr::null_mut();
        let dib = match CreateDIBSection(mem_dc, &bitmap_info, DIB_RGB_COLORS, &mut bits, None, 0)
        {
            Ok(dib) => dib,
            Err(e) => {
                let _ = DeleteDC(mem_dc);
                ReleaseDC(None, screen_dc);
                return Err(gdi_failed(&format!("CreateDIBSection: {e}")));
            }
        };

        let old_bitmap = SelectObject(mem_dc, dib);
        let pixels = match BitBlt(
            mem_dc, 0, 0, width, height,
            screen_dc, rect.left, rect.top,
            SRCCOPY,
        ) {
            Ok(()) => {
                let len = width as usize * height as usize * 4;
                let bgra = std::slice::from_raw_parts(bits as *const u8, len);
                Ok(PixelBuffer::from_bgra(width as u32, height as u32, bgra))
            }
            Err(e) => Err(gdi_failed(&format!("BitBlt: {e}"))),
        };

        SelectObject(mem_dc, old_bitmap);
        let _ = DeleteObject(dib);
        let _ = DeleteDC(mem_dc);
        ReleaseDC(None, screen_dc);

        pixels
    }
}

fn gdi_failed(what: &str) -> CaptureError {
    CaptureError::CaptureFailed { reason: what.to_owned() }
}
