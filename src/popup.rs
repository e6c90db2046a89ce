use crate::relay::{PopupCommand, PopupRelay};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the popup thread polls the relay for new intents.
pub const POPUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Rendering surface for the result popup.
///
/// Implementations are expected to use borderless, always-on-top windows so
/// the text floats over whatever application has focus. Every method runs on
/// the popup thread only.
pub trait PopupSurface: Send {
    fn show(&mut self, content: &str);
    fn hide(&mut self);
    /// Drive the surface's message loop between polls. Optional.
    fn pump(&mut self) {}
}

/// Headless stand-in for platforms without a native surface.
#[derive(Default)]
pub struct NoopPopupSurface;

impl PopupSurface for NoopPopupSurface {
    fn show(&mut self, content: &str) {
        tracing::info!(chars = content.len(), "popup shown (noop surface)");
    }

    fn hide(&mut self) {
        tracing::info!("popup hidden (noop surface)");
    }
}

pub fn default_surface(opacity: u8) -> Box<dyn PopupSurface> {
    #[cfg(windows)]
    {
        Box::new(GdiPopupSurface::new(opacity))
    }
    #[cfg(not(windows))]
    {
        let _ = opacity;
        Box::new(NoopPopupSurface)
    }
}

/// Spawn the popup-owning thread.
///
/// The thread is the sole owner of the surface: it drains the relay, applies
/// the newest intent, pumps window messages and sleeps. It exits when the
/// shared running flag clears, tearing the surface down on the way out.
pub fn spawn_popup_thread(
    relay: Arc<PopupRelay>,
    running: Arc<AtomicBool>,
    mut surface: Box<dyn PopupSurface>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::debug!("popup thread started");
        while running.load(Ordering::Acquire) {
            for command in relay.drain() {
                match command {
                    PopupCommand::Show(content) => {
                        surface.show(&content);
                        relay.set_visible(true);
                    }
                    PopupCommand::Hide => {
                        surface.hide();
                        relay.set_visible(false);
                    }
                }
            }
            surface.pump();
            thread::sleep(POPUP_POLL_INTERVAL);
        }
        surface.hide();
        relay.set_visible(false);
        tracing::debug!("popup thread exited");
    })
}

#[cfg(windows)]
const LINE_HEIGHT: i32 = 20;
#[cfg(windows)]
const PADDING: i32 = 12;

/// Layered GDI window, rebuilt from scratch on every `show`.
///
/// Destroy-and-recreate keeps the window sized to the current content and
/// sidesteps stale-paint issues; at the poll cadence the flicker is not
/// observable.
#[cfg(windows)]
pub struct GdiPopupSurface {
    hwnd: Option<isize>,
    // Keeps the GWLP_USERDATA pointer alive for the window's lifetime.
    content: Option<Box<String>>,
    class_registered: bool,
    opacity: u8,
}

#[cfg(windows)]
impl GdiPopupSurface {
    pub fn new(opacity: u8) -> Self {
        Self {
            hwnd: None,
            content: None,
            class_registered: false,
            opacity,
        }
    }

    fn destroy(&mut self) {
        if let Some(hwnd) = self.hwnd.take() {
            unsafe {
                let _ = windows::Win32::UI::WindowsAndMessaging::DestroyWindow(
                    windows::Win32::Foundation::HWND(hwnd as *mut _),
                );
            }
        }
        self.content = None;
    }
}

#[cfg(windows)]
impl Drop for GdiPopupSurface {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(windows)]
impl PopupSurface for GdiPopupSurface {
    fn show(&mut self, content: &str) {
        use windows::core::PCWSTR;
        use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
        use windows::Win32::Graphics::Gdi::{
            BeginPaint, CreateSolidBrush, DeleteObject, EndPaint, FillRect, SetBkMode,
            SetTextColor, TextOutW, PAINTSTRUCT, TRANSPARENT,
        };
        use windows::Win32::System::LibraryLoader::GetModuleHandleW;
        use windows::Win32::UI::WindowsAndMessaging::{
            CreateWindowExW, DefWindowProcW, GetSystemMetrics, GetWindowLongPtrW, RegisterClassW,
            SetLayeredWindowAttributes, SetWindowLongPtrW, SetWindowPos, ShowWindow, CS_HREDRAW,
            CS_VREDRAW, GWLP_USERDATA, HMENU, HWND_TOPMOST, LWA_ALPHA, SM_CXSCREEN, SWP_NOACTIVATE,
            SWP_NOMOVE, SWP_NOSIZE, SW_SHOWNOACTIVATE, WM_PAINT, WNDCLASSW, WS_EX_LAYERED,
            WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
        };

        unsafe extern "system" fn wndproc(
            hwnd: HWND,
            msg: u32,
            wparam: WPARAM,
            lparam: LPARAM,
        ) -> LRESULT {
            use windows::Win32::Foundation::COLORREF;
            if msg == WM_PAINT {
                let content_ptr = GetWindowLongPtrW(hwnd, GWLP_USERDATA);
                if content_ptr != 0 {
                    let content = &*(content_ptr as *const String);
                    let mut paint = PAINTSTRUCT::default();
                    let hdc = BeginPaint(hwnd, &mut paint);
                    let brush = CreateSolidBrush(COLORREF(0x00202020));
                    FillRect(hdc, &paint.rcPaint, brush);
                    let _ = DeleteObject(brush);
                    SetBkMode(hdc, TRANSPARENT);
                    SetTextColor(hdc, COLORREF(0x00f0f0f0));
                    for (idx, line) in content.lines().enumerate() {
                        let wide: Vec<u16> = line.encode_utf16().collect();
                        let _ = TextOutW(hdc, PADDING, PADDING + idx as i32 * LINE_HEIGHT, &wide);
                    }
                    let _ = EndPaint(hwnd, &paint);
                    return LRESULT(0);
                }
            }
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }

        // Newest intent replaces the old window wholesale.
        self.destroy();

        let lines: Vec<&str> = content.lines().collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as i32;
        let boxed = Box::new(content.to_string());

        unsafe {
            let class_name = windows::core::w!("QuizLensPopup");
            let hinstance = GetModuleHandleW(None).unwrap_or_default();
            if !self.class_registered {
                let wc = WNDCLASSW {
                    style: CS_HREDRAW | CS_VREDRAW,
                    lpfnWndProc: Some(wndproc),
                    hInstance: hinstance.into(),
                    lpszClassName: class_name,
                    ..Default::default()
                };
                let _ = RegisterClassW(&wc);
                self.class_registered = true;
            }

            let screen_width = GetSystemMetrics(SM_CXSCREEN);
            let width = (longest * 9 + PADDING * 2).clamp(160, screen_width - 40);
            let height = lines.len().max(1) as i32 * LINE_HEIGHT + PADDING * 2;

            let hwnd = CreateWindowExW(
                WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
                class_name,
                PCWSTR::null(),
                WS_POPUP,
                20,
                20,
                width,
                height,
                None,
                HMENU::default(),
                hinstance,
                None,
            )
            .ok();

            let Some(hwnd) = hwnd else {
                tracing::error!("failed to create popup window");
                return;
            };
            if hwnd.0.is_null() {
                tracing::error!("popup window handle is null");
                return;
            }

            SetWindowLongPtrW(hwnd, GWLP_USERDATA, &*boxed as *const String as isize);
            let _ = SetLayeredWindowAttributes(
                hwnd,
                windows::Win32::Foundation::COLORREF(0),
                self.opacity,
                LWA_ALPHA,
            );
            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
            let _ = SetWindowPos(
                hwnd,
                HWND_TOPMOST,
                0,
                0,
                0,
                0,
                SWP_NOACTIVATE | SWP_NOMOVE | SWP_NOSIZE,
            );

            self.hwnd = Some(hwnd.0 as isize);
            self.content = Some(boxed);
        }
        tracing::debug!(lines = lines.len(), "popup window created");
    }

    fn hide(&mut self) {
        if self.hwnd.is_some() {
            tracing::debug!("popup window destroyed");
        }
        self.destroy();
    }

    fn pump(&mut self) {
        use windows::Win32::Foundation::HWND;
        use windows::Win32::UI::WindowsAndMessaging::{
            DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
        };
        if self.hwnd.is_none() {
            return;
        }
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, HWND(std::ptr::null_mut()), 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}
