#[cfg(target_os = "windows")]
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
#[cfg(target_os = "windows")]
use windows::Win32::Foundation::HWND;

/// Raises the window and asks for foreground focus. Returns false when
/// Windows refused the foreground switch.
#[cfg(target_os = "windows")]
pub fn bring_to_foreground(hwnd: HWND) -> bool {
    use windows::Win32::UI::WindowsAndMessaging::{BringWindowToTop, SetForegroundWindow};
    unsafe {
        let _ = BringWindowToTop(hwnd);
        SetForegroundWindow(hwnd).as_bool()
    }
}

#[cfg(target_os = "windows")]
pub fn get_hwnd(frame: &eframe::Frame) -> Option<HWND> {
    frame
        .window_handle()
        .ok()
        .and_then(|wh| match wh.as_raw() {
            RawWindowHandle::Win32(handle) => {
                Some(HWND(handle.hwnd.get() as *mut core::ffi::c_void))
            }
            _ => None,
        })
}
