pub mod autostart;
pub mod draw;
pub mod launcher;
pub mod logging;
pub mod settings;
#[cfg(target_os = "windows")]
pub mod win_util;
