use anyhow::{anyhow, Result};
use std::path::Path;

pub const AUTOSTART_VALUE_NAME: &str = "InkOverlay";

/// Registers or removes the application from the per-user login items.
pub trait LaunchAtLogin {
    fn set_enabled(&mut self, enabled: bool) -> Result<()>;
    fn is_enabled(&self) -> Result<bool>;
}

/// Command line stored for the login entry. Quoted so paths with spaces work.
pub fn launch_command(exe_path: &Path) -> String {
    format!("\"{}\"", exe_path.display())
}

/// Applies the wanted state, skipping the write when it already matches.
pub fn apply(autostart: &mut dyn LaunchAtLogin, wanted: bool) -> Result<()> {
    match autostart.is_enabled() {
        Ok(current) if current == wanted => return Ok(()),
        Ok(_) => {}
        Err(err) => tracing::debug!(?err, "could not read launch-at-login state"),
    }
    autostart.set_enabled(wanted)?;
    tracing::info!(enabled = wanted, "launch at login updated");
    Ok(())
}

/// Fallback for platforms without a login-item implementation.
#[derive(Debug, Default)]
pub struct Unsupported;

impl LaunchAtLogin for Unsupported {
    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            return Err(anyhow!("launch at login is not supported on this platform"));
        }
        tracing::debug!("launch at login unsupported; nothing to remove");
        Ok(())
    }

    fn is_enabled(&self) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(target_os = "windows")]
pub use registry::RunKeyAutostart;

#[cfg(target_os = "windows")]
mod registry {
    use super::{launch_command, LaunchAtLogin, AUTOSTART_VALUE_NAME};
    use anyhow::{Context, Result};
    use windows::core::{w, HSTRING, PCWSTR};
    use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_SUCCESS};
    use windows::Win32::System::Registry::{
        RegCloseKey, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY,
        HKEY_CURRENT_USER, KEY_QUERY_VALUE, KEY_SET_VALUE, REG_SAM_FLAGS, REG_SZ,
    };

    const RUN_KEY: PCWSTR = w!("Software\\Microsoft\\Windows\\CurrentVersion\\Run");

    /// `HKCU\...\Run` entry pointing at the current executable.
    #[derive(Debug, Default)]
    pub struct RunKeyAutostart;

    struct OpenKey(HKEY);

    impl OpenKey {
        fn open(access: REG_SAM_FLAGS) -> Result<Self> {
            let mut key = HKEY::default();
            unsafe { RegOpenKeyExW(HKEY_CURRENT_USER, RUN_KEY, 0, access, &mut key) }
                .ok()
                .context("open HKCU Run key")?;
            Ok(Self(key))
        }
    }

    impl Drop for OpenKey {
        fn drop(&mut self) {
            let _ = unsafe { RegCloseKey(self.0) };
        }
    }

    impl LaunchAtLogin for RunKeyAutostart {
        fn set_enabled(&mut self, enabled: bool) -> Result<()> {
            let key = OpenKey::open(KEY_SET_VALUE)?;
            let name = HSTRING::from(AUTOSTART_VALUE_NAME);
            if !enabled {
                let status = unsafe { RegDeleteValueW(key.0, &name) };
                if status == ERROR_FILE_NOT_FOUND {
                    return Ok(());
                }
                return status.ok().context("remove Run key value");
            }

            let exe = std::env::current_exe().context("resolve current executable")?;
            let command: Vec<u8> = launch_command(&exe)
                .encode_utf16()
                .chain(std::iter::once(0))
                .flat_map(u16::to_le_bytes)
                .collect();
            unsafe { RegSetValueExW(key.0, &name, 0, REG_SZ, Some(&command)) }
                .ok()
                .context("write Run key value")
        }

        fn is_enabled(&self) -> Result<bool> {
            let key = OpenKey::open(KEY_QUERY_VALUE)?;
            let name = HSTRING::from(AUTOSTART_VALUE_NAME);
            let status = unsafe { RegQueryValueExW(key.0, &name, None, None, None, None) };
            if status == ERROR_SUCCESS {
                Ok(true)
            } else if status == ERROR_FILE_NOT_FOUND {
                Ok(false)
            } else {
                status.ok().context("query Run key value")?;
                Ok(false)
            }
        }
    }
}

pub fn platform_autostart() -> Box<dyn LaunchAtLogin> {
    #[cfg(target_os = "windows")]
    {
        Box::new(RunKeyAutostart)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Box::new(Unsupported)
    }
}
