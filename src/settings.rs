use crate::draw::model::{clamp_pen_width, Color, ToolState, DEFAULT_PEN_WIDTH};
use crate::draw::input_hook::DEFAULT_LISTENER_RETRY;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE_NAME: &str = "ink_overlay_settings.json";
pub const DEFAULT_PEN_COLOR: Color = Color::RED;
pub const PRESET_COLORS: [Color; 7] = [
    Color::rgb(0xFF, 0x00, 0x00),
    Color::rgb(0x00, 0xFF, 0x00),
    Color::rgb(0x00, 0x00, 0xFF),
    Color::rgb(0xFF, 0xFF, 0x00),
    Color::rgb(0xFF, 0x00, 0xFF),
    Color::rgb(0x00, 0xFF, 0xFF),
    Color::rgb(0xFF, 0xFF, 0xFF),
];
const MIN_LISTENER_RETRY_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pen color as `#RRGGBB` or `#RRGGBBAA`.
    pub pen_color: String,
    pub pen_width: u32,
    pub launch_at_login: bool,
    /// When enabled the logger runs at debug level and honours `RUST_LOG`.
    pub debug_logging: bool,
    /// Optional log file written in addition to stderr.
    pub log_file: Option<PathBuf>,
    /// Swatches offered by the overlay control panel.
    pub quick_colors: Vec<String>,
    /// Delay before the global listener is restarted after a failure.
    pub listener_retry_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pen_color: DEFAULT_PEN_COLOR.to_hex(),
            pen_width: DEFAULT_PEN_WIDTH,
            launch_at_login: false,
            debug_logging: false,
            log_file: None,
            quick_colors: PRESET_COLORS.iter().map(|c| c.to_hex()).collect(),
            listener_retry_ms: DEFAULT_LISTENER_RETRY.as_millis() as u64,
        }
    }
}

impl Settings {
    /// Loads settings from `path`. A missing or empty file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read settings file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut loaded: Settings = serde_json::from_str(&content)
            .with_context(|| format!("deserialize settings file {}", path.display()))?;
        loaded.sanitize();
        Ok(loaded)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create settings folder {}", parent.display()))?;
        }
        let mut sanitized = self.clone();
        sanitized.sanitize();
        let json = serde_json::to_string_pretty(&sanitized).context("serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("write settings file {}", path.display()))
    }

    pub fn sanitize(&mut self) {
        self.pen_width = clamp_pen_width(self.pen_width);
        self.pen_color = parse_pen_color(&self.pen_color)
            .unwrap_or_else(|| {
                tracing::warn!(color = %self.pen_color, "invalid pen color; using default");
                DEFAULT_PEN_COLOR
            })
            .to_hex();

        let quick: Vec<String> = self
            .quick_colors
            .iter()
            .filter_map(|hex| parse_pen_color(hex))
            .map(Color::to_hex)
            .collect();
        self.quick_colors = if quick.is_empty() {
            PRESET_COLORS.iter().map(|c| c.to_hex()).collect()
        } else {
            quick
        };

        self.listener_retry_ms = self.listener_retry_ms.max(MIN_LISTENER_RETRY_MS);
    }

    pub fn pen_color(&self) -> Color {
        parse_pen_color(&self.pen_color).unwrap_or(DEFAULT_PEN_COLOR)
    }

    pub fn set_pen_color(&mut self, color: Color) {
        if color.is_valid_pen_color() {
            self.pen_color = color.to_hex();
        }
    }

    pub fn tool(&self) -> ToolState {
        ToolState::new(self.pen_color(), self.pen_width)
    }

    pub fn quick_colors(&self) -> Vec<Color> {
        self.quick_colors
            .iter()
            .filter_map(|hex| parse_pen_color(hex))
            .collect()
    }

    pub fn listener_retry(&self) -> Duration {
        Duration::from_millis(self.listener_retry_ms.max(MIN_LISTENER_RETRY_MS))
    }
}

fn parse_pen_color(hex: &str) -> Option<Color> {
    Color::from_hex(hex).filter(|c| c.is_valid_pen_color())
}

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SETTINGS_FILE_NAME))
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}
