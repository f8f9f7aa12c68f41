use crate::draw::messages::OverlayRequest;
use crate::draw::model::{Color, DrawMode, Point, StrokeStore, ToolState};
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayMode {
    #[default]
    Disabled,
    Enabled,
}

impl OverlayMode {
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enabled,
    Disabled,
    Cleared,
    Closing,
    Ignored,
}

/// Window operations the overlay needs from whatever hosts the surface.
pub trait SurfaceHost {
    fn show_surface(&mut self);
    fn hide_surface(&mut self);
    fn set_mouse_passthrough(&mut self, passthrough: bool);
    fn set_crosshair_cursor(&mut self, crosshair: bool);
    /// Raise and focus a freshly shown surface so real input reaches it.
    /// Hosts that do not need this return `Ok(())` without doing anything.
    fn activate_input(&mut self) -> Result<()>;
    fn request_redraw(&mut self);
    fn close(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct OverlayStateMachine {
    mode: OverlayMode,
    store: StrokeStore,
    tool: ToolState,
    capturing: bool,
    cursor_overridden: bool,
    closing: bool,
}

impl OverlayStateMachine {
    pub fn new(tool: ToolState) -> Self {
        Self {
            tool,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn store(&self) -> &StrokeStore {
        &self.store
    }

    pub fn tool(&self) -> &ToolState {
        &self.tool
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn apply(&mut self, request: OverlayRequest, host: &mut dyn SurfaceHost) -> Transition {
        if self.closing {
            return Transition::Ignored;
        }

        let transition = match (self.mode, request) {
            (_, OverlayRequest::Close) => {
                self.close(host);
                Transition::Closing
            }
            (OverlayMode::Disabled, OverlayRequest::Toggle) => {
                self.enable(host);
                Transition::Enabled
            }
            (OverlayMode::Enabled, OverlayRequest::Toggle) => {
                self.disable(host);
                Transition::Disabled
            }
            (OverlayMode::Enabled, OverlayRequest::Clear) => {
                self.store.clear();
                host.request_redraw();
                Transition::Cleared
            }
            (OverlayMode::Disabled, OverlayRequest::Clear) => Transition::Ignored,
        };

        tracing::debug!(
            ?request,
            ?transition,
            mode = ?self.mode,
            strokes = self.store.len(),
            "overlay request applied"
        );
        transition
    }

    fn enable(&mut self, host: &mut dyn SurfaceHost) {
        self.mode = OverlayMode::Enabled;
        host.show_surface();
        host.set_mouse_passthrough(false);
        host.set_crosshair_cursor(true);
        self.cursor_overridden = true;
        activate_with_retry(host);
        host.request_redraw();
        tracing::info!("drawing mode enabled");
    }

    fn disable(&mut self, host: &mut dyn SurfaceHost) {
        self.mode = OverlayMode::Disabled;
        self.restore_cursor(host);
        host.set_mouse_passthrough(true);
        host.hide_surface();
        self.capturing = false;
        self.store.clear();
        host.request_redraw();
        tracing::info!("drawing mode disabled");
    }

    fn close(&mut self, host: &mut dyn SurfaceHost) {
        self.closing = true;
        self.capturing = false;
        self.restore_cursor(host);
        tracing::info!("overlay closing");
        host.close();
    }

    fn restore_cursor(&mut self, host: &mut dyn SurfaceHost) {
        if self.cursor_overridden {
            host.set_crosshair_cursor(false);
            self.cursor_overridden = false;
        }
    }

    pub fn pointer_press(&mut self, point: Point) -> bool {
        if !self.mode.is_enabled() || self.closing {
            return false;
        }
        self.store.begin(&self.tool, point);
        self.capturing = true;
        true
    }

    pub fn pointer_move(&mut self, point: Point) -> bool {
        if !self.capturing || !self.mode.is_enabled() {
            return false;
        }
        self.store.extend_last(point)
    }

    pub fn pointer_release(&mut self) -> bool {
        std::mem::replace(&mut self.capturing, false)
    }

    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        self.tool.set_mode(mode);
    }

    pub fn set_color(&mut self, color: Color) -> bool {
        self.tool.set_color(color)
    }

    pub fn set_width(&mut self, width: u32) -> u32 {
        self.tool.set_width(width)
    }
}

fn activate_with_retry(host: &mut dyn SurfaceHost) {
    if let Err(err) = host.activate_input() {
        tracing::warn!(?err, "surface activation failed; retrying once");
        if let Err(err) = host.activate_input() {
            tracing::warn!(?err, "surface activation failed again; continuing");
        }
    }
}
