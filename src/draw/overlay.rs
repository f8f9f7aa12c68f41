use crate::draw::composite::{Compositor, RenderUpdate};
use crate::draw::controller::{ListenerStatus, OverlayController};
use crate::draw::input::{FocusedInput, PointerButton, SurfaceEvent, SurfaceKey};
use crate::draw::input_hook::{spawn_global_listener, WakeFn};
use crate::draw::messages::{HookSignal, OverlayRequest};
use crate::draw::model::{Color, DrawMode, Point, ToolState, MAX_PEN_WIDTH, MIN_PEN_WIDTH};
use crate::draw::modifiers::{ModifierPoller, ModifierState};
use crate::draw::state::{OverlayStateMachine, SurfaceHost};
use anyhow::{anyhow, Result};
use eframe::egui;
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SHORTCUT_HINT: &str =
    "Ctrl+Shift+Z or Ctrl+middle click starts drawing. Ctrl+middle click clears, Ctrl+left click or Ctrl+Shift+Z stops.";

#[derive(Debug, Clone)]
pub struct OverlayOptions {
    pub tool: ToolState,
    pub quick_colors: Vec<Color>,
    pub listener_retry: Duration,
}

/// Opens the full-screen transparent surface and blocks until it is closed.
pub fn run(options: OverlayOptions) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Ink overlay")
            .with_transparent(true)
            .with_decorations(false)
            .with_always_on_top()
            .with_fullscreen(true)
            .with_mouse_passthrough(true),
        ..Default::default()
    };

    eframe::run_native(
        "ink_overlay",
        native_options,
        Box::new(move |cc| Box::new(OverlayApp::new(cc, options))),
    )
    .map_err(|err| anyhow!("failed to create drawing surface: {err}"))
}

#[derive(Debug, Clone, Copy)]
enum PanelAction {
    Mode(DrawMode),
    Color(Color),
    Width(u32),
    Clear,
    Exit,
}

struct ViewportHost {
    ctx: egui::Context,
    surface_visible: bool,
    crosshair: bool,
    #[cfg(target_os = "windows")]
    hwnd: Option<windows::Win32::Foundation::HWND>,
}

impl ViewportHost {
    fn new(ctx: egui::Context) -> Self {
        Self {
            ctx,
            surface_visible: false,
            crosshair: false,
            #[cfg(target_os = "windows")]
            hwnd: None,
        }
    }

    fn attach(&mut self, frame: &eframe::Frame) {
        #[cfg(target_os = "windows")]
        {
            self.hwnd = crate::win_util::get_hwnd(frame);
        }
        #[cfg(not(target_os = "windows"))]
        let _ = frame;
    }
}

impl SurfaceHost for ViewportHost {
    fn show_surface(&mut self) {
        self.surface_visible = true;
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::Visible(true));
        self.ctx.send_viewport_cmd(egui::ViewportCommand::WindowLevel(
            egui::WindowLevel::AlwaysOnTop,
        ));
    }

    fn hide_surface(&mut self) {
        self.surface_visible = false;
    }

    fn set_mouse_passthrough(&mut self, passthrough: bool) {
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::MousePassthrough(passthrough));
    }

    fn set_crosshair_cursor(&mut self, crosshair: bool) {
        self.crosshair = crosshair;
    }

    // No synthetic press/release here: the focused surface would record it
    // as a one-point stroke. Focus and foreground activation are enough for
    // real input to arrive.
    fn activate_input(&mut self) -> Result<()> {
        self.ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
        #[cfg(target_os = "windows")]
        if let Some(hwnd) = self.hwnd {
            if !crate::win_util::bring_to_foreground(hwnd) {
                return Err(anyhow!("overlay window refused foreground activation"));
            }
        }
        Ok(())
    }

    fn request_redraw(&mut self) {
        self.ctx.request_repaint();
    }

    fn close(&mut self) {
        self.ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

pub struct OverlayApp {
    machine: OverlayStateMachine,
    controller: OverlayController,
    focused: FocusedInput,
    host: ViewportHost,
    compositor: Option<Compositor>,
    texture: Option<egui::TextureHandle>,
    quick_colors: Vec<Color>,
}

impl OverlayApp {
    pub fn new(cc: &eframe::CreationContext<'_>, options: OverlayOptions) -> Self {
        let (hook_tx, hook_rx) = channel::<HookSignal>();
        let wake_ctx = cc.egui_ctx.clone();
        let wake: WakeFn = Arc::new(move || wake_ctx.request_repaint());
        if let Err(err) = spawn_global_listener(hook_tx, wake, options.listener_retry) {
            tracing::warn!(?err, "global listener not started; only focused shortcuts will work");
        }

        tracing::info!(
            color = %options.tool.color().to_hex(),
            width = options.tool.width(),
            "overlay ready"
        );

        Self {
            machine: OverlayStateMachine::new(options.tool),
            controller: OverlayController::new(hook_rx),
            focused: FocusedInput::new(ModifierPoller::default()),
            host: ViewportHost::new(cc.egui_ctx.clone()),
            compositor: None,
            texture: None,
            quick_colors: options.quick_colors,
        }
    }

    fn handle_focused_input(&mut self, ctx: &egui::Context) {
        let sampled = ctx.input(|i| modifier_state(i.modifiers));
        self.focused.poll_modifiers(Instant::now(), sampled);

        let over_panel = ctx.is_pointer_over_area();
        let mut requests = Vec::new();
        for event in surface_events(ctx, over_panel) {
            if let Some(request) = self.focused.handle(event, &mut self.machine) {
                requests.push(request);
            }
        }
        for request in requests {
            self.machine.apply(request, &mut self.host);
        }
    }

    fn show_control_panel(&self, ctx: &egui::Context) -> Vec<PanelAction> {
        let mut actions = Vec::new();
        let tool = *self.machine.tool();

        egui::Window::new("Ink")
            .anchor(egui::Align2::RIGHT_TOP, [-16.0, 16.0])
            .default_width(300.0)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui
                        .selectable_label(tool.mode() == DrawMode::Pen, "Pen")
                        .clicked()
                    {
                        actions.push(PanelAction::Mode(DrawMode::Pen));
                    }
                    if ui
                        .selectable_label(tool.mode() == DrawMode::Eraser, "Eraser")
                        .clicked()
                    {
                        actions.push(PanelAction::Mode(DrawMode::Eraser));
                    }
                });

                ui.horizontal(|ui| {
                    ui.label("Color:");
                    let mut picked = to_color32(tool.color());
                    if egui::color_picker::color_edit_button_srgba(
                        ui,
                        &mut picked,
                        egui::color_picker::Alpha::Opaque,
                    )
                    .changed()
                    {
                        actions.push(PanelAction::Color(from_color32(picked)));
                    }
                    for color in &self.quick_colors {
                        let swatch = egui::Button::new("")
                            .fill(to_color32(*color))
                            .min_size(egui::vec2(18.0, 18.0));
                        if ui.add(swatch).on_hover_text(color.to_hex()).clicked() {
                            actions.push(PanelAction::Color(*color));
                        }
                    }
                });

                ui.horizontal(|ui| {
                    ui.label("Size:");
                    let mut width = tool.width();
                    if ui
                        .add(egui::Slider::new(&mut width, MIN_PEN_WIDTH..=MAX_PEN_WIDTH))
                        .changed()
                    {
                        actions.push(PanelAction::Width(width));
                    }
                });

                ui.horizontal(|ui| {
                    if ui.button("Clear").clicked() {
                        actions.push(PanelAction::Clear);
                    }
                    if ui.button("Exit").clicked() {
                        actions.push(PanelAction::Exit);
                    }
                });

                ui.label(egui::RichText::new(SHORTCUT_HINT).small());
                if let ListenerStatus::Unavailable { reason } = self.controller.listener_status() {
                    ui.colored_label(
                        egui::Color32::YELLOW,
                        format!("Global shortcuts unavailable: {reason}"),
                    );
                }
            });

        actions
    }

    fn apply_panel_action(&mut self, action: PanelAction) {
        match action {
            PanelAction::Mode(mode) => self.machine.set_draw_mode(mode),
            PanelAction::Color(color) => {
                self.machine.set_color(color);
            }
            PanelAction::Width(width) => {
                self.machine.set_width(width);
            }
            PanelAction::Clear => {
                self.machine.apply(OverlayRequest::Clear, &mut self.host);
            }
            PanelAction::Exit => {
                self.machine.apply(OverlayRequest::Close, &mut self.host);
            }
        }
    }

    fn show_status(&self, ctx: &egui::Context) {
        egui::Area::new(egui::Id::new("ink-status"))
            .anchor(egui::Align2::LEFT_BOTTOM, [16.0, -16.0])
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.strong("Drawing mode active. Ctrl+Shift+Z or Ctrl+left click to stop.");
                });
            });
    }

    fn paint_surface(&mut self, ctx: &egui::Context) {
        let screen = ctx.screen_rect();
        let scale = ctx.pixels_per_point();
        let size = (
            (screen.width() * scale).round().max(1.0) as u32,
            (screen.height() * scale).round().max(1.0) as u32,
        );

        if self.compositor.is_none() {
            self.compositor = Compositor::new(size.0, size.1);
        }
        let Some(compositor) = self.compositor.as_mut() else {
            return;
        };
        compositor.ensure_size(size.0, size.1);

        let update = compositor.update(self.machine.mode(), self.machine.store(), scale);
        match update {
            RenderUpdate::Unchanged if self.texture.is_some() => {}
            RenderUpdate::Partial(rect) if self.texture.is_some() => {
                let image = egui::ColorImage::from_rgba_premultiplied(
                    [rect.width as usize, rect.height as usize],
                    &compositor.region(rect),
                );
                if let Some(texture) = self.texture.as_mut() {
                    texture.set_partial(
                        [rect.x as usize, rect.y as usize],
                        image,
                        egui::TextureOptions::NEAREST,
                    );
                }
            }
            _ => {
                let (width, height) = compositor.size();
                let image = egui::ColorImage::from_rgba_premultiplied(
                    [width as usize, height as usize],
                    compositor.data(),
                );
                match self.texture.as_mut() {
                    Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
                    None => {
                        self.texture = Some(ctx.load_texture(
                            "ink-surface",
                            image,
                            egui::TextureOptions::NEAREST,
                        ));
                    }
                }
            }
        }

        if !self.host.surface_visible {
            return;
        }
        if let Some(texture) = &self.texture {
            ctx.layer_painter(egui::LayerId::background()).image(
                texture.id(),
                screen,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.host.attach(frame);
        self.controller
            .pump_hook_signals(&mut self.machine, &mut self.host);
        self.handle_focused_input(ctx);

        if self.machine.mode().is_enabled() && !self.machine.is_closing() {
            for action in self.show_control_panel(ctx) {
                self.apply_panel_action(action);
            }
            self.show_status(ctx);
        }

        self.paint_surface(ctx);

        if self.host.crosshair && !ctx.is_pointer_over_area() {
            ctx.set_cursor_icon(egui::CursorIcon::Crosshair);
        }
        ctx.request_repaint_after(self.focused.poll_interval());
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0; 4]
    }
}

fn modifier_state(modifiers: egui::Modifiers) -> ModifierState {
    ModifierState {
        ctrl: modifiers.ctrl,
        shift: modifiers.shift,
    }
}

fn pointer_button(button: egui::PointerButton) -> PointerButton {
    match button {
        egui::PointerButton::Primary => PointerButton::Left,
        egui::PointerButton::Middle => PointerButton::Middle,
        egui::PointerButton::Secondary => PointerButton::Right,
        _ => PointerButton::Other,
    }
}

fn surface_events(ctx: &egui::Context, over_panel: bool) -> Vec<SurfaceEvent> {
    ctx.input(|input| {
        let mut events = Vec::new();
        for event in &input.events {
            match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } => {
                    events.push(SurfaceEvent::Modifiers(modifier_state(*modifiers)));
                    let key = match key {
                        egui::Key::Escape => SurfaceKey::Escape,
                        _ => SurfaceKey::Other,
                    };
                    events.push(SurfaceEvent::KeyPress(key));
                }
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    modifiers,
                } => {
                    events.push(SurfaceEvent::Modifiers(modifier_state(*modifiers)));
                    let button = pointer_button(*button);
                    if !*pressed {
                        events.push(SurfaceEvent::PointerRelease { button });
                    } else if !over_panel {
                        events.push(SurfaceEvent::PointerPress {
                            button,
                            pos: Point::new(pos.x, pos.y),
                        });
                    }
                }
                egui::Event::PointerMoved(pos) => {
                    events.push(SurfaceEvent::PointerMove {
                        pos: Point::new(pos.x, pos.y),
                    });
                }
                _ => {}
            }
        }
        events
    })
}

pub(crate) fn to_color32(color: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

pub(crate) fn from_color32(color: egui::Color32) -> Color {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    Color::rgba(r, g, b, a)
}
