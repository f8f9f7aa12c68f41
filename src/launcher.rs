use crate::autostart::{self, LaunchAtLogin};
use crate::draw::model::{MAX_PEN_WIDTH, MIN_PEN_WIDTH};
use crate::draw::overlay::{from_color32, to_color32, SHORTCUT_HINT};
use crate::settings::Settings;
use anyhow::{anyhow, Result};
use eframe::egui;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Commits the launcher form: applies the login-item choice and persists the
/// settings. Neither failure blocks drawing; both are logged.
pub fn commit_start(
    settings: &mut Settings,
    autostart: &mut dyn LaunchAtLogin,
    settings_path: &Path,
) -> Settings {
    settings.sanitize();
    if let Err(err) = autostart::apply(autostart, settings.launch_at_login) {
        tracing::warn!(?err, "failed to update launch at login");
        settings.launch_at_login = false;
    }
    if let Err(err) = settings.save(settings_path) {
        tracing::warn!(?err, path = %settings_path.display(), "failed to save settings");
    }
    settings.clone()
}

pub struct LauncherApp {
    settings: Settings,
    settings_path: PathBuf,
    autostart: Box<dyn LaunchAtLogin>,
    outcome: Rc<RefCell<Option<Settings>>>,
}

impl LauncherApp {
    pub fn new(
        settings: Settings,
        settings_path: PathBuf,
        autostart: Box<dyn LaunchAtLogin>,
        outcome: Rc<RefCell<Option<Settings>>>,
    ) -> Self {
        Self {
            settings,
            settings_path,
            autostart,
            outcome,
        }
    }

    fn start(&mut self, ctx: &egui::Context) {
        let chosen = commit_start(
            &mut self.settings,
            self.autostart.as_mut(),
            &self.settings_path,
        );
        tracing::info!(color = %chosen.pen_color, width = chosen.pen_width, "starting overlay");
        *self.outcome.borrow_mut() = Some(chosen);
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

impl eframe::App for LauncherApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut start = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Ink overlay");
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.label("Default color:");
                let mut color = to_color32(self.settings.pen_color());
                if egui::color_picker::color_edit_button_srgba(
                    ui,
                    &mut color,
                    egui::color_picker::Alpha::Opaque,
                )
                .changed()
                {
                    self.settings.set_pen_color(from_color32(color));
                }
                ui.monospace(&self.settings.pen_color);
            });

            ui.horizontal(|ui| {
                ui.label("Default size:");
                ui.add(egui::Slider::new(
                    &mut self.settings.pen_width,
                    MIN_PEN_WIDTH..=MAX_PEN_WIDTH,
                ));
            });

            ui.checkbox(&mut self.settings.launch_at_login, "Launch at login");
            ui.separator();
            ui.label(SHORTCUT_HINT);
            ui.add_space(12.0);

            ui.vertical_centered(|ui| {
                if ui.button("Start drawing").clicked() {
                    start = true;
                }
            });
        });

        if start {
            self.start(ctx);
        }
    }
}

/// Shows the launcher and returns the chosen settings, or `None` when the
/// window was closed without starting.
pub fn run(settings: Settings, settings_path: PathBuf) -> Result<Option<Settings>> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Ink overlay")
            .with_inner_size([450.0, 360.0])
            .with_resizable(false),
        ..Default::default()
    };

    let outcome = Rc::new(RefCell::new(None));
    let app_outcome = Rc::clone(&outcome);
    eframe::run_native(
        "ink_overlay_launcher",
        native_options,
        Box::new(move |_cc| {
            Box::new(LauncherApp::new(
                settings,
                settings_path,
                autostart::platform_autostart(),
                app_outcome,
            ))
        }),
    )
    .map_err(|err| anyhow!("failed to open launcher window: {err}"))?;

    let chosen = outcome.borrow_mut().take();
    Ok(chosen)
}
