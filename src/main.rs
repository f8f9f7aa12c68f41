use ink_overlay::draw::{self, OverlayOptions};
use ink_overlay::settings::{self, Settings};
use ink_overlay::{launcher, logging};

fn main() -> anyhow::Result<()> {
    let settings_path = settings::resolve_settings_path()?;
    let loaded = Settings::load(&settings_path);
    let settings = loaded.as_ref().cloned().unwrap_or_default();

    if let Err(err) = logging::init(settings.debug_logging, settings.log_file.as_deref()) {
        logging::init(settings.debug_logging, None)?;
        tracing::warn!(?err, "file logging unavailable");
    }
    if let Err(err) = &loaded {
        tracing::warn!(?err, "settings unreadable; using defaults");
    }

    let Some(chosen) = launcher::run(settings, settings_path)? else {
        tracing::info!("launcher closed without starting");
        return Ok(());
    };

    let options = OverlayOptions {
        tool: chosen.tool(),
        quick_colors: chosen.quick_colors(),
        listener_retry: chosen.listener_retry(),
    };
    if let Err(err) = draw::run(options) {
        tracing::error!(?err, "drawing surface could not be created");
        return Err(err);
    }
    tracing::info!("overlay closed");
    Ok(())
}
