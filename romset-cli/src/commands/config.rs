use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romset_lib::settings;

use crate::error::CliError;

/// Print the settings file path.
pub(crate) fn run_config_path() {
    log::info!("{}", settings::settings_path().display());
}

/// Show where settings come from and the values in effect.
pub(crate) fn run_config_show() -> Result<(), CliError> {
    let path = settings::settings_path();
    let state = if path.exists() { "(exists)" } else { "(not found)" };
    log::info!(
        "{}",
        "romset settings".if_supports_color(Stdout, |t| t.bold())
    );
    crate::logging::blank();
    log::info!(
        "  Settings file: {} {}",
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        state.if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!(
        "  Header rules:  {}",
        settings::headers_dir()
            .display()
            .if_supports_color(Stdout, |t| t.cyan()),
    );
    crate::logging::blank();

    let current = settings::load_settings();
    log::info!("  threads       = {}", current.threads());
    log::info!("  chunk_size    = {}", romset_core::util::format_bytes(current.chunk_size()));
    log::info!(
        "  max_file_size = {}",
        romset_core::util::format_bytes(current.max_file_size())
    );
    crate::logging::blank();
    log::info!("{}", settings::settings_string(&current)?);
    Ok(())
}

/// Write the current settings to the settings file, unless it exists.
pub(crate) fn run_config_init() -> Result<(), CliError> {
    let path = settings::settings_path();
    if path.exists() {
        log::warn!("{} already exists", path.display());
        return Ok(());
    }
    settings::save_settings_to(&path, &settings::load_settings())?;
    log::info!(
        "{} {}",
        "Wrote".if_supports_color(Stdout, |t| t.green()),
        path.display()
    );
    Ok(())
}
