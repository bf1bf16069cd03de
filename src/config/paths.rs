//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\narration-sync\
//!   macOS:   ~/Library/Application Support/narration-sync/
//!   Linux:   ~/.config/narration-sync/
//!
//! Data dir (stored unit timings):
//!   Windows: %LOCALAPPDATA%\narration-sync\
//!   macOS:   ~/Library/Application Support/narration-sync/
//!   Linux:   ~/.local/share/narration-sync/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory the JSON timing store writes `<project>.json` files into.
    pub timings_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "narration-sync";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let timings_dir = data_dir.join("timings");

        Self {
            config_dir,
            settings_file,
            timings_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
