//! Platform locations of the settings file and the speech output directory.
//!
//! | File                | Linux                                         |
//! |---------------------|-----------------------------------------------|
//! | `settings.toml`     | `~/.config/voice-translator/settings.toml`    |
//! | synthesized speech  | `~/.local/share/voice-translator/speech/`     |
//!
//! Other platforms use the equivalent `dirs` locations.  When the platform
//! has none, paths are relative to the working directory.

use std::path::PathBuf;

const APP_DIR: &str = "voice-translator";

#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Read by [`AppConfig::load`](crate::config::AppConfig::load).
    pub settings_file: PathBuf,
    /// Default root of the file audio sink.
    pub output_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let base = |dir: Option<PathBuf>| dir.unwrap_or_default().join(APP_DIR);
        Self {
            settings_file: base(dirs::config_dir()).join("settings.toml"),
            output_dir: base(dirs::data_local_dir()).join("speech"),
        }
    }
}
