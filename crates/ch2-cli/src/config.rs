//! Configuration loading and management.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use ch2_core::{FormatOptions, MeasureOrder};
use ch2_core::format::DEFAULT_KM_THRESHOLD;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Distances above this many metres are shown in kilometres.
    pub km_threshold: f64,
    /// Default ranking direction per statistic name.
    pub measures: HashMap<String, MeasureOrder>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut measures: Vec<_> = self.measures.iter().collect();
        measures.sort_by(|a, b| a.0.cmp(b.0));
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("km_threshold", &self.km_threshold)
            .field("measures", &measures)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("ch2.db"),
            km_threshold: DEFAULT_KM_THRESHOLD,
            measures: HashMap::new(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // CH2_DATABASE_PATH, CH2_KM_THRESHOLD, ...
        figment = figment.merge(Env::prefixed("CH2_"));

        figment.extract()
    }

    /// Formatting options derived from this configuration.
    pub const fn format_options(&self) -> FormatOptions {
        FormatOptions {
            km_threshold: self.km_threshold,
        }
    }
}

/// Returns the platform-specific config directory for ch2.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ch2"))
}

/// Returns the platform-specific data directory for ch2.
///
/// On Linux: `~/.local/share/ch2`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ch2"))
}
