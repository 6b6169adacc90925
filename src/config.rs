//! Settings loading
//!
//! Settings come from an explicit TOML file when one is given, otherwise from
//! the platform config location managed by confy
//! (`~/.config/camoverlay/settings.toml` on Linux), created with defaults on
//! first use.

use std::path::{Path, PathBuf};

use camoverlay_types::AppSettings;
use thiserror::Error;

/// Errors during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] confy::ConfyError),

    #[error("failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load settings from `path`, or from the default location when `None`
pub fn load(path: Option<&Path>) -> Result<AppSettings, ConfigError> {
    let settings = match path {
        Some(path) => load_file(path)?,
        None => confy::load("camoverlay", "settings")?,
    };
    validate(&settings)?;
    Ok(settings)
}

/// Location of the default settings file
pub fn default_path() -> Result<PathBuf, ConfigError> {
    Ok(confy::get_configuration_file_path("camoverlay", "settings")?)
}

fn load_file(path: &Path) -> Result<AppSettings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(text: &str) -> Result<AppSettings, toml::de::Error> {
    toml::from_str(text)
}

/// Light sanity checks on values the compositor cannot work with
pub fn validate(settings: &AppSettings) -> Result<(), ConfigError> {
    let overlay = &settings.overlay;

    if !(overlay.scale.is_finite() && overlay.scale > 0.0) {
        return Err(ConfigError::Invalid(format!(
            "overlay.scale must be positive, got {}",
            overlay.scale
        )));
    }
    if overlay.stream_width == 0 || overlay.stream_height == 0 {
        return Err(ConfigError::Invalid(format!(
            "overlay stream size must be non-zero, got {}x{}",
            overlay.stream_width, overlay.stream_height
        )));
    }
    if overlay.width <= 0.0 || overlay.height <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "overlay size must be positive, got {}x{}",
            overlay.width, overlay.height
        )));
    }
    if overlay.refresh_ms == 0 {
        return Err(ConfigError::Invalid("overlay.refresh_ms must be non-zero".into()));
    }

    let mut seen = std::collections::HashSet::new();
    for entry in &settings.resources {
        if !seen.insert(entry.moniker.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "resource moniker '{}' is registered twice",
                entry.moniker
            )));
        }
    }

    Ok(())
}
