//! Settings file and feed URL resolution.
//!
//! Settings live in `~/.config/opencal/config.toml` and are loaded once at startup; saving
//! overwrites the file with the edited settings.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    parser::ParserOptions,
    source::{CalendarSource, find_source},
    types::Tz,
};

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Environment prefix for settings overrides (`OPENCAL_RELAY_URL`...).
const ENV_PREFIX: &str = "OPENCAL";

/// JSON array of `{ "id": ..., "url": ... }` objects consulted when a source has no URL.
pub const SOURCES_ENV: &str = "CALENDAR_SOURCES";

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Could not save configuration: {0}")]
    Save(String),
    #[error("Could not determine config directory")]
    NoConfigDir,
    #[error("No URL configured for calendar '{0}'")]
    MissingUrl(String),
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),
    #[error("Calendar not found: {0}")]
    SourceNotFound(String),
}

/// Where calendar sources come from.
///
/// The aggregator only asks for the current list; how it is stored is up to the provider.
pub trait SourceProvider {
    fn sources(&self) -> Vec<CalendarSource>;
}

impl SourceProvider for Vec<CalendarSource> {
    fn sources(&self) -> Vec<CalendarSource> {
        self.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub sources: Vec<CalendarSource>,

    /// Relay fetching feeds on our behalf, queried with `?url=` or `?id=`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_url: Option<String>,

    /// IANA timezone events are shown in. The system timezone when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources: vec![],
            relay_url: None,
            timezone: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl SourceProvider for Settings {
    fn sources(&self) -> Vec<CalendarSource> {
        self.sources.clone()
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("opencal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the settings file, falling back to defaults when it does not exist.
    ///
    /// `OPENCAL_*` environment variables override scalar settings.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Save(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Save(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, content)
            .map_err(|e| ConfigError::Save(format!("Could not write config file: {e}")))
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        match &self.timezone {
            None => Ok(Tz::Local),
            Some(name) => name
                .parse()
                .map_err(|_| ConfigError::InvalidTimezone(name.clone())),
        }
    }

    pub fn parser_options(&self) -> Result<ParserOptions, ConfigError> {
        Ok(ParserOptions::default().with_timezone(self.timezone()?))
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &CalendarSource> {
        self.sources.iter().filter(|source| source.enabled)
    }

    pub fn add_source(&mut self, source: CalendarSource) {
        self.sources.push(source);
    }

    pub fn remove_source(&mut self, id: &str) -> Result<CalendarSource, ConfigError> {
        let pos = self
            .sources
            .iter()
            .position(|source| source.id == id)
            .ok_or_else(|| ConfigError::SourceNotFound(id.to_owned()))?;
        Ok(self.sources.remove(pos))
    }

    /// Flip the `enabled` flag of a source, returning the new value.
    pub fn toggle_source(&mut self, id: &str) -> Result<bool, ConfigError> {
        let source = self
            .sources
            .iter_mut()
            .find(|source| source.id == id)
            .ok_or_else(|| ConfigError::SourceNotFound(id.to_owned()))?;
        source.enabled = !source.enabled;
        Ok(source.enabled)
    }

    pub fn source(&self, id: &str) -> Option<&CalendarSource> {
        find_source(&self.sources, id)
    }
}

#[derive(Deserialize)]
struct SourceEntry {
    id: String,
    #[serde(default)]
    url: String,
}

/// Resolve the feed URL of `source` from the process environment.
pub fn resolve_url(source: &CalendarSource) -> Result<String, ConfigError> {
    resolve_url_with(source, |key| std::env::var(key).ok())
}

/// Resolve the feed URL of `source`.
///
/// The source's own URL wins. Otherwise `CALENDAR_<ID>_URL` (id upper-cased) is looked up,
/// then the entry with the same id in the `CALENDAR_SOURCES` JSON array.
pub fn resolve_url_with(
    source: &CalendarSource,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    if !source.url.trim().is_empty() {
        return Ok(source.url.trim().to_owned());
    }

    let var = format!("CALENDAR_{}_URL", source.id.to_uppercase());
    if let Some(url) = lookup(&var).filter(|url| !url.trim().is_empty()) {
        return Ok(url.trim().to_owned());
    }

    if let Some(json) = lookup(SOURCES_ENV) {
        match serde_json::from_str::<Vec<SourceEntry>>(&json) {
            Ok(entries) => {
                if let Some(entry) = entries
                    .into_iter()
                    .find(|entry| entry.id == source.id && !entry.url.trim().is_empty())
                {
                    return Ok(entry.url.trim().to_owned());
                }
            }
            Err(err) => warn!("Failed to parse {SOURCES_ENV}: {err}"),
        }
    }

    Err(ConfigError::MissingUrl(source.id.clone()))
}
