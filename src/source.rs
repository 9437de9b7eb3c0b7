use serde::{Deserialize, Serialize};

/// Colour given to new sources.
pub const DEFAULT_COLOR: &str = "#10b981";

/// Colour used when an event's source is unknown.
pub const FALLBACK_COLOR: &str = "#94a3b8";

fn default_color() -> String {
    DEFAULT_COLOR.to_owned()
}

fn default_enabled() -> bool {
    true
}

/// A configured calendar feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSource {
    /// Stable identifier, also used to look up the feed URL in the environment.
    pub id: String,
    pub name: String,
    /// May be empty when the URL is resolved from the id.
    #[serde(default)]
    pub url: String,
    /// Display colour as a hex string.
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl CalendarSource {
    /// A new enabled source with a random id.
    pub fn new(name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_owned(),
            url: String::new(),
            color: default_color(),
            enabled: true,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_owned();
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_owned();
        self
    }

    /// The colour as an RGB triple, if it is a valid `#rrggbb` or `#rgb` string.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        parse_hex_color(&self.color)
    }
}

pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            let expand = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
            Some((expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

/// Find a source by id.
pub fn find_source<'a>(sources: &'a [CalendarSource], id: &str) -> Option<&'a CalendarSource> {
    sources.iter().find(|source| source.id == id)
}
