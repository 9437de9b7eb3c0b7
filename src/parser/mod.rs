mod error;
pub use error::ParserError;

mod line;
pub use line::{Line, LineReader, unfold};

mod content_line;
pub use content_line::{ContentLine, ContentLineError, ContentLineParams, ContentLineParser};

mod text;
pub use text::unescape_text;

mod component;
pub use component::EventParser;

use crate::types::Tz;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Timezone the decoded instants are expressed in.
    /// UTC values are converted to it and floating values are read on its wall clock.
    pub timezone: Tz,
    /// When true, a `TZID` parameter naming a known IANA zone is honoured.
    /// Otherwise (and for unknown zone names) such values are treated as floating time.
    pub resolve_tzid: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            timezone: Tz::Local,
            resolve_tzid: true,
        }
    }
}

impl ParserOptions {
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}
