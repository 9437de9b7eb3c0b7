//! Personal calendar aggregator.
//!
//! The heart of the crate is a tolerant ICS parser turning raw feed text into a flat list of
//! [`CalendarEvent`]s. Around it live the source configuration, the concurrent feed refresh
//! and the month/list views.
//!
//! # Examples
//!
//! ```rust
//! let feed = "BEGIN:VCALENDAR\r\n\
//!     BEGIN:VEVENT\r\n\
//!     UID:standup@example.com\r\n\
//!     SUMMARY:Standup\r\n\
//!     DTSTART:20240115T090000Z\r\n\
//!     END:VEVENT\r\n\
//!     END:VCALENDAR\r\n";
//!
//! let events = opencal::parse(feed, "work");
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].summary, "Standup");
//! assert_eq!(events[0].source_id, "work");
//! ```

const PARAM_VALUE_DELIMITER: char = ',';
const VALUE_DELIMITER: char = ':';
const PARAM_DELIMITER: char = ';';
const PARAM_NAME_DELIMITER: char = '=';
const PARAM_QUOTE: char = '"';

pub mod component;
pub use component::{CalendarEvent, EventBuilder};

pub mod parser;
pub use parser::{ContentLineParser, EventParser, LineReader, ParserError, ParserOptions};

pub mod types;

pub mod source;
pub use source::CalendarSource;

pub mod config;
pub mod fetch;
pub mod aggregate;
pub mod view;

mod error;
pub use error::Error;

/// Parse the text of one ICS feed into events tagged with `source_id`.
///
/// Never fails: malformed lines and event blocks are skipped, so a broken feed only yields
/// fewer events.
pub fn parse(feed_text: &str, source_id: &str) -> Vec<CalendarEvent> {
    parse_with(feed_text, source_id, &ParserOptions::default())
}

/// Same as [`parse`] with explicit [`ParserOptions`].
pub fn parse_with(feed_text: &str, source_id: &str, options: &ParserOptions) -> Vec<CalendarEvent> {
    EventParser::from_text(feed_text, source_id)
        .with_options(options.clone())
        .collect()
}
