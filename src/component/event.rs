use chrono::DateTime;
use log::debug;
use serde::Serialize;

use crate::{
    parser::{ContentLine, ParserError, ParserOptions, unescape_text},
    types::{CalDateOrDateTime, Tz},
};

/// Title given to events whose feed has no usable `SUMMARY`.
pub const DEFAULT_SUMMARY: &str = "No Title";

/// A normalized event occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    /// Unique within one parse. The feed's `UID` when it has one and it was not seen before in
    /// the same feed, otherwise derived from `RECURRENCE-ID` or random.
    pub uid: String,
    pub summary: String,
    /// Empty when the feed has none.
    pub description: String,
    /// Empty when the feed has none.
    pub location: String,
    pub start: DateTime<Tz>,
    /// Synthesized from `start` when `DTEND` is missing or unusable.
    pub end: DateTime<Tz>,
    pub is_all_day: bool,
    /// Id of the [`crate::CalendarSource`] this event came from.
    pub source_id: String,
}

impl CalendarEvent {
    /// The last local day the event occupies. An end at midnight is exclusive.
    pub fn last_day(&self) -> chrono::NaiveDate {
        if self.end > self.start && self.end.time() == chrono::NaiveTime::MIN {
            self.end.date_naive().pred_opt().unwrap_or(self.end.date_naive())
        } else {
            self.end.date_naive()
        }
    }

    /// Whether the event spans more than one local day.
    pub fn is_multi_day(&self) -> bool {
        self.last_day() > self.start.date_naive()
    }
}

/// Properties collected while inside a `VEVENT` block.
///
/// Fields stay raw until [`EventBuilder::build`], which validates them and produces the
/// finished [`CalendarEvent`].
#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    source_id: String,
    uid: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    recurrence_id: Option<String>,
    dtstart: Option<ContentLine>,
    dtend: Option<ContentLine>,
}

impl EventBuilder {
    pub fn new(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_owned(),
            ..Default::default()
        }
    }

    /// Add the given property. Repeated properties overwrite earlier ones, unknown ones are
    /// ignored.
    pub fn add_content_line(&mut self, line: ContentLine) {
        match line.name.as_str() {
            "UID" => self.uid = Some(line.value),
            "SUMMARY" => self.summary = Some(line.value),
            "DESCRIPTION" => self.description = Some(line.value),
            "LOCATION" => self.location = Some(line.value),
            "RECURRENCE-ID" => self.recurrence_id = Some(line.value),
            "DTSTART" => self.dtstart = Some(line),
            "DTEND" => self.dtend = Some(line),
            _ => {}
        }
    }

    /// The raw `RECURRENCE-ID` value, if the block overrides one occurrence of a series.
    pub fn recurrence_id(&self) -> Option<&str> {
        self.recurrence_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn build(self, options: &ParserOptions) -> Result<CalendarEvent, ParserError> {
        let tz = &options.timezone;

        let dtstart = self
            .dtstart
            .ok_or(ParserError::MissingProperty("DTSTART"))?;
        let start_value = CalDateOrDateTime::parse_prop(&dtstart, options)?;
        let start = start_value.resolve(tz)?;

        let end = match self.dtend.map(|dtend| {
            CalDateOrDateTime::parse_prop(&dtend, options).and_then(|value| value.resolve(tz))
        }) {
            Some(Ok(end)) => end,
            Some(Err(err)) => {
                debug!("{}: unusable DTEND, using default duration: {err}", self.source_id);
                start_value.default_end(&start, tz)?
            }
            None => start_value.default_end(&start, tz)?,
        };

        let text = |value: Option<String>| {
            value
                .map(|value| unescape_text(&value).into_owned())
                .unwrap_or_default()
        };

        Ok(CalendarEvent {
            uid: self
                .uid
                .map(|uid| uid.trim().to_owned())
                .filter(|uid| !uid.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            summary: Some(text(self.summary))
                .filter(|summary| !summary.is_empty())
                .unwrap_or_else(|| DEFAULT_SUMMARY.to_owned()),
            description: text(self.description),
            location: text(self.location),
            start,
            end,
            is_all_day: start_value.is_date(),
            source_id: self.source_id,
        })
    }
}
