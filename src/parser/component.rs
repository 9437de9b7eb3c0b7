use log::debug;
use std::{collections::HashSet, mem};

use crate::{
    ContentLineParser,
    component::{CalendarEvent, EventBuilder},
    parser::{ContentLine, ParserError, ParserOptions},
};

const EVENT_COMPONENT: &str = "VEVENT";

enum ScanState {
    OutsideEvent,
    /// `depth` counts the components nested in the event (`VALARM`...) we are currently in.
    InsideEvent { builder: EventBuilder, depth: usize },
}

/// What a content line means to the scanner.
enum Marker {
    BeginEvent,
    EndEvent,
    BeginOther,
    EndOther,
    Property,
}

impl Marker {
    fn of(line: &ContentLine) -> Self {
        let is_event = line.value.trim().eq_ignore_ascii_case(EVENT_COMPONENT);
        match (line.name.as_str(), is_event) {
            ("BEGIN", true) => Self::BeginEvent,
            ("END", true) => Self::EndEvent,
            ("BEGIN", false) => Self::BeginOther,
            ("END", false) => Self::EndOther,
            _ => Self::Property,
        }
    }
}

/// Iterator returning the `VEVENT`s of an ICS feed as [`CalendarEvent`]s.
///
/// Everything outside `VEVENT` blocks is ignored. Lines that cannot be split, blocks without
/// a usable `DTSTART` and a block left open at the end of the input are skipped; they never
/// stop the scan.
///
/// The uids of the returned events are unique: a block repeating an earlier `UID` gets
/// `{UID}#{RECURRENCE-ID}`, or a random uid when it has no `RECURRENCE-ID`.
pub struct EventParser<'a> {
    line_parser: ContentLineParser<'a>,
    source_id: String,
    options: ParserOptions,
    state: ScanState,
    seen_uids: HashSet<String>,
}

impl<'a> EventParser<'a> {
    pub fn from_text(text: &'a str, source_id: &str) -> Self {
        Self {
            line_parser: ContentLineParser::from_text(text),
            source_id: source_id.to_owned(),
            options: ParserOptions::default(),
            state: ScanState::OutsideEvent,
            seen_uids: HashSet::new(),
        }
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    fn finish(&mut self, builder: EventBuilder) -> Option<CalendarEvent> {
        let recurrence_id = builder.recurrence_id().map(str::to_owned);
        let mut event = builder
            .build(&self.options)
            .inspect_err(|err| debug!("{}: dropping event: {err}", self.source_id))
            .ok()?;

        if self.seen_uids.contains(&event.uid) {
            let derived = recurrence_id
                .map(|recurrence_id| format!("{}#{recurrence_id}", event.uid))
                .filter(|uid| !self.seen_uids.contains(uid))
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            debug!("{}: duplicate uid {}, using {derived}", self.source_id, event.uid);
            event.uid = derived;
        }
        self.seen_uids.insert(event.uid.clone());
        Some(event)
    }

    /// Feed one line to the state machine, returning the event it completes, if any.
    fn step(&mut self, line: ContentLine) -> Option<CalendarEvent> {
        let state = mem::replace(&mut self.state, ScanState::OutsideEvent);
        let (next, event) = match (state, Marker::of(&line)) {
            (state, Marker::BeginEvent) => {
                if matches!(state, ScanState::InsideEvent { .. }) {
                    debug!(
                        "{}: {}, discarding unterminated event",
                        self.source_id,
                        ParserError::NotComplete
                    );
                }
                let builder = EventBuilder::new(&self.source_id);
                (ScanState::InsideEvent { builder, depth: 0 }, None)
            }
            (ScanState::OutsideEvent, _) => (ScanState::OutsideEvent, None),
            (ScanState::InsideEvent { builder, .. }, Marker::EndEvent) => {
                (ScanState::OutsideEvent, self.finish(builder))
            }
            (ScanState::InsideEvent { builder, depth }, Marker::BeginOther) => {
                let depth = depth + 1;
                (ScanState::InsideEvent { builder, depth }, None)
            }
            (ScanState::InsideEvent { builder, depth }, Marker::EndOther) => {
                let depth = depth.saturating_sub(1);
                (ScanState::InsideEvent { builder, depth }, None)
            }
            (ScanState::InsideEvent { mut builder, depth }, Marker::Property) => {
                // Properties of nested components do not belong to the event
                if depth == 0 {
                    builder.add_content_line(line);
                }
                (ScanState::InsideEvent { builder, depth }, None)
            }
        };
        self.state = next;
        event
    }
}

impl Iterator for EventParser<'_> {
    type Item = CalendarEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.line_parser.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => {
                    debug!(
                        "{}: skipping line: {}",
                        self.source_id,
                        ParserError::from(err)
                    );
                    continue;
                }
                None => {
                    if let ScanState::InsideEvent { .. } =
                        mem::replace(&mut self.state, ScanState::OutsideEvent)
                    {
                        debug!(
                            "{}: {} at end of input",
                            self.source_id,
                            ParserError::NotComplete
                        );
                    }
                    return None;
                }
            };

            if let Some(event) = self.step(line) {
                return Some(event);
            }
        }
    }
}
