//! Plain-text rendering of the list, month and event views.

use std::fmt::{self, Display, Formatter};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{
    component::CalendarEvent,
    source::{CalendarSource, find_source},
    view::{DayCell, DayGroup, MonthGrid},
};

/// Width of a month grid column in terminal columns, separator included.
///
/// Wide characters (CJK, most emoji) count as two columns. Terminals that draw some emoji
/// narrower than their Unicode width still misalign the grid.
pub const COLUMN_WIDTH: usize = 16;

const FULL_DATE: &str = "%A, %-d %B %Y";

const TIME_COLUMN_WIDTH: usize = 19;

/// `All Day`, or the start and end times on a 12-hour clock.
pub fn event_time(event: &CalendarEvent) -> String {
    if event.is_all_day {
        return "All Day".to_owned();
    }
    format!(
        "{} - {}",
        event.start.format("%-I:%M %p"),
        event.end.format("%-I:%M %p")
    )
}

/// The text of an event in a month cell. Single-day timed events are prefixed with their start.
pub fn cell_label(event: &CalendarEvent) -> String {
    if event.is_all_day || event.is_multi_day() {
        event.summary.clone()
    } else {
        format!("{} {}", event.start.format("%H:%M"), event.summary)
    }
}

/// The longest prefix of `text` that fits in `width` terminal columns.
fn truncate(text: &str, width: usize) -> &str {
    let mut used = 0;
    for (pos, c) in text.char_indices() {
        used += c.width().unwrap_or(0);
        if used > width {
            return &text[..pos];
        }
    }
    text
}

/// `text` padded with spaces to `width` terminal columns.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

/// Events grouped by day, one line per event.
pub struct ListView<'a> {
    pub groups: &'a [DayGroup<'a>],
    pub sources: &'a [CalendarSource],
}

impl Display for ListView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.groups.is_empty() {
            return writeln!(f, "No events");
        }

        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", group.date.format("%a %-d %b %Y"))?;

            for event in &group.events {
                let mut line = format!(
                    "  {:<TIME_COLUMN_WIDTH$}  {}",
                    event_time(event),
                    event.summary
                );
                if !event.location.is_empty() {
                    line += &format!(" @ {}", event.location);
                }
                if let Some(source) = find_source(self.sources, &event.source_id) {
                    line += &format!("  [{}]", source.name);
                }
                writeln!(f, "{}", line.trim_end())?;
            }
        }
        Ok(())
    }
}

pub fn render_list(groups: &[DayGroup<'_>], sources: &[CalendarSource]) -> String {
    ListView { groups, sources }.to_string()
}

/// What a day cell shows on its `line`-th event line.
fn cell_line(cell: &DayCell<'_>, line: usize) -> String {
    let visible = cell.visible();
    if let Some(event) = visible.get(line) {
        truncate(&cell_label(event), COLUMN_WIDTH - 1).to_owned()
    } else if line == visible.len() && cell.hidden() > 0 {
        format!("+{} more", cell.hidden())
    } else {
        String::new()
    }
}

fn day_label(cell: &DayCell<'_>) -> String {
    let day = cell.date.format("%-d");
    match (cell.in_month, cell.is_today) {
        (_, true) => format!("{day}*"),
        (true, false) => day.to_string(),
        (false, false) => format!("({day})"),
    }
}

fn write_row(f: &mut Formatter<'_>, columns: impl Iterator<Item = String>) -> fmt::Result {
    let row: String = columns
        .map(|column| pad(&column, COLUMN_WIDTH))
        .collect();
    writeln!(f, "{}", row.trim_end())
}

/// Seven-column month grid. Today is marked with `*`, days outside the month are in parentheses.
pub struct MonthView<'a, 'g> {
    pub grid: &'g MonthGrid<'a>,
}

impl Display for MonthView<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.grid.month().format("%B %Y"))?;
        write_row(f, self.grid.weekdays().map(|day| day.to_string()))?;

        for week in self.grid.weeks() {
            writeln!(f)?;
            write_row(f, week.iter().map(day_label))?;

            let lines = week
                .iter()
                .map(|cell| cell.visible().len() + usize::from(cell.hidden() > 0))
                .max()
                .unwrap_or(0);
            for line in 0..lines {
                write_row(f, week.iter().map(|cell| cell_line(cell, line)))?;
            }
        }
        Ok(())
    }
}

pub fn render_month(grid: &MonthGrid<'_>) -> String {
    MonthView { grid }.to_string()
}

/// Everything known about one event: title, full date, time, location, calendar and the
/// multi-line description.
pub struct EventDetails<'a> {
    pub event: &'a CalendarEvent,
    pub sources: &'a [CalendarSource],
}

impl Display for EventDetails<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let event = self.event;
        writeln!(f, "{}", event.summary)?;

        let first = event.start.date_naive();
        let last = event.last_day();
        if last > first {
            writeln!(f, "{} - {}", first.format(FULL_DATE), last.format(FULL_DATE))?;
        } else {
            writeln!(f, "{}", first.format(FULL_DATE))?;
        }
        writeln!(f, "{}", event_time(event))?;

        if !event.location.is_empty() {
            writeln!(f, "Location: {}", event.location)?;
        }
        if let Some(source) = find_source(self.sources, &event.source_id) {
            writeln!(f, "Calendar: {}", source.name)?;
        }
        if !event.description.is_empty() {
            writeln!(f)?;
            for line in event.description.lines() {
                writeln!(f, "{}", line.trim_end())?;
            }
        }
        Ok(())
    }
}

pub fn render_event(event: &CalendarEvent, sources: &[CalendarSource]) -> String {
    EventDetails { event, sources }.to_string()
}
