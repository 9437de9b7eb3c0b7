//! Selection and layout of events for display.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta};
use derive_more::Display;
use itertools::Itertools;

use crate::{component::CalendarEvent, types::Tz};

mod month;
pub use month::*;

mod render;
pub use render::*;

/// How far ahead [`ViewMode::Upcoming`] looks.
pub const UPCOMING_DAYS: i64 = 31;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum ViewMode {
    #[display("month")]
    Month,
    #[display("list")]
    List,
    /// The next [`UPCOMING_DAYS`] days, whatever month is selected.
    #[default]
    #[display("upcoming")]
    Upcoming,
}

/// Events relevant to `mode`.
///
/// `List` keeps the events starting in the month of `anchor`, `Upcoming` those starting
/// between `now` and [`UPCOMING_DAYS`] later. `Month` keeps everything, the grid picks its days.
pub fn filter_events<'a>(
    events: &'a [CalendarEvent],
    mode: ViewMode,
    anchor: NaiveDate,
    now: DateTime<Tz>,
) -> Vec<&'a CalendarEvent> {
    match mode {
        ViewMode::Month => events.iter().collect(),
        ViewMode::List => events
            .iter()
            .filter(|event| {
                let start = event.start.date_naive();
                start.year() == anchor.year() && start.month() == anchor.month()
            })
            .collect(),
        ViewMode::Upcoming => {
            let until = now + TimeDelta::days(UPCOMING_DAYS);
            events
                .iter()
                .filter(|event| event.start >= now && event.start <= until)
                .collect()
        }
    }
}

/// Events sharing a local start date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup<'a> {
    pub date: NaiveDate,
    pub events: Vec<&'a CalendarEvent>,
}

/// Sort by start and group by local start date.
pub fn group_by_day<'a>(events: impl IntoIterator<Item = &'a CalendarEvent>) -> Vec<DayGroup<'a>> {
    events
        .into_iter()
        .sorted_by_key(|event| event.start)
        .chunk_by(|event| event.start.date_naive())
        .into_iter()
        .map(|(date, group)| DayGroup {
            date,
            events: group.collect(),
        })
        .collect()
}
