use chrono::{Datelike, Months, NaiveDate, NaiveTime, TimeDelta, Weekday};

use crate::component::CalendarEvent;

/// Events listed in a day cell before the rest is collapsed into a count.
pub const MAX_VISIBLE_EVENTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    /// False for the days of the previous and next month padding the first and last week.
    pub in_month: bool,
    pub is_today: bool,
    /// All-day events first, then by start.
    pub events: Vec<&'a CalendarEvent>,
}

impl<'a> DayCell<'a> {
    pub fn visible(&self) -> &[&'a CalendarEvent] {
        &self.events[..self.events.len().min(MAX_VISIBLE_EVENTS)]
    }

    pub fn hidden(&self) -> usize {
        self.events.len().saturating_sub(MAX_VISIBLE_EVENTS)
    }
}

/// Whether `event` occupies `date`: it starts that day, or overlaps it with its end excluded.
pub fn occupies(event: &CalendarEvent, date: NaiveDate) -> bool {
    let start = event.start.naive_local();
    let end = event.end.naive_local();
    let day_start = date.and_time(NaiveTime::MIN);
    let day_end = day_start + TimeDelta::days(1);

    start.date() == date || (start < day_end && end > day_start)
}

/// The weeks covering a month, each day holding the events that occupy it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid<'a> {
    month: NaiveDate,
    week_start: Weekday,
    days: Vec<DayCell<'a>>,
}

impl<'a> MonthGrid<'a> {
    /// Lay out the month containing `anchor`, weeks starting on `week_start`.
    pub fn new(
        anchor: NaiveDate,
        week_start: Weekday,
        events: impl IntoIterator<Item = &'a CalendarEvent>,
        today: NaiveDate,
    ) -> Self {
        let month = anchor.with_day(1).unwrap_or(anchor);
        let last = month
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(month);
        let first_shown = month.week(week_start).first_day();
        let last_shown = last.week(week_start).last_day();

        let events: Vec<&CalendarEvent> = events.into_iter().collect();
        let days = first_shown
            .iter_days()
            .take_while(|date| *date <= last_shown)
            .map(|date| {
                let mut day_events: Vec<&CalendarEvent> = events
                    .iter()
                    .copied()
                    .filter(|event| occupies(event, date))
                    .collect();
                day_events.sort_by_key(|event| (!event.is_all_day, event.start));
                DayCell {
                    date,
                    in_month: date.month() == month.month() && date.year() == month.year(),
                    is_today: date == today,
                    events: day_events,
                }
            })
            .collect();

        Self {
            month,
            week_start,
            days,
        }
    }

    /// First day of the displayed month.
    pub fn month(&self) -> NaiveDate {
        self.month
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    /// Weekdays in column order.
    pub fn weekdays(&self) -> impl Iterator<Item = Weekday> {
        std::iter::successors(Some(self.week_start), |day| Some(day.succ())).take(7)
    }

    pub fn days(&self) -> &[DayCell<'a>] {
        &self.days
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[DayCell<'a>]> {
        self.days.chunks(7)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayCell<'a>> {
        self.days.iter().find(|cell| cell.date == date)
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_VISIBLE_EVENTS, MonthGrid, occupies};
    use crate::view::tests::{all_day, event};
    use chrono::{NaiveDate, Weekday};
    use rstest::rstest;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[rstest]
    // Monday January 1st 2024
    #[case(Weekday::Mon, jan(1), NaiveDate::from_ymd_opt(2024, 2, 4).unwrap(), 5)]
    #[case(Weekday::Sun, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(), NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(), 5)]
    fn covers_whole_weeks(
        #[case] week_start: Weekday,
        #[case] first: NaiveDate,
        #[case] last: NaiveDate,
        #[case] weeks: usize,
    ) {
        let grid = MonthGrid::new(jan(17), week_start, &[], jan(17));
        assert_eq!(grid.month(), jan(1));
        assert_eq!(grid.days().first().unwrap().date, first);
        assert_eq!(grid.days().last().unwrap().date, last);
        assert_eq!(grid.weeks().count(), weeks);
        assert_eq!(grid.weekdays().next(), Some(week_start));
        assert!(grid.weeks().all(|week| week.len() == 7));
    }

    #[test]
    fn in_month_and_today() {
        let grid = MonthGrid::new(jan(1), Weekday::Sun, &[], jan(9));
        assert!(!grid.day(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()).unwrap().in_month);
        assert!(grid.day(jan(31)).unwrap().in_month);
        assert!(grid.day(jan(9)).unwrap().is_today);
        assert_eq!(grid.days().iter().filter(|d| d.is_today).count(), 1);
    }

    #[test]
    fn end_is_exclusive() {
        let holiday = all_day("holiday", 15, 1);
        assert!(occupies(&holiday, jan(15)));
        assert!(!occupies(&holiday, jan(16)));

        let trip = all_day("trip", 15, 3);
        assert!([15, 16, 17].iter().all(|d| occupies(&trip, jan(*d))));
        assert!(!occupies(&trip, jan(18)));

        let overnight = event("overnight", (15, 22, 0), (16, 2, 0));
        assert!(occupies(&overnight, jan(15)));
        assert!(occupies(&overnight, jan(16)));

        let instant = event("instant", (15, 0, 0), (15, 0, 0));
        assert!(occupies(&instant, jan(15)));
        assert!(!occupies(&instant, jan(14)));
    }

    #[test]
    fn cell_order_and_overflow() {
        let events = vec![
            event("late", (10, 18, 0), (10, 19, 0)),
            event("early", (10, 8, 0), (10, 9, 0)),
            all_day("allday", 10, 1),
            event("noon", (10, 12, 0), (10, 13, 0)),
            event("evening", (10, 20, 0), (10, 21, 0)),
            event("night", (10, 22, 0), (10, 23, 0)),
        ];
        let grid = MonthGrid::new(jan(1), Weekday::Mon, &events, jan(1));
        let cell = grid.day(jan(10)).unwrap();

        let order: Vec<&str> = cell.events.iter().map(|e| e.uid.as_str()).collect();
        similar_asserts::assert_eq!(
            order,
            vec!["allday", "early", "noon", "late", "evening", "night"]
        );
        assert_eq!(cell.visible().len(), MAX_VISIBLE_EVENTS);
        assert_eq!(cell.hidden(), 2);
        assert!(grid.day(jan(11)).unwrap().events.is_empty());
    }
}
