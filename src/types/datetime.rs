use chrono::{DateTime, MappedLocalTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use derive_more::From;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::str::FromStr;

use crate::{
    parser::{ContentLine, ContentLineParams, ParserOptions},
    types::Tz,
};

lazy_static! {
    static ref RE_DATE: Regex = Regex::new(r"^([0-9]{4})([0-9]{2})([0-9]{2})$").unwrap();
    static ref RE_DATETIME: Regex =
        Regex::new(r"^([0-9]{4})([0-9]{2})([0-9]{2})T([0-9]{2})([0-9]{2})([0-9]{2})(Z)?$").unwrap();
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalDateTimeError {
    #[error("Invalid date or date-time: {0}")]
    InvalidFormat(String),
    #[error("Date out of range: {0}")]
    InvalidDate(String),
    #[error("Time out of range: {0}")]
    InvalidTime(String),
    #[error("Local time {0} does not exist in {1}")]
    NonexistentLocalTime(NaiveDateTime, String),
}

/// A decoded ICS date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalDateTime {
    /// `Z` suffixed value.
    Utc(NaiveDateTime),
    /// Wall-clock value without timezone, read on the caller's clock.
    Floating(NaiveDateTime),
    /// Wall-clock value in the zone named by its `TZID` parameter.
    Zoned(NaiveDateTime, chrono_tz::Tz),
}

impl CalDateTime {
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            Self::Utc(naive) | Self::Floating(naive) | Self::Zoned(naive, _) => *naive,
        }
    }

    /// The instant this value denotes, expressed in `tz`.
    pub fn resolve(&self, tz: &Tz) -> Result<DateTime<Tz>, CalDateTimeError> {
        match self {
            Self::Utc(naive) => Ok(Utc.from_utc_datetime(naive).with_timezone(tz)),
            Self::Floating(naive) => from_wall_clock(tz, *naive),
            Self::Zoned(naive, zone) => {
                Ok(from_wall_clock(&Tz::Olson(*zone), *naive)?.with_timezone(tz))
            }
        }
    }
}

/// A `DTSTART`/`DTEND` value: either a whole date or a date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, From)]
pub enum CalDateOrDateTime {
    Date(NaiveDate),
    DateTime(CalDateTime),
}

/// Map a wall-clock time of `tz` to an instant.
///
/// Ambiguous times (DST fall back) take the earliest instant, times inside a DST gap are
/// pushed forward by one hour.
fn from_wall_clock(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>, CalDateTimeError> {
    match tz.from_local_datetime(&naive) {
        MappedLocalTime::Single(dt) => Ok(dt),
        MappedLocalTime::Ambiguous(earliest, _) => Ok(earliest),
        MappedLocalTime::None => tz
            .from_local_datetime(&(naive + TimeDelta::hours(1)))
            .earliest()
            .ok_or_else(|| CalDateTimeError::NonexistentLocalTime(naive, tz.name().to_owned())),
    }
}

fn capture<T: FromStr>(captures: &Captures, idx: usize, value: &str) -> Result<T, CalDateTimeError> {
    captures
        .get(idx)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| CalDateTimeError::InvalidFormat(value.to_owned()))
}

fn parse_date(captures: &Captures, value: &str) -> Result<NaiveDate, CalDateTimeError> {
    NaiveDate::from_ymd_opt(
        capture(captures, 1, value)?,
        capture(captures, 2, value)?,
        capture(captures, 3, value)?,
    )
    .ok_or_else(|| CalDateTimeError::InvalidDate(value.to_owned()))
}

impl CalDateOrDateTime {
    /// Decode a raw value, its parameters already split off.
    ///
    /// - `YYYYMMDD` is a date.
    /// - `YYYYMMDDTHHMMSS` is a floating date-time, or a zoned one when `tzid` names a known
    ///   IANA zone.
    /// - `YYYYMMDDTHHMMSSZ` is a UTC date-time.
    ///
    /// With `VALUE=DATE`, a date-time shaped value is reduced to its date.
    pub fn parse(
        value: &str,
        params: &ContentLineParams,
        resolve_tzid: bool,
    ) -> Result<Self, CalDateTimeError> {
        let value = value.trim();

        if let Some(captures) = RE_DATE.captures(value) {
            return Ok(Self::Date(parse_date(&captures, value)?));
        }

        let Some(captures) = RE_DATETIME.captures(value) else {
            return Err(CalDateTimeError::InvalidFormat(value.to_owned()));
        };
        let date = parse_date(&captures, value)?;
        if params
            .get_value_type()
            .is_some_and(|value_type| value_type.eq_ignore_ascii_case("DATE"))
        {
            return Ok(Self::Date(date));
        }

        let time = NaiveTime::from_hms_opt(
            capture(&captures, 4, value)?,
            capture(&captures, 5, value)?,
            capture(&captures, 6, value)?,
        )
        .ok_or_else(|| CalDateTimeError::InvalidTime(value.to_owned()))?;
        let naive = date.and_time(time);

        if captures.get(7).is_some() {
            return Ok(CalDateTime::Utc(naive).into());
        }
        let zone = params
            .get_tzid()
            .filter(|_| resolve_tzid)
            .and_then(Tz::from_tzid);
        Ok(match zone {
            Some(zone) => CalDateTime::Zoned(naive, zone),
            None => CalDateTime::Floating(naive),
        }
        .into())
    }

    pub fn parse_prop(prop: &ContentLine, options: &ParserOptions) -> Result<Self, CalDateTimeError> {
        Self::parse(&prop.value, &prop.params, options.resolve_tzid)
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// The instant this value denotes, expressed in `tz`. Dates map to their local midnight.
    pub fn resolve(&self, tz: &Tz) -> Result<DateTime<Tz>, CalDateTimeError> {
        match self {
            Self::Date(date) => from_wall_clock(tz, date.and_time(NaiveTime::MIN)),
            Self::DateTime(datetime) => datetime.resolve(tz),
        }
    }

    /// End used when `DTEND` is missing or unusable: the next local midnight for dates,
    /// one hour after `start` otherwise.
    pub fn default_end(
        &self,
        start: &DateTime<Tz>,
        tz: &Tz,
    ) -> Result<DateTime<Tz>, CalDateTimeError> {
        match self {
            Self::Date(date) => {
                let next = date
                    .succ_opt()
                    .ok_or_else(|| CalDateTimeError::InvalidDate(date.to_string()))?;
                Self::Date(next).resolve(tz)
            }
            Self::DateTime(_) => Ok(*start + TimeDelta::hours(1)),
        }
    }
}
