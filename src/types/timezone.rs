use chrono::{FixedOffset, Local, MappedLocalTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use derive_more::{Display, From};
use std::str::FromStr;

/// The timezone decoded events are expressed in.
///
/// `Local` follows the system timezone, `Olson` pins an IANA zone (handy for servers and
/// tests that must not depend on the machine they run on).
#[derive(Debug, Clone, Copy, Default, From, PartialEq, Eq)]
pub enum Tz {
    #[default]
    Local,
    Olson(chrono_tz::Tz),
}

impl Tz {
    pub const UTC: Self = Self::Olson(chrono_tz::UTC);

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Local => "Local",
            Self::Olson(tz) => tz.name(),
        }
    }

    /// The zone named by an ICS `TZID` parameter, if it is a known IANA name.
    ///
    /// A leading `/` (globally unique TZID prefix) is ignored.
    pub fn from_tzid(tzid: &str) -> Option<chrono_tz::Tz> {
        chrono_tz::Tz::from_str(tzid.trim().trim_start_matches('/')).ok()
    }
}

impl FromStr for Tz {
    type Err = chrono_tz::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        chrono_tz::Tz::from_str(s).map(Self::Olson)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CalTimezoneOffset {
    Local(FixedOffset),
    Olson(chrono_tz::TzOffset),
}

impl chrono::Offset for CalTimezoneOffset {
    fn fix(&self) -> FixedOffset {
        match self {
            Self::Local(offset) => *offset,
            Self::Olson(olson) => olson.fix(),
        }
    }
}

impl TimeZone for Tz {
    type Offset = CalTimezoneOffset;

    fn from_offset(offset: &Self::Offset) -> Self {
        match offset {
            CalTimezoneOffset::Local(_) => Self::Local,
            CalTimezoneOffset::Olson(offset) => Self::Olson(chrono_tz::Tz::from_offset(offset)),
        }
    }

    #[cfg(not(tarpaulin_include))] // Only used by deprecated chrono::Date type
    fn offset_from_local_date(&self, local: &NaiveDate) -> MappedLocalTime<Self::Offset> {
        self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> MappedLocalTime<Self::Offset> {
        match self {
            Self::Local => Local
                .offset_from_local_datetime(local)
                .map(CalTimezoneOffset::Local),
            Self::Olson(tz) => tz
                .offset_from_local_datetime(local)
                .map(CalTimezoneOffset::Olson),
        }
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> Self::Offset {
        match self {
            Self::Local => CalTimezoneOffset::Local(Local.offset_from_utc_datetime(utc)),
            Self::Olson(tz) => CalTimezoneOffset::Olson(tz.offset_from_utc_datetime(utc)),
        }
    }

    #[cfg(not(tarpaulin_include))] // Only used by deprecated chrono::Date type
    fn offset_from_utc_date(&self, utc: &NaiveDate) -> Self::Offset {
        self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
    }
}
