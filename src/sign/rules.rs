//! Structured restriction rules extracted from sign text.
//!
//! A photographed sign yields an ordered sequence of these rules (order of
//! appearance in the recognized text). Rules are immutable once constructed.

use chrono::{NaiveTime, Weekday};
use std::fmt;

/// A set of weekdays, stored as a bitmask (bit 0 = Monday .. bit 6 = Sunday).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DaySet(u8);

const ALL_DAYS: u8 = 0x7F;

impl DaySet {
    pub fn empty() -> Self {
        DaySet(0)
    }

    /// Every day of the week (signs with no day qualifier apply daily).
    pub fn all() -> Self {
        DaySet(ALL_DAYS)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Inclusive range of days, wrapping past Sunday if needed
    /// (e.g. SAT-MON covers Sat, Sun, Mon).
    pub fn range(start: Weekday, end: Weekday) -> Self {
        let mut set = DaySet::empty();
        let mut day = start;
        loop {
            set.insert(day);
            if day == end {
                break;
            }
            day = day.succ();
        }
        set
    }
}

impl FromIterator<Weekday> for DaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = DaySet::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Display for DaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == ALL_DAYS {
            return write!(f, "every day");
        }
        const NAMES: [(Weekday, &str); 7] = [
            (Weekday::Mon, "Mon"),
            (Weekday::Tue, "Tue"),
            (Weekday::Wed, "Wed"),
            (Weekday::Thu, "Thu"),
            (Weekday::Fri, "Fri"),
            (Weekday::Sat, "Sat"),
            (Weekday::Sun, "Sun"),
        ];
        let mut first = true;
        for (day, name) in NAMES {
            if self.contains(day) {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A time-of-day range. `start == end` denotes the full day; `start > end`
/// denotes a window that wraps past midnight (e.g. 10PM-6AM).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// The whole day, used for signs like "NO PARKING ANY TIME".
    pub fn full_day() -> Self {
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        Self {
            start: midnight,
            end: midnight,
        }
    }

    pub fn is_full_day(&self) -> bool {
        self.start == self.end
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    /// Whether `t` falls inside the window, treating the window as starting
    /// on the day under consideration. For wrapping windows this covers only
    /// the pre-midnight half; callers check the post-midnight half against
    /// the previous day (see `RestrictionRule::applies_at`).
    pub fn contains_from_start(&self, t: NaiveTime) -> bool {
        if self.is_full_day() {
            true
        } else if self.wraps_midnight() {
            t >= self.start
        } else {
            t >= self.start && t < self.end
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_full_day() {
            write!(f, "any time")
        } else {
            write!(
                f,
                "{}-{}",
                self.start.format("%-I:%M%p"),
                self.end.format("%-I:%M%p")
            )
        }
    }
}

/// One structured constraint extracted from sign text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestrictionRule {
    /// Maximum stay, e.g. "2 HR PARKING".
    TimeLimit { minutes: u32 },
    /// Parking reserved for permit holders of a zone, e.g. "PERMIT ZONE 4".
    PermitOnly { zone: String },
    /// Hard prohibition window, e.g. "NO PARKING 8AM-6PM MON-FRI".
    NoParkingWindow { days: DaySet, window: TimeWindow },
    /// Street-cleaning prohibition window.
    StreetCleaning { days: DaySet, window: TimeWindow },
    /// Text that matched no known phrasing; kept for the human fallback.
    Unknown { fragment: String },
}

impl RestrictionRule {
    /// Whether this rule carries actionable meaning (anything but `Unknown`).
    pub fn is_decisive(&self) -> bool {
        !matches!(self, RestrictionRule::Unknown { .. })
    }

    pub fn is_prohibition(&self) -> bool {
        matches!(
            self,
            RestrictionRule::NoParkingWindow { .. } | RestrictionRule::StreetCleaning { .. }
        )
    }

    /// Whether a prohibition rule is in force at the given weekday and time.
    ///
    /// Wrapping windows are anchored to their start day: "MON 10PM-6AM"
    /// covers Monday night and Tuesday's early morning.
    pub fn applies_at(&self, weekday: Weekday, time: NaiveTime) -> bool {
        let (days, window) = match self {
            RestrictionRule::NoParkingWindow { days, window } => (days, window),
            RestrictionRule::StreetCleaning { days, window } => (days, window),
            _ => return false,
        };

        if days.contains(weekday) && window.contains_from_start(time) {
            return true;
        }
        // Post-midnight half of a wrapping window belongs to the previous day.
        if window.wraps_midnight() && days.contains(weekday.pred()) && time < window.end {
            return true;
        }
        false
    }
}

impl fmt::Display for RestrictionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestrictionRule::TimeLimit { minutes } => {
                if minutes % 60 == 0 {
                    write!(f, "{} hour limit", minutes / 60)
                } else {
                    write!(f, "{} minute limit", minutes)
                }
            }
            RestrictionRule::PermitOnly { zone } if zone.is_empty() => {
                write!(f, "permit required")
            }
            RestrictionRule::PermitOnly { zone } => write!(f, "permit zone {} only", zone),
            RestrictionRule::NoParkingWindow { days, window } => {
                write!(f, "no parking {} {}", days, window)
            }
            RestrictionRule::StreetCleaning { days, window } => {
                write!(f, "street cleaning {} {}", days, window)
            }
            RestrictionRule::Unknown { fragment } => write!(f, "unrecognized: \"{}\"", fragment),
        }
    }
}
