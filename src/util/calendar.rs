use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike};

/// Local hour before which a Monday still belongs to the previous week.
pub const TRANSITION_HOUR: u32 = 4;

/// English day names, Monday first (index = days from Monday).
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Format a date as a basket key (`YYYY-MM-DD`).
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse a basket key back into a date. Shape-valid keys that are not real
/// dates (`2024-13-40`) yield None.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()
}

/// Monday of the week that `now` belongs to.
///
/// Until `transition_hour` on a Monday the previous week is still current,
/// so late-night work before the cut-off lands in the week it started in.
pub fn current_week_monday_at(now: NaiveDateTime, transition_hour: u32) -> NaiveDate {
    let today = now.date();
    let days_from_monday = today.weekday().num_days_from_monday() as i64;
    let monday = today - Duration::days(days_from_monday);
    if days_from_monday == 0 && now.hour() < transition_hour {
        monday - Duration::days(7)
    } else {
        monday
    }
}

/// Monday of the current week in local time.
pub fn current_week_monday() -> NaiveDate {
    current_week_monday_at(Local::now().naive_local(), TRANSITION_HOUR)
}

/// The 7 date keys (Monday..Sunday) of the current week.
pub fn current_week_dates() -> [String; 7] {
    Week::current().keys()
}

/// ISO `(week, year)` of the week containing `key`, computed from that
/// week's Monday so all seven days share one number.
pub fn week_number(key: &str) -> Option<(u32, i32)> {
    parse_date_key(key).map(|d| Week::containing(d).iso_week())
}

/// Day name of a date key (`2026-01-19` -> `Monday`).
pub fn date_to_day_name(key: &str) -> Option<&'static str> {
    parse_date_key(key).map(|d| DAY_NAMES[d.weekday().num_days_from_monday() as usize])
}

/// One Monday-to-Sunday week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Week {
    monday: NaiveDate,
}

impl Week {
    /// The week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as i64;
        Week {
            monday: date - Duration::days(offset),
        }
    }

    /// The current week, honouring the default transition hour.
    pub fn current() -> Self {
        Self::current_at(Local::now().naive_local(), TRANSITION_HOUR)
    }

    pub fn current_at(now: NaiveDateTime, transition_hour: u32) -> Self {
        Week {
            monday: current_week_monday_at(now, transition_hour),
        }
    }

    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    pub fn previous(&self) -> Self {
        Week {
            monday: self.monday - Duration::days(7),
        }
    }

    pub fn next(&self) -> Self {
        Week {
            monday: self.monday + Duration::days(7),
        }
    }

    pub fn dates(&self) -> [NaiveDate; 7] {
        std::array::from_fn(|i| self.monday + Duration::days(i as i64))
    }

    /// Basket keys for Monday..Sunday.
    pub fn keys(&self) -> [String; 7] {
        self.dates().map(date_key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        parse_date_key(key).is_some_and(|d| Week::containing(d) == *self)
    }

    /// Date key for an English day name within this week.
    pub fn key_for_day(&self, day_name: &str) -> Option<String> {
        let offset = DAY_NAMES
            .iter()
            .position(|d| d.eq_ignore_ascii_case(day_name))?;
        Some(date_key(self.monday + Duration::days(offset as i64)))
    }

    /// ISO `(week, year)` of this week.
    pub fn iso_week(&self) -> (u32, i32) {
        let iso = self.monday.iso_week();
        (iso.week(), iso.year())
    }

    /// Short label like `W: 04/26`.
    pub fn header_label(&self) -> String {
        let (week, year) = self.iso_week();
        format!("W: {:02}/{:02}", week, year.rem_euclid(100))
    }
}
