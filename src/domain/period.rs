use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger dates are stored as `YYYY-MM-DD` text and compared as strings,
/// so only four-digit years keep lexical and calendar order in step.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// True when `date` falls in a year the store can order correctly.
pub fn is_storable_date(date: NaiveDate) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&date.year())
}

/// A calendar month, covering `[first day of month, first day of next month)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMonthWindow")]
pub struct MonthWindow {
    month: u32,
    year: i32,
}

#[derive(Deserialize)]
struct RawMonthWindow {
    month: u32,
    year: i32,
}

impl TryFrom<RawMonthWindow> for MonthWindow {
    type Error = String;

    fn try_from(raw: RawMonthWindow) -> Result<Self, Self::Error> {
        MonthWindow::new(raw.month, raw.year)
            .ok_or_else(|| format!("invalid month {}/{}", raw.month, raw.year))
    }
}

impl MonthWindow {
    /// Returns `None` unless `month` is in 1..=12 and `year` in 1..=9999.
    pub fn new(month: u32, year: i32) -> Option<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self { month, year })
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            year: date.year(),
        }
    }

    /// The current month in the server's local time zone.
    /// Presentation code resolves this; aggregation always takes a window.
    pub fn current_local() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// First day of the month (inclusive bound).
    pub fn start(&self) -> NaiveDate {
        self.start_opt().unwrap_or(NaiveDate::MIN)
    }

    /// First day of the following month (exclusive bound).
    pub fn end(&self) -> NaiveDate {
        self.next().start_opt().unwrap_or(NaiveDate::MAX)
    }

    /// Last day of the month (inclusive bound).
    pub fn last_day(&self) -> NaiveDate {
        self.end().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date < self.end()
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                month: 1,
                year: self.year + 1,
            }
        } else {
            Self {
                month: self.month + 1,
                year: self.year,
            }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                month: 12,
                year: self.year - 1,
            }
        } else {
            Self {
                month: self.month - 1,
                year: self.year,
            }
        }
    }

    fn start_opt(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for MonthWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
