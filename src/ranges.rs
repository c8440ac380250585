//! Date ranges, minimum-span adjustment and output formatting.

use crate::series::format_date;
use chrono::{Duration, NaiveDate};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inclusive date interval with `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, swapping the endpoints if given in reverse order.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// A range covering a single day.
    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// First day.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// `end − start` in whole days.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// True when start and end coincide.
    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    /// Both endpoints as `YYYY-MM-DD`.
    pub fn format(&self) -> FormattedRange {
        FormattedRange(format_date(self.start), format_date(self.end))
    }
}

/// `(start, end)` pair of `YYYY-MM-DD` strings. Serialises as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormattedRange(pub String, pub String);

impl FormattedRange {
    /// Start date string.
    pub fn start(&self) -> &str {
        &self.0
    }

    /// End date string.
    pub fn end(&self) -> &str {
        &self.1
    }
}

impl From<FormattedRange> for (String, String) {
    fn from(range: FormattedRange) -> Self {
        (range.0, range.1)
    }
}

/// Widen single-day ranges to two days without leaving the data.
///
/// A lone day before `max_date` extends forward by one day; a lone day on
/// `max_date` extends backward instead.
pub fn ensure_minimum_span(range: DateRange, max_date: NaiveDate) -> DateRange {
    if !range.is_single_day() {
        return range;
    }
    let one_day = Duration::days(1);
    if range.start < max_date {
        DateRange {
            start: range.start,
            end: range.start + one_day,
        }
    } else {
        DateRange {
            start: range.start - one_day,
            end: range.end,
        }
    }
}

/// Apply [`ensure_minimum_span`] to every range, then order by descending
/// span. The sort is stable, so equal spans keep their incoming order.
pub fn adjust_ranges(ranges: Vec<DateRange>, max_date: NaiveDate) -> Vec<DateRange> {
    let mut adjusted: Vec<DateRange> = ranges
        .into_iter()
        .map(|r| ensure_minimum_span(r, max_date))
        .collect();
    adjusted.sort_by(|a, b| b.span_days().cmp(&a.span_days()));
    adjusted
}

/// Format ranges for output, preserving order.
pub fn format_ranges(ranges: &[DateRange]) -> Vec<FormattedRange> {
    ranges.iter().map(DateRange::format).collect()
}
