//! Gap-based clustering of flagged dates into candidate ranges.
//!
//! Dates are split wherever the gap to the next flagged date is strictly
//! larger than the median gap. Groups holding a single date are dropped when
//! there is more than one group; a lone group is always kept, even a single
//! date, and is widened later by the range adjuster.

use crate::ranges::DateRange;
use crate::stats::median;
use chrono::NaiveDate;

/// Whole-day gaps between consecutive dates.
pub fn day_gaps(dates: &[NaiveDate]) -> Vec<i64> {
    dates.windows(2).map(|w| (w[1] - w[0]).num_days()).collect()
}

/// Indices `i` such that the gap between `dates[i]` and `dates[i + 1]`
/// exceeds the median gap.
pub fn split_points(gaps: &[i64]) -> Vec<usize> {
    if gaps.is_empty() {
        return Vec::new();
    }
    let as_f64: Vec<f64> = gaps.iter().map(|&g| g as f64).collect();
    let median_gap = median(&as_f64);
    as_f64
        .iter()
        .enumerate()
        .filter(|(_, &g)| g > median_gap)
        .map(|(i, _)| i)
        .collect()
}

/// Cluster chronologically sorted flagged dates into candidate ranges.
///
/// Output is in chronological order. Empty input yields no ranges.
pub fn group_dates(dates: &[NaiveDate]) -> Vec<DateRange> {
    let (first, last) = match (dates.first(), dates.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Vec::new(),
    };

    let splits = split_points(&day_gaps(dates));
    if splits.is_empty() {
        return vec![DateRange::new(first, last)];
    }

    let mut ranges = Vec::with_capacity(splits.len() + 1);
    let mut group_start = 0;
    for end in splits.into_iter().chain(std::iter::once(dates.len() - 1)) {
        // Singleton groups carry no span and are not reported.
        if end != group_start {
            ranges.push(DateRange::new(dates[group_start], dates[end]));
        }
        group_start = end + 1;
    }

    log::debug!(
        "Grouped {} flagged dates into {} candidate ranges",
        dates.len(),
        ranges.len()
    );
    ranges
}
