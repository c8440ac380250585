//! Daily change calculation.

use crate::errors::{AnomalyDetectionError, AnomalyResult};
use crate::series::PriceSeries;
use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a daily change is derived from two consecutive values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChangeKind {
    /// `price[i+1] - price[i]`
    #[default]
    Absolute,
    /// `(price[i+1] / price[i] - 1) * 100`
    Percent,
}

/// A change attributed to the later of the two days it spans.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DailyChange {
    /// Date of the later observation
    pub date: NaiveDate,
    /// Size of the move
    pub value: f64,
}

/// Daily changes of a price series, one fewer than the prices.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChangeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ChangeSeries {
    /// Dates the changes are attributed to.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Change values, aligned with [`dates`](Self::dates).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when there are no changes.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate changes as [`DailyChange`] values.
    pub fn iter(&self) -> impl Iterator<Item = DailyChange> + '_ {
        self.dates
            .iter()
            .zip(&self.values)
            .map(|(&date, &value)| DailyChange { date, value })
    }
}

/// Compute daily changes of a validated series.
pub fn daily_changes(series: &PriceSeries, kind: ChangeKind) -> AnomalyResult<ChangeSeries> {
    let points = series.points();
    let mut dates = Vec::with_capacity(points.len() - 1);
    let mut values = Vec::with_capacity(points.len() - 1);

    for (i, pair) in points.windows(2).enumerate() {
        let (prev, next) = (pair[0], pair[1]);
        let value = match kind {
            ChangeKind::Absolute => next.price - prev.price,
            ChangeKind::Percent => {
                if prev.price == 0.0 {
                    return Err(AnomalyDetectionError::ZeroBasePrice { index: i });
                }
                (next.price / prev.price - 1.0) * 100.0
            }
        };
        if !value.is_finite() {
            return Err(AnomalyDetectionError::NonFiniteValue {
                name: "daily change".to_string(),
                index: i,
                value,
            });
        }
        dates.push(next.date);
        values.push(value);
    }

    Ok(ChangeSeries { dates, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::RawSeries;
    use assert_approx_eq::assert_approx_eq;

    fn series(prices: Vec<f64>) -> PriceSeries {
        let dates: Vec<String> = (1..=prices.len()).map(|d| format!("2025-01-{:02}", d)).collect();
        RawSeries::new(dates, prices).validate().unwrap()
    }

    #[test]
    fn test_absolute_changes_attributed_to_later_day() {
        let changes = daily_changes(&series(vec![10.0, 12.0, 11.0]), ChangeKind::Absolute).unwrap();
        assert_eq!(changes.len(), 2);
        assert_approx_eq!(changes.values()[0], 2.0);
        assert_approx_eq!(changes.values()[1], -1.0);
        assert_eq!(changes.dates()[0], NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(changes.dates()[1], NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
    }

    #[test]
    fn test_percent_changes() {
        let changes = daily_changes(&series(vec![100.0, 110.0, 99.0]), ChangeKind::Percent).unwrap();
        assert_approx_eq!(changes.values()[0], 10.0, 1e-9);
        assert_approx_eq!(changes.values()[1], -10.0, 1e-9);
    }

    #[test]
    fn test_percent_change_from_zero_fails() {
        let result = daily_changes(&series(vec![1.0, 0.0, 2.0]), ChangeKind::Percent);
        assert!(matches!(result, Err(AnomalyDetectionError::ZeroBasePrice { index: 1 })));
    }

    #[test]
    fn test_two_points_give_one_change() {
        let changes = daily_changes(&series(vec![5.0, 7.0]), ChangeKind::Absolute).unwrap();
        let all: Vec<DailyChange> = changes.iter().collect();
        assert_eq!(all.len(), 1);
        assert_approx_eq!(all[0].value, 2.0);
    }
}
