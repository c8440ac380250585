//! Input data model and series validation.
//!
//! [`RawSeries`] mirrors the wire shape handed over by the surrounding
//! application (`{"time": [...], "price": [...]}`); [`PriceSeries`] is the
//! validated form every later stage consumes. Construction of a
//! `PriceSeries` is the only way past validation.

use crate::errors::{validate_data_length, AnomalyDetectionError, AnomalyResult};
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Minimum number of prices: one daily change needs two observations.
pub const MIN_PRICE_POINTS: usize = 2;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date, reading only the first ten characters so
/// full ISO timestamps are accepted too.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let head = value.get(..value.len().min(10))?;
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// A single dated observation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PricePoint {
    /// Calendar date of the observation
    pub date: NaiveDate,
    /// Observed value
    pub price: f64,
}

impl PricePoint {
    /// Create a new observation
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Unvalidated input in the two-array layout.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawSeries {
    /// Date strings, `YYYY-MM-DD`
    #[cfg_attr(feature = "serde", serde(default))]
    pub time: Option<Vec<String>>,
    /// Values aligned with `time`
    #[cfg_attr(feature = "serde", serde(default))]
    pub price: Option<Vec<f64>>,
}

impl RawSeries {
    /// Build from parallel date and price sequences.
    pub fn new<S: Into<String>>(time: impl IntoIterator<Item = S>, price: Vec<f64>) -> Self {
        Self {
            time: Some(time.into_iter().map(Into::into).collect()),
            price: Some(price),
        }
    }

    /// Adapt a date-keyed mapping (`{"2025-01-01": [0.05], ...}`) into the
    /// two-array layout.
    ///
    /// Keys are ordered chronologically and the first element of each list
    /// is used. A key with an empty list is rejected.
    pub fn from_date_map(map: &BTreeMap<String, Vec<f64>>) -> AnomalyResult<Self> {
        let mut entries = Vec::with_capacity(map.len());
        for (index, (key, values)) in map.iter().enumerate() {
            let date = parse_date(key).ok_or_else(|| AnomalyDetectionError::InvalidDate {
                index,
                value: key.clone(),
            })?;
            let value = values
                .first()
                .copied()
                .ok_or_else(|| AnomalyDetectionError::MissingField {
                    field: format!("value for {}", key),
                })?;
            entries.push((date, value));
        }
        // String order already matches date order for canonical keys, but
        // timestamps with suffixes may not.
        entries.sort_by_key(|(date, _)| *date);

        Ok(Self {
            time: Some(entries.iter().map(|(d, _)| format_date(*d)).collect()),
            price: Some(entries.into_iter().map(|(_, v)| v).collect()),
        })
    }

    /// Validate into a [`PriceSeries`].
    pub fn validate(&self) -> AnomalyResult<PriceSeries> {
        let time = self
            .time
            .as_ref()
            .ok_or_else(|| AnomalyDetectionError::MissingField {
                field: "time".to_string(),
            })?;
        let price = self
            .price
            .as_ref()
            .ok_or_else(|| AnomalyDetectionError::MissingField {
                field: "price".to_string(),
            })?;

        if time.len() != price.len() {
            return Err(AnomalyDetectionError::LengthMismatch {
                dates: time.len(),
                prices: price.len(),
            });
        }

        let mut points = Vec::with_capacity(price.len());
        for (index, (raw_date, &value)) in time.iter().zip(price.iter()).enumerate() {
            let date = parse_date(raw_date).ok_or_else(|| AnomalyDetectionError::InvalidDate {
                index,
                value: raw_date.clone(),
            })?;
            points.push(PricePoint::new(date, value));
        }

        PriceSeries::new(points)
    }
}

impl TryFrom<RawSeries> for PriceSeries {
    type Error = AnomalyDetectionError;

    fn try_from(raw: RawSeries) -> AnomalyResult<Self> {
        raw.validate()
    }
}

/// Validated price series: at least two points, strictly increasing dates,
/// finite values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Validate and wrap a sequence of observations.
    pub fn new(points: Vec<PricePoint>) -> AnomalyResult<Self> {
        validate_data_length(&points, MIN_PRICE_POINTS)?;

        if let Some(index) = points.iter().position(|p| !p.price.is_finite()) {
            return Err(AnomalyDetectionError::NonFiniteValue {
                name: "price".to_string(),
                index,
                value: points[index].price,
            });
        }

        if let Some(offset) = points.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(AnomalyDetectionError::UnorderedDates {
                index: offset + 1,
                previous: format_date(points[offset].date),
                current: format_date(points[offset + 1].date),
            });
        }

        Ok(Self { points })
    }

    /// Build from parallel date and price slices.
    pub fn from_parts(dates: &[NaiveDate], prices: &[f64]) -> AnomalyResult<Self> {
        if dates.len() != prices.len() {
            return Err(AnomalyDetectionError::LengthMismatch {
                dates: dates.len(),
                prices: prices.len(),
            });
        }
        Self::new(
            dates
                .iter()
                .zip(prices)
                .map(|(&date, &price)| PricePoint::new(date, price))
                .collect(),
        )
    }

    /// Observations in chronological order.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a validated series.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Latest date in the series, the bound no range may extend past.
    pub fn max_date(&self) -> NaiveDate {
        // Validation guarantees at least two strictly increasing points.
        self.points[self.points.len() - 1].date
    }

    /// Dates in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Prices in order.
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }
}
