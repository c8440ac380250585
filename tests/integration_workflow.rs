//! Integration tests for full detection workflows
//!
//! These tests run the public pipeline end to end on synthetic series whose
//! outcome is known in advance, and check the output contract: ranges are
//! non-empty on success, well-formed, ordered by span and reproducible.

use anomaly_ranges::{
    errors::AnomalyDetectionError, AnomalyRangeDetector, ChangeKind, DetectorConfig, ErrorKind,
    FormattedRange, PriceSeries, RawSeries,
};
use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;
use std::collections::BTreeMap;

fn consecutive_dates(n: usize) -> Vec<String> {
    let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    (0..n)
        .map(|i| (base + Duration::days(i as i64)).format("%Y-%m-%d").to_string())
        .collect()
}

fn raw(prices: Vec<f64>) -> RawSeries {
    RawSeries::new(consecutive_dates(prices.len()), prices)
}

/// Smooth oscillating prices with jumps at the given change indices.
fn calm_prices(n_changes: usize, jumps: &[(usize, f64)]) -> Vec<f64> {
    let mut prices = vec![100.0];
    for i in 0..n_changes {
        let step = jumps
            .iter()
            .find(|(at, _)| *at == i)
            .map_or((0.7 * i as f64).sin(), |(_, size)| *size);
        let last = prices[prices.len() - 1];
        prices.push(last + step);
    }
    prices
}

fn parse(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn assert_output_contract(ranges: &[FormattedRange], max_date: NaiveDate) {
    assert!(!ranges.is_empty(), "success must never be an empty list");
    let spans: Vec<i64> = ranges
        .iter()
        .map(|r| {
            let (start, end) = (parse(r.start()), parse(r.end()));
            assert!(end >= start, "range {:?} is reversed", r);
            assert!(end <= max_date, "range {:?} runs past the data", r);
            (end - start).num_days()
        })
        .collect();
    for pair in spans.windows(2) {
        assert!(pair[0] >= pair[1], "spans not ordered: {:?}", spans);
    }
    assert!(spans.iter().all(|&s| s >= 1));
}

/// Test scenario: two isolated shocks in an otherwise calm series
///
/// Only the two shock days pass both tests, so they form one cluster
/// spanning from the first shock to the second.
#[test]
fn test_two_shocks_form_one_range() {
    let prices = calm_prices(120, &[(40, 8.0), (90, 7.0)]);
    let dates = consecutive_dates(prices.len());
    let series = RawSeries::new(dates.clone(), prices).validate().unwrap();

    let detector = AnomalyRangeDetector::new();
    let report = detector.analyze(&series).unwrap();

    // Change i is attributed to price date i + 1.
    let first_shock = parse(&dates[41]);
    let second_shock = parse(&dates[91]);
    assert_eq!(report.classification.flagged_dates, vec![first_shock, second_shock]);

    let ranges = report.formatted();
    assert_eq!(ranges, vec![FormattedRange(dates[41].clone(), dates[91].clone())]);
    assert_output_contract(&ranges, series.max_date());
}

/// Test scenario: a single shock in the middle extends one day forward
#[test]
fn test_single_shock_extends_forward() {
    let prices = calm_prices(100, &[(50, -9.0)]);
    let dates = consecutive_dates(prices.len());
    let ranges = AnomalyRangeDetector::new().detect_raw(&RawSeries::new(dates.clone(), prices)).unwrap();

    assert_eq!(ranges, vec![FormattedRange(dates[51].clone(), dates[52].clone())]);
}

/// Test scenario: a shock on the last day never extends past the data
#[test]
fn test_shock_on_last_day_extends_backward() {
    let prices = calm_prices(100, &[(99, 10.0)]);
    let dates = consecutive_dates(prices.len());
    let ranges = AnomalyRangeDetector::new().detect_raw(&RawSeries::new(dates.clone(), prices)).unwrap();

    assert_eq!(ranges, vec![FormattedRange(dates[99].clone(), dates[100].clone())]);
}

/// Test scenario: noisy random walk with volatility bursts
///
/// Exact membership depends on the fitted volatility path; the output
/// contract must hold either way.
#[test]
fn test_random_walk_with_bursts_satisfies_contract() {
    let mut rng = ChaCha20Rng::seed_from_u64(42);
    let mut prices = vec![250.0];
    for i in 0..400 {
        let scale = if (150..155).contains(&i) || (300..303).contains(&i) { 6.0 } else { 1.0 };
        let shock: f64 = rng.sample(StandardNormal);
        let last = prices[prices.len() - 1];
        prices.push(last + scale * shock);
    }
    let series = raw(prices).validate().unwrap();

    match AnomalyRangeDetector::new().detect(&series) {
        Ok(ranges) => assert_output_contract(&ranges, series.max_date()),
        Err(e) => assert_eq!(e.kind(), ErrorKind::NoAnomaly, "unexpected failure: {}", e),
    }
}

/// Test scenario: repeated runs on the same input
#[test]
fn test_detection_is_idempotent() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let mut prices = vec![50.0];
    for i in 0..250 {
        let z: f64 = rng.sample(StandardNormal);
        let jump = if i == 120 { 12.0 } else { 0.0 };
        let last = prices[prices.len() - 1];
        prices.push(last + z + jump);
    }
    let raw = raw(prices);
    let detector = AnomalyRangeDetector::new();

    let first = detector.detect_raw(&raw);
    let second = detector.detect_raw(&raw);
    assert_eq!(first, second);

    let a = detector.analyze(&raw.validate().unwrap());
    let b = detector.analyze(&raw.validate().unwrap());
    assert_eq!(a, b);
}

/// Scenario A: seven small values read as prices
///
/// No change sits more than 1.96 standard deviations from the mean of six
/// changes, so the unconditional test cannot fire.
#[test]
fn test_small_sample_reports_no_findings() {
    let raw = raw(vec![0.05, 0.02, 0.10, 0.03, -0.04, 0.01, 0.07]);
    let err = AnomalyRangeDetector::new().detect_raw(&raw).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoAnomaly);
    assert!(matches!(err, AnomalyDetectionError::NoAnomalies { observations: 6 }));
}

/// Scenario B: strictly linear prices have zero-variance changes
#[test]
fn test_linear_series_is_a_model_fit_error() {
    let prices: Vec<f64> = (0..60).map(|i| 10.0 + 0.5 * i as f64).collect();
    let err = AnomalyRangeDetector::new().detect_raw(&raw(prices)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelFit);
    assert!(matches!(err, AnomalyDetectionError::DegenerateVariance { .. }));
}

/// Scenario C: smooth, low-amplitude walk without outliers
#[test]
fn test_smooth_series_reports_no_findings() {
    let err = AnomalyRangeDetector::new().detect_raw(&raw(calm_prices(150, &[]))).unwrap_err();
    assert!(err.is_no_findings());
}

/// Scenario D: exactly two prices give one change and nothing to fit
#[test]
fn test_two_points_is_a_model_fit_error() {
    let err = AnomalyRangeDetector::new().detect_raw(&raw(vec![100.0, 101.0])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelFit);
}

/// Test scenario: percentage changes on a price level series
#[test]
fn test_percent_changes() {
    let prices = calm_prices(120, &[(60, 15.0)]);
    let dates = consecutive_dates(prices.len());
    let config = DetectorConfig::standard().with_change_kind(ChangeKind::Percent);
    let detector = AnomalyRangeDetector::with_config(config).unwrap();

    let series = RawSeries::new(dates.clone(), prices).validate().unwrap();
    let report = detector.analyze(&series).unwrap();
    assert!(report.classification.flagged_dates.contains(&parse(&dates[61])));
    assert_output_contract(&report.formatted(), series.max_date());
}

/// Test scenario: a stricter significance level never flags more days
#[test]
fn test_conservative_config_flags_subset() {
    let mut rng = ChaCha20Rng::seed_from_u64(2024);
    let mut prices = vec![80.0];
    for i in 0..300 {
        let z: f64 = rng.sample(StandardNormal);
        let jump = if i % 97 == 50 { 9.0 } else { 0.0 };
        let last = prices[prices.len() - 1];
        prices.push(last + z + jump);
    }
    let series = raw(prices).validate().unwrap();

    let standard = AnomalyRangeDetector::new().analyze(&series).unwrap();
    let conservative = AnomalyRangeDetector::with_config(DetectorConfig::conservative())
        .unwrap()
        .analyze(&series);

    if let Ok(conservative) = conservative {
        for date in &conservative.classification.flagged_dates {
            assert!(standard.classification.flagged_dates.contains(date));
        }
    }
}

/// Test scenario: caller holds a date-keyed mapping instead of two arrays
#[test]
fn test_date_map_input() {
    let prices = calm_prices(80, &[(30, 7.5)]);
    let dates = consecutive_dates(prices.len());
    let map: BTreeMap<String, Vec<f64>> = dates
        .iter()
        .cloned()
        .zip(prices.iter().map(|&p| vec![p]))
        .collect();

    let from_map = RawSeries::from_date_map(&map).unwrap();
    let direct = RawSeries::new(dates, prices);
    let detector = AnomalyRangeDetector::new();
    assert_eq!(detector.detect_raw(&from_map), detector.detect_raw(&direct));
}

/// Test scenario: series built from typed dates
#[test]
fn test_typed_series_matches_wire_series() {
    let prices = calm_prices(90, &[(45, 8.0)]);
    let strings = consecutive_dates(prices.len());
    let dates: Vec<NaiveDate> = strings.iter().map(|s| parse(s)).collect();

    let typed = PriceSeries::from_parts(&dates, &prices).unwrap();
    let wire = RawSeries::new(strings, prices).validate().unwrap();
    assert_eq!(typed, wire);
}

#[cfg(feature = "serde")]
mod wire_format {
    use super::*;

    #[test]
    fn test_json_round_trip_through_wire_shape() {
        let prices = calm_prices(100, &[(50, -9.0)]);
        let dates = consecutive_dates(prices.len());
        let json = serde_json::json!({ "time": &dates, "price": prices });

        let raw: RawSeries = serde_json::from_value(json).unwrap();
        let ranges = AnomalyRangeDetector::new().detect_raw(&raw).unwrap();

        let output = serde_json::to_value(&ranges).unwrap();
        assert_eq!(output, serde_json::json!([[dates[51], dates[52]]]));
    }

    #[test]
    fn test_missing_key_is_a_validation_error() {
        let raw: RawSeries = serde_json::from_str(r#"{"time": ["2025-01-01", "2025-01-02"]}"#).unwrap();
        let err = AnomalyRangeDetector::new().detect_raw(&raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(err, AnomalyDetectionError::MissingField { ref field } if field == "price"));
    }
}
