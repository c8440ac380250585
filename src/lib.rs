//! # Anomaly Ranges
//!
//! Volatility-based detection of statistically unusual date ranges in daily
//! price series.
//!
//! A GARCH(1,1) model is fitted to the daily changes of a series. A day is
//! flagged when its move is extreme both relative to the model's local
//! volatility and relative to the distribution of all moves in the window.
//! Flagged days are clustered by their gaps, widened to at least two days and
//! returned longest first as `YYYY-MM-DD` pairs.
//!
//! ## Key Features
//!
//! - **Dual test**: conditional (GARCH) and unconditional outlier tests must both fire
//! - **Parameter-free grouping**: clusters split where a gap exceeds the median gap
//! - **Distinct outcomes**: validation, model-fit and "no findings" failures are separate kinds
//! - **Deterministic**: identical input always produces identical output
//! - **Worker pool**: bounded rayon pool with timeouts and cooperative cancellation
//!
//! ## Quick Start
//!
//! ```rust
//! use anomaly_ranges::{AnomalyRangeDetector, ErrorKind, RawSeries};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Calm oscillating prices with one large jump.
//!     let mut prices = vec![100.0];
//!     for i in 0..90 {
//!         let step = if i == 45 { 9.0 } else { (0.7 * i as f64).sin() };
//!         let last = prices[prices.len() - 1];
//!         prices.push(last + step);
//!     }
//!     let dates: Vec<String> = (0..prices.len())
//!         .map(|i| format!("2025-{:02}-{:02}", 1 + i / 28, 1 + i % 28))
//!         .collect();
//!
//!     let raw = RawSeries::new(dates, prices);
//!     let detector = AnomalyRangeDetector::new();
//!
//!     match detector.detect_raw(&raw) {
//!         Ok(ranges) => {
//!             for range in &ranges {
//!                 println!("{} .. {}", range.start(), range.end());
//!             }
//!         }
//!         Err(e) if e.kind() == ErrorKind::NoAnomaly => println!("nothing unusual"),
//!         Err(e) => return Err(e.into()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! 1. [`series`]: input validation
//! 2. [`returns`]: daily changes
//! 3. [`garch`]: conditional volatility path
//! 4. [`classifier`]: dual-test anomaly mask
//! 5. [`grouping`]: gap-based clustering
//! 6. [`ranges`]: minimum span, ordering, formatting
//!
//! [`detector`] chains the stages and [`executor`] runs them off the caller's
//! thread.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classifier;
pub mod config;
pub mod detector;
pub mod errors;
pub mod executor;
pub mod garch;
pub mod grouping;
pub mod optimizer;
pub mod ranges;
pub mod returns;
pub mod series;
pub mod stats;

pub use classifier::{classify, AnomalyMask, Classification, DayScore};
pub use config::{DetectorConfig, PoolConfig};
pub use detector::{detect_unusual_ranges, AnomalyRangeDetector, DetectionReport};
pub use errors::{AnomalyDetectionError, AnomalyResult, ErrorKind};
pub use executor::{CancellationToken, DetectionHandle, DetectionPool};
pub use garch::{fit_garch, GarchConfig, GarchFit};
pub use grouping::group_dates;
pub use ranges::{adjust_ranges, ensure_minimum_span, format_ranges, DateRange, FormattedRange};
pub use returns::{daily_changes, ChangeKind, ChangeSeries, DailyChange};
pub use series::{PricePoint, PriceSeries, RawSeries};
pub use stats::two_tailed_critical_value;
