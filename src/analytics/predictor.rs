//! Hour-of-day duration trend
//!
//! A single-feature ordinary least-squares fit of `duration ≈ slope·hour +
//! intercept` over records with a positive duration. Zero durations mark the
//! first record of a batch or session and are left out of the fit.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::info;

use crate::models::LogTable;

/// Share of the filtered rows held out for evaluation
pub const TEST_FRACTION: f64 = 0.2;

/// Default seed for the train/test shuffle
pub const DEFAULT_SPLIT_SEED: u64 = 42;

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("no records with a positive duration to fit on")]
    InsufficientData,
    #[error("hour must be within 0..=23, got {0}")]
    InvalidArgument(i64),
}

/// Fitted hour → duration line.
///
/// Predictions are not clamped, so extrapolating a falling trend can yield a
/// negative duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendModel {
    pub slope: f64,
    pub intercept: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Mean squared error on the held-out rows; `None` when none were held out
    pub mse: Option<f64>,
}

impl TrendModel {
    pub fn fit(table: &LogTable) -> Result<Self, PredictError> {
        Self::fit_with_seed(table, DEFAULT_SPLIT_SEED)
    }

    pub fn fit_with_seed(table: &LogTable, seed: u64) -> Result<Self, PredictError> {
        let mut samples: Vec<(f64, f64)> = table
            .iter()
            .filter(|record| record.duration > 0.0)
            .map(|record| (f64::from(record.hour()), record.duration))
            .collect();

        if samples.is_empty() {
            return Err(PredictError::InsufficientData);
        }

        samples.shuffle(&mut StdRng::seed_from_u64(seed));

        // Keep at least one training row
        let test_rows = ((samples.len() as f64 * TEST_FRACTION).ceil() as usize)
            .min(samples.len() - 1);
        let (test, train) = samples.split_at(test_rows);

        let (slope, intercept) = least_squares(train);
        let mut model = Self {
            slope,
            intercept,
            train_rows: train.len(),
            test_rows: test.len(),
            mse: None,
        };

        if !test.is_empty() {
            let squared_errors: Vec<f64> = test
                .iter()
                .map(|&(hour, duration)| (model.evaluate(hour) - duration).powi(2))
                .collect();
            model.mse = Some(squared_errors.iter().mean());
        }

        info!(
            slope = model.slope,
            intercept = model.intercept,
            train_rows = model.train_rows,
            test_rows = model.test_rows,
            mse = ?model.mse,
            "Fitted duration trend model"
        );
        Ok(model)
    }

    /// Predicted duration in seconds for `hour` (0..=23)
    pub fn predict(&self, hour: i64) -> Result<f64, PredictError> {
        if !(0..=23).contains(&hour) {
            return Err(PredictError::InvalidArgument(hour));
        }
        Ok(self.evaluate(hour as f64))
    }

    fn evaluate(&self, hour: f64) -> f64 {
        self.slope * hour + self.intercept
    }
}

/// Returns `(slope, intercept)`; a flat line through the mean when the
/// feature has no variance.
fn least_squares(samples: &[(f64, f64)]) -> (f64, f64) {
    let hours: Vec<f64> = samples.iter().map(|&(hour, _)| hour).collect();
    let durations: Vec<f64> = samples.iter().map(|&(_, duration)| duration).collect();

    let mean_hour = hours.iter().mean();
    let mean_duration = durations.iter().mean();

    if samples.len() < 2 {
        return (0.0, mean_duration);
    }

    let variance = hours.iter().variance();
    if !variance.is_finite() || variance == 0.0 {
        return (0.0, mean_duration);
    }

    let slope = hours.iter().covariance(durations.iter()) / variance;
    (slope, mean_duration - slope * mean_hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::record;

    fn table_from(points: &[(u32, f64)]) -> LogTable {
        LogTable::new(
            points
                .iter()
                .map(|&(hour, duration)| {
                    record(&format!("2024-03-10 {hour:02}:15:00"), [5, 5, 5, 5], duration)
                })
                .collect(),
        )
    }

    #[test]
    fn test_fit_all_zero_durations_is_insufficient() {
        let table = table_from(&[(1, 0.0), (2, 0.0), (3, 0.0)]);
        assert_eq!(TrendModel::fit(&table), Err(PredictError::InsufficientData));
    }

    #[test]
    fn test_fit_empty_table_is_insufficient() {
        assert_eq!(
            TrendModel::fit(&LogTable::default()),
            Err(PredictError::InsufficientData)
        );
    }

    #[test]
    fn test_predict_rejects_out_of_range_hours() {
        let model = TrendModel::fit(&table_from(&[(4, 10.0)])).unwrap();
        assert_eq!(model.predict(-1), Err(PredictError::InvalidArgument(-1)));
        assert_eq!(model.predict(24), Err(PredictError::InvalidArgument(24)));
        assert!(model.predict(0).is_ok());
        assert!(model.predict(23).is_ok());
    }

    #[test]
    fn test_fit_recovers_exact_line() {
        let points: Vec<(u32, f64)> = (0..24).map(|h| (h, 2.0 * h as f64 + 5.0)).collect();
        let model = TrendModel::fit(&table_from(&points)).unwrap();

        assert!((model.slope - 2.0).abs() < 1e-9);
        assert!((model.intercept - 5.0).abs() < 1e-9);
        assert_eq!(model.test_rows, 5);
        assert_eq!(model.train_rows, 19);
        assert!(model.mse.unwrap() < 1e-12);
        assert!((model.predict(10).unwrap() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_durations_are_excluded() {
        let mut points: Vec<(u32, f64)> = (1..11).map(|h| (h, 3.0)).collect();
        points.push((12, 0.0));
        let model = TrendModel::fit(&table_from(&points)).unwrap();
        assert_eq!(model.train_rows + model.test_rows, 10);
    }

    #[test]
    fn test_single_row_fits_flat_line() {
        let model = TrendModel::fit(&table_from(&[(7, 42.0)])).unwrap();
        assert_eq!(model.train_rows, 1);
        assert_eq!(model.test_rows, 0);
        assert_eq!(model.mse, None);
        assert_eq!(model.predict(20).unwrap(), 42.0);
    }

    #[test]
    fn test_prediction_is_not_clamped() {
        let points: Vec<(u32, f64)> = (0..10).map(|h| (h, 100.0 - 20.0 * h as f64)).collect();
        let points: Vec<(u32, f64)> = points.into_iter().filter(|&(_, d)| d > 0.0).collect();
        let model = TrendModel::fit(&table_from(&points)).unwrap();
        assert!(model.predict(23).unwrap() < 0.0);
    }
}
