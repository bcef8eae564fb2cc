//! @ai:module:intent Regression measures
//! @ai:module:layer domain
//! @ai:module:public_api RegrMeasure, RegrMetric
//! @ai:module:stateless true

use crate::error::Result;
use crate::measure::{check_task_type, measure_error, Measure, MeasureInput};
use crate::task::TaskType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegrMetric {
    Mse,
    Rmse,
    Mae,
    Rsq,
}

/// @ai:intent Regression measure backed by one of the built-in metrics
#[derive(Debug, Clone)]
pub struct RegrMeasure {
    id: String,
    metric: RegrMetric,
}

impl RegrMeasure {
    pub fn new(metric: RegrMetric) -> Self {
        let id = match metric {
            RegrMetric::Mse => "regr.mse",
            RegrMetric::Rmse => "regr.rmse",
            RegrMetric::Mae => "regr.mae",
            RegrMetric::Rsq => "regr.rsq",
        };
        Self {
            id: id.to_string(),
            metric,
        }
    }
}

impl Measure for RegrMeasure {
    fn id(&self) -> &str {
        &self.id
    }

    fn task_type(&self) -> Option<TaskType> {
        Some(TaskType::Regr)
    }

    fn minimize(&self) -> bool {
        self.metric != RegrMetric::Rsq
    }

    fn range(&self) -> (f64, f64) {
        match self.metric {
            RegrMetric::Rsq => (f64::NEG_INFINITY, 1.0),
            _ => (0.0, f64::INFINITY),
        }
    }

    fn score(&self, input: &MeasureInput) -> Result<f64> {
        check_task_type(self, input.prediction)?;
        let Some(p) = input.prediction.as_regr() else {
            return Err(measure_error(&self.id, "expected a regression prediction"));
        };
        if p.truth.is_empty() {
            return Ok(f64::NAN);
        }

        let n = p.truth.len() as f64;
        let residuals = p.truth.iter().zip(&p.response).map(|(t, r)| t - r);
        let sse: f64 = residuals.clone().map(|e| e * e).sum();

        let score = match self.metric {
            RegrMetric::Mse => sse / n,
            RegrMetric::Rmse => (sse / n).sqrt(),
            RegrMetric::Mae => residuals.map(f64::abs).sum::<f64>() / n,
            RegrMetric::Rsq => {
                let mean = p.truth.iter().sum::<f64>() / n;
                let sst: f64 = p.truth.iter().map(|t| (t - mean).powi(2)).sum();
                if sst == 0.0 {
                    f64::NAN
                } else {
                    1.0 - sse / sst
                }
            }
        };
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{Prediction, RegrPrediction};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_regression_scores() {
        let p = Prediction::Regr(RegrPrediction {
            row_ids: vec![1, 2, 3],
            truth: vec![1.0, 2.0, 3.0],
            response: vec![1.0, 3.0, 1.0],
            se: None,
        });
        let input = MeasureInput::new(&p);
        let score = |m| RegrMeasure::new(m).score(&input).unwrap();

        assert_abs_diff_eq!(score(RegrMetric::Mse), 5.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(score(RegrMetric::Rmse), (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(score(RegrMetric::Mae), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(score(RegrMetric::Rsq), 1.0 - 5.0 / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rsq_undefined_for_constant_truth() {
        let p = Prediction::Regr(RegrPrediction {
            row_ids: vec![1, 2],
            truth: vec![2.0, 2.0],
            response: vec![1.0, 3.0],
            se: None,
        });
        let rsq = RegrMeasure::new(RegrMetric::Rsq)
            .score(&MeasureInput::new(&p))
            .unwrap();
        assert!(rsq.is_nan());
    }
}
