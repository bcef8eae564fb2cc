//! @ai:module:intent Performance measures comparing predictions with ground truth
//! @ai:module:layer domain
//! @ai:module:public_api Measure, MeasureInput, Average, Averaged, mean, mean_ignoring_nan, msr, msrs, measure_ids, default_measure

pub mod classif;
pub mod registry;
pub mod regr;
pub mod surv;
pub mod time;

use crate::error::{Error, Result};
use crate::learner::PredictType;
use crate::prediction::Prediction;
use crate::task::TaskType;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

pub use registry::{default_measure, measure_ids, msr, msrs};

/// @ai:intent How scores over resampling iterations are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Average {
    /// Score every iteration, then aggregate the scores
    #[default]
    Macro,
    /// Score the prediction combined over all iterations
    Micro,
}

/// @ai:intent Everything a measure may look at for one evaluation
#[derive(Debug, Clone, Copy)]
pub struct MeasureInput<'a> {
    pub prediction: &'a Prediction,
    pub train_time: Duration,
    pub predict_time: Duration,
}

impl<'a> MeasureInput<'a> {
    pub fn new(prediction: &'a Prediction) -> Self {
        Self {
            prediction,
            train_time: Duration::ZERO,
            predict_time: Duration::ZERO,
        }
    }
}

/// @ai:intent Scoring function with metadata used for aggregation and ranking
pub trait Measure: Send + Sync + Debug {
    fn id(&self) -> &str;

    /// Task type the measure applies to; None means any.
    fn task_type(&self) -> Option<TaskType>;

    fn minimize(&self) -> bool;

    fn range(&self) -> (f64, f64);

    fn predict_type(&self) -> PredictType {
        PredictType::Response
    }

    fn average(&self) -> Average {
        Average::Macro
    }

    /// @ai:intent Score one prediction
    /// @ai:pre prediction matches task_type and carries the required predict type
    fn score(&self, input: &MeasureInput) -> Result<f64>;

    /// @ai:intent Combine per-iteration scores; any NaN score makes the result NaN
    fn aggregate(&self, scores: &[f64]) -> f64 {
        mean(scores)
    }
}

/// Arithmetic mean, NaN when empty or when any value is NaN.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Arithmetic mean of the non-NaN values, NaN when none are left.
///
/// Measures that should score only the successful iterations override
/// `aggregate` with this.
pub fn mean_ignoring_nan(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// @ai:intent Check the prediction fits the measure's task type
/// @ai:effects pure
pub(crate) fn check_task_type(measure: &dyn Measure, prediction: &Prediction) -> Result<()> {
    match measure.task_type() {
        Some(expected) if expected != prediction.task_type() => Err(Error::Measure {
            measure: measure.id().to_string(),
            message: format!(
                "measure is for {} predictions, got {}",
                expected,
                prediction.task_type()
            ),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn measure_error(measure: &str, message: impl Into<String>) -> Error {
    Error::Measure {
        measure: measure.to_string(),
        message: message.into(),
    }
}

/// @ai:intent Wrapper overriding how a measure is averaged
#[derive(Debug, Clone)]
pub struct Averaged {
    inner: Arc<dyn Measure>,
    average: Average,
}

impl Averaged {
    /// @ai:intent Same measure, scored on the combined prediction
    /// @ai:effects pure
    pub fn micro(inner: Arc<dyn Measure>) -> Arc<dyn Measure> {
        Arc::new(Self {
            inner,
            average: Average::Micro,
        })
    }

    pub fn new(inner: Arc<dyn Measure>, average: Average) -> Arc<dyn Measure> {
        Arc::new(Self { inner, average })
    }
}

impl Measure for Averaged {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn task_type(&self) -> Option<TaskType> {
        self.inner.task_type()
    }

    fn minimize(&self) -> bool {
        self.inner.minimize()
    }

    fn range(&self) -> (f64, f64) {
        self.inner.range()
    }

    fn predict_type(&self) -> PredictType {
        self.inner.predict_type()
    }

    fn average(&self) -> Average {
        self.average
    }

    fn score(&self, input: &MeasureInput) -> Result<f64> {
        self.inner.score(input)
    }

    fn aggregate(&self, scores: &[f64]) -> f64 {
        self.inner.aggregate(scores)
    }
}
