//! @ai:module:intent Timing measures in seconds, valid for any task type
//! @ai:module:layer domain
//! @ai:module:public_api TimeMeasure, TimePhase
//! @ai:module:stateless true

use crate::error::Result;
use crate::measure::{Measure, MeasureInput};
use crate::task::TaskType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePhase {
    Train,
    Predict,
    Both,
}

#[derive(Debug, Clone)]
pub struct TimeMeasure {
    phase: TimePhase,
}

impl TimeMeasure {
    pub fn new(phase: TimePhase) -> Self {
        Self { phase }
    }
}

impl Measure for TimeMeasure {
    fn id(&self) -> &str {
        match self.phase {
            TimePhase::Train => "time_train",
            TimePhase::Predict => "time_predict",
            TimePhase::Both => "time_both",
        }
    }

    fn task_type(&self) -> Option<TaskType> {
        None
    }

    fn minimize(&self) -> bool {
        true
    }

    fn range(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    fn score(&self, input: &MeasureInput) -> Result<f64> {
        let secs = match self.phase {
            TimePhase::Train => input.train_time,
            TimePhase::Predict => input.predict_time,
            TimePhase::Both => input.train_time + input.predict_time,
        };
        Ok(secs.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{Prediction, RegrPrediction};
    use std::time::Duration;

    #[test]
    fn test_time_both_adds_phases() {
        let p = Prediction::Regr(RegrPrediction {
            row_ids: vec![],
            truth: vec![],
            response: vec![],
            se: None,
        });
        let input = MeasureInput {
            prediction: &p,
            train_time: Duration::from_millis(1500),
            predict_time: Duration::from_millis(500),
        };
        assert_eq!(TimeMeasure::new(TimePhase::Both).score(&input).unwrap(), 2.0);
        assert_eq!(TimeMeasure::new(TimePhase::Train).score(&input).unwrap(), 1.5);
    }
}
