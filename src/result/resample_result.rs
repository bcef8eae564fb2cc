//! @ai:module:intent Per-iteration records of one task/learner/resampling run
//! @ai:module:layer domain
//! @ai:module:public_api IterationRecord, ResampleResult
//! @ai:module:stateless false

use crate::error::{Error, Result};
use crate::learner::Learner;
use crate::measure::{Average, Measure, MeasureInput};
use crate::prediction::Prediction;
use crate::resampling::Resampling;
use crate::result::rows::{ConditionRow, ScoreRow, Scores};
use crate::task::Task;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// @ai:intent Outcome of one resampling iteration
#[derive(Debug, Clone)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Missing when training or prediction failed and no fallback could stand in
    pub prediction: Option<Prediction>,
    /// Trained learner, kept only when models are stored
    pub learner: Option<Learner>,
    pub train_time: Duration,
    pub predict_time: Duration,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub fallback_used: bool,
}

/// @ai:intent Ordered iteration records plus the task, learner and resampling that produced them
#[derive(Debug, Clone)]
pub struct ResampleResult {
    task: Task,
    learner: Learner,
    resampling: Resampling,
    iterations: Vec<IterationRecord>,
    uhash: String,
}

impl ResampleResult {
    /// @ai:intent Assemble a result; the unique hash identifies the design row
    /// @ai:effects pure
    pub fn new(
        task: Task,
        learner: Learner,
        resampling: Resampling,
        iterations: Vec<IterationRecord>,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(task.hash().as_bytes());
        hasher.update(learner.hash().as_bytes());
        hasher.update(resampling.hash().as_bytes());
        let uhash = hex::encode(hasher.finalize());

        Self {
            task,
            learner,
            resampling,
            iterations,
            uhash,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// The untrained learner prototype used for every iteration.
    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    pub fn resampling(&self) -> &Resampling {
        &self.resampling
    }

    pub fn iterations(&self) -> &[IterationRecord] {
        &self.iterations
    }

    pub fn uhash(&self) -> &str {
        &self.uhash
    }

    pub fn iters(&self) -> usize {
        self.iterations.len()
    }

    pub fn predictions(&self) -> Vec<Option<&Prediction>> {
        self.iterations.iter().map(|r| r.prediction.as_ref()).collect()
    }

    /// @ai:intent All available predictions concatenated in iteration order
    /// @ai:effects pure
    pub fn prediction(&self) -> Result<Prediction> {
        let predictions: Vec<Prediction> = self
            .iterations
            .iter()
            .filter_map(|r| r.prediction.clone())
            .collect();
        Prediction::combine(&predictions)
    }

    /// Trained learners per iteration; None where models were not stored.
    pub fn learners(&self) -> Vec<Option<&Learner>> {
        self.iterations.iter().map(|r| r.learner.as_ref()).collect()
    }

    fn check_measures(&self, measures: &[Arc<dyn Measure>]) -> Result<()> {
        for measure in measures {
            if let Some(expected) = measure.task_type() {
                if expected != self.task.task_type() {
                    return Err(Error::TypeMismatch(format!(
                        "measure '{}' is for {} tasks, task '{}' is {}",
                        measure.id(),
                        expected,
                        self.task.id(),
                        self.task.task_type()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Failures to score (e.g. a missing predict type) yield NaN, logged once per call.
    fn score_one(&self, measure: &dyn Measure, input: &MeasureInput) -> f64 {
        match measure.score(input) {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!("Scoring {} on {}: {}", measure.id(), self.task.id(), e);
                f64::NAN
            }
        }
    }

    fn iteration_scores(&self, record: &IterationRecord, measures: &[Arc<dyn Measure>]) -> Scores {
        measures
            .iter()
            .map(|m| {
                let score = match &record.prediction {
                    Some(prediction) => self.score_one(
                        m.as_ref(),
                        &MeasureInput {
                            prediction,
                            train_time: record.train_time,
                            predict_time: record.predict_time,
                        },
                    ),
                    None => f64::NAN,
                };
                (m.id().to_string(), score)
            })
            .collect()
    }

    /// @ai:intent Score every iteration
    /// @ai:pre every measure applies to the task type
    /// @ai:effects pure
    pub fn score(&self, measures: &[Arc<dyn Measure>]) -> Result<Vec<ScoreRow>> {
        self.check_measures(measures)?;
        Ok(self
            .iterations
            .iter()
            .map(|record| ScoreRow {
                uhash: self.uhash.clone(),
                task_id: self.task.id().to_string(),
                learner_id: self.learner.id().to_string(),
                resampling_id: self.resampling.id().to_string(),
                iteration: record.iteration,
                scores: self.iteration_scores(record, measures),
            })
            .collect())
    }

    /// @ai:intent One scalar per measure, averaged the way each measure asks
    /// @ai:pre every measure applies to the task type
    /// @ai:effects pure
    pub fn aggregate(&self, measures: &[Arc<dyn Measure>]) -> Result<Scores> {
        self.check_measures(measures)?;
        let mut result = Scores::new();
        for measure in measures {
            let value = match measure.average() {
                Average::Macro => {
                    let scores: Vec<f64> = self
                        .iterations
                        .iter()
                        .map(|record| {
                            self.iteration_scores(record, std::slice::from_ref(measure))
                                .into_values()
                                .next()
                                .unwrap_or(f64::NAN)
                        })
                        .collect();
                    measure.aggregate(&scores)
                }
                Average::Micro => match self.prediction() {
                    Ok(prediction) => {
                        let input = MeasureInput {
                            prediction: &prediction,
                            train_time: self.iterations.iter().map(|r| r.train_time).sum(),
                            predict_time: self.iterations.iter().map(|r| r.predict_time).sum(),
                        };
                        self.score_one(measure.as_ref(), &input)
                    }
                    Err(_) => f64::NAN,
                },
            };
            result.insert(measure.id().to_string(), value);
        }
        Ok(result)
    }

    fn conditions(&self, pick: impl Fn(&IterationRecord) -> &[String]) -> Vec<ConditionRow> {
        self.iterations
            .iter()
            .flat_map(|record| {
                pick(record).iter().map(move |message| ConditionRow {
                    uhash: self.uhash.clone(),
                    task_id: self.task.id().to_string(),
                    learner_id: self.learner.id().to_string(),
                    resampling_id: self.resampling.id().to_string(),
                    iteration: record.iteration,
                    message: message.clone(),
                })
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<ConditionRow> {
        self.conditions(|r| &r.warnings)
    }

    pub fn errors(&self) -> Vec<ConditionRow> {
        self.conditions(|r| &r.errors)
    }

    pub fn warning_count(&self) -> usize {
        self.iterations.iter().map(|r| r.warnings.len()).sum()
    }

    pub fn error_count(&self) -> usize {
        self.iterations.iter().map(|r| r.errors.len()).sum()
    }

    /// @ai:intent Keep only the given iterations (by iteration number), in that order
    /// @ai:effects state:write
    pub fn filter(&mut self, iterations: &[usize]) -> Result<()> {
        let mut kept = Vec::with_capacity(iterations.len());
        for &i in iterations {
            let record = self
                .iterations
                .iter()
                .find(|r| r.iteration == i)
                .ok_or_else(|| {
                    Error::InvalidResampling(format!("no iteration {} in result", i))
                })?;
            kept.push(record.clone());
        }
        self.iterations = kept;
        Ok(())
    }

    /// @ai:intent Drop stored models to free memory
    /// @ai:effects state:write
    pub fn discard_models(&mut self) {
        for record in &mut self.iterations {
            record.learner = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::lrn;
    use crate::measure::{msr, Averaged};
    use crate::prediction::ClassifPrediction;
    use crate::resampling::Strategy;
    use crate::task::generators::two_normals;
    use approx::assert_abs_diff_eq;

    fn record(iteration: usize, truth: Vec<usize>, response: Vec<usize>) -> IterationRecord {
        let n = truth.len();
        IterationRecord {
            iteration,
            prediction: Some(Prediction::Classif(ClassifPrediction {
                row_ids: (iteration * 10..iteration * 10 + n).collect(),
                classes: vec!["A".to_string(), "B".to_string()],
                positive: Some(0),
                truth,
                response,
                prob: None,
            })),
            learner: None,
            train_time: Duration::from_millis(10),
            predict_time: Duration::from_millis(1),
            warnings: vec![],
            errors: vec![],
            fallback_used: false,
        }
    }

    fn result() -> ResampleResult {
        let task = two_normals(10, 1).unwrap();
        let resampling = Resampling::new(Strategy::Cv { folds: 2 }).unwrap();
        let mut failed = record(2, vec![], vec![]);
        failed.prediction = None;
        failed.errors.push("boom".to_string());
        ResampleResult::new(
            task,
            lrn("classif.featureless").unwrap(),
            resampling,
            vec![
                record(0, vec![0, 0, 0, 0], vec![0, 0, 0, 1]),
                record(1, vec![0, 1], vec![1, 0]),
                failed,
            ],
        )
    }

    #[test]
    fn test_macro_is_nan_with_failed_iteration() {
        let mut rr = result();
        let ce = msr("classif.ce").unwrap();
        let agg = rr.aggregate(&[ce.clone()]).unwrap();
        assert!(agg["classif.ce"].is_nan());

        let scores = rr.score(&[ce.clone()]).unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores[2].scores["classif.ce"].is_nan());

        rr.filter(&[0, 1]).unwrap();
        let agg = rr.aggregate(&[ce]).unwrap();
        assert_abs_diff_eq!(agg["classif.ce"], (0.25 + 1.0) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_micro_scores_combined_prediction() {
        let rr = result();
        let micro = Averaged::micro(msr("classif.ce").unwrap());
        let agg = rr.aggregate(&[micro]).unwrap();
        assert_abs_diff_eq!(agg["classif.ce"], 3.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_measure_for_other_task_type_rejected() {
        let rr = result();
        assert!(rr.aggregate(&[msr("regr.mse").unwrap()]).is_err());
    }

    #[test]
    fn test_errors_and_filter() {
        let mut rr = result();
        assert_eq!(rr.errors().len(), 1);
        assert_eq!(rr.errors()[0].iteration, 2);
        assert_eq!(rr.prediction().unwrap().len(), 6);

        rr.filter(&[1]).unwrap();
        assert_eq!(rr.iters(), 1);
        assert!(rr.errors().is_empty());
        assert!(rr.filter(&[5]).is_err());
    }
}
