//! @ai:module:intent Featureless baseline learners ignoring all features
//! @ai:module:layer domain
//! @ai:module:public_api FeaturelessClassif, FeaturelessRegr
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::learner::base::{Algorithm, Conditions, FittedModel, PredictType};
use crate::param::{Param, ParamSet, ParamValue};
use crate::prediction::{ClassifPrediction, Prediction, RegrPrediction};
use crate::task::{Task, TaskType, Truth};
use rand::prelude::*;
use std::any::Any;

/// @ai:intent Predicts the majority class or samples from the class distribution
#[derive(Debug, Clone, Copy, Default)]
pub struct FeaturelessClassif;

#[derive(Debug, Clone)]
struct ClassFrequencies {
    method: String,
    seed: u64,
    classes: Vec<String>,
    probs: Vec<f64>,
}

impl Algorithm for FeaturelessClassif {
    fn task_type(&self) -> TaskType {
        TaskType::Classif
    }

    fn predict_types(&self) -> &[PredictType] {
        &[PredictType::Response, PredictType::Prob]
    }

    fn param_set(&self) -> ParamSet {
        ParamSet::new()
            .with(
                Param::fct("method", &["mode", "sample", "weighted.sample"])
                    .default_value(ParamValue::Fct("mode".to_string())),
            )
            .with(Param::int("seed", 0, i64::MAX).default_value(ParamValue::Int(1)))
    }

    fn train(
        &self,
        task: &Task,
        rows: &[usize],
        params: &ParamSet,
        _conditions: &mut Conditions,
    ) -> Result<Box<dyn FittedModel>> {
        let Truth::Classes { classes, codes } = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected class labels".to_string()));
        };
        if codes.is_empty() {
            return Err(Error::InvalidData("no training rows".to_string()));
        }

        let weights = task
            .weights(rows)?
            .unwrap_or_else(|| vec![1.0; codes.len()]);
        let mut counts = vec![0.0; classes.len()];
        for (&code, &w) in codes.iter().zip(&weights) {
            counts[code] += w;
        }
        let total: f64 = counts.iter().sum();
        let probs = counts.iter().map(|c| c / total).collect();

        Ok(Box::new(ClassFrequencies {
            method: params.get_fct("method")?,
            seed: params.get_int("seed")? as u64,
            classes,
            probs,
        }))
    }
}

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

impl FittedModel for ClassFrequencies {
    fn predict(
        &self,
        task: &Task,
        rows: &[usize],
        predict_type: PredictType,
        _conditions: &mut Conditions,
    ) -> Result<Prediction> {
        let Truth::Classes { codes: truth, .. } = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected class labels".to_string()));
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let response: Vec<usize> = match self.method.as_str() {
            "sample" => (0..rows.len())
                .map(|_| rng.gen_range(0..self.classes.len()))
                .collect(),
            "weighted.sample" => (0..rows.len())
                .map(|_| {
                    let u: f64 = rng.gen();
                    let mut acc = 0.0;
                    for (i, p) in self.probs.iter().enumerate() {
                        acc += p;
                        if u < acc {
                            return i;
                        }
                    }
                    self.probs.len() - 1
                })
                .collect(),
            _ => vec![argmax(&self.probs); rows.len()],
        };

        let prob = (predict_type == PredictType::Prob).then(|| vec![self.probs.clone(); rows.len()]);

        Ok(Prediction::Classif(ClassifPrediction {
            row_ids: rows.to_vec(),
            classes: self.classes.clone(),
            positive: task.positive_index(),
            truth,
            response,
            prob,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// @ai:intent Predicts the training mean (or median) for every row
#[derive(Debug, Clone, Copy, Default)]
pub struct FeaturelessRegr;

#[derive(Debug, Clone)]
struct Location {
    center: f64,
    spread: f64,
}

impl Algorithm for FeaturelessRegr {
    fn task_type(&self) -> TaskType {
        TaskType::Regr
    }

    fn predict_types(&self) -> &[PredictType] {
        &[PredictType::Response, PredictType::Se]
    }

    fn param_set(&self) -> ParamSet {
        ParamSet::new().with(Param::lgl("robust").default_value(ParamValue::Lgl(false)))
    }

    fn train(
        &self,
        task: &Task,
        rows: &[usize],
        params: &ParamSet,
        conditions: &mut Conditions,
    ) -> Result<Box<dyn FittedModel>> {
        let Truth::Numeric(y) = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected numeric target".to_string()));
        };
        let y: Vec<f64> = y.into_iter().filter(|v| !v.is_nan()).collect();
        if y.is_empty() {
            return Err(Error::InvalidData("no non-missing training targets".to_string()));
        }
        if y.len() == 1 {
            conditions.warn("single training observation, standard error set to 0");
        }

        let location = if params.get_lgl("robust")? {
            let center = median(&y);
            let deviations: Vec<f64> = y.iter().map(|v| (v - center).abs()).collect();
            Location {
                center,
                spread: 1.4826 * median(&deviations),
            }
        } else {
            let n = y.len() as f64;
            let center = y.iter().sum::<f64>() / n;
            let var = if y.len() > 1 {
                y.iter().map(|v| (v - center).powi(2)).sum::<f64>() / (n - 1.0)
            } else {
                0.0
            };
            Location {
                center,
                spread: var.sqrt(),
            }
        };

        Ok(Box::new(location))
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

impl FittedModel for Location {
    fn predict(
        &self,
        task: &Task,
        rows: &[usize],
        predict_type: PredictType,
        _conditions: &mut Conditions,
    ) -> Result<Prediction> {
        let Truth::Numeric(truth) = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected numeric target".to_string()));
        };
        Ok(Prediction::Regr(RegrPrediction {
            row_ids: rows.to_vec(),
            truth,
            response: vec![self.center; rows.len()],
            se: (predict_type == PredictType::Se).then(|| vec![self.spread; rows.len()]),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, DataBackend};
    use crate::learner::base::Learner;
    use crate::param::ParamConfig;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn classif_task() -> Task {
        let backend = DataBackend::from_columns(vec![
            ("x".to_string(), Column::Numeric(vec![0.0; 5])),
            ("y".to_string(), Column::factor_from_labels(&["a", "b", "b", "b", "a"])),
        ])
        .unwrap();
        Task::classif("toy", backend, "y").unwrap()
    }

    #[test]
    fn test_mode_and_probabilities() {
        let task = classif_task();
        let mut learner = Learner::new("classif.featureless", Arc::new(FeaturelessClassif))
            .with_predict_type(PredictType::Prob)
            .unwrap();
        learner.train(&task, None).unwrap();

        let prediction = learner.predict(&task, Some(&[1, 2])).unwrap();
        let p = prediction.as_classif().unwrap();
        assert_eq!(p.response, vec![1, 1]);
        let prob = p.prob.as_ref().unwrap();
        assert_abs_diff_eq!(prob[0][0], 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(prob[0][1], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_sample_is_seeded() {
        let task = classif_task();
        let mut values = ParamConfig::new();
        values.insert("method".to_string(), ParamValue::Fct("sample".to_string()));
        let mut learner = Learner::new("classif.featureless", Arc::new(FeaturelessClassif))
            .with_params(&values)
            .unwrap();
        learner.train(&task, None).unwrap();

        let a = learner.predict(&task, None).unwrap();
        let b = learner.predict(&task, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_regr_mean_and_median() {
        let backend = DataBackend::from_columns(vec![(
            "y".to_string(),
            Column::Numeric(vec![1.0, 2.0, 3.0, 10.0]),
        )])
        .unwrap();
        let task = Task::regr("toy", backend, "y").unwrap();

        let mut mean = Learner::new("regr.featureless", Arc::new(FeaturelessRegr));
        mean.train(&task, None).unwrap();
        let p = mean.predict(&task, None).unwrap();
        assert_abs_diff_eq!(p.as_regr().unwrap().response[0], 4.0, epsilon = 1e-12);

        let mut values = ParamConfig::new();
        values.insert("robust".to_string(), ParamValue::Lgl(true));
        let mut robust = Learner::new("regr.featureless", Arc::new(FeaturelessRegr))
            .with_params(&values)
            .unwrap();
        robust.train(&task, None).unwrap();
        let p = robust.predict(&task, None).unwrap();
        assert_abs_diff_eq!(p.as_regr().unwrap().response[0], 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_argmax_ties_take_first() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
    }
}
