//! @ai:module:intent Debug learners that fail, warn or panic on demand
//! @ai:module:layer domain
//! @ai:module:public_api DebugClassif, DebugRegr
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::learner::base::{Algorithm, Conditions, FittedModel, PredictType};
use crate::learner::featureless::argmax;
use crate::param::{Param, ParamSet, ParamValue};
use crate::prediction::{ClassifPrediction, Prediction, RegrPrediction};
use crate::task::{Task, TaskType, Truth};
use rand::prelude::*;
use std::any::Any;

/// Probabilities of misbehaving, drawn once per train or predict call.
#[derive(Debug, Clone, Copy)]
struct Triggers {
    error_train: f64,
    error_predict: f64,
    warning_train: f64,
    warning_predict: f64,
    panic_train: bool,
    seed: u64,
}

impl Triggers {
    fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            error_train: params.get_dbl("error_train")?,
            error_predict: params.get_dbl("error_predict")?,
            warning_train: params.get_dbl("warning_train")?,
            warning_predict: params.get_dbl("warning_predict")?,
            panic_train: params.get_lgl("panic_train")?,
            seed: params.get_int("seed")? as u64,
        })
    }

    /// The draw depends on the rows, so different folds can behave differently.
    fn rng(&self, rows: &[usize]) -> StdRng {
        let offset: u64 = rows.iter().map(|&r| r as u64).sum();
        StdRng::seed_from_u64(self.seed.wrapping_add(offset))
    }

    fn on_train(&self, rows: &[usize], conditions: &mut Conditions) -> Result<()> {
        if self.panic_train {
            panic!("debug learner panicked during training");
        }
        let mut rng = self.rng(rows);
        if rng.gen::<f64>() < self.warning_train {
            conditions.warn("debug learner warning during training");
        }
        if rng.gen::<f64>() < self.error_train {
            return Err(Error::InvalidData("debug learner error during training".to_string()));
        }
        Ok(())
    }

    fn on_predict(&self, rows: &[usize], conditions: &mut Conditions) -> Result<()> {
        let mut rng = self.rng(rows);
        // Skip the two training draws so predict uses its own stream.
        let _: (f64, f64) = (rng.gen(), rng.gen());
        if rng.gen::<f64>() < self.warning_predict {
            conditions.warn("debug learner warning during prediction");
        }
        if rng.gen::<f64>() < self.error_predict {
            return Err(Error::InvalidData("debug learner error during prediction".to_string()));
        }
        Ok(())
    }
}

fn debug_params() -> ParamSet {
    let probability = |id: &str| Param::dbl(id, 0.0, 1.0).default_value(ParamValue::Dbl(0.0));
    ParamSet::new()
        .with(probability("error_train"))
        .with(probability("error_predict"))
        .with(probability("warning_train"))
        .with(probability("warning_predict"))
        .with(Param::lgl("panic_train").default_value(ParamValue::Lgl(false)))
        .with(Param::int("seed", 0, i64::MAX).default_value(ParamValue::Int(0)))
}

/// @ai:intent Majority-class learner with configurable failures
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugClassif;

#[derive(Debug, Clone)]
struct DebugClassifModel {
    triggers: Triggers,
    classes: Vec<String>,
    majority: usize,
    probs: Vec<f64>,
}

impl Algorithm for DebugClassif {
    fn task_type(&self) -> TaskType {
        TaskType::Classif
    }

    fn predict_types(&self) -> &[PredictType] {
        &[PredictType::Response, PredictType::Prob]
    }

    fn param_set(&self) -> ParamSet {
        debug_params()
    }

    fn train(
        &self,
        task: &Task,
        rows: &[usize],
        params: &ParamSet,
        conditions: &mut Conditions,
    ) -> Result<Box<dyn FittedModel>> {
        let triggers = Triggers::from_params(params)?;
        triggers.on_train(rows, conditions)?;

        let Truth::Classes { classes, codes } = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected class labels".to_string()));
        };
        let mut counts = vec![0.0; classes.len()];
        for code in &codes {
            counts[*code] += 1.0;
        }
        let total = codes.len().max(1) as f64;
        let probs: Vec<f64> = counts.iter().map(|c| c / total).collect();

        Ok(Box::new(DebugClassifModel {
            triggers,
            majority: argmax(&counts),
            classes,
            probs,
        }))
    }
}

impl FittedModel for DebugClassifModel {
    fn predict(
        &self,
        task: &Task,
        rows: &[usize],
        predict_type: PredictType,
        conditions: &mut Conditions,
    ) -> Result<Prediction> {
        self.triggers.on_predict(rows, conditions)?;
        let Truth::Classes { codes: truth, .. } = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected class labels".to_string()));
        };
        Ok(Prediction::Classif(ClassifPrediction {
            row_ids: rows.to_vec(),
            classes: self.classes.clone(),
            positive: task.positive_index(),
            truth,
            response: vec![self.majority; rows.len()],
            prob: (predict_type == PredictType::Prob)
                .then(|| vec![self.probs.clone(); rows.len()]),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// @ai:intent Mean-predicting regression learner with configurable failures
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugRegr;

#[derive(Debug, Clone)]
struct DebugRegrModel {
    triggers: Triggers,
    mean: f64,
}

impl Algorithm for DebugRegr {
    fn task_type(&self) -> TaskType {
        TaskType::Regr
    }

    fn predict_types(&self) -> &[PredictType] {
        &[PredictType::Response]
    }

    fn param_set(&self) -> ParamSet {
        debug_params()
    }

    fn train(
        &self,
        task: &Task,
        rows: &[usize],
        params: &ParamSet,
        conditions: &mut Conditions,
    ) -> Result<Box<dyn FittedModel>> {
        let triggers = Triggers::from_params(params)?;
        triggers.on_train(rows, conditions)?;

        let Truth::Numeric(y) = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected numeric target".to_string()));
        };
        let mean = if y.is_empty() {
            f64::NAN
        } else {
            y.iter().sum::<f64>() / y.len() as f64
        };
        Ok(Box::new(DebugRegrModel { triggers, mean }))
    }
}

impl FittedModel for DebugRegrModel {
    fn predict(
        &self,
        task: &Task,
        rows: &[usize],
        _predict_type: PredictType,
        conditions: &mut Conditions,
    ) -> Result<Prediction> {
        self.triggers.on_predict(rows, conditions)?;
        let Truth::Numeric(truth) = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected numeric target".to_string()));
        };
        Ok(Prediction::Regr(RegrPrediction {
            row_ids: rows.to_vec(),
            truth,
            response: vec![self.mean; rows.len()],
            se: None,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::base::Learner;
    use crate::param::ParamConfig;
    use crate::task::generators::two_normals;
    use std::sync::Arc;

    fn with(id: &str, value: ParamValue) -> Learner {
        let mut values = ParamConfig::new();
        values.insert(id.to_string(), value);
        Learner::new("classif.debug", Arc::new(DebugClassif))
            .with_params(&values)
            .unwrap()
    }

    #[test]
    fn test_error_train_always_fails() {
        let task = two_normals(20, 1).unwrap();
        let mut learner = with("error_train", ParamValue::Dbl(1.0));
        assert!(matches!(learner.train(&task, None), Err(Error::Train { .. })));
        assert!(!learner.is_trained());
    }

    #[test]
    fn test_warning_is_collected() {
        let task = two_normals(20, 1).unwrap();
        let mut learner = with("warning_train", ParamValue::Dbl(1.0));
        let mut conditions = Conditions::new();
        learner
            .train_with_conditions(&task, None, &mut conditions)
            .unwrap();
        assert_eq!(conditions.warnings().len(), 1);
        assert_eq!(learner.state().unwrap().warnings.len(), 1);
    }

    #[test]
    fn test_error_predict_fails_after_training() {
        let task = two_normals(20, 1).unwrap();
        let mut learner = with("error_predict", ParamValue::Dbl(1.0));
        learner.train(&task, None).unwrap();
        assert!(matches!(
            learner.predict(&task, None),
            Err(Error::Predict { .. })
        ));
    }

    #[test]
    fn test_predicts_majority_class() {
        let task = two_normals(21, 1).unwrap();
        let mut learner = Learner::new("classif.debug", Arc::new(DebugClassif));
        learner.train(&task, None).unwrap();
        let p = learner.predict(&task, None).unwrap();
        // 11 rows of class A, 10 of class B
        assert!(p.as_classif().unwrap().response.iter().all(|&r| r == 0));
    }
}
