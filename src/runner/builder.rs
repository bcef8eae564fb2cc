//! @ai:module:intent Build learners, resamplings and measures from configuration entries
//! @ai:module:layer application
//! @ai:module:public_api build_learner, build_resampling, build_measures
//! @ai:module:stateless true

use crate::config::LearnerSpec;
use crate::learner::{lrn, Learner};
use crate::measure::{default_measure, msr, msrs, Measure};
use crate::param::ParamSet;
use crate::resampling::{Resampling, Strategy};
use crate::task::TaskType;
use crate::tuning::AutoTuner;
use anyhow::{Context, Result};
use std::sync::Arc;

/// @ai:intent Construct a learner entry, wrapping it in an auto-tuner when tuning is set
/// @ai:pre ids refer to registered learners and measures
/// @ai:effects pure
pub fn build_learner(spec: &LearnerSpec, seed: u64) -> Result<Learner> {
    let mut learner = lrn(&spec.id)?
        .with_params(&spec.params)
        .with_context(|| format!("Invalid parameters for learner '{}'", spec.id))?;
    if let Some(predict_type) = spec.predict_type {
        learner.set_predict_type(predict_type)?;
    }

    if let Some(tuning) = &spec.tuning {
        let measure = msr(&tuning.measure)?;
        let search_space = ParamSet::from_params(tuning.search_space.clone());
        learner = AutoTuner::new(
            learner,
            build_resampling(&tuning.resampling)?,
            measure,
            search_space,
            tuning.terminator.clone(),
            tuning.tuner.clone(),
            seed,
        )
        .with_context(|| format!("Invalid tuning setup for learner '{}'", spec.id))?;
    }

    if let Some(fallback) = &spec.fallback {
        learner = learner
            .with_fallback(lrn(fallback)?)
            .with_context(|| format!("Invalid fallback for learner '{}'", spec.id))?;
    }
    Ok(learner)
}

/// @ai:intent Validate a strategy and wrap it in a fresh resampling
/// @ai:effects pure
pub fn build_resampling(strategy: &Strategy) -> Result<Resampling> {
    Resampling::new(strategy.clone())
        .with_context(|| format!("Invalid resampling '{}'", strategy.id()))
}

/// @ai:intent Measures by id, or the default measure of every task type present
/// @ai:effects pure
pub fn build_measures(ids: &[String], task_types: &[TaskType]) -> Result<Vec<Arc<dyn Measure>>> {
    if !ids.is_empty() {
        return Ok(msrs(ids)?);
    }

    let mut measures: Vec<Arc<dyn Measure>> = Vec::new();
    for task_type in task_types {
        let measure = default_measure(*task_type);
        if !measures.iter().any(|m| m.id() == measure.id()) {
            measures.push(measure);
        }
    }
    Ok(measures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TuningSpec;
    use crate::learner::PredictType;
    use crate::param::{Param, ParamValue};
    use crate::tuning::{Terminator, Tuner};

    #[test]
    fn test_build_learner_with_params_and_fallback() {
        let mut spec = LearnerSpec::new("classif.kknn");
        spec.params.insert("k".to_string(), ParamValue::Int(3));
        spec.predict_type = Some(PredictType::Prob);
        spec.fallback = Some("classif.featureless".to_string());

        let learner = build_learner(&spec, 1).unwrap();
        assert_eq!(learner.param_set().get_int("k").unwrap(), 3);
        assert_eq!(learner.predict_type(), PredictType::Prob);
        assert_eq!(learner.fallback().unwrap().id(), "classif.featureless");
    }

    #[test]
    fn test_build_tuned_learner() {
        let mut spec = LearnerSpec::new("regr.kknn");
        spec.tuning = Some(TuningSpec {
            tuner: Tuner::GridSearch {
                resolution: 2,
                batch_size: 1,
            },
            terminator: Terminator::None,
            resampling: Strategy::Holdout { ratio: 0.7 },
            measure: "regr.mse".to_string(),
            search_space: vec![Param::int("k", 1, 5)],
        });

        let learner = build_learner(&spec, 1).unwrap();
        assert_eq!(learner.id(), "regr.kknn.tuned");
        assert_eq!(learner.task_type(), TaskType::Regr);
    }

    #[test]
    fn test_build_learner_rejects_unknown_parameter() {
        let mut spec = LearnerSpec::new("classif.featureless");
        spec.params.insert("depth".to_string(), ParamValue::Int(3));
        assert!(build_learner(&spec, 1).is_err());
    }

    #[test]
    fn test_build_measures_defaults_per_task_type() {
        let measures =
            build_measures(&[], &[TaskType::Classif, TaskType::Surv, TaskType::Classif]).unwrap();
        let ids: Vec<&str> = measures.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["classif.ce", "surv.cindex"]);

        let explicit = build_measures(&["regr.rmse".to_string()], &[TaskType::Classif]).unwrap();
        assert_eq!(explicit[0].id(), "regr.rmse");
        assert!(build_measures(&["nope".to_string()], &[]).is_err());
    }

    #[test]
    fn test_build_resampling_rejects_bad_ratio() {
        assert!(build_resampling(&Strategy::Holdout { ratio: 1.5 }).is_err());
    }
}
