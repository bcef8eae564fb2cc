//! @ai:module:intent Learner wrapper that tunes itself on its training rows (nested resampling)
//! @ai:module:layer application
//! @ai:module:public_api AutoTuner, TunedModel, InnerTuningRow, extract_inner_tuning_results
//! @ai:module:stateless false

use crate::error::{Error, Result};
use crate::learner::{Algorithm, Conditions, FittedModel, Learner, PredictType};
use crate::measure::Measure;
use crate::param::{ParamConfig, ParamSet};
use crate::prediction::Prediction;
use crate::resampling::Resampling;
use crate::result::ResampleResult;
use crate::task::{Task, TaskType};
use crate::tuning::archive::Archive;
use crate::tuning::instance::{tune, TuningResult};
use crate::tuning::terminator::Terminator;
use crate::tuning::tuner::Tuner;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// @ai:intent Builds auto-tuning learners
pub struct AutoTuner;

#[derive(Debug, Clone)]
struct AutoTunerAlgorithm {
    learner: Learner,
    resampling: Resampling,
    measure: Arc<dyn Measure>,
    search_space: ParamSet,
    terminator: Terminator,
    tuner: Tuner,
    seed: u64,
}

/// @ai:intent Inner learner trained with the best configuration, plus how it was found
#[derive(Debug, Clone)]
pub struct TunedModel {
    learner: Learner,
    result: TuningResult,
    archive: Archive,
    inner_resampling: Resampling,
}

impl TunedModel {
    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    pub fn tuning_result(&self) -> &TuningResult {
        &self.result
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Inner resampling, instantiated on the outer training rows only.
    pub fn inner_resampling(&self) -> &Resampling {
        &self.inner_resampling
    }
}

impl AutoTuner {
    /// @ai:intent Wrap `learner` so that training runs a full search first
    /// @ai:pre search space ids are parameters of `learner`; resampling not instantiated
    /// @ai:effects pure
    #[allow(clippy::new_ret_no_self, clippy::too_many_arguments)]
    pub fn new(
        learner: Learner,
        resampling: Resampling,
        measure: Arc<dyn Measure>,
        search_space: ParamSet,
        terminator: Terminator,
        tuner: Tuner,
        seed: u64,
    ) -> Result<Learner> {
        search_space.validate()?;
        for id in search_space.ids() {
            if learner.param_set().param(id).is_none() {
                return Err(Error::invalid_param(
                    id,
                    format!("not a parameter of learner '{}'", learner.id()),
                ));
            }
        }
        if !tuner.is_finite() && !terminator.is_bounded() {
            return Err(Error::Tuning(format!(
                "{} needs a terminator that bounds the number of evaluations",
                tuner.id()
            )));
        }
        if resampling.is_instantiated() {
            return Err(Error::InvalidResampling(
                "inner resampling must not be instantiated; it is drawn on each training set"
                    .to_string(),
            ));
        }

        let id = format!("{}.tuned", learner.id());
        let predict_type = learner.predict_type();
        let algorithm = AutoTunerAlgorithm {
            learner,
            resampling,
            measure,
            search_space,
            terminator,
            tuner,
            seed,
        };
        Learner::new(id, Arc::new(algorithm)).with_predict_type(predict_type)
    }

    /// @ai:intent Tuning outcome of a trained auto-tuner; None for other learners
    /// @ai:effects pure
    pub fn tuning_result(learner: &Learner) -> Option<&TunedModel> {
        learner.model()?.as_any().downcast_ref::<TunedModel>()
    }
}

impl Algorithm for AutoTunerAlgorithm {
    fn task_type(&self) -> TaskType {
        self.learner.task_type()
    }

    fn predict_types(&self) -> &[PredictType] {
        self.learner.predict_types()
    }

    fn param_set(&self) -> ParamSet {
        ParamSet::new()
    }

    fn train(
        &self,
        task: &Task,
        rows: &[usize],
        _params: &ParamSet,
        conditions: &mut Conditions,
    ) -> Result<Box<dyn FittedModel>> {
        // Inner splits run on distinct rows so no copy of a row lands on both
        // sides; the final fit below keeps the repeated rows as given.
        let mut view = task.clone();
        view.filter(rows)?;

        let instance = tune(
            &self.tuner,
            &view,
            &self.learner,
            &self.resampling,
            self.measure.clone(),
            &self.search_space,
            &self.terminator,
            self.seed,
        )?;
        let result = instance.result()?;

        let mut learner = self.learner.clone().with_params(&result.config)?;
        learner.train_with_conditions(task, Some(rows), conditions)?;

        Ok(Box::new(TunedModel {
            learner,
            result,
            archive: instance.archive().clone(),
            inner_resampling: instance.resampling().clone(),
        }))
    }
}

impl FittedModel for TunedModel {
    fn predict(
        &self,
        task: &Task,
        rows: &[usize],
        predict_type: PredictType,
        conditions: &mut Conditions,
    ) -> Result<Prediction> {
        let learner = self.learner.clone().with_predict_type(predict_type)?;
        learner.predict_with_conditions(task, Some(rows), conditions)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// @ai:intent Best inner configuration of one outer iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerTuningRow {
    pub task_id: String,
    pub learner_id: String,
    pub iteration: usize,
    pub config: ParamConfig,
    pub measure: String,
    pub score: f64,
}

/// @ai:intent List the inner tuning results of every outer iteration
/// @ai:pre the result was produced with stored models and an auto-tuner
/// @ai:effects pure
pub fn extract_inner_tuning_results(rr: &ResampleResult) -> Result<Vec<InnerTuningRow>> {
    if rr.learners().iter().all(|l| l.is_none()) {
        return Err(Error::Tuning(
            "no models stored; resample with store_models enabled".to_string(),
        ));
    }

    Ok(rr
        .iterations()
        .iter()
        .filter_map(|record| {
            let tuned = AutoTuner::tuning_result(record.learner.as_ref()?)?;
            let result = tuned.tuning_result();
            Some(InnerTuningRow {
                task_id: rr.task().id().to_string(),
                learner_id: rr.learner().id().to_string(),
                iteration: record.iteration,
                config: result.config.clone(),
                measure: result.measure.clone(),
                score: result.score,
            })
        })
        .collect())
}
