//! @ai:module:intent Tuning instance: evaluates configurations by resampling and records them
//! @ai:module:layer application
//! @ai:module:public_api TuningInstance, TuningResult, tune
//! @ai:module:stateless false

use crate::error::{Error, Result};
use crate::learner::Learner;
use crate::measure::Measure;
use crate::param::{format_config, ParamConfig, ParamSet};
use crate::resample::{resample, ResampleOptions};
use crate::resampling::Resampling;
use crate::task::Task;
use crate::tuning::archive::{Archive, ArchiveEntry};
use crate::tuning::terminator::Terminator;
use crate::tuning::tuner::Tuner;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// @ai:intent Best configuration found and its inner score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningResult {
    pub config: ParamConfig,
    pub measure: String,
    pub score: f64,
}

/// @ai:intent Everything one tuning run needs, plus the growing archive
#[derive(Debug, Clone)]
pub struct TuningInstance {
    task: Task,
    learner: Learner,
    resampling: Resampling,
    measure: Arc<dyn Measure>,
    search_space: ParamSet,
    terminator: Terminator,
    archive: Archive,
    opts: ResampleOptions,
    started: Instant,
}

impl TuningInstance {
    /// @ai:intent Validate the setup and instantiate the resampling once for all configurations
    /// @ai:pre search space ids are parameters of the learner
    /// @ai:effects compute
    pub fn new(
        task: &Task,
        learner: &Learner,
        resampling: &Resampling,
        measure: Arc<dyn Measure>,
        search_space: ParamSet,
        terminator: Terminator,
        seed: u64,
    ) -> Result<Self> {
        if learner.task_type() != task.task_type() {
            return Err(Error::TypeMismatch(format!(
                "cannot tune {} learner '{}' on {} task '{}'",
                learner.task_type(),
                learner.id(),
                task.task_type(),
                task.id()
            )));
        }
        if let Some(expected) = measure.task_type() {
            if expected != task.task_type() {
                return Err(Error::TypeMismatch(format!(
                    "measure '{}' cannot score {} tasks",
                    measure.id(),
                    task.task_type()
                )));
            }
        }
        search_space.validate()?;
        for id in search_space.ids() {
            if learner.param_set().param(id).is_none() {
                return Err(Error::invalid_param(
                    id,
                    format!("not a parameter of learner '{}'", learner.id()),
                ));
            }
        }

        let mut resampling = resampling.clone();
        if resampling.is_instantiated() {
            resampling.check_task(task)?;
        } else {
            resampling.instantiate(task, seed)?;
        }

        Ok(Self {
            task: task.clone(),
            learner: learner.clone(),
            resampling,
            measure,
            search_space,
            terminator,
            archive: Archive::default(),
            opts: ResampleOptions {
                seed,
                ..Default::default()
            },
            started: Instant::now(),
        })
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn resampling(&self) -> &Resampling {
        &self.resampling
    }

    pub fn search_space(&self) -> &ParamSet {
        &self.search_space
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator
            .is_terminated(&self.archive, self.measure.minimize(), self.started.elapsed())
    }

    /// @ai:intent Resample the learner once per configuration and archive the scores
    /// @ai:effects compute, state:write
    pub fn eval_batch(&mut self, configs: Vec<ParamConfig>) -> Result<()> {
        let batch = self.archive.n_batches();
        for config in configs {
            let learner = self.learner.clone().with_params(&config)?;
            let start = Instant::now();
            let rr = resample(&self.task, &learner, &self.resampling, &self.opts)?;
            let score = rr
                .aggregate(std::slice::from_ref(&self.measure))?
                .remove(self.measure.id())
                .unwrap_or(f64::NAN);

            tracing::debug!(
                "Tuning {} batch {}: [{}] {} = {:.4}",
                self.learner.id(),
                batch,
                format_config(&config),
                self.measure.id(),
                score
            );

            self.archive.push(ArchiveEntry {
                batch,
                config,
                score,
                warnings: rr.warning_count(),
                errors: rr.error_count(),
                runtime: start.elapsed(),
            });
        }
        Ok(())
    }

    /// @ai:intent Best archived configuration
    /// @ai:pre at least one configuration produced a score
    /// @ai:effects pure
    pub fn result(&self) -> Result<TuningResult> {
        let best = self
            .archive
            .best(self.measure.minimize())
            .ok_or_else(|| Error::Tuning("no configuration produced a score".to_string()))?;
        Ok(TuningResult {
            config: best.config.clone(),
            measure: self.measure.id().to_string(),
            score: best.score,
        })
    }
}

/// @ai:intent Run a full search and return the instance holding the archive
/// @ai:pre the tuner can run out of candidates or the terminator is bounded
/// @ai:effects compute
#[allow(clippy::too_many_arguments)]
pub fn tune(
    tuner: &Tuner,
    task: &Task,
    learner: &Learner,
    resampling: &Resampling,
    measure: Arc<dyn Measure>,
    search_space: &ParamSet,
    terminator: &Terminator,
    seed: u64,
) -> Result<TuningInstance> {
    if !tuner.is_finite() && !terminator.is_bounded() {
        return Err(Error::Tuning(format!(
            "{} needs a terminator that bounds the number of evaluations",
            tuner.id()
        )));
    }

    let mut instance = TuningInstance::new(
        task,
        learner,
        resampling,
        measure,
        search_space.clone(),
        terminator.clone(),
        seed,
    )?;
    let mut proposer = tuner.proposer(search_space, seed)?;

    while !instance.is_terminated() {
        let batch = proposer.next_batch()?;
        if batch.is_empty() {
            break;
        }
        instance.eval_batch(batch)?;
    }

    let result = instance.result()?;
    tracing::info!(
        "Tuned {} on {} with {} evaluations: [{}] {} = {:.4}",
        learner.id(),
        task.id(),
        instance.archive().len(),
        format_config(&result.config),
        result.measure,
        result.score
    );
    Ok(instance)
}
