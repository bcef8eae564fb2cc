//! @ai:module:intent Run one learner over every iteration of a resampling
//! @ai:module:layer application
//! @ai:module:public_api resample, ResampleOptions, Parallelism
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::learner::{Conditions, Learner};
use crate::prediction::Prediction;
use crate::resampling::Resampling;
use crate::result::{IterationRecord, ResampleResult};
use crate::task::Task;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// @ai:intent Whether iterations run one after another or on a worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

/// @ai:intent Options shared by `resample` and `benchmark`
#[derive(Debug, Clone)]
pub struct ResampleOptions {
    /// Keep the trained learner of every iteration
    pub store_models: bool,
    pub parallelism: Parallelism,
    /// Worker threads for `Parallel`; rayon's global pool when None
    pub workers: Option<usize>,
    /// Capture errors and panics per iteration instead of aborting
    pub encapsulate: bool,
    /// Seed for resamplings that still need instantiation
    pub seed: u64,
}

impl Default for ResampleOptions {
    fn default() -> Self {
        Self {
            store_models: false,
            parallelism: Parallelism::Sequential,
            workers: None,
            encapsulate: true,
            seed: 42,
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Train,
    Predict,
}

/// Run `f`, turning panics into the error of the phase that failed when encapsulating.
fn guarded<T>(
    encapsulate: bool,
    phase: Phase,
    learner_id: &str,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    if !encapsulate {
        return f();
    }
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let learner = learner_id.to_string();
            let message = format!("panicked: {}", panic_message(payload));
            Err(match phase {
                Phase::Train => Error::Train { learner, message },
                Phase::Predict => Error::Predict { learner, message },
            })
        }
    }
}

/// Train on `train` and predict `test`; returns the prediction and the train/predict times.
fn fit_predict(
    learner: &mut Learner,
    task: &Task,
    train: &[usize],
    test: &[usize],
    encapsulate: bool,
    conditions: &mut Conditions,
) -> (Result<Prediction>, Duration, Duration) {
    let learner_id = learner.id().to_string();
    let start = Instant::now();
    let trained = guarded(encapsulate, Phase::Train, &learner_id, || {
        learner.train_with_conditions(task, Some(train), conditions)
    });
    let train_time = start.elapsed();
    if let Err(e) = trained {
        return (Err(e), train_time, Duration::ZERO);
    }

    let start = Instant::now();
    let learner = &*learner;
    let prediction = guarded(encapsulate, Phase::Predict, &learner_id, || {
        learner.predict_with_conditions(task, Some(test), conditions)
    });
    (prediction, train_time, start.elapsed())
}

fn run_iteration(
    task: &Task,
    prototype: &Learner,
    resampling: &Resampling,
    iteration: usize,
    opts: &ResampleOptions,
) -> Result<IterationRecord> {
    let train = resampling.train_set(iteration)?;
    let test = resampling.test_set(iteration)?;
    tracing::debug!(
        "Iteration {}/{}: {} on {} ({} train, {} test rows)",
        iteration + 1,
        resampling.iters(),
        prototype.id(),
        task.id(),
        train.len(),
        test.len()
    );

    let mut learner = prototype.clone();
    learner.reset();
    let mut conditions = Conditions::new();
    let mut errors = Vec::new();
    let mut fallback_used = false;

    let (outcome, train_time, predict_time) =
        fit_predict(&mut learner, task, train, test, opts.encapsulate, &mut conditions);

    let prediction = match outcome {
        Ok(prediction) => Some(prediction),
        Err(e) if !opts.encapsulate => return Err(e),
        Err(e) => {
            tracing::warn!(
                "Iteration {} of {} on {} failed: {}",
                iteration + 1,
                learner.id(),
                task.id(),
                e
            );
            errors.push(e.to_string());

            match learner.fallback().cloned() {
                Some(mut fallback) => {
                    tracing::info!(
                        "Using fallback {} for iteration {} of {}",
                        fallback.id(),
                        iteration + 1,
                        learner.id()
                    );
                    fallback_used = true;
                    let (outcome, _, _) =
                        fit_predict(&mut fallback, task, train, test, true, &mut conditions);
                    match outcome {
                        Ok(prediction) => Some(prediction),
                        Err(e) => {
                            errors.push(format!("fallback {}: {}", fallback.id(), e));
                            None
                        }
                    }
                }
                None => None,
            }
        }
    };

    Ok(IterationRecord {
        iteration,
        prediction,
        learner: opts.store_models.then_some(learner),
        train_time,
        predict_time,
        warnings: conditions.into_warnings(),
        errors,
        fallback_used,
    })
}

/// @ai:intent Train and predict the learner on every iteration of the resampling
/// @ai:pre learner and task share a task type; an instantiated resampling matches the task
/// @ai:effects compute, parallel when requested
pub fn resample(
    task: &Task,
    learner: &Learner,
    resampling: &Resampling,
    opts: &ResampleOptions,
) -> Result<ResampleResult> {
    if learner.task_type() != task.task_type() {
        return Err(Error::TypeMismatch(format!(
            "learner '{}' is {}, task '{}' is {}",
            learner.id(),
            learner.task_type(),
            task.id(),
            task.task_type()
        )));
    }

    let mut resampling = resampling.clone();
    if resampling.is_instantiated() {
        resampling.check_task(task)?;
    } else {
        resampling.instantiate(task, opts.seed)?;
    }

    let mut prototype = learner.clone();
    prototype.reset();

    tracing::info!(
        "Resampling {} on {} with {} ({} iterations)",
        prototype.id(),
        task.id(),
        resampling.id(),
        resampling.iters()
    );

    let n = resampling.iters();
    let run = |i: usize| run_iteration(task, &prototype, &resampling, i, opts);
    let iterations: Vec<IterationRecord> = match (opts.parallelism, opts.workers) {
        (Parallelism::Sequential, _) => (0..n).map(run).collect::<Result<_>>()?,
        (Parallelism::Parallel, None) => (0..n).into_par_iter().map(run).collect::<Result<_>>()?,
        (Parallelism::Parallel, Some(workers)) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
            pool.install(|| (0..n).into_par_iter().map(run).collect::<Result<_>>())?
        }
    };

    let failed = iterations.iter().filter(|r| !r.errors.is_empty()).count();
    if failed > 0 {
        tracing::warn!(
            "{} of {} iterations of {} on {} recorded errors",
            failed,
            n,
            prototype.id(),
            task.id()
        );
    }

    Ok(ResampleResult::new(
        task.clone(),
        prototype,
        resampling,
        iterations,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::lrn;
    use crate::param::{ParamConfig, ParamValue};
    use crate::resampling::Strategy;
    use crate::task::generators::{friedman1, two_normals};

    fn debug_learner(param: &str) -> Learner {
        let mut values = ParamConfig::new();
        values.insert(param.to_string(), ParamValue::Dbl(1.0));
        lrn("classif.debug").unwrap().with_params(&values).unwrap()
    }

    fn cv(folds: usize) -> Resampling {
        Resampling::new(Strategy::Cv { folds }).unwrap()
    }

    #[test]
    fn test_resample_instantiates_and_predicts_every_row() {
        let task = two_normals(30, 1).unwrap();
        let rr = resample(&task, &lrn("classif.kknn").unwrap(), &cv(3), &ResampleOptions::default())
            .unwrap();
        assert_eq!(rr.iters(), 3);
        assert!(rr.resampling().is_instantiated());
        assert_eq!(rr.prediction().unwrap().len(), 30);
        assert!(rr.learners().iter().all(|l| l.is_none()));
    }

    #[test]
    fn test_failures_are_captured_not_raised() {
        let task = two_normals(30, 1).unwrap();
        let rr = resample(&task, &debug_learner("error_train"), &cv(3), &ResampleOptions::default())
            .unwrap();
        assert_eq!(rr.errors().len(), 3);
        assert!(rr.predictions().iter().all(|p| p.is_none()));
    }

    #[test]
    fn test_failures_raise_without_encapsulation() {
        let task = two_normals(30, 1).unwrap();
        let opts = ResampleOptions {
            encapsulate: false,
            ..Default::default()
        };
        assert!(resample(&task, &debug_learner("error_train"), &cv(3), &opts).is_err());
    }

    #[test]
    fn test_fallback_predicts_for_failed_iterations() {
        let task = two_normals(30, 1).unwrap();
        let learner = debug_learner("error_predict")
            .with_fallback(lrn("classif.featureless").unwrap())
            .unwrap();
        let rr = resample(&task, &learner, &cv(3), &ResampleOptions::default()).unwrap();
        assert_eq!(rr.errors().len(), 3);
        assert!(rr.iterations().iter().all(|r| r.fallback_used));
        assert_eq!(rr.prediction().unwrap().len(), 30);
    }

    #[test]
    fn test_panics_are_captured() {
        let task = two_normals(20, 1).unwrap();
        let mut values = ParamConfig::new();
        values.insert("panic_train".to_string(), ParamValue::Lgl(true));
        let learner = lrn("classif.debug").unwrap().with_params(&values).unwrap();
        let rr = resample(&task, &learner, &cv(2), &ResampleOptions::default()).unwrap();
        assert_eq!(rr.errors().len(), 2);
        let message = &rr.errors()[0].message;
        assert!(message.contains("failed to train"));
        assert!(message.contains("classif.debug"));
        assert!(message.contains("panicked"));
    }

    #[test]
    fn test_panic_maps_to_phase_error() {
        let train: Result<()> = guarded(true, Phase::Train, "classif.debug", || panic!("boom"));
        match train {
            Err(Error::Train { learner, message }) => {
                assert_eq!(learner, "classif.debug");
                assert_eq!(message, "panicked: boom");
            }
            other => panic!("unexpected {:?}", other),
        }

        let predict: Result<()> = guarded(true, Phase::Predict, "regr.kknn", || panic!("boom"));
        assert!(matches!(predict, Err(Error::Predict { .. })));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let task = friedman1(40, 2).unwrap();
        let mut resampling = cv(4);
        resampling.instantiate(&task, 5).unwrap();
        let learner = lrn("regr.kknn").unwrap();

        let sequential =
            resample(&task, &learner, &resampling, &ResampleOptions::default()).unwrap();
        let parallel = resample(
            &task,
            &learner,
            &resampling,
            &ResampleOptions {
                parallelism: Parallelism::Parallel,
                workers: Some(2),
                store_models: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(sequential.prediction().unwrap(), parallel.prediction().unwrap());
        assert_eq!(sequential.uhash(), parallel.uhash());
        assert!(parallel.learners().iter().all(|l| l.unwrap().is_trained()));
    }

    #[test]
    fn test_resampling_for_other_task_rejected() {
        let task = friedman1(20, 1).unwrap();
        let mut other = task.clone();
        other.set_id("other");
        let mut resampling = cv(2);
        resampling.instantiate(&other, 1).unwrap();
        let result = resample(&task, &lrn("regr.featureless").unwrap(), &resampling, &ResampleOptions::default());
        assert!(matches!(result, Err(Error::ResamplingMismatch { .. })));
    }
}
