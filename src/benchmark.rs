//! @ai:module:intent Benchmark designs: tasks x learners x resamplings
//! @ai:module:layer application
//! @ai:module:public_api DesignRow, benchmark_grid, benchmark
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::learner::Learner;
use crate::resample::{resample, ResampleOptions};
use crate::resampling::Resampling;
use crate::result::BenchmarkResult;
use crate::task::Task;
use std::collections::HashSet;

/// @ai:intent One cell of a benchmark design
#[derive(Debug, Clone)]
pub struct DesignRow {
    pub task: Task,
    pub learner: Learner,
    /// Instantiated on `task`
    pub resampling: Resampling,
}

/// @ai:intent Full cross product with one shared instantiation per task and resampling
///
/// Resamplings already instantiated must belong to the task; others are instantiated
/// with `seed`, so all learners on a task see identical splits.
/// @ai:effects compute
pub fn benchmark_grid(
    tasks: &[Task],
    learners: &[Learner],
    resamplings: &[Resampling],
    seed: u64,
) -> Result<Vec<DesignRow>> {
    let mut design = Vec::with_capacity(tasks.len() * learners.len() * resamplings.len());
    for task in tasks {
        for resampling in resamplings {
            let mut instance = resampling.clone();
            if instance.is_instantiated() {
                instance.check_task(task)?;
            } else {
                instance.instantiate(task, seed)?;
            }
            for learner in learners {
                design.push(DesignRow {
                    task: task.clone(),
                    learner: learner.clone(),
                    resampling: instance.clone(),
                });
            }
        }
    }

    let mut seen = HashSet::new();
    for row in &design {
        let key = (row.task.hash(), row.learner.hash(), row.resampling.hash());
        if !seen.insert(key) {
            tracing::warn!(
                "Duplicate design row: {} / {} / {}",
                row.task.id(),
                row.learner.id(),
                row.resampling.id()
            );
        }
    }
    Ok(design)
}

/// @ai:intent Resample every design row and collect the results in design order
/// @ai:pre every row pairs a learner with a task of the same type
/// @ai:effects compute, parallel when requested
pub fn benchmark(design: &[DesignRow], opts: &ResampleOptions) -> Result<BenchmarkResult> {
    for row in design {
        if row.learner.task_type() != row.task.task_type() {
            return Err(Error::TypeMismatch(format!(
                "design pairs learner '{}' ({}) with task '{}' ({})",
                row.learner.id(),
                row.learner.task_type(),
                row.task.id(),
                row.task.task_type()
            )));
        }
    }

    tracing::info!("Running benchmark with {} design rows", design.len());
    let mut result = BenchmarkResult::new();
    for (i, row) in design.iter().enumerate() {
        tracing::info!(
            "[{}/{}] {} on {} with {}",
            i + 1,
            design.len(),
            row.learner.id(),
            row.task.id(),
            row.resampling.id()
        );
        result.push(resample(&row.task, &row.learner, &row.resampling, opts)?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::lrn;
    use crate::measure::msr;
    use crate::resampling::Strategy;
    use crate::task::generators::{friedman1, two_normals};

    #[test]
    fn test_grid_shares_instantiation_across_learners() {
        let tasks = vec![two_normals(30, 1).unwrap()];
        let learners = vec![lrn("classif.featureless").unwrap(), lrn("classif.kknn").unwrap()];
        let resamplings = vec![Resampling::new(Strategy::Cv { folds: 3 }).unwrap()];

        let design = benchmark_grid(&tasks, &learners, &resamplings, 1).unwrap();
        assert_eq!(design.len(), 2);
        assert_eq!(design[0].resampling.instance(), design[1].resampling.instance());
    }

    #[test]
    fn test_benchmark_runs_every_row() {
        let tasks = vec![two_normals(30, 1).unwrap()];
        let learners = vec![lrn("classif.featureless").unwrap(), lrn("classif.kknn").unwrap()];
        let resamplings = vec![
            Resampling::new(Strategy::Cv { folds: 3 }).unwrap(),
            Resampling::new(Strategy::Holdout { ratio: 0.7 }).unwrap(),
        ];
        let design = benchmark_grid(&tasks, &learners, &resamplings, 1).unwrap();
        let bmr = benchmark(&design, &ResampleOptions::default()).unwrap();

        assert_eq!(bmr.len(), 4);
        assert_eq!(bmr.resampling_ids(), vec!["cv", "holdout"]);
        let rows = bmr.aggregate(&[msr("classif.acc").unwrap()]).unwrap();
        assert!(rows.iter().all(|r| r.scores["classif.acc"] >= 0.0));
    }

    #[test]
    fn test_mismatched_types_rejected_before_running() {
        let design = vec![DesignRow {
            task: friedman1(20, 1).unwrap(),
            learner: lrn("classif.featureless").unwrap(),
            resampling: Resampling::new(Strategy::Cv { folds: 2 }).unwrap(),
        }];
        assert!(matches!(
            benchmark(&design, &ResampleOptions::default()),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_grid_rejects_foreign_instance() {
        let task = two_normals(30, 1).unwrap();
        let mut resampling = Resampling::new(Strategy::Cv { folds: 3 }).unwrap();
        resampling.instantiate(&friedman1(30, 1).unwrap(), 1).unwrap();
        let result = benchmark_grid(
            &[task],
            &[lrn("classif.featureless").unwrap()],
            &[resampling],
            1,
        );
        assert!(result.is_err());
    }
}
