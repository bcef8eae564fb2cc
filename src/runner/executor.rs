//! @ai:module:intent Benchmark execution from a configuration
//! @ai:module:layer application
//! @ai:module:public_api BenchmarkRunner, load_tasks
//! @ai:module:stateless false

use crate::benchmark::{benchmark, benchmark_grid, DesignRow};
use crate::config::{BenchmarkConfig, RunConfig};
use crate::learner::Learner;
use crate::report::BenchmarkReport;
use crate::resample::{Parallelism, ResampleOptions};
use crate::resampling::Resampling;
use crate::runner::builder::{build_learner, build_measures, build_resampling};
use crate::task::generators::generate;
use crate::task::{Task, TaskLoader, TaskLoaderTrait, TaskType};
use anyhow::{bail, Context, Result};

/// @ai:intent Load manifest tasks plus configured synthetic tasks, filtered
/// @ai:effects fs:read
pub fn load_tasks(config: &BenchmarkConfig) -> Result<Vec<Task>> {
    let mut tasks = Vec::new();
    let tasks_dir = &config.paths.tasks_dir;
    if tasks_dir.exists() {
        tracing::info!("Loading tasks from {}", tasks_dir.display());
        tasks.extend(TaskLoader::new().load_filtered(tasks_dir, &config.run.filter)?);
    } else {
        tracing::debug!("Task directory {} not found, skipping", tasks_dir.display());
    }

    for spec in &config.design.generated {
        let task = generate(&spec.generator, spec.n, spec.seed)
            .with_context(|| format!("Failed to generate task '{}'", spec.generator))?;
        if config
            .run
            .filter
            .matches_task(task.id(), task.task_type().as_str())
        {
            tasks.push(task);
        }
    }
    Ok(tasks)
}

/// @ai:intent Builds the design from a configuration and runs it
pub struct BenchmarkRunner {
    run_config: RunConfig,
    learners: Vec<Learner>,
    resamplings: Vec<Resampling>,
}

impl BenchmarkRunner {
    /// @ai:intent Resolve every learner and resampling entry upfront
    /// @ai:effects pure
    pub fn new(config: &BenchmarkConfig) -> Result<Self> {
        let learners = config
            .design
            .learners
            .iter()
            .filter(|spec| config.run.filter.matches_learner(&spec.id))
            .map(|spec| build_learner(spec, config.run.seed))
            .collect::<Result<Vec<_>>>()?;
        let resamplings = config
            .design
            .resamplings
            .iter()
            .map(build_resampling)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            run_config: config.run.clone(),
            learners,
            resamplings,
        })
    }

    fn options(&self) -> ResampleOptions {
        ResampleOptions {
            store_models: self.run_config.store_models,
            parallelism: if self.run_config.parallel {
                Parallelism::Parallel
            } else {
                Parallelism::Sequential
            },
            workers: self.run_config.workers,
            encapsulate: self.run_config.encapsulate,
            seed: self.run_config.seed,
        }
    }

    /// @ai:intent Cross every task with the learners of its type and every resampling
    /// @ai:effects compute
    pub fn design(&self, tasks: &[Task]) -> Result<Vec<DesignRow>> {
        let mut design = Vec::new();
        for task_type in [TaskType::Classif, TaskType::Regr, TaskType::Surv] {
            let typed_tasks: Vec<Task> = tasks
                .iter()
                .filter(|t| t.task_type() == task_type)
                .cloned()
                .collect();
            let typed_learners: Vec<Learner> = self
                .learners
                .iter()
                .filter(|l| l.task_type() == task_type)
                .cloned()
                .collect();
            if typed_tasks.is_empty() || typed_learners.is_empty() {
                continue;
            }
            design.extend(benchmark_grid(
                &typed_tasks,
                &typed_learners,
                &self.resamplings,
                self.run_config.seed,
            )?);
        }
        Ok(design)
    }

    /// @ai:intent Run the design and score it into a report
    /// @ai:effects compute, parallel when configured
    pub fn run(&self, tasks: &[Task]) -> Result<BenchmarkReport> {
        let design = self.design(tasks)?;
        if design.is_empty() {
            bail!("Design is empty: no task has a learner of the same type");
        }

        tracing::info!(
            "Running {} design rows over {} tasks",
            design.len(),
            tasks.len()
        );
        let result = benchmark(&design, &self.options())?;

        let mut task_types: Vec<TaskType> = tasks.iter().map(|t| t.task_type()).collect();
        task_types.dedup();
        let measures = build_measures(&self.run_config.measures, &task_types)?;
        BenchmarkReport::from_result(&result, &measures, self.run_config.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterConfig, GeneratedTaskSpec, LearnerSpec, PathConfig};
    use crate::resampling::Strategy;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> BenchmarkConfig {
        let mut config = BenchmarkConfig::default();
        config.paths = PathConfig {
            tasks_dir: dir.path().join("tasks"),
            results_dir: dir.path().join("results"),
        };
        config.design.generated = vec![
            GeneratedTaskSpec {
                generator: "2dnormals".to_string(),
                n: 60,
                seed: 1,
            },
            GeneratedTaskSpec {
                generator: "friedman1".to_string(),
                n: 60,
                seed: 1,
            },
        ];
        config.design.learners = ["classif.featureless", "classif.kknn", "regr.featureless"]
            .iter()
            .map(|id| LearnerSpec::new(id))
            .collect();
        config.design.resamplings = vec![Strategy::Cv { folds: 3 }];
        config
    }

    #[test]
    fn test_design_pairs_matching_types_only() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        let tasks = load_tasks(&config).unwrap();
        assert_eq!(tasks.len(), 2);

        let runner = BenchmarkRunner::new(&config).unwrap();
        let design = runner.design(&tasks).unwrap();
        assert_eq!(design.len(), 3);
        assert!(design
            .iter()
            .all(|row| row.learner.task_type() == row.task.task_type()));
    }

    #[test]
    fn test_run_produces_report_with_default_measures() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        let tasks = load_tasks(&config).unwrap();

        let report = BenchmarkRunner::new(&config).unwrap().run(&tasks).unwrap();
        assert_eq!(report.measures, vec!["classif.ce", "regr.mse"]);
        assert_eq!(report.aggregate.len(), 3);
        assert_eq!(report.scores.len(), 9);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_filter_limits_tasks_and_learners() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.run.filter = FilterConfig {
            task_types: Some(vec!["classif".to_string()]),
            learner_ids: Some(vec!["classif.kknn".to_string()]),
            ..Default::default()
        };

        let tasks = load_tasks(&config).unwrap();
        let runner = BenchmarkRunner::new(&config).unwrap();
        let design = runner.design(&tasks).unwrap();
        assert_eq!(design.len(), 1);
        assert_eq!(design[0].learner.id(), "classif.kknn");
    }

    #[test]
    fn test_empty_design_is_an_error() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.design.learners = vec![LearnerSpec::new("surv.kaplan")];

        let tasks = load_tasks(&config).unwrap();
        let runner = BenchmarkRunner::new(&config).unwrap();
        assert!(runner.run(&tasks).is_err());
    }
}
