//! @ai:module:intent Configuration structs for benchmark runs
//! @ai:module:layer infrastructure
//! @ai:module:public_api BenchmarkConfig, RunConfig, DesignConfig, PathConfig, FilterConfig, LearnerSpec, TuningSpec, GeneratedTaskSpec
//! @ai:module:stateless true

use crate::learner::PredictType;
use crate::param::{Param, ParamValue};
use crate::resampling::Strategy;
use crate::tuning::{Terminator, Tuner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// @ai:intent Main configuration for a benchmark run
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub design: DesignConfig,
    #[serde(default)]
    pub paths: PathConfig,
}

/// @ai:intent Execution settings shared by every design row
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub store_models: bool,
    #[serde(default)]
    pub parallel: bool,
    /// Size of the worker pool when `parallel` is set; rayon's default otherwise
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_encapsulate")]
    pub encapsulate: bool,
    /// Measure ids; empty means the default measure of each task type
    #[serde(default)]
    pub measures: Vec<String>,
    #[serde(default)]
    pub filter: FilterConfig,
}

/// @ai:intent Learners, resamplings and generated tasks forming the design
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignConfig {
    #[serde(default)]
    pub learners: Vec<LearnerSpec>,
    #[serde(default)]
    pub resamplings: Vec<Strategy>,
    #[serde(default)]
    pub generated: Vec<GeneratedTaskSpec>,
}

/// @ai:intent Learner entry of the design
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerSpec {
    pub id: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    #[serde(default)]
    pub predict_type: Option<PredictType>,
    /// Learner id trained in place of a failing one
    #[serde(default)]
    pub fallback: Option<String>,
    /// Wraps the learner in an auto-tuner when present
    #[serde(default)]
    pub tuning: Option<TuningSpec>,
}

/// @ai:intent Inner tuning setup for nested resampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningSpec {
    pub tuner: Tuner,
    pub terminator: Terminator,
    pub resampling: Strategy,
    pub measure: String,
    pub search_space: Vec<Param>,
}

/// @ai:intent Synthetic task included in the design
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTaskSpec {
    pub generator: String,
    #[serde(default = "default_generated_rows")]
    pub n: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// @ai:intent Path configuration for input/output directories
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub tasks_dir: PathBuf,
    pub results_dir: PathBuf,
}

/// @ai:intent Filter configuration for selecting tasks and learners
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub task_ids: Option<Vec<String>>,
    pub task_types: Option<Vec<String>>,
    pub learner_ids: Option<Vec<String>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            store_models: false,
            parallel: false,
            workers: None,
            encapsulate: default_encapsulate(),
            measures: Vec::new(),
            filter: FilterConfig::default(),
        }
    }
}

impl Default for DesignConfig {
    fn default() -> Self {
        let learners = [
            "classif.featureless",
            "classif.kknn",
            "regr.featureless",
            "regr.kknn",
            "surv.kaplan",
        ]
        .iter()
        .map(|id| LearnerSpec::new(id))
        .collect();

        let generated = ["2dnormals", "friedman1", "simsurv"]
            .iter()
            .map(|g| GeneratedTaskSpec {
                generator: g.to_string(),
                n: default_generated_rows(),
                seed: default_seed(),
            })
            .collect();

        Self {
            learners,
            resamplings: vec![Strategy::Cv { folds: 3 }],
            generated,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            tasks_dir: PathBuf::from("tasks"),
            results_dir: PathBuf::from("results"),
        }
    }
}

impl LearnerSpec {
    /// @ai:intent Learner entry with default settings
    /// @ai:effects pure
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            params: BTreeMap::new(),
            predict_type: None,
            fallback: None,
            tuning: None,
        }
    }
}

fn default_seed() -> u64 {
    42
}

fn default_encapsulate() -> bool {
    true
}

fn default_generated_rows() -> usize {
    200
}

impl BenchmarkConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// @ai:intent Save configuration to a TOML file
    /// @ai:effects fs:write
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn list_matches(list: &Option<Vec<String>>, value: &str) -> bool {
    list.as_ref()
        .map(|items| items.iter().any(|item| item == value))
        .unwrap_or(true)
}

impl FilterConfig {
    /// @ai:intent Check if filter matches a task
    /// @ai:effects pure
    pub fn matches_task(&self, task_id: &str, task_type: &str) -> bool {
        list_matches(&self.task_ids, task_id) && list_matches(&self.task_types, task_type)
    }

    pub fn matches_learner(&self, learner_id: &str) -> bool {
        list_matches(&self.learner_ids, learner_id)
    }

    /// @ai:intent Check if filter matches a design row
    /// @ai:effects pure
    pub fn matches(&self, task_id: &str, task_type: &str, learner_id: &str) -> bool {
        self.matches_task(task_id, task_type) && self.matches_learner(learner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filter_matches_all_when_empty() {
        let filter = FilterConfig::default();
        assert!(filter.matches("iris", "classif", "classif.kknn"));
    }

    #[test]
    fn test_filter_matches_specific_type() {
        let filter = FilterConfig {
            task_types: Some(vec!["regr".to_string()]),
            ..Default::default()
        };
        assert!(filter.matches_task("mtcars", "regr"));
        assert!(!filter.matches_task("iris", "classif"));
    }

    #[test]
    fn test_filter_matches_multiple_criteria() {
        let filter = FilterConfig {
            task_ids: Some(vec!["iris".to_string(), "sonar".to_string()]),
            learner_ids: Some(vec!["classif.kknn".to_string()]),
            ..Default::default()
        };
        assert!(filter.matches("sonar", "classif", "classif.kknn"));
        assert!(!filter.matches("sonar", "classif", "classif.featureless"));
        assert!(!filter.matches("spam", "classif", "classif.kknn"));
    }

    #[test]
    fn test_config_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("benchmark.toml");

        let mut config = BenchmarkConfig::default();
        config.run.seed = 7;
        config.run.measures = vec!["classif.acc".to_string()];
        config.save(&path).unwrap();

        let loaded = BenchmarkConfig::load(&path).unwrap();
        assert_eq!(loaded.run.seed, 7);
        assert_eq!(loaded.design.learners.len(), config.design.learners.len());
        assert_eq!(loaded.design.resamplings, config.design.resamplings);
    }

    #[test]
    fn test_parse_learner_with_tuning() {
        let content = r#"
[run]
seed = 1

[[design.learners]]
id = "classif.kknn"
params = { scale = true }
fallback = "classif.featureless"

[design.learners.tuning]
measure = "classif.ce"
tuner = { method = "grid_search", resolution = 3 }
terminator = { type = "evals", n_evals = 10 }
resampling = { method = "cv", folds = 3 }
search_space = [
  { id = "k", type = "int", lower = 1, upper = 9 },
]

[[design.resamplings]]
method = "holdout"
ratio = 0.8
"#;
        let config: BenchmarkConfig = toml::from_str(content).unwrap();
        let learner = &config.design.learners[0];
        assert_eq!(learner.params.get("scale"), Some(&ParamValue::Lgl(true)));
        assert_eq!(learner.fallback.as_deref(), Some("classif.featureless"));
        let tuning = learner.tuning.as_ref().unwrap();
        assert_eq!(tuning.search_space[0].id, "k");
        assert_eq!(config.design.resamplings, vec![Strategy::Holdout { ratio: 0.8 }]);
        assert!(config.run.encapsulate);
    }
}
