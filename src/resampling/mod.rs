//! @ai:module:intent Resampling strategies and their instantiation on a task
//! @ai:module:layer domain
//! @ai:module:public_api Strategy, Resampling, Instance, rsmp, resampling_ids
//! @ai:module:stateless false

pub mod split;

use crate::error::{Error, Result};
use crate::task::Task;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use split::{Split, Units};

const RESAMPLINGS: [&str; 8] = [
    "bootstrap",
    "custom",
    "cv",
    "holdout",
    "insample",
    "loo",
    "repeated_cv",
    "subsampling",
];

pub fn resampling_ids() -> &'static [&'static str] {
    &RESAMPLINGS
}

/// @ai:intent How train/test splits are drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Strategy {
    Holdout {
        #[serde(default = "default_ratio")]
        ratio: f64,
    },
    Cv {
        #[serde(default = "default_folds")]
        folds: usize,
    },
    RepeatedCv {
        #[serde(default = "default_folds")]
        folds: usize,
        #[serde(default = "default_folds")]
        repeats: usize,
    },
    Subsampling {
        #[serde(default = "default_repeats")]
        repeats: usize,
        #[serde(default = "default_ratio")]
        ratio: f64,
    },
    Bootstrap {
        #[serde(default = "default_repeats")]
        repeats: usize,
        #[serde(default = "default_bootstrap_ratio")]
        ratio: f64,
    },
    Insample,
    Loo,
    Custom {
        train_sets: Vec<Vec<usize>>,
        test_sets: Vec<Vec<usize>>,
    },
}

fn default_ratio() -> f64 {
    2.0 / 3.0
}

fn default_folds() -> usize {
    10
}

fn default_repeats() -> usize {
    30
}

fn default_bootstrap_ratio() -> f64 {
    1.0
}

impl Strategy {
    pub fn id(&self) -> &'static str {
        match self {
            Strategy::Holdout { .. } => "holdout",
            Strategy::Cv { .. } => "cv",
            Strategy::RepeatedCv { .. } => "repeated_cv",
            Strategy::Subsampling { .. } => "subsampling",
            Strategy::Bootstrap { .. } => "bootstrap",
            Strategy::Insample => "insample",
            Strategy::Loo => "loo",
            Strategy::Custom { .. } => "custom",
        }
    }

    /// @ai:intent Reject parameter values that can never produce valid splits
    /// @ai:effects pure
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidResampling(msg));
        match self {
            Strategy::Holdout { ratio } | Strategy::Subsampling { ratio, .. }
                if !(*ratio > 0.0 && *ratio < 1.0) =>
            {
                invalid(format!("ratio must be in (0, 1), got {}", ratio))
            }
            Strategy::Bootstrap { ratio, .. } if !(*ratio > 0.0) => {
                invalid(format!("ratio must be positive, got {}", ratio))
            }
            Strategy::Cv { folds } | Strategy::RepeatedCv { folds, .. } if *folds < 2 => {
                invalid(format!("need at least 2 folds, got {}", folds))
            }
            Strategy::RepeatedCv { repeats, .. }
            | Strategy::Subsampling { repeats, .. }
            | Strategy::Bootstrap { repeats, .. }
                if *repeats == 0 =>
            {
                invalid("need at least 1 repetition".to_string())
            }
            Strategy::Custom {
                train_sets,
                test_sets,
            } if train_sets.len() != test_sets.len() || train_sets.is_empty() => invalid(format!(
                "custom resampling needs matching, non-empty train and test sets ({} vs {})",
                train_sets.len(),
                test_sets.len()
            )),
            _ => Ok(()),
        }
    }

    /// Number of iterations known without a task.
    pub fn nominal_iters(&self) -> Option<usize> {
        match self {
            Strategy::Holdout { .. } | Strategy::Insample => Some(1),
            Strategy::Cv { folds } => Some(*folds),
            Strategy::RepeatedCv { folds, repeats } => Some(folds * repeats),
            Strategy::Subsampling { repeats, .. } | Strategy::Bootstrap { repeats, .. } => {
                Some(*repeats)
            }
            Strategy::Custom { train_sets, .. } => Some(train_sets.len()),
            Strategy::Loo => None,
        }
    }
}

/// @ai:intent Fixed train/test row id sets bound to one task view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub task_id: String,
    pub task_hash: String,
    pub seed: u64,
    pub train_sets: Vec<Vec<usize>>,
    pub test_sets: Vec<Vec<usize>>,
}

/// @ai:intent A strategy plus, once instantiated, its concrete splits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resampling {
    strategy: Strategy,
    instance: Option<Instance>,
}

/// @ai:intent Construct a resampling by id with default parameters
/// @ai:effects pure
pub fn rsmp(id: &str) -> Result<Resampling> {
    let strategy = match id {
        "holdout" => Strategy::Holdout {
            ratio: default_ratio(),
        },
        "cv" => Strategy::Cv {
            folds: default_folds(),
        },
        "repeated_cv" => Strategy::RepeatedCv {
            folds: default_folds(),
            repeats: default_folds(),
        },
        "subsampling" => Strategy::Subsampling {
            repeats: default_repeats(),
            ratio: default_ratio(),
        },
        "bootstrap" => Strategy::Bootstrap {
            repeats: default_repeats(),
            ratio: default_bootstrap_ratio(),
        },
        "insample" => Strategy::Insample,
        "loo" => Strategy::Loo,
        other => return Err(Error::unknown("resampling", other)),
    };
    Resampling::new(strategy)
}

impl Resampling {
    /// @ai:intent Wrap a validated strategy, not yet instantiated
    /// @ai:effects pure
    pub fn new(strategy: Strategy) -> Result<Self> {
        strategy.validate()?;
        Ok(Self {
            strategy,
            instance: None,
        })
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn id(&self) -> &'static str {
        self.strategy.id()
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn is_instantiated(&self) -> bool {
        self.instance.is_some()
    }

    /// Iterations of the instance, or the nominal count before instantiation.
    pub fn iters(&self) -> usize {
        match &self.instance {
            Some(instance) => instance.train_sets.len(),
            None => self.strategy.nominal_iters().unwrap_or(0),
        }
    }

    /// @ai:intent Draw the splits for a task; calling it again re-draws
    /// @ai:effects state:write
    pub fn instantiate(&mut self, task: &Task, seed: u64) -> Result<()> {
        if task.nrow() == 0 {
            return Err(Error::InvalidResampling(format!(
                "task '{}' has no rows to resample",
                task.id()
            )));
        }

        let (train_sets, test_sets) = match &self.strategy {
            Strategy::Custom {
                train_sets,
                test_sets,
            } => {
                let known: std::collections::HashSet<usize> =
                    task.row_ids().iter().copied().collect();
                for row in train_sets.iter().chain(test_sets).flatten() {
                    if !known.contains(row) {
                        return Err(Error::UnknownRow(*row));
                    }
                }
                (train_sets.clone(), test_sets.clone())
            }
            strategy => {
                let units = Units::from_task(task)?;
                let mut rng = StdRng::seed_from_u64(seed);
                let splits: Vec<Split> = match strategy {
                    Strategy::Holdout { ratio } => vec![units.holdout(*ratio, &mut rng)],
                    Strategy::Cv { folds } => units.cv(*folds, &mut rng)?,
                    Strategy::RepeatedCv { folds, repeats } => {
                        let mut splits = Vec::with_capacity(folds * repeats);
                        for _ in 0..*repeats {
                            splits.extend(units.cv(*folds, &mut rng)?);
                        }
                        splits
                    }
                    Strategy::Subsampling { repeats, ratio } => (0..*repeats)
                        .map(|_| units.holdout(*ratio, &mut rng))
                        .collect(),
                    Strategy::Bootstrap { repeats, ratio } => (0..*repeats)
                        .map(|_| units.bootstrap(*ratio, &mut rng))
                        .collect(),
                    Strategy::Insample => vec![(units.all(), units.all())],
                    Strategy::Loo => units.loo(),
                    Strategy::Custom { .. } => Vec::new(),
                };
                splits
                    .iter()
                    .map(|(train, test)| (units.expand(train), units.expand(test)))
                    .unzip()
            }
        };

        tracing::debug!(
            "Instantiated {} on task {} with {} iterations (seed {})",
            self.id(),
            task.id(),
            train_sets.len(),
            seed
        );

        self.instance = Some(Instance {
            task_id: task.id().to_string(),
            task_hash: task.hash(),
            seed,
            train_sets,
            test_sets,
        });
        Ok(())
    }

    fn instance_or_err(&self) -> Result<&Instance> {
        self.instance.as_ref().ok_or(Error::NotInstantiated)
    }

    fn check_iter(&self, instance: &Instance, i: usize) -> Result<()> {
        if i >= instance.train_sets.len() {
            return Err(Error::InvalidResampling(format!(
                "iteration {} out of range, {} has {} iterations",
                i,
                self.id(),
                instance.train_sets.len()
            )));
        }
        Ok(())
    }

    /// @ai:intent Training row ids of iteration `i` (0-based)
    /// @ai:pre instantiated, i < iters()
    pub fn train_set(&self, i: usize) -> Result<&[usize]> {
        let instance = self.instance_or_err()?;
        self.check_iter(instance, i)?;
        Ok(&instance.train_sets[i])
    }

    pub fn test_set(&self, i: usize) -> Result<&[usize]> {
        let instance = self.instance_or_err()?;
        self.check_iter(instance, i)?;
        Ok(&instance.test_sets[i])
    }

    /// @ai:intent Fail unless instantiated on exactly this task view
    /// @ai:effects pure
    pub fn check_task(&self, task: &Task) -> Result<()> {
        let instance = self.instance_or_err()?;
        if instance.task_hash != task.hash() {
            return Err(Error::ResamplingMismatch {
                instantiated: instance.task_id.clone(),
                task: task.id().to_string(),
            });
        }
        Ok(())
    }

    /// @ai:intent Hash over strategy and, when instantiated, the concrete splits
    /// @ai:effects pure
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id().as_bytes());
        if let Ok(params) = serde_json::to_string(&self.strategy) {
            hasher.update(params.as_bytes());
        }
        if let Some(instance) = &self.instance {
            for set in instance.train_sets.iter().chain(&instance.test_sets) {
                for row in set {
                    hasher.update(row.to_le_bytes());
                }
                hasher.update([0xff]);
            }
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::generators::{friedman1, two_normals};
    use crate::task::ColRole;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cv_test_sets_partition_rows() {
        let task = friedman1(23, 1).unwrap();
        let mut cv = Resampling::new(Strategy::Cv { folds: 5 }).unwrap();
        cv.instantiate(&task, 7).unwrap();

        let mut seen: Vec<usize> = (0..cv.iters())
            .flat_map(|i| cv.test_set(i).unwrap().to_vec())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, task.row_ids().to_vec());

        for i in 0..cv.iters() {
            let train = cv.train_set(i).unwrap();
            let test = cv.test_set(i).unwrap();
            assert_eq!(train.len() + test.len(), 23);
            assert!(test.iter().all(|r| !train.contains(r)));
        }
    }

    #[test]
    fn test_same_seed_same_instance() {
        let task = friedman1(30, 1).unwrap();
        let mut a = Resampling::new(Strategy::Subsampling { repeats: 3, ratio: 0.5 }).unwrap();
        let mut b = a.clone();
        a.instantiate(&task, 99).unwrap();
        b.instantiate(&task, 99).unwrap();
        assert_eq!(a.instance(), b.instance());
        assert_eq!(a.hash(), b.hash());

        b.instantiate(&task, 100).unwrap();
        assert_ne!(a.instance(), b.instance());
    }

    #[test]
    fn test_not_instantiated_access() {
        let cv = rsmp("cv").unwrap();
        assert!(matches!(cv.train_set(0), Err(Error::NotInstantiated)));
        assert_eq!(cv.iters(), 10);
    }

    #[test]
    fn test_mismatched_task_detected() {
        let task = friedman1(20, 1).unwrap();
        let mut holdout = rsmp("holdout").unwrap();
        holdout.instantiate(&task, 1).unwrap();
        assert!(holdout.check_task(&task).is_ok());

        let mut smaller = task.clone();
        smaller.filter(&task.row_ids()[..10]).unwrap();
        assert!(matches!(
            holdout.check_task(&smaller),
            Err(Error::ResamplingMismatch { .. })
        ));
    }

    #[test]
    fn test_holdout_ratio_and_validation() {
        let task = friedman1(30, 1).unwrap();
        let mut holdout = Resampling::new(Strategy::Holdout { ratio: 0.8 }).unwrap();
        holdout.instantiate(&task, 1).unwrap();
        assert_eq!(holdout.train_set(0).unwrap().len(), 24);
        assert_eq!(holdout.test_set(0).unwrap().len(), 6);
        assert!(holdout.test_set(1).is_err());

        assert!(Resampling::new(Strategy::Holdout { ratio: 1.5 }).is_err());
        assert!(Resampling::new(Strategy::Cv { folds: 1 }).is_err());
    }

    #[test]
    fn test_stratified_cv_balances_classes() {
        let mut task = two_normals(40, 2).unwrap();
        task.set_col_roles("y", &[ColRole::Target, ColRole::Stratum])
            .unwrap();
        let mut cv = Resampling::new(Strategy::Cv { folds: 4 }).unwrap();
        cv.instantiate(&task, 3).unwrap();

        for i in 0..4 {
            let test = cv.test_set(i).unwrap();
            let strata = task.strata(test).unwrap().unwrap();
            let a = strata.iter().filter(|s| *s == "A").count();
            assert_eq!(a, 5);
            assert_eq!(test.len(), 10);
        }
    }

    #[test]
    fn test_loo_and_insample() {
        let task = friedman1(5, 1).unwrap();
        let mut loo = rsmp("loo").unwrap();
        assert_eq!(loo.iters(), 0);
        loo.instantiate(&task, 1).unwrap();
        assert_eq!(loo.iters(), 5);
        assert_eq!(loo.test_set(2).unwrap(), &[3]);

        let mut insample = rsmp("insample").unwrap();
        insample.instantiate(&task, 1).unwrap();
        assert_eq!(insample.train_set(0).unwrap(), insample.test_set(0).unwrap());
    }

    #[test]
    fn test_custom_sets_validated_against_task() {
        let task = friedman1(5, 1).unwrap();
        let mut custom = Resampling::new(Strategy::Custom {
            train_sets: vec![vec![1, 2, 3]],
            test_sets: vec![vec![4, 5]],
        })
        .unwrap();
        custom.instantiate(&task, 0).unwrap();
        assert_eq!(custom.test_set(0).unwrap(), &[4, 5]);

        let mut bad = Resampling::new(Strategy::Custom {
            train_sets: vec![vec![1, 99]],
            test_sets: vec![vec![2]],
        })
        .unwrap();
        assert!(matches!(bad.instantiate(&task, 0), Err(Error::UnknownRow(99))));
    }

    #[test]
    fn test_strategy_toml_format() {
        let s: Strategy = toml::from_str("method = \"repeated_cv\"\nfolds = 3\nrepeats = 2").unwrap();
        assert_eq!(s, Strategy::RepeatedCv { folds: 3, repeats: 2 });
        assert_eq!(s.nominal_iters(), Some(6));
    }
}
