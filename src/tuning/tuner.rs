//! @ai:module:intent Search strategies proposing batches of configurations
//! @ai:module:layer domain
//! @ai:module:public_api Tuner, Proposer

use crate::error::{Error, Result};
use crate::param::{ParamConfig, ParamSet};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// @ai:intent How candidate configurations are generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Tuner {
    /// Evaluates a shuffled grid until it is exhausted or the terminator stops
    GridSearch {
        #[serde(default = "default_resolution")]
        resolution: usize,
        #[serde(default = "default_batch_size")]
        batch_size: usize,
    },
    RandomSearch {
        #[serde(default = "default_batch_size")]
        batch_size: usize,
    },
}

fn default_resolution() -> usize {
    10
}

fn default_batch_size() -> usize {
    1
}

impl Tuner {
    pub fn id(&self) -> &'static str {
        match self {
            Tuner::GridSearch { .. } => "grid_search",
            Tuner::RandomSearch { .. } => "random_search",
        }
    }

    /// Whether the tuner stops by itself once candidates run out.
    pub fn is_finite(&self) -> bool {
        matches!(self, Tuner::GridSearch { .. })
    }

    /// @ai:intent Start a proposal stream over a search space
    /// @ai:effects pure
    pub fn proposer(&self, search_space: &ParamSet, seed: u64) -> Result<Proposer> {
        let mut rng = StdRng::seed_from_u64(seed);
        match self {
            Tuner::GridSearch {
                resolution,
                batch_size,
            } => {
                let mut grid = search_space.grid_design(*resolution)?;
                grid.shuffle(&mut rng);
                Ok(Proposer {
                    tuner: self.clone(),
                    batch_size: (*batch_size).max(1),
                    grid,
                    search_space: search_space.clone(),
                    rng,
                })
            }
            Tuner::RandomSearch { batch_size } => {
                if search_space.is_empty() {
                    return Err(Error::Tuning("random search needs a non-empty search space".to_string()));
                }
                Ok(Proposer {
                    tuner: self.clone(),
                    batch_size: (*batch_size).max(1),
                    grid: Vec::new(),
                    search_space: search_space.clone(),
                    rng,
                })
            }
        }
    }
}

/// @ai:intent Stateful source of configuration batches
#[derive(Debug, Clone)]
pub struct Proposer {
    tuner: Tuner,
    batch_size: usize,
    grid: Vec<ParamConfig>,
    search_space: ParamSet,
    rng: StdRng,
}

impl Proposer {
    /// @ai:intent Next batch; empty once a finite search is exhausted
    /// @ai:effects state:write
    pub fn next_batch(&mut self) -> Result<Vec<ParamConfig>> {
        match self.tuner {
            Tuner::GridSearch { .. } => {
                let take = self.batch_size.min(self.grid.len());
                Ok(self.grid.drain(..take).collect())
            }
            Tuner::RandomSearch { .. } => self
                .search_space
                .random_design(self.batch_size, &mut self.rng),
        }
    }
}
