//! @ai:module:intent Split units (rows or groups) into train/test index sets
//! @ai:module:layer domain
//! @ai:module:public_api Units, Split
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::task::Task;
use rand::prelude::*;
use std::collections::HashMap;

/// One train/test pair of unit indices.
pub type Split = (Vec<usize>, Vec<usize>);

/// @ai:intent Resampling units of a task: single rows, or whole groups
///
/// `blocks` partitions unit indices by stratum; without stratification there is
/// a single block holding every unit.
#[derive(Debug, Clone)]
pub struct Units {
    rows: Vec<Vec<usize>>,
    blocks: Vec<Vec<usize>>,
}

impl Units {
    /// @ai:intent Collect units from the task's group and stratum roles
    /// @ai:pre group and stratum roles are not both set
    /// @ai:effects pure
    pub fn from_task(task: &Task) -> Result<Self> {
        let row_ids = task.row_ids();
        let groups = task.groups(row_ids)?;
        let strata = task.strata(row_ids)?;

        if groups.is_some() && strata.is_some() {
            return Err(Error::InvalidResampling(
                "cannot combine grouping with stratification".to_string(),
            ));
        }

        let rows: Vec<Vec<usize>> = match groups {
            Some(labels) => {
                let mut index: HashMap<&str, usize> = HashMap::new();
                let mut rows: Vec<Vec<usize>> = Vec::new();
                for (row, label) in row_ids.iter().zip(&labels) {
                    let unit = *index.entry(label.as_str()).or_insert_with(|| {
                        rows.push(Vec::new());
                        rows.len() - 1
                    });
                    rows[unit].push(*row);
                }
                rows
            }
            None => row_ids.iter().map(|&r| vec![r]).collect(),
        };

        let blocks = match strata {
            Some(labels) => {
                let mut index: HashMap<&str, usize> = HashMap::new();
                let mut blocks: Vec<Vec<usize>> = Vec::new();
                for (unit, label) in labels.iter().enumerate() {
                    let block = *index.entry(label.as_str()).or_insert_with(|| {
                        blocks.push(Vec::new());
                        blocks.len() - 1
                    });
                    blocks[block].push(unit);
                }
                blocks
            }
            None => vec![(0..rows.len()).collect()],
        };

        Ok(Self { rows, blocks })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// @ai:intent Row ids covered by the given units, sorted
    /// @ai:effects pure
    pub fn expand(&self, units: &[usize]) -> Vec<usize> {
        let mut rows: Vec<usize> = units
            .iter()
            .flat_map(|&u| self.rows[u].iter().copied())
            .collect();
        rows.sort_unstable();
        rows
    }

    fn complement(&self, units: &[usize]) -> Vec<usize> {
        let mut taken = vec![false; self.len()];
        for &u in units {
            taken[u] = true;
        }
        (0..self.len()).filter(|&u| !taken[u]).collect()
    }

    /// @ai:intent One random train/test split, `ratio` of each block for training
    /// @ai:effects pure
    pub fn holdout(&self, ratio: f64, rng: &mut StdRng) -> Split {
        let mut train = Vec::new();
        let mut test = Vec::new();
        for block in &self.blocks {
            let mut units = block.clone();
            units.shuffle(rng);
            let n_train = ((ratio * units.len() as f64).round() as usize).min(units.len());
            train.extend_from_slice(&units[..n_train]);
            test.extend_from_slice(&units[n_train..]);
        }
        (train, test)
    }

    /// @ai:intent K-fold partition; each unit is in exactly one test fold
    /// @ai:pre folds <= number of units
    /// @ai:effects pure
    pub fn cv(&self, folds: usize, rng: &mut StdRng) -> Result<Vec<Split>> {
        if folds > self.len() {
            return Err(Error::InvalidResampling(format!(
                "{} folds requested but only {} units available",
                folds,
                self.len()
            )));
        }

        let mut assignment = vec![Vec::new(); folds];
        // Continue the fold counter across blocks so small strata do not all
        // land in the first folds.
        let mut next = 0;
        for block in &self.blocks {
            let mut units = block.clone();
            units.shuffle(rng);
            for unit in units {
                assignment[next % folds].push(unit);
                next += 1;
            }
        }

        Ok(assignment
            .into_iter()
            .map(|test| (self.complement(&test), test))
            .collect())
    }

    /// @ai:intent Draw training units with replacement; unsampled units form the test set
    /// @ai:effects pure
    pub fn bootstrap(&self, ratio: f64, rng: &mut StdRng) -> Split {
        let mut train = Vec::new();
        for block in &self.blocks {
            let n = (ratio * block.len() as f64).round() as usize;
            for _ in 0..n {
                if let Some(unit) = block.choose(rng) {
                    train.push(*unit);
                }
            }
        }
        let test = self.complement(&train);
        (train, test)
    }

    /// @ai:intent Every unit once as the single test unit
    /// @ai:effects pure
    pub fn loo(&self) -> Vec<Split> {
        (0..self.len())
            .map(|u| (self.complement(&[u]), vec![u]))
            .collect()
    }

    pub fn all(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, DataBackend};
    use crate::task::ColRole;

    fn grouped_task() -> Task {
        let backend = DataBackend::from_columns(vec![
            ("x".to_string(), Column::Numeric(vec![1.0; 6])),
            ("g".to_string(), Column::factor_from_labels(&["a", "a", "b", "c", "c", "c"])),
            ("y".to_string(), Column::Numeric(vec![1.0; 6])),
        ])
        .unwrap();
        let mut task = Task::regr("grouped", backend, "y").unwrap();
        task.set_col_roles("g", &[ColRole::Group]).unwrap();
        task
    }

    #[test]
    fn test_groups_become_units() {
        let units = Units::from_task(&grouped_task()).unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units.expand(&[0, 1]), vec![1, 2, 3]);
        assert_eq!(units.expand(&[2]), vec![4, 5, 6]);
    }

    #[test]
    fn test_cv_rejects_too_many_folds() {
        let units = Units::from_task(&grouped_task()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(units.cv(4, &mut rng).is_err());
        assert_eq!(units.cv(3, &mut rng).unwrap().len(), 3);
    }

    #[test]
    fn test_bootstrap_test_set_is_out_of_bag() {
        let units = Units::from_task(&grouped_task()).unwrap();
        let (train, test) = units.bootstrap(1.0, &mut StdRng::seed_from_u64(3));
        assert_eq!(train.len(), 3);
        assert!(test.iter().all(|u| !train.contains(u)));
    }
}
