//! @ai:module:intent Collection of resample results with provenance
//! @ai:module:layer domain
//! @ai:module:public_api BenchmarkResult
//! @ai:module:stateless false

use crate::error::{Error, Result};
use crate::measure::Measure;
use crate::result::resample_result::ResampleResult;
use crate::result::rows::{AggregateRow, ConditionRow, RankRow, ScoreRow};
use std::collections::BTreeMap;
use std::sync::Arc;

/// @ai:intent Ordered multiset of resample results, each keeping its own task, learner and resampling
#[derive(Debug, Clone, Default)]
pub struct BenchmarkResult {
    results: Vec<ResampleResult>,
}

impl From<ResampleResult> for BenchmarkResult {
    fn from(rr: ResampleResult) -> Self {
        Self { results: vec![rr] }
    }
}

impl FromIterator<ResampleResult> for BenchmarkResult {
    fn from_iter<I: IntoIterator<Item = ResampleResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

fn unique(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// Measures applicable to the result's task type.
fn applicable(rr: &ResampleResult, measures: &[Arc<dyn Measure>]) -> Vec<Arc<dyn Measure>> {
    measures
        .iter()
        .filter(|m| m.task_type().map_or(true, |t| t == rr.task().task_type()))
        .cloned()
        .collect()
}

impl BenchmarkResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rr: ResampleResult) {
        self.results.push(rr);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn resample_results(&self) -> &[ResampleResult] {
        &self.results
    }

    pub fn resample_result(&self, i: usize) -> Option<&ResampleResult> {
        self.results.get(i)
    }

    /// @ai:intent Unwrap the single contained resample result
    /// @ai:pre exactly one resample result
    /// @ai:effects pure
    pub fn into_resample_result(mut self) -> Result<ResampleResult> {
        if self.results.len() != 1 {
            return Err(Error::InvalidData(format!(
                "expected exactly one resample result, found {}",
                self.results.len()
            )));
        }
        self.results
            .pop()
            .ok_or_else(|| Error::InvalidData("empty benchmark result".to_string()))
    }

    /// @ai:intent Append every resample result of `other`; duplicates are kept
    /// @ai:effects state:write
    pub fn combine(&mut self, other: BenchmarkResult) {
        self.results.extend(other.results);
    }

    pub fn task_ids(&self) -> Vec<String> {
        unique(self.results.iter().map(|rr| rr.task().id().to_string()))
    }

    pub fn learner_ids(&self) -> Vec<String> {
        unique(self.results.iter().map(|rr| rr.learner().id().to_string()))
    }

    pub fn resampling_ids(&self) -> Vec<String> {
        unique(self.results.iter().map(|rr| rr.resampling().id().to_string()))
    }

    /// @ai:intent Subset by task and/or learner ids; None keeps everything
    /// @ai:effects pure
    pub fn filter(&self, task_ids: Option<&[&str]>, learner_ids: Option<&[&str]>) -> Self {
        self.results
            .iter()
            .filter(|rr| task_ids.map_or(true, |ids| ids.contains(&rr.task().id())))
            .filter(|rr| learner_ids.map_or(true, |ids| ids.contains(&rr.learner().id())))
            .cloned()
            .collect()
    }

    /// @ai:intent Per-iteration scores; measures of other task types are skipped per row
    /// @ai:effects pure
    pub fn score(&self, measures: &[Arc<dyn Measure>]) -> Result<Vec<ScoreRow>> {
        let mut rows = Vec::new();
        for rr in &self.results {
            rows.extend(rr.score(&applicable(rr, measures))?);
        }
        Ok(rows)
    }

    /// @ai:intent One aggregate row per resample result, numbered from 1
    /// @ai:effects pure
    pub fn aggregate(&self, measures: &[Arc<dyn Measure>]) -> Result<Vec<AggregateRow>> {
        self.results
            .iter()
            .enumerate()
            .map(|(i, rr)| {
                Ok(AggregateRow {
                    nr: i + 1,
                    uhash: rr.uhash().to_string(),
                    task_id: rr.task().id().to_string(),
                    learner_id: rr.learner().id().to_string(),
                    resampling_id: rr.resampling().id().to_string(),
                    iters: rr.iters(),
                    scores: rr.aggregate(&applicable(rr, measures))?,
                    warnings: rr.warning_count(),
                    errors: rr.error_count(),
                })
            })
            .collect()
    }

    /// @ai:intent Rank learners within each task and resampling by an aggregated measure
    ///
    /// Ties share the mean of their ranks; undefined scores rank last.
    /// @ai:effects pure
    pub fn rank(&self, measure: &Arc<dyn Measure>) -> Result<Vec<RankRow>> {
        let rows = self.aggregate(std::slice::from_ref(measure))?;

        let mut by_group: BTreeMap<(String, String), Vec<&AggregateRow>> = BTreeMap::new();
        for row in rows.iter().filter(|r| r.scores.contains_key(measure.id())) {
            by_group
                .entry((row.task_id.clone(), row.resampling_id.clone()))
                .or_default()
                .push(row);
        }

        let mut ranks = Vec::new();
        for group in by_group.values() {
            let key = |row: &AggregateRow| {
                let score = row.scores[measure.id()];
                if score.is_nan() {
                    f64::INFINITY
                } else if measure.minimize() {
                    score
                } else {
                    -score
                }
            };
            let mut order: Vec<usize> = (0..group.len()).collect();
            order.sort_by(|&a, &b| key(group[a]).total_cmp(&key(group[b])));

            let mut rank_of = vec![0.0; group.len()];
            let mut i = 0;
            while i < order.len() {
                let mut j = i;
                while j + 1 < order.len() && key(group[order[j + 1]]) == key(group[order[i]]) {
                    j += 1;
                }
                let mean_rank = (i + j) as f64 / 2.0 + 1.0;
                for &idx in &order[i..=j] {
                    rank_of[idx] = mean_rank;
                }
                i = j + 1;
            }

            for (row, rank) in group.iter().zip(rank_of) {
                let score = row.scores[measure.id()];
                ranks.push(RankRow {
                    task_id: row.task_id.clone(),
                    learner_id: row.learner_id.clone(),
                    resampling_id: row.resampling_id.clone(),
                    measure: measure.id().to_string(),
                    score: (!score.is_nan()).then_some(score),
                    rank,
                });
            }
        }
        Ok(ranks)
    }

    pub fn warnings(&self) -> Vec<ConditionRow> {
        self.results.iter().flat_map(|rr| rr.warnings()).collect()
    }

    pub fn errors(&self) -> Vec<ConditionRow> {
        self.results.iter().flat_map(|rr| rr.errors()).collect()
    }

    pub fn discard_models(&mut self) {
        for rr in &mut self.results {
            rr.discard_models();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::lrn;
    use crate::measure::msr;
    use crate::resample::{resample, ResampleOptions};
    use crate::resampling::{Resampling, Strategy};
    use crate::task::generators::{friedman1, two_normals};

    fn run(task: &crate::task::Task, learner: &str) -> ResampleResult {
        let resampling = Resampling::new(Strategy::Cv { folds: 3 }).unwrap();
        resample(task, &lrn(learner).unwrap(), &resampling, &ResampleOptions::default()).unwrap()
    }

    #[test]
    fn test_combine_keeps_size_and_provenance() {
        let classif = two_normals(30, 1).unwrap();
        let regr = friedman1(30, 1).unwrap();
        let mut a: BenchmarkResult = vec![
            run(&classif, "classif.featureless"),
            run(&classif, "classif.kknn"),
        ]
        .into_iter()
        .collect();
        let b = BenchmarkResult::from(run(&regr, "regr.featureless"));

        a.combine(b.clone());
        assert_eq!(a.len(), 3);
        assert_eq!(a.task_ids(), vec!["2dnormals", "friedman1"]);
        assert_eq!(a.resample_result(2).unwrap().uhash(), b.resample_result(0).unwrap().uhash());

        a.combine(b);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_round_trip_through_resample_result() {
        let task = two_normals(30, 1).unwrap();
        let rr = run(&task, "classif.kknn");
        let before = rr.prediction().unwrap();

        let bmr = BenchmarkResult::from(rr);
        let back = bmr.into_resample_result().unwrap();
        assert_eq!(back.prediction().unwrap(), before);

        assert!(BenchmarkResult::new().into_resample_result().is_err());
    }

    #[test]
    fn test_aggregate_skips_foreign_measures() {
        let classif = two_normals(30, 1).unwrap();
        let regr = friedman1(30, 1).unwrap();
        let bmr: BenchmarkResult = vec![
            run(&classif, "classif.featureless"),
            run(&regr, "regr.featureless"),
        ]
        .into_iter()
        .collect();

        let measures = vec![msr("classif.ce").unwrap(), msr("regr.mse").unwrap()];
        let rows = bmr.aggregate(&measures).unwrap();
        assert_eq!(rows[0].nr, 1);
        assert!(rows[0].scores.contains_key("classif.ce"));
        assert!(!rows[0].scores.contains_key("regr.mse"));
        assert!(rows[1].scores.contains_key("regr.mse"));
    }

    #[test]
    fn test_rank_and_filter() {
        let task = two_normals(60, 4).unwrap();
        let bmr: BenchmarkResult = vec![
            run(&task, "classif.featureless"),
            run(&task, "classif.kknn"),
        ]
        .into_iter()
        .collect();

        let ranks = bmr.rank(&msr("classif.ce").unwrap()).unwrap();
        assert_eq!(ranks.len(), 2);
        let knn = ranks.iter().find(|r| r.learner_id == "classif.kknn").unwrap();
        assert_eq!(knn.rank, 1.0);

        let only_knn = bmr.filter(None, Some(&["classif.kknn"]));
        assert_eq!(only_knn.len(), 1);
        assert_eq!(only_knn.learner_ids(), vec!["classif.kknn"]);
    }
}
