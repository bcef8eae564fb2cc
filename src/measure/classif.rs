//! @ai:module:intent Classification measures
//! @ai:module:layer domain
//! @ai:module:public_api ClassifMeasure, ClassifMetric
//! @ai:module:stateless true

use crate::error::Result;
use crate::learner::PredictType;
use crate::measure::{check_task_type, measure_error, Measure, MeasureInput};
use crate::prediction::ClassifPrediction;
use crate::task::TaskType;

const EPS: f64 = 1e-15;

/// @ai:intent Which classification score to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifMetric {
    Ce,
    Acc,
    Bacc,
    Logloss,
    Bbrier,
    Mbrier,
    Auc,
}

/// @ai:intent Classification measure backed by one of the built-in metrics
#[derive(Debug, Clone)]
pub struct ClassifMeasure {
    id: String,
    metric: ClassifMetric,
}

impl ClassifMeasure {
    pub fn new(metric: ClassifMetric) -> Self {
        let id = match metric {
            ClassifMetric::Ce => "classif.ce",
            ClassifMetric::Acc => "classif.acc",
            ClassifMetric::Bacc => "classif.bacc",
            ClassifMetric::Logloss => "classif.logloss",
            ClassifMetric::Bbrier => "classif.bbrier",
            ClassifMetric::Mbrier => "classif.mbrier",
            ClassifMetric::Auc => "classif.auc",
        };
        Self {
            id: id.to_string(),
            metric,
        }
    }

    fn probabilities<'a>(&self, p: &'a ClassifPrediction) -> Result<&'a [Vec<f64>]> {
        p.prob
            .as_deref()
            .ok_or_else(|| measure_error(&self.id, "requires predict type 'prob'"))
    }

    fn positive(&self, p: &ClassifPrediction) -> Result<usize> {
        if p.classes.len() != 2 {
            return Err(measure_error(&self.id, "requires a binary task"));
        }
        p.positive
            .ok_or_else(|| measure_error(&self.id, "positive class is not set"))
    }
}

fn misclassified(p: &ClassifPrediction) -> f64 {
    let wrong = p
        .response
        .iter()
        .zip(&p.truth)
        .filter(|(r, t)| r != t)
        .count();
    wrong as f64 / p.truth.len() as f64
}

/// Mean recall over the classes present in the truth.
fn balanced_accuracy(p: &ClassifPrediction) -> f64 {
    let confusion = p.confusion();
    let recalls: Vec<f64> = (0..p.classes.len())
        .filter_map(|t| {
            let support: usize = confusion.iter().map(|row| row[t]).sum();
            (support > 0).then(|| confusion[t][t] as f64 / support as f64)
        })
        .collect();
    recalls.iter().sum::<f64>() / recalls.len() as f64
}

/// Mann-Whitney estimate with mid-ranks for ties.
fn auc(scores: &[f64], positive: &[bool]) -> f64 {
    let n_pos = positive.iter().filter(|p| **p).count();
    let n_neg = positive.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let mid = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = mid;
        }
        i = j + 1;
    }

    let rank_sum: f64 = ranks
        .iter()
        .zip(positive)
        .filter(|(_, p)| **p)
        .map(|(r, _)| r)
        .sum();
    let n_pos = n_pos as f64;
    (rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64)
}

impl Measure for ClassifMeasure {
    fn id(&self) -> &str {
        &self.id
    }

    fn task_type(&self) -> Option<TaskType> {
        Some(TaskType::Classif)
    }

    fn minimize(&self) -> bool {
        !matches!(
            self.metric,
            ClassifMetric::Acc | ClassifMetric::Bacc | ClassifMetric::Auc
        )
    }

    fn range(&self) -> (f64, f64) {
        match self.metric {
            ClassifMetric::Logloss => (0.0, f64::INFINITY),
            ClassifMetric::Mbrier => (0.0, 2.0),
            _ => (0.0, 1.0),
        }
    }

    fn predict_type(&self) -> PredictType {
        match self.metric {
            ClassifMetric::Ce | ClassifMetric::Acc | ClassifMetric::Bacc => PredictType::Response,
            _ => PredictType::Prob,
        }
    }

    fn score(&self, input: &MeasureInput) -> Result<f64> {
        check_task_type(self, input.prediction)?;
        let Some(p) = input.prediction.as_classif() else {
            return Err(measure_error(&self.id, "expected a classification prediction"));
        };
        if p.truth.is_empty() {
            return Ok(f64::NAN);
        }

        let n = p.truth.len() as f64;
        let score = match self.metric {
            ClassifMetric::Ce => misclassified(p),
            ClassifMetric::Acc => 1.0 - misclassified(p),
            ClassifMetric::Bacc => balanced_accuracy(p),
            ClassifMetric::Logloss => {
                let prob = self.probabilities(p)?;
                -prob
                    .iter()
                    .zip(&p.truth)
                    .map(|(row, &t)| row[t].max(EPS).ln())
                    .sum::<f64>()
                    / n
            }
            ClassifMetric::Mbrier => {
                let prob = self.probabilities(p)?;
                prob.iter()
                    .zip(&p.truth)
                    .map(|(row, &t)| {
                        row.iter()
                            .enumerate()
                            .map(|(k, q)| {
                                let y = if k == t { 1.0 } else { 0.0 };
                                (q - y).powi(2)
                            })
                            .sum::<f64>()
                    })
                    .sum::<f64>()
                    / n
            }
            ClassifMetric::Bbrier => {
                let positive = self.positive(p)?;
                let prob = self.probabilities(p)?;
                prob.iter()
                    .zip(&p.truth)
                    .map(|(row, &t)| {
                        let y = if t == positive { 1.0 } else { 0.0 };
                        (row[positive] - y).powi(2)
                    })
                    .sum::<f64>()
                    / n
            }
            ClassifMetric::Auc => {
                let positive = self.positive(p)?;
                let prob = self.probabilities(p)?;
                let scores: Vec<f64> = prob.iter().map(|row| row[positive]).collect();
                let labels: Vec<bool> = p.truth.iter().map(|&t| t == positive).collect();
                auc(&scores, &labels)
            }
        };
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::Prediction;
    use approx::assert_abs_diff_eq;

    fn prediction(truth: Vec<usize>, response: Vec<usize>, prob: Option<Vec<Vec<f64>>>) -> Prediction {
        Prediction::Classif(ClassifPrediction {
            row_ids: (1..=truth.len()).collect(),
            classes: vec!["pos".to_string(), "neg".to_string()],
            positive: Some(0),
            truth,
            response,
            prob,
        })
    }

    fn score(metric: ClassifMetric, p: &Prediction) -> Result<f64> {
        ClassifMeasure::new(metric).score(&MeasureInput::new(p))
    }

    #[test]
    fn test_ce_acc_bacc() {
        let p = prediction(vec![0, 0, 0, 1], vec![0, 0, 1, 0], None);
        assert_abs_diff_eq!(score(ClassifMetric::Ce, &p).unwrap(), 0.5);
        assert_abs_diff_eq!(score(ClassifMetric::Acc, &p).unwrap(), 0.5);
        // recall pos = 2/3, recall neg = 0
        assert_abs_diff_eq!(score(ClassifMetric::Bacc, &p).unwrap(), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_probability_measures_need_prob() {
        let p = prediction(vec![0, 1], vec![0, 1], None);
        assert!(score(ClassifMetric::Logloss, &p).is_err());
        assert!(score(ClassifMetric::Auc, &p).is_err());
    }

    #[test]
    fn test_brier_and_logloss() {
        let prob = vec![vec![0.8, 0.2], vec![0.4, 0.6]];
        let p = prediction(vec![0, 1], vec![0, 1], Some(prob));
        assert_abs_diff_eq!(score(ClassifMetric::Bbrier, &p).unwrap(), (0.04 + 0.16) / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            score(ClassifMetric::Mbrier, &p).unwrap(),
            (0.08 + 0.32) / 2.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            score(ClassifMetric::Logloss, &p).unwrap(),
            -(0.8f64.ln() + 0.6f64.ln()) / 2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_auc_with_ties() {
        assert_abs_diff_eq!(auc(&[0.9, 0.8, 0.1], &[true, false, false]), 1.0);
        assert_abs_diff_eq!(auc(&[0.5, 0.5], &[true, false]), 0.5);
        assert!(auc(&[0.5, 0.7], &[true, true]).is_nan());
    }

    #[test]
    fn test_wrong_prediction_type() {
        let p = Prediction::Regr(crate::prediction::RegrPrediction {
            row_ids: vec![1],
            truth: vec![1.0],
            response: vec![1.0],
            se: None,
        });
        assert!(score(ClassifMetric::Ce, &p).is_err());
    }
}
