//! @ai:module:intent Predictions of trained learners on test rows
//! @ai:module:layer domain
//! @ai:module:public_api Prediction, ClassifPrediction, RegrPrediction, SurvPrediction, SurvDistr
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::task::TaskType;
use serde::{Deserialize, Serialize};

/// @ai:intent Class predictions with optional per-class probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifPrediction {
    pub row_ids: Vec<usize>,
    pub classes: Vec<String>,
    /// Index into `classes` of the positive class for binary tasks
    pub positive: Option<usize>,
    pub truth: Vec<usize>,
    pub response: Vec<usize>,
    pub prob: Option<Vec<Vec<f64>>>,
}

/// @ai:intent Numeric predictions with optional standard errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegrPrediction {
    pub row_ids: Vec<usize>,
    pub truth: Vec<f64>,
    pub response: Vec<f64>,
    pub se: Option<Vec<f64>>,
}

/// @ai:intent Survival curves on a shared time grid, one curve per row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvDistr {
    pub times: Vec<f64>,
    pub survival: Vec<Vec<f64>>,
}

impl SurvDistr {
    /// @ai:intent Survival probability of row `i` at time `t` (step function)
    /// @ai:effects pure
    pub fn survival_at(&self, i: usize, t: f64) -> f64 {
        let curve = &self.survival[i];
        match self.times.iter().rposition(|&time| time <= t) {
            Some(idx) => curve[idx],
            None => 1.0,
        }
    }
}

/// @ai:intent Survival predictions: continuous ranking and optional distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvPrediction {
    pub row_ids: Vec<usize>,
    pub time: Vec<f64>,
    pub event: Vec<bool>,
    /// Higher rank means higher risk
    pub crank: Vec<f64>,
    pub distr: Option<SurvDistr>,
}

/// @ai:intent Prediction object for any supported task type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Prediction {
    Classif(ClassifPrediction),
    Regr(RegrPrediction),
    Surv(SurvPrediction),
}

impl Prediction {
    pub fn task_type(&self) -> TaskType {
        match self {
            Prediction::Classif(_) => TaskType::Classif,
            Prediction::Regr(_) => TaskType::Regr,
            Prediction::Surv(_) => TaskType::Surv,
        }
    }

    pub fn row_ids(&self) -> &[usize] {
        match self {
            Prediction::Classif(p) => &p.row_ids,
            Prediction::Regr(p) => &p.row_ids,
            Prediction::Surv(p) => &p.row_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.row_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_classif(&self) -> Option<&ClassifPrediction> {
        match self {
            Prediction::Classif(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_regr(&self) -> Option<&RegrPrediction> {
        match self {
            Prediction::Regr(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_surv(&self) -> Option<&SurvPrediction> {
        match self {
            Prediction::Surv(p) => Some(p),
            _ => None,
        }
    }

    /// @ai:intent Concatenate predictions in the given order
    /// @ai:pre all predictions share task type (and class set for classification)
    /// @ai:effects pure
    pub fn combine(predictions: &[Prediction]) -> Result<Prediction> {
        let first = predictions
            .first()
            .ok_or_else(|| Error::InvalidData("no predictions to combine".to_string()))?;

        let mut combined = first.clone();
        for next in &predictions[1..] {
            combined.append(next)?;
        }
        Ok(combined)
    }

    fn append(&mut self, other: &Prediction) -> Result<()> {
        match (self, other) {
            (Prediction::Classif(a), Prediction::Classif(b)) => {
                if a.classes != b.classes {
                    return Err(Error::TypeMismatch(
                        "cannot combine predictions with different classes".to_string(),
                    ));
                }
                a.row_ids.extend_from_slice(&b.row_ids);
                a.truth.extend_from_slice(&b.truth);
                a.response.extend_from_slice(&b.response);
                a.prob = match (a.prob.take(), &b.prob) {
                    (Some(mut pa), Some(pb)) => {
                        pa.extend(pb.iter().cloned());
                        Some(pa)
                    }
                    _ => None,
                };
            }
            (Prediction::Regr(a), Prediction::Regr(b)) => {
                a.row_ids.extend_from_slice(&b.row_ids);
                a.truth.extend_from_slice(&b.truth);
                a.response.extend_from_slice(&b.response);
                a.se = match (a.se.take(), &b.se) {
                    (Some(mut sa), Some(sb)) => {
                        sa.extend_from_slice(sb);
                        Some(sa)
                    }
                    _ => None,
                };
            }
            (Prediction::Surv(a), Prediction::Surv(b)) => {
                a.row_ids.extend_from_slice(&b.row_ids);
                a.time.extend_from_slice(&b.time);
                a.event.extend_from_slice(&b.event);
                a.crank.extend_from_slice(&b.crank);
                a.distr = match (a.distr.take(), &b.distr) {
                    (Some(da), Some(db)) => Some(merge_distr(da, db)),
                    _ => None,
                };
            }
            (a, b) => {
                return Err(Error::TypeMismatch(format!(
                    "cannot combine {} and {} predictions",
                    a.task_type(),
                    b.task_type()
                )))
            }
        }
        Ok(())
    }
}

/// Put two sets of survival curves on the union of their time grids.
fn merge_distr(a: SurvDistr, b: &SurvDistr) -> SurvDistr {
    let mut times: Vec<f64> = a.times.iter().chain(b.times.iter()).copied().collect();
    times.sort_by(|x, y| x.total_cmp(y));
    times.dedup();

    let project = |d: &SurvDistr| -> Vec<Vec<f64>> {
        (0..d.survival.len())
            .map(|i| times.iter().map(|&t| d.survival_at(i, t)).collect())
            .collect()
    };

    let mut survival = project(&a);
    survival.extend(project(b));
    SurvDistr { times, survival }
}

impl ClassifPrediction {
    /// @ai:intent Confusion matrix indexed `[response][truth]`
    /// @ai:effects pure
    pub fn confusion(&self) -> Vec<Vec<usize>> {
        let k = self.classes.len();
        let mut matrix = vec![vec![0usize; k]; k];
        for (&r, &t) in self.response.iter().zip(&self.truth) {
            matrix[r][t] += 1;
        }
        matrix
    }
}
