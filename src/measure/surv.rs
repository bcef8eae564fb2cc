//! @ai:module:intent Survival measures: Harrell's C and the integrated Graf score
//! @ai:module:layer domain
//! @ai:module:public_api CIndex, Graf
//! @ai:module:stateless true

use crate::error::Result;
use crate::learner::kaplan::SurvivalCurve;
use crate::learner::PredictType;
use crate::measure::{check_task_type, measure_error, Measure, MeasureInput};
use crate::prediction::SurvPrediction;
use crate::task::TaskType;

fn surv_prediction<'a>(id: &str, input: &MeasureInput<'a>) -> Result<&'a SurvPrediction> {
    input
        .prediction
        .as_surv()
        .ok_or_else(|| measure_error(id, "expected a survival prediction"))
}

/// @ai:intent Harrell's concordance index over comparable pairs
#[derive(Debug, Clone, Copy, Default)]
pub struct CIndex;

impl Measure for CIndex {
    fn id(&self) -> &str {
        "surv.cindex"
    }

    fn task_type(&self) -> Option<TaskType> {
        Some(TaskType::Surv)
    }

    fn minimize(&self) -> bool {
        false
    }

    fn range(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn predict_type(&self) -> PredictType {
        PredictType::Crank
    }

    /// A pair is comparable when the shorter time is an event. Tied ranks count half.
    fn score(&self, input: &MeasureInput) -> Result<f64> {
        check_task_type(self, input.prediction)?;
        let p = surv_prediction(self.id(), input)?;

        let mut concordant = 0.0;
        let mut comparable = 0usize;
        for i in 0..p.time.len() {
            if !p.event[i] {
                continue;
            }
            for j in 0..p.time.len() {
                if p.time[i] < p.time[j] {
                    comparable += 1;
                    if p.crank[i] > p.crank[j] {
                        concordant += 1.0;
                    } else if p.crank[i] == p.crank[j] {
                        concordant += 0.5;
                    }
                }
            }
        }

        if comparable == 0 {
            return Ok(f64::NAN);
        }
        Ok(concordant / comparable as f64)
    }
}

/// @ai:intent Integrated Graf (Brier) score with inverse probability of censoring weights
///
/// The censoring distribution is estimated on the scored rows and the score is
/// averaged over their distinct observed times.
#[derive(Debug, Clone, Copy, Default)]
pub struct Graf;

impl Graf {
    /// Censoring survival just before `t`.
    fn censoring_before(curve: &SurvivalCurve, t: f64) -> f64 {
        match curve.times.iter().rposition(|&time| time < t) {
            Some(idx) => curve.survival[idx],
            None => 1.0,
        }
    }

    fn censoring_at(curve: &SurvivalCurve, t: f64) -> f64 {
        match curve.times.iter().rposition(|&time| time <= t) {
            Some(idx) => curve.survival[idx],
            None => 1.0,
        }
    }
}

impl Measure for Graf {
    fn id(&self) -> &str {
        "surv.graf"
    }

    fn task_type(&self) -> Option<TaskType> {
        Some(TaskType::Surv)
    }

    fn minimize(&self) -> bool {
        true
    }

    fn range(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn predict_type(&self) -> PredictType {
        PredictType::Distr
    }

    fn score(&self, input: &MeasureInput) -> Result<f64> {
        check_task_type(self, input.prediction)?;
        let p = surv_prediction(self.id(), input)?;
        let distr = p
            .distr
            .as_ref()
            .ok_or_else(|| measure_error(self.id(), "requires predict type 'distr'"))?;
        if p.time.is_empty() {
            return Ok(f64::NAN);
        }

        let censored: Vec<bool> = p.event.iter().map(|e| !e).collect();
        let censoring = SurvivalCurve::estimate(&p.time, &censored);

        let mut grid = p.time.clone();
        grid.sort_by(|a, b| a.total_cmp(b));
        grid.dedup();

        let n = p.time.len() as f64;
        let mut total = 0.0;
        let mut points = 0usize;
        for &t in &grid {
            let g_t = Self::censoring_at(&censoring, t);
            let mut brier = 0.0;
            for i in 0..p.time.len() {
                let s = distr.survival_at(i, t);
                if p.time[i] <= t && p.event[i] {
                    let g = Self::censoring_before(&censoring, p.time[i]);
                    if g > 0.0 {
                        brier += s * s / g;
                    }
                } else if p.time[i] > t && g_t > 0.0 {
                    brier += (1.0 - s).powi(2) / g_t;
                }
            }
            total += brier / n;
            points += 1;
        }

        Ok(total / points as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{Prediction, SurvDistr};
    use approx::assert_abs_diff_eq;

    fn prediction(crank: Vec<f64>, distr: Option<SurvDistr>) -> Prediction {
        Prediction::Surv(SurvPrediction {
            row_ids: vec![1, 2, 3],
            time: vec![1.0, 2.0, 3.0],
            event: vec![true, true, false],
            crank,
            distr,
        })
    }

    #[test]
    fn test_cindex_perfect_and_constant() {
        let perfect = prediction(vec![3.0, 2.0, 1.0], None);
        assert_abs_diff_eq!(CIndex.score(&MeasureInput::new(&perfect)).unwrap(), 1.0);

        let constant = prediction(vec![0.0, 0.0, 0.0], None);
        assert_abs_diff_eq!(CIndex.score(&MeasureInput::new(&constant)).unwrap(), 0.5);

        let reversed = prediction(vec![1.0, 2.0, 3.0], None);
        assert_abs_diff_eq!(CIndex.score(&MeasureInput::new(&reversed)).unwrap(), 0.0);
    }

    #[test]
    fn test_graf_needs_distribution() {
        let p = prediction(vec![0.0; 3], None);
        assert!(Graf.score(&MeasureInput::new(&p)).is_err());
    }

    #[test]
    fn test_graf_is_zero_for_perfect_curves() {
        // Each row's curve drops to 0 exactly at its own event time; row 3 is censored
        // at 3 and stays at 1.
        let distr = SurvDistr {
            times: vec![1.0, 2.0],
            survival: vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0]],
        };
        let p = prediction(vec![0.0; 3], Some(distr));
        let score = Graf.score(&MeasureInput::new(&p)).unwrap();
        assert_abs_diff_eq!(score, 0.0, epsilon = 1e-12);
    }
}
