//! @ai:module:intent Kaplan-Meier survival learner
//! @ai:module:layer domain
//! @ai:module:public_api KaplanMeier
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::learner::base::{Algorithm, Conditions, FittedModel, PredictType};
use crate::param::ParamSet;
use crate::prediction::{Prediction, SurvDistr, SurvPrediction};
use crate::task::{Task, TaskType, Truth};
use std::any::Any;

/// @ai:intent Marginal survival curve of the training rows, identical for every new row
#[derive(Debug, Clone, Copy, Default)]
pub struct KaplanMeier;

/// @ai:intent Fitted survival step function
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalCurve {
    pub times: Vec<f64>,
    pub survival: Vec<f64>,
}

impl SurvivalCurve {
    /// @ai:intent Product-limit estimate over distinct event times
    /// @ai:effects pure
    pub fn estimate(time: &[f64], event: &[bool]) -> Self {
        let mut order: Vec<usize> = (0..time.len()).collect();
        order.sort_by(|&a, &b| time[a].total_cmp(&time[b]));

        let mut at_risk = time.len() as f64;
        let mut times = Vec::new();
        let mut survival = Vec::new();
        let mut current = 1.0;

        let mut i = 0;
        while i < order.len() {
            let t = time[order[i]];
            let mut deaths = 0.0;
            let mut leaving = 0.0;
            while i < order.len() && time[order[i]] == t {
                if event[order[i]] {
                    deaths += 1.0;
                }
                leaving += 1.0;
                i += 1;
            }
            if deaths > 0.0 {
                current *= 1.0 - deaths / at_risk;
                times.push(t);
                survival.push(current);
            }
            at_risk -= leaving;
        }

        Self { times, survival }
    }

    /// Area under the step function up to the last event time.
    pub fn restricted_mean(&self) -> f64 {
        let mut area = 0.0;
        let mut previous_time = 0.0;
        let mut previous_surv = 1.0;
        for (&t, &s) in self.times.iter().zip(&self.survival) {
            area += previous_surv * (t - previous_time);
            previous_time = t;
            previous_surv = s;
        }
        area
    }
}

impl Algorithm for KaplanMeier {
    fn task_type(&self) -> TaskType {
        TaskType::Surv
    }

    fn predict_types(&self) -> &[PredictType] {
        &[PredictType::Distr, PredictType::Crank]
    }

    fn param_set(&self) -> ParamSet {
        ParamSet::new()
    }

    fn train(
        &self,
        task: &Task,
        rows: &[usize],
        _params: &ParamSet,
        conditions: &mut Conditions,
    ) -> Result<Box<dyn FittedModel>> {
        let Truth::Surv { time, event } = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected survival target".to_string()));
        };
        if time.is_empty() {
            return Err(Error::InvalidData("no training rows".to_string()));
        }
        if time.iter().any(|t| t.is_nan()) {
            return Err(Error::InvalidData("missing survival times".to_string()));
        }
        let curve = SurvivalCurve::estimate(&time, &event);
        if curve.times.is_empty() {
            conditions.warn("no events in training rows, survival curve is flat");
        }
        Ok(Box::new(curve))
    }
}

impl FittedModel for SurvivalCurve {
    fn predict(
        &self,
        task: &Task,
        rows: &[usize],
        predict_type: PredictType,
        _conditions: &mut Conditions,
    ) -> Result<Prediction> {
        let Truth::Surv { time, event } = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected survival target".to_string()));
        };
        let crank = -self.restricted_mean();
        let distr = (predict_type == PredictType::Distr).then(|| SurvDistr {
            times: self.times.clone(),
            survival: vec![self.survival.clone(); rows.len()],
        });
        Ok(Prediction::Surv(SurvPrediction {
            row_ids: rows.to_vec(),
            time,
            event,
            crank: vec![crank; rows.len()],
            distr,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::base::Learner;
    use crate::task::generators::sim_surv;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    #[test]
    fn test_product_limit_estimate() {
        // times 1 2 2 3 4, event at 1, 2 (once), 4
        let curve = SurvivalCurve::estimate(
            &[2.0, 1.0, 4.0, 2.0, 3.0],
            &[true, true, true, false, false],
        );
        assert_eq!(curve.times, vec![1.0, 2.0, 4.0]);
        assert_abs_diff_eq!(curve.survival[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.survival[1], 0.8 * 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.survival[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_predicts_same_curve_for_every_row() {
        let task = sim_surv(50, 2).unwrap();
        let mut learner = Learner::new("surv.kaplan", Arc::new(KaplanMeier));
        learner.train(&task, None).unwrap();
        let p = learner.predict(&task, Some(&task.row_ids()[..3])).unwrap();
        let s = p.as_surv().unwrap();
        let distr = s.distr.as_ref().unwrap();
        assert_eq!(distr.survival.len(), 3);
        assert_eq!(distr.survival[0], distr.survival[2]);
        assert!(s.crank.iter().all(|&c| c == s.crank[0]));
    }
}
