//! @ai:module:intent Weighted k-nearest-neighbour learners for classification and regression
//! @ai:module:layer domain
//! @ai:module:public_api KnnClassif, KnnRegr
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::learner::base::{Algorithm, Conditions, FittedModel, PredictType};
use crate::learner::featureless::argmax;
use crate::param::{Param, ParamSet, ParamValue};
use crate::prediction::{ClassifPrediction, Prediction, RegrPrediction};
use crate::task::{Task, TaskType, Truth};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::any::Any;

const KERNELS: [&str; 3] = ["rectangular", "inverse", "triangular"];

fn knn_params() -> ParamSet {
    ParamSet::new()
        .with(Param::int("k", 1, i64::MAX).default_value(ParamValue::Int(7)))
        .with(Param::dbl("distance", 1e-8, f64::INFINITY).default_value(ParamValue::Dbl(2.0)))
        .with(Param::fct("kernel", &KERNELS).default_value(ParamValue::Fct("rectangular".to_string())))
        .with(Param::lgl("scale").default_value(ParamValue::Lgl(true)))
}

/// @ai:intent Training matrix, standardised when requested, plus neighbour settings
#[derive(Debug, Clone)]
struct Neighbours {
    features: Vec<String>,
    x: Array2<f64>,
    center: Array1<f64>,
    scale: Array1<f64>,
    k: usize,
    p: f64,
    kernel: String,
}

impl Neighbours {
    fn fit(
        task: &Task,
        rows: &[usize],
        params: &ParamSet,
        conditions: &mut Conditions,
    ) -> Result<Self> {
        let x = task.model_matrix(rows)?;
        if x.iter().any(|v| v.is_nan()) {
            return Err(Error::InvalidData(
                "k-nearest-neighbours does not support missing values".to_string(),
            ));
        }
        if x.nrows() == 0 {
            return Err(Error::InvalidData("no training rows".to_string()));
        }

        let width = x.ncols();
        let (center, scale) = if params.get_lgl("scale")? {
            let center = x
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(width));
            let sd = x.std_axis(Axis(0), if x.nrows() > 1 { 1.0 } else { 0.0 });
            let sd = sd.mapv(|s| if s > 0.0 { s } else { 1.0 });
            (center, sd)
        } else {
            (Array1::zeros(width), Array1::ones(width))
        };

        let mut k = params.get_int("k")? as usize;
        if k > x.nrows() {
            conditions.warn(format!(
                "k = {} exceeds the {} training rows, using all rows",
                k,
                x.nrows()
            ));
            k = x.nrows();
        }

        let x = (&x - &center) / &scale;
        Ok(Self {
            features: task.model_matrix_names()?,
            x,
            center,
            scale,
            k,
            p: params.get_dbl("distance")?,
            kernel: params.get_fct("kernel")?,
        })
    }

    fn minkowski(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(u, v)| (u - v).abs().powf(self.p))
            .sum::<f64>()
            .powf(1.0 / self.p)
    }

    /// @ai:intent Nearest training positions and their kernel weights for each new row
    /// @ai:effects pure
    fn query(&self, task: &Task, rows: &[usize]) -> Result<Vec<Vec<(usize, f64)>>> {
        let features = task.model_matrix_names()?;
        if features != self.features {
            return Err(Error::TypeMismatch(format!(
                "model was trained on features [{}], task has [{}]",
                self.features.join(", "),
                features.join(", ")
            )));
        }
        let new = task.model_matrix(rows)?;
        if new.iter().any(|v| v.is_nan()) {
            return Err(Error::InvalidData(
                "k-nearest-neighbours does not support missing values".to_string(),
            ));
        }
        let new = (&new - &self.center) / &self.scale;

        let neighbours = new
            .axis_iter(Axis(0))
            .map(|row| {
                let mut distances: Vec<(usize, f64)> = self
                    .x
                    .axis_iter(Axis(0))
                    .enumerate()
                    .map(|(i, train)| (i, self.minkowski(row, train)))
                    .collect();
                distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

                // The (k+1)-th distance normalises the triangular kernel.
                let bandwidth = distances
                    .get(self.k)
                    .map(|d| d.1)
                    .unwrap_or_else(|| distances.last().map(|d| d.1).unwrap_or(0.0))
                    .max(1e-6);
                distances.truncate(self.k);

                distances
                    .into_iter()
                    .map(|(i, d)| {
                        let w = match self.kernel.as_str() {
                            "inverse" => 1.0 / d.max(1e-6),
                            "triangular" => (1.0 - d / (bandwidth * (1.0 + 1e-6))).max(1e-6),
                            _ => 1.0,
                        };
                        (i, w)
                    })
                    .collect()
            })
            .collect();
        Ok(neighbours)
    }
}

/// @ai:intent Classifies by kernel-weighted vote of the nearest training rows
#[derive(Debug, Clone, Copy, Default)]
pub struct KnnClassif;

#[derive(Debug, Clone)]
struct KnnClassifModel {
    neighbours: Neighbours,
    classes: Vec<String>,
    codes: Vec<usize>,
}

impl Algorithm for KnnClassif {
    fn task_type(&self) -> TaskType {
        TaskType::Classif
    }

    fn predict_types(&self) -> &[PredictType] {
        &[PredictType::Response, PredictType::Prob]
    }

    fn param_set(&self) -> ParamSet {
        knn_params()
    }

    fn train(
        &self,
        task: &Task,
        rows: &[usize],
        params: &ParamSet,
        conditions: &mut Conditions,
    ) -> Result<Box<dyn FittedModel>> {
        let Truth::Classes { classes, codes } = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected class labels".to_string()));
        };
        let neighbours = Neighbours::fit(task, rows, params, conditions)?;
        Ok(Box::new(KnnClassifModel {
            neighbours,
            classes,
            codes,
        }))
    }
}

impl FittedModel for KnnClassifModel {
    fn predict(
        &self,
        task: &Task,
        rows: &[usize],
        predict_type: PredictType,
        _conditions: &mut Conditions,
    ) -> Result<Prediction> {
        let Truth::Classes { codes: truth, .. } = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected class labels".to_string()));
        };

        let probs: Vec<Vec<f64>> = self
            .neighbours
            .query(task, rows)?
            .into_iter()
            .map(|nearest| {
                let mut votes = vec![0.0; self.classes.len()];
                for (i, w) in nearest {
                    votes[self.codes[i]] += w;
                }
                let total: f64 = votes.iter().sum();
                votes.iter().map(|v| v / total).collect()
            })
            .collect();

        Ok(Prediction::Classif(ClassifPrediction {
            row_ids: rows.to_vec(),
            classes: self.classes.clone(),
            positive: task.positive_index(),
            truth,
            response: probs.iter().map(|p| argmax(p)).collect(),
            prob: (predict_type == PredictType::Prob).then_some(probs),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// @ai:intent Predicts the kernel-weighted mean target of the nearest training rows
#[derive(Debug, Clone, Copy, Default)]
pub struct KnnRegr;

#[derive(Debug, Clone)]
struct KnnRegrModel {
    neighbours: Neighbours,
    y: Vec<f64>,
}

impl Algorithm for KnnRegr {
    fn task_type(&self) -> TaskType {
        TaskType::Regr
    }

    fn predict_types(&self) -> &[PredictType] {
        &[PredictType::Response]
    }

    fn param_set(&self) -> ParamSet {
        knn_params()
    }

    fn train(
        &self,
        task: &Task,
        rows: &[usize],
        params: &ParamSet,
        conditions: &mut Conditions,
    ) -> Result<Box<dyn FittedModel>> {
        let Truth::Numeric(y) = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected numeric target".to_string()));
        };
        if y.iter().any(|v| v.is_nan()) {
            return Err(Error::InvalidData("missing values in target".to_string()));
        }
        let neighbours = Neighbours::fit(task, rows, params, conditions)?;
        Ok(Box::new(KnnRegrModel { neighbours, y }))
    }
}

impl FittedModel for KnnRegrModel {
    fn predict(
        &self,
        task: &Task,
        rows: &[usize],
        _predict_type: PredictType,
        _conditions: &mut Conditions,
    ) -> Result<Prediction> {
        let Truth::Numeric(truth) = task.truth(rows)? else {
            return Err(Error::TypeMismatch("expected numeric target".to_string()));
        };
        let response = self
            .neighbours
            .query(task, rows)?
            .into_iter()
            .map(|nearest| {
                let (sum, weight) = nearest
                    .iter()
                    .fold((0.0, 0.0), |(s, t), &(i, w)| (s + w * self.y[i], t + w));
                sum / weight
            })
            .collect();

        Ok(Prediction::Regr(RegrPrediction {
            row_ids: rows.to_vec(),
            truth,
            response,
            se: None,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, DataBackend};
    use crate::learner::base::Learner;
    use crate::param::ParamConfig;
    use crate::task::generators::{friedman1, two_normals};
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn params(k: i64, kernel: &str) -> ParamConfig {
        let mut values = ParamConfig::new();
        values.insert("k".to_string(), ParamValue::Int(k));
        values.insert("kernel".to_string(), ParamValue::Fct(kernel.to_string()));
        values
    }

    #[test]
    fn test_one_neighbour_reproduces_training_labels() {
        let task = two_normals(30, 3).unwrap();
        let mut learner = Learner::new("classif.kknn", Arc::new(KnnClassif))
            .with_params(&params(1, "rectangular"))
            .unwrap();
        learner.train(&task, None).unwrap();
        let p = learner.predict(&task, None).unwrap();
        let c = p.as_classif().unwrap();
        assert_eq!(c.response, c.truth);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let task = two_normals(40, 3).unwrap();
        let mut learner = Learner::new("classif.kknn", Arc::new(KnnClassif))
            .with_params(&params(5, "triangular"))
            .unwrap()
            .with_predict_type(PredictType::Prob)
            .unwrap();
        learner.train(&task, Some(&task.row_ids()[..30])).unwrap();
        let p = learner.predict(&task, Some(&task.row_ids()[30..])).unwrap();
        for row in p.as_classif().unwrap().prob.as_ref().unwrap() {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_regression_average_of_neighbours() {
        let backend = DataBackend::from_columns(vec![
            ("x".to_string(), Column::Numeric(vec![0.0, 1.0, 2.0, 10.0])),
            ("y".to_string(), Column::Numeric(vec![1.0, 2.0, 3.0, 100.0])),
        ])
        .unwrap();
        let task = Task::regr("line", backend, "y").unwrap();
        let mut values = params(3, "rectangular");
        values.insert("scale".to_string(), ParamValue::Lgl(false));
        let mut learner = Learner::new("regr.kknn", Arc::new(KnnRegr))
            .with_params(&values)
            .unwrap();
        learner.train(&task, Some(&[1, 2, 3, 4])).unwrap();
        let p = learner.predict(&task, Some(&[2])).unwrap();
        assert_abs_diff_eq!(p.as_regr().unwrap().response[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_predict_on_other_features_is_error() {
        let task = friedman1(40, 2).unwrap();
        let mut learner = Learner::new("regr.kknn", Arc::new(KnnRegr));
        learner.train(&task, None).unwrap();

        let mut narrow = task.clone();
        narrow.select(&["x1".to_string()]).unwrap();
        let err = learner.predict(&narrow, None).unwrap_err();
        assert!(matches!(err, Error::Predict { .. }));
        assert!(err.to_string().contains("x1"));

        assert_eq!(learner.predict(&task, None).unwrap().len(), 40);
    }

    #[test]
    fn test_missing_values_rejected() {
        let backend = DataBackend::from_columns(vec![
            ("x".to_string(), Column::Numeric(vec![0.0, f64::NAN, 2.0])),
            ("y".to_string(), Column::Numeric(vec![1.0, 2.0, 3.0])),
        ])
        .unwrap();
        let task = Task::regr("gaps", backend, "y").unwrap();
        let mut learner = Learner::new("regr.kknn", Arc::new(KnnRegr));
        assert!(learner.train(&task, None).is_err());
    }

    #[test]
    fn test_large_k_warns_and_clamps() {
        let task = two_normals(6, 3).unwrap();
        let mut learner = Learner::new("classif.kknn", Arc::new(KnnClassif))
            .with_params(&params(50, "rectangular"))
            .unwrap();
        let mut conditions = Conditions::new();
        learner
            .train_with_conditions(&task, None, &mut conditions)
            .unwrap();
        assert_eq!(conditions.warnings().len(), 1);
    }
}
