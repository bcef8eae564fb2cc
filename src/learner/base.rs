//! @ai:module:intent Learner abstraction: pluggable algorithm plus parameters and state
//! @ai:module:layer domain
//! @ai:module:public_api Algorithm, FittedModel, Learner, LearnerState, PredictType, Conditions
//! @ai:module:stateless false

use crate::error::{Error, Result};
use crate::param::{ParamConfig, ParamSet};
use crate::prediction::Prediction;
use crate::task::{Task, TaskType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// @ai:intent Kind of output a learner is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictType {
    Response,
    Prob,
    Se,
    Crank,
    Distr,
}

impl PredictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictType::Response => "response",
            PredictType::Prob => "prob",
            PredictType::Se => "se",
            PredictType::Crank => "crank",
            PredictType::Distr => "distr",
        }
    }
}

/// @ai:intent Warnings raised while training or predicting
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    warnings: Vec<String>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// @ai:intent Record a warning without interrupting the computation
    /// @ai:effects state:write
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

/// @ai:intent A trained model able to predict new rows
pub trait FittedModel: Send + Sync + Debug {
    /// @ai:intent Predict the given rows of a task
    fn predict(
        &self,
        task: &Task,
        rows: &[usize],
        predict_type: PredictType,
        conditions: &mut Conditions,
    ) -> Result<Prediction>;

    /// @ai:intent Downcast hook for model-specific accessors
    fn as_any(&self) -> &dyn Any;
}

/// @ai:intent The fitting procedure behind a learner
pub trait Algorithm: Send + Sync + Debug {
    fn task_type(&self) -> TaskType;

    /// Supported predict types, the first one is the default.
    fn predict_types(&self) -> &[PredictType];

    /// @ai:intent Parameter definitions with defaults, no values set
    fn param_set(&self) -> ParamSet;

    /// @ai:intent Fit a model on the given rows
    fn train(
        &self,
        task: &Task,
        rows: &[usize],
        params: &ParamSet,
        conditions: &mut Conditions,
    ) -> Result<Box<dyn FittedModel>>;
}

/// @ai:intent Trained model plus bookkeeping from the training call
#[derive(Debug, Clone)]
pub struct LearnerState {
    pub model: Arc<dyn FittedModel>,
    pub train_time: Duration,
    pub train_rows: usize,
    pub task_hash: String,
    pub warnings: Vec<String>,
}

/// @ai:intent Trainable predictor with hyperparameters and optional fallback
///
/// Cloning is cheap: the algorithm and a trained model are shared.
#[derive(Debug, Clone)]
pub struct Learner {
    id: String,
    algorithm: Arc<dyn Algorithm>,
    param_set: ParamSet,
    predict_type: PredictType,
    fallback: Option<Box<Learner>>,
    state: Option<LearnerState>,
}

impl Learner {
    /// @ai:intent Wrap an algorithm under an id with default parameters
    /// @ai:effects pure
    pub fn new(id: impl Into<String>, algorithm: Arc<dyn Algorithm>) -> Self {
        let predict_type = algorithm
            .predict_types()
            .first()
            .copied()
            .unwrap_or(PredictType::Response);
        Self {
            id: id.into(),
            param_set: algorithm.param_set(),
            algorithm,
            predict_type,
            fallback: None,
            state: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn task_type(&self) -> TaskType {
        self.algorithm.task_type()
    }

    pub fn algorithm(&self) -> &Arc<dyn Algorithm> {
        &self.algorithm
    }

    pub fn param_set(&self) -> &ParamSet {
        &self.param_set
    }

    pub fn predict_type(&self) -> PredictType {
        self.predict_type
    }

    pub fn predict_types(&self) -> &[PredictType] {
        self.algorithm.predict_types()
    }

    /// @ai:intent Set hyperparameter values; resets a trained state
    /// @ai:effects state:write
    pub fn set_params(&mut self, values: &ParamConfig) -> Result<()> {
        self.param_set.set_values(values)?;
        self.state = None;
        Ok(())
    }

    /// @ai:intent Builder-style `set_params`
    /// @ai:effects pure
    pub fn with_params(mut self, values: &ParamConfig) -> Result<Self> {
        self.set_params(values)?;
        Ok(self)
    }

    /// @ai:intent Choose the predict type among the supported ones
    /// @ai:effects state:write
    pub fn set_predict_type(&mut self, predict_type: PredictType) -> Result<()> {
        if !self.predict_types().contains(&predict_type) {
            return Err(Error::TypeMismatch(format!(
                "learner '{}' does not support predict type '{}'",
                self.id,
                predict_type.as_str()
            )));
        }
        self.predict_type = predict_type;
        Ok(())
    }

    pub fn with_predict_type(mut self, predict_type: PredictType) -> Result<Self> {
        self.set_predict_type(predict_type)?;
        Ok(self)
    }

    pub fn fallback(&self) -> Option<&Learner> {
        self.fallback.as_deref()
    }

    /// @ai:intent Attach a learner that stands in when this one fails
    /// @ai:pre fallback solves the same task type
    /// @ai:effects state:write
    pub fn set_fallback(&mut self, fallback: Learner) -> Result<()> {
        if fallback.task_type() != self.task_type() {
            return Err(Error::TypeMismatch(format!(
                "fallback '{}' is {}, learner '{}' is {}",
                fallback.id,
                fallback.task_type(),
                self.id,
                self.task_type()
            )));
        }
        let mut fallback = fallback;
        if fallback.predict_types().contains(&self.predict_type) {
            fallback.predict_type = self.predict_type;
        }
        self.fallback = Some(Box::new(fallback));
        Ok(())
    }

    pub fn with_fallback(mut self, fallback: Learner) -> Result<Self> {
        self.set_fallback(fallback)?;
        Ok(self)
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&LearnerState> {
        self.state.as_ref()
    }

    pub fn model(&self) -> Option<&dyn FittedModel> {
        self.state.as_ref().map(|s| s.model.as_ref())
    }

    /// @ai:intent Forget the trained model
    /// @ai:effects state:write
    pub fn reset(&mut self) {
        self.state = None;
    }

    fn check_task(&self, task: &Task) -> Result<()> {
        if task.task_type() != self.task_type() {
            return Err(Error::TypeMismatch(format!(
                "learner '{}' is {}, task '{}' is {}",
                self.id,
                self.task_type(),
                task.id(),
                task.task_type()
            )));
        }
        Ok(())
    }

    /// @ai:intent Train on the given rows (all `use` rows when None)
    /// @ai:effects state:write
    pub fn train(&mut self, task: &Task, rows: Option<&[usize]>) -> Result<()> {
        let mut conditions = Conditions::new();
        self.train_with_conditions(task, rows, &mut conditions)?;
        for warning in conditions.warnings() {
            tracing::warn!("Learner {} warned during training: {}", self.id, warning);
        }
        Ok(())
    }

    /// @ai:intent Train and collect warnings into the caller's conditions
    /// @ai:effects state:write
    pub fn train_with_conditions(
        &mut self,
        task: &Task,
        rows: Option<&[usize]>,
        conditions: &mut Conditions,
    ) -> Result<()> {
        self.check_task(task)?;
        let rows = rows.unwrap_or_else(|| task.row_ids());
        self.state = None;

        let start = Instant::now();
        let before = conditions.warnings().len();
        let model = self
            .algorithm
            .train(task, rows, &self.param_set, conditions)
            .map_err(|e| match e {
                Error::Train { .. } => e,
                other => Error::Train {
                    learner: self.id.clone(),
                    message: other.to_string(),
                },
            })?;

        self.state = Some(LearnerState {
            model: Arc::from(model),
            train_time: start.elapsed(),
            train_rows: rows.len(),
            task_hash: task.hash(),
            warnings: conditions.warnings()[before..].to_vec(),
        });
        Ok(())
    }

    /// @ai:intent Predict the given rows (all `use` rows when None)
    /// @ai:pre learner is trained
    /// @ai:effects pure
    pub fn predict(&self, task: &Task, rows: Option<&[usize]>) -> Result<Prediction> {
        let mut conditions = Conditions::new();
        let prediction = self.predict_with_conditions(task, rows, &mut conditions)?;
        for warning in conditions.warnings() {
            tracing::warn!("Learner {} warned during prediction: {}", self.id, warning);
        }
        Ok(prediction)
    }

    pub fn predict_with_conditions(
        &self,
        task: &Task,
        rows: Option<&[usize]>,
        conditions: &mut Conditions,
    ) -> Result<Prediction> {
        self.check_task(task)?;
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| Error::NotTrained(self.id.clone()))?;
        let rows = rows.unwrap_or_else(|| task.row_ids());

        state
            .model
            .predict(task, rows, self.predict_type, conditions)
            .map_err(|e| match e {
                Error::Predict { .. } => e,
                other => Error::Predict {
                    learner: self.id.clone(),
                    message: other.to_string(),
                },
            })
    }

    /// @ai:intent Identity hash over id, parameter values and predict type
    /// @ai:effects pure
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        for (id, value) in self.param_set.values() {
            hasher.update(id.as_bytes());
            hasher.update(value.to_string().as_bytes());
        }
        hasher.update(self.predict_type.as_str().as_bytes());
        if let Some(fallback) = &self.fallback {
            hasher.update(fallback.hash().as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
