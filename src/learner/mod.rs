//! @ai:module:intent Learners: algorithms, trained state and the built-in registry
//! @ai:module:layer domain
//! @ai:module:public_api Learner, Algorithm, FittedModel, LearnerState, PredictType, Conditions, lrn, lrns, learner_ids

pub mod base;
pub mod debug;
pub mod featureless;
pub mod kaplan;
pub mod knn;
pub mod registry;

pub use base::{Algorithm, Conditions, FittedModel, Learner, LearnerState, PredictType};
pub use registry::{learner_ids, lrn, lrns};
