//! @ai:module:intent Hyperparameter tuning and nested resampling
//! @ai:module:layer application
//! @ai:module:public_api Tuner, Terminator, Archive, TuningInstance, TuningResult, tune, AutoTuner, extract_inner_tuning_results

pub mod archive;
pub mod auto_tuner;
pub mod instance;
pub mod terminator;
pub mod tuner;

pub use archive::{Archive, ArchiveEntry};
pub use auto_tuner::{extract_inner_tuning_results, AutoTuner, InnerTuningRow, TunedModel};
pub use instance::{tune, TuningInstance, TuningResult};
pub use terminator::Terminator;
pub use tuner::{Proposer, Tuner};
