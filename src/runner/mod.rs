//! @ai:module:intent Turns a configuration into a design and executes it
//! @ai:module:layer application
//! @ai:module:public_api BenchmarkRunner, build_learner, build_resampling, build_measures, load_tasks

pub mod builder;
pub mod executor;

pub use builder::{build_learner, build_measures, build_resampling};
pub use executor::{load_tasks, BenchmarkRunner};
