//! @ai:module:intent Machine-learning benchmarking: tasks, learners, resampling, measures and nested tuning
//! @ai:module:layer application
//! @ai:module:public_api Task, Learner, Resampling, Measure, resample, benchmark, BenchmarkResult, AutoTuner

pub mod benchmark;
pub mod config;
pub mod data;
pub mod error;
pub mod learner;
pub mod measure;
pub mod param;
pub mod prediction;
pub mod report;
pub mod resample;
pub mod resampling;
pub mod result;
pub mod runner;
pub mod task;
pub mod tuning;

pub use benchmark::{benchmark, benchmark_grid, DesignRow};
pub use config::BenchmarkConfig;
pub use error::{Error, Result};
pub use learner::{lrn, lrns, Learner, PredictType};
pub use measure::{msr, msrs, Measure};
pub use prediction::Prediction;
pub use report::{BenchmarkReport, ReportGenerator};
pub use resample::{resample, Parallelism, ResampleOptions};
pub use resampling::{rsmp, Resampling, Strategy};
pub use result::{BenchmarkResult, ResampleResult};
pub use runner::BenchmarkRunner;
pub use task::{Task, TaskType};
pub use tuning::{tune, AutoTuner, Terminator, Tuner};
