//! @ai:module:intent Resample and benchmark results with scoring and aggregation
//! @ai:module:layer domain
//! @ai:module:public_api IterationRecord, ResampleResult, BenchmarkResult, ScoreRow, AggregateRow, ConditionRow, RankRow

pub mod benchmark_result;
pub mod resample_result;
pub mod rows;

pub use benchmark_result::BenchmarkResult;
pub use resample_result::{IterationRecord, ResampleResult};
pub use rows::{AggregateRow, ConditionRow, RankRow, ScoreRow, Scores};
