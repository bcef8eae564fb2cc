//! @ai:module:intent Report generation for benchmark results
//! @ai:module:layer infrastructure
//! @ai:module:public_api BenchmarkReport, ReportGenerator, JsonReporter, MarkdownReporter

pub mod json_report;
pub mod markdown_report;

pub use json_report::{JsonReporter, JsonReporterTrait};
pub use markdown_report::{MarkdownReporter, MarkdownReporterTrait};

use crate::measure::Measure;
use crate::result::{AggregateRow, BenchmarkResult, ConditionRow, RankRow, ScoreRow};
use crate::tuning::{extract_inner_tuning_results, InnerTuningRow};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// @ai:intent Serializable snapshot of a scored benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub timestamp: String,
    pub seed: u64,
    pub measures: Vec<String>,
    pub aggregate: Vec<AggregateRow>,
    pub scores: Vec<ScoreRow>,
    pub ranks: Vec<RankRow>,
    pub warnings: Vec<ConditionRow>,
    pub errors: Vec<ConditionRow>,
    /// Best inner configuration per outer iteration of every auto-tuned learner
    #[serde(default)]
    pub tuning: Vec<InnerTuningRow>,
}

impl BenchmarkReport {
    /// @ai:intent Score a benchmark result with the given measures
    /// @ai:effects compute
    pub fn from_result(
        result: &BenchmarkResult,
        measures: &[Arc<dyn Measure>],
        seed: u64,
    ) -> Result<Self> {
        let mut ranks = Vec::new();
        for measure in measures {
            ranks.extend(result.rank(measure)?);
        }

        let mut tuning = Vec::new();
        for rr in result.resample_results() {
            if rr.learners().iter().any(|l| l.is_some()) {
                tuning.extend(extract_inner_tuning_results(rr)?);
            }
        }

        Ok(Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            seed,
            measures: measures.iter().map(|m| m.id().to_string()).collect(),
            aggregate: result.aggregate(measures)?,
            scores: result.score(measures)?,
            ranks,
            warnings: result.warnings(),
            errors: result.errors(),
            tuning,
        })
    }

    /// @ai:intent Read a report previously written by the JSON reporter
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// @ai:intent Combined report generator
pub struct ReportGenerator {
    json: JsonReporter,
    markdown: MarkdownReporter,
}

impl ReportGenerator {
    /// @ai:intent Create a new report generator
    /// @ai:effects pure
    pub fn new() -> Self {
        Self {
            json: JsonReporter::new(),
            markdown: MarkdownReporter::new(),
        }
    }

    /// @ai:intent Generate all reports
    /// @ai:effects fs:write
    pub fn generate_all(&self, report: &BenchmarkReport, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)?;

        self.json.generate(report, &output_dir.join("results.json"))?;
        self.markdown
            .generate(report, &output_dir.join("results.md"))?;

        tracing::info!("Reports generated in {}", output_dir.display());
        Ok(())
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}
