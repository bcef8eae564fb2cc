//! @ai:module:intent Markdown report generation
//! @ai:module:layer infrastructure
//! @ai:module:public_api MarkdownReporter
//! @ai:module:stateless true

use crate::param::format_config;
use crate::report::BenchmarkReport;
use crate::result::ConditionRow;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::{self, Write as FmtWrite};
use std::path::Path;

/// @ai:intent Trait for Markdown report generation
pub trait MarkdownReporterTrait: Send + Sync {
    /// @ai:intent Generate Markdown report from a benchmark report
    fn generate(&self, report: &BenchmarkReport, output_path: &Path) -> Result<()>;
}

/// @ai:intent Generates Markdown reports from benchmark reports
pub struct MarkdownReporter;

/// Conditions listed per section before the rest is summarised.
const MAX_CONDITIONS: usize = 20;

impl MarkdownReporter {
    /// @ai:intent Create a new Markdown reporter
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Format a score, leaving undefined ones visibly blank
    /// @ai:effects pure
    fn format_score(value: Option<f64>) -> String {
        match value {
            Some(v) if !v.is_nan() => format!("{:.4}", v),
            _ => "n/a".to_string(),
        }
    }

    fn write_summary(out: &mut String, report: &BenchmarkReport) -> fmt::Result {
        writeln!(out, "# Benchmark Results")?;
        writeln!(out)?;
        writeln!(out, "**Date:** {}", report.timestamp)?;
        writeln!(out, "**Seed:** {}", report.seed)?;
        writeln!(out, "**Resample results:** {}", report.aggregate.len())?;
        writeln!(out, "**Measures:** {}", report.measures.join(", "))?;
        writeln!(out)
    }

    /// @ai:intent Aggregate table, one row per resample result
    /// @ai:effects pure
    fn write_aggregate(out: &mut String, report: &BenchmarkReport) -> fmt::Result {
        writeln!(out, "## Aggregated Scores")?;
        writeln!(out)?;
        write!(out, "| nr | Task | Learner | Resampling | Iters |")?;
        for measure in &report.measures {
            write!(out, " {} |", measure)?;
        }
        writeln!(out, " Warnings | Errors |")?;
        write!(out, "|----|------|---------|------------|-------|")?;
        for _ in &report.measures {
            write!(out, "------|")?;
        }
        writeln!(out, "----------|--------|")?;

        for row in &report.aggregate {
            write!(
                out,
                "| {} | {} | {} | {} | {} |",
                row.nr, row.task_id, row.learner_id, row.resampling_id, row.iters
            )?;
            for measure in &report.measures {
                write!(out, " {} |", Self::format_score(row.scores.get(measure).copied()))?;
            }
            writeln!(out, " {} | {} |", row.warnings, row.errors)?;
        }
        writeln!(out)
    }

    /// @ai:intent Mean rank of each learner over all tasks, per measure
    /// @ai:effects pure
    fn write_ranking(out: &mut String, report: &BenchmarkReport) -> fmt::Result {
        if report.ranks.is_empty() {
            return Ok(());
        }

        let mut mean_ranks: BTreeMap<(&str, &str), (f64, usize)> = BTreeMap::new();
        for row in &report.ranks {
            let entry = mean_ranks
                .entry((row.measure.as_str(), row.learner_id.as_str()))
                .or_insert((0.0, 0));
            entry.0 += row.rank;
            entry.1 += 1;
        }

        writeln!(out, "## Ranking")?;
        writeln!(out)?;
        writeln!(out, "| Measure | Learner | Mean Rank | Tasks |")?;
        writeln!(out, "|---------|---------|-----------|-------|")?;
        for ((measure, learner), (sum, n)) in &mean_ranks {
            writeln!(
                out,
                "| {} | {} | {:.2} | {} |",
                measure,
                learner,
                sum / *n as f64,
                n
            )?;
        }
        writeln!(out)
    }

    fn write_conditions(out: &mut String, title: &str, rows: &[ConditionRow]) -> fmt::Result {
        if rows.is_empty() {
            return Ok(());
        }

        writeln!(out, "## {} ({})", title, rows.len())?;
        writeln!(out)?;
        writeln!(out, "| Task | Learner | Resampling | Iteration | Message |")?;
        writeln!(out, "|------|---------|------------|-----------|---------|")?;
        for row in rows.iter().take(MAX_CONDITIONS) {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                row.task_id,
                row.learner_id,
                row.resampling_id,
                row.iteration,
                row.message.replace('|', "\\|").replace('\n', " ")
            )?;
        }
        if rows.len() > MAX_CONDITIONS {
            writeln!(out)?;
            writeln!(out, "_{} more not shown._", rows.len() - MAX_CONDITIONS)?;
        }
        writeln!(out)
    }

    fn write_tuning(out: &mut String, report: &BenchmarkReport) -> fmt::Result {
        if report.tuning.is_empty() {
            return Ok(());
        }

        writeln!(out, "## Inner Tuning Results")?;
        writeln!(out)?;
        writeln!(out, "| Task | Learner | Iteration | Configuration | Inner Score |")?;
        writeln!(out, "|------|---------|-----------|---------------|-------------|")?;
        for row in &report.tuning {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} = {} |",
                row.task_id,
                row.learner_id,
                row.iteration,
                format_config(&row.config),
                row.measure,
                Self::format_score(Some(row.score))
            )?;
        }
        writeln!(out)
    }

    /// @ai:intent Render the whole document
    /// @ai:effects pure
    pub fn render(report: &BenchmarkReport) -> Result<String> {
        let mut content = String::new();
        Self::write_summary(&mut content, report)?;
        Self::write_aggregate(&mut content, report)?;
        Self::write_ranking(&mut content, report)?;
        Self::write_tuning(&mut content, report)?;
        Self::write_conditions(&mut content, "Errors", &report.errors)?;
        Self::write_conditions(&mut content, "Warnings", &report.warnings)?;
        Ok(content)
    }
}

impl Default for MarkdownReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownReporterTrait for MarkdownReporter {
    /// @ai:intent Generate Markdown report to file
    /// @ai:effects fs:write
    fn generate(&self, report: &BenchmarkReport, output_path: &Path) -> Result<()> {
        std::fs::write(output_path, Self::render(report)?)?;
        Ok(())
    }
}
