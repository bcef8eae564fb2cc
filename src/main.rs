//! @ai:module:intent CLI for the mlbench benchmarking toolkit
//! @ai:module:layer presentation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mlbench::{
    config::{BenchmarkConfig, FilterConfig},
    learner::{learner_ids, lrn},
    measure::{measure_ids, msr},
    report::{BenchmarkReport, ReportGenerator},
    resampling::resampling_ids,
    runner::{load_tasks, BenchmarkRunner},
    task::{generators::generator_ids, TaskLoader, TaskLoaderTrait},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mlbench")]
#[command(about = "Benchmark learners on tasks with resampling, measures and nested tuning")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a benchmark
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Filter by task IDs (comma-separated)
        #[arg(long)]
        tasks: Option<String>,

        /// Filter by learner IDs (comma-separated)
        #[arg(long)]
        learners: Option<String>,

        /// Seed for resampling instantiation
        #[arg(long)]
        seed: Option<u64>,

        /// Run resampling iterations in parallel
        #[arg(long)]
        parallel: bool,

        /// Keep trained models (needed for inner tuning results)
        #[arg(long)]
        store_models: bool,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Regenerate reports from an existing results file
    Report {
        /// Path to results JSON file
        #[arg(short, long)]
        results: PathBuf,

        /// Output directory for reports
        #[arg(short, long, default_value = "reports")]
        output: PathBuf,
    },

    /// List registered objects or configured tasks
    List {
        #[arg(value_enum)]
        kind: ListKind,

        /// Path to configuration file (for tasks)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate task manifests and the configured design
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "benchmark.toml")]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListKind {
    Tasks,
    Learners,
    Measures,
    Resamplings,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mlbench=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            tasks,
            learners,
            seed,
            parallel,
            store_models,
            output,
        } => run_benchmark(RunArgs {
            config,
            tasks,
            learners,
            seed,
            parallel,
            store_models,
            output,
        }),
        Commands::Report { results, output } => generate_reports(results, output),
        Commands::List { kind, config } => list(kind, config),
        Commands::Validate { config } => validate(config),
        Commands::Init { output } => init_config(output),
    }
}

struct RunArgs {
    config: Option<PathBuf>,
    tasks: Option<String>,
    learners: Option<String>,
    seed: Option<u64>,
    parallel: bool,
    store_models: bool,
    output: Option<PathBuf>,
}

/// @ai:intent Run the configured benchmark and write reports
/// @ai:effects compute, fs:read, fs:write
fn run_benchmark(args: RunArgs) -> Result<()> {
    let mut config = load_or_default_config(args.config)?;

    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    config.run.parallel |= args.parallel;
    config.run.store_models |= args.store_models;
    apply_filter(&mut config.run.filter, args.tasks, args.learners);

    let tasks = load_tasks(&config)?;
    if tasks.is_empty() {
        tracing::warn!("No tasks match the filter criteria");
        return Ok(());
    }
    tracing::info!("Found {} tasks to run", tasks.len());

    let runner = BenchmarkRunner::new(&config)?;
    let report = runner.run(&tasks)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
    let output_dir = args
        .output
        .unwrap_or_else(|| config.paths.results_dir.clone())
        .join(timestamp.to_string());
    ReportGenerator::new().generate_all(&report, &output_dir)?;

    print_summary(&report);
    Ok(())
}

/// @ai:intent Generate reports from results file
/// @ai:effects fs:read, fs:write
fn generate_reports(results_path: PathBuf, output_dir: PathBuf) -> Result<()> {
    let report = BenchmarkReport::load(&results_path)
        .with_context(|| format!("Failed to read results: {}", results_path.display()))?;

    ReportGenerator::new().generate_all(&report, &output_dir)?;

    println!("Reports generated in {}", output_dir.display());
    Ok(())
}

/// @ai:intent Print registered ids or configured tasks
/// @ai:effects fs:read, io
fn list(kind: ListKind, config: Option<PathBuf>) -> Result<()> {
    match kind {
        ListKind::Tasks => {
            let config = load_or_default_config(config)?;
            let tasks = load_tasks(&config)?;

            println!("Available tasks ({}):", tasks.len());
            println!();
            println!("{:<30} {:<10} {:>8} {:>10}", "ID", "Type", "Rows", "Features");
            println!("{}", "-".repeat(62));
            for task in &tasks {
                println!(
                    "{:<30} {:<10} {:>8} {:>10}",
                    task.id(),
                    task.task_type().as_str(),
                    task.nrow(),
                    task.feature_names().len()
                );
            }
            println!();
            println!("Generators: {}", generator_ids().join(", "));
        }
        ListKind::Learners => {
            println!("{:<24} {:<10} {}", "ID", "Type", "Parameters");
            println!("{}", "-".repeat(62));
            for id in learner_ids() {
                let learner = lrn(id)?;
                println!(
                    "{:<24} {:<10} {}",
                    id,
                    learner.task_type().as_str(),
                    learner.param_set().ids().join(", ")
                );
            }
        }
        ListKind::Measures => {
            println!("{:<20} {:<10} {}", "ID", "Type", "Direction");
            println!("{}", "-".repeat(44));
            for id in measure_ids() {
                let measure = msr(id)?;
                println!(
                    "{:<20} {:<10} {}",
                    id,
                    measure.task_type().map(|t| t.as_str()).unwrap_or("any"),
                    if measure.minimize() { "minimize" } else { "maximize" }
                );
            }
        }
        ListKind::Resamplings => {
            for id in resampling_ids() {
                println!("{}", id);
            }
        }
    }
    Ok(())
}

/// @ai:intent Load every manifest and build every design entry, reporting problems
/// @ai:effects fs:read
fn validate(config: Option<PathBuf>) -> Result<()> {
    let config = load_or_default_config(config)?;
    let mut failures = 0;

    if config.paths.tasks_dir.exists() {
        for (path, result) in TaskLoader::new().validate(&config.paths.tasks_dir) {
            match result {
                Ok(task) => println!("  ok   {} ({})", path.display(), task.id()),
                Err(e) => {
                    failures += 1;
                    println!("  FAIL {}: {:#}", path.display(), e);
                }
            }
        }
    } else {
        println!("Task directory {} not found", config.paths.tasks_dir.display());
    }

    if let Err(e) = BenchmarkRunner::new(&config) {
        failures += 1;
        println!("  FAIL design: {:#}", e);
    }

    if failures > 0 {
        anyhow::bail!("Validation failed with {} problem(s)", failures);
    }
    println!("Validation passed!");
    Ok(())
}

/// @ai:intent Initialize default configuration file
/// @ai:effects fs:write
fn init_config(output: PathBuf) -> Result<()> {
    let config = BenchmarkConfig::default();
    config.save(&output)?;
    println!("Configuration saved to {}", output.display());
    Ok(())
}

/// @ai:intent Load configuration or use defaults
/// @ai:effects fs:read
fn load_or_default_config(path: Option<PathBuf>) -> Result<BenchmarkConfig> {
    match path {
        Some(p) => BenchmarkConfig::load(&p)
            .with_context(|| format!("Failed to load config: {}", p.display())),
        None => {
            let default_path = PathBuf::from("benchmark.toml");
            if default_path.exists() {
                BenchmarkConfig::load(&default_path)
            } else {
                Ok(BenchmarkConfig::default())
            }
        }
    }
}

fn split_ids(value: Option<String>) -> Option<Vec<String>> {
    value.map(|s| s.split(',').map(|t| t.trim().to_string()).collect())
}

/// @ai:intent Narrow the configured filter with CLI arguments
/// @ai:effects pure
fn apply_filter(filter: &mut FilterConfig, tasks: Option<String>, learners: Option<String>) {
    if let Some(ids) = split_ids(tasks) {
        filter.task_ids = Some(ids);
    }
    if let Some(ids) = split_ids(learners) {
        filter.learner_ids = Some(ids);
    }
}

/// @ai:intent Print the aggregate table to console
/// @ai:effects io
fn print_summary(report: &BenchmarkReport) {
    println!();
    println!("Benchmark Results");
    println!("=================");
    println!();

    print!("{:<20} {:<26} {:<12}", "Task", "Learner", "Resampling");
    for measure in &report.measures {
        print!(" {:>14}", measure);
    }
    println!();
    println!("{}", "-".repeat(60 + 15 * report.measures.len()));

    for row in &report.aggregate {
        print!(
            "{:<20} {:<26} {:<12}",
            row.task_id, row.learner_id, row.resampling_id
        );
        for measure in &report.measures {
            match row.scores.get(measure) {
                Some(v) if !v.is_nan() => print!(" {:>14.4}", v),
                _ => print!(" {:>14}", "-"),
            }
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!();
        println!(
            "{} iteration error(s) captured; see results.md for details",
            report.errors.len()
        );
    }
    println!();
}
