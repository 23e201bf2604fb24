//! fixpilot - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use fixpilot::{
    analysis::{ConvergenceController, IterationInput, RunStatus},
    applier::{ApplyReport, GuardedApplier},
    classifier::{AnalysisReport, ClassifiedFailure, ProblemClassifier},
    cli::{Args, Commands, TrackCommand, Verbosity},
    config::Config,
    pipeline::FixPipeline,
    proposer::{ProposalReport, RepositoryContext, Solution, SolutionProposer},
    telemetry,
    types::ingest_failures,
};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

/// Exit status telling the orchestrating loop to stop iterating
const STOP_REQUESTED: u8 = 2;

/// `propose` output: the classified failures alongside their solutions
#[derive(Serialize)]
struct ProposalOutput<'a> {
    failures: &'a [ClassifiedFailure],
    #[serde(flatten)]
    report: &'a ProposalReport,
}

#[derive(Deserialize)]
struct SolutionsInput {
    #[serde(default)]
    solutions: Vec<Solution>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    let default_verbosity =
        Verbosity::from_name(&config.telemetry.default_verbosity).unwrap_or(Verbosity::Normal);
    let verbosity = args.verbosity(default_verbosity);
    telemetry::init(verbosity, args.log_json || config.telemetry.json)?;

    let root = args.repo_root();

    match &args.command {
        Commands::Analyze { input, output } => {
            let report = analyze(input)?;
            write_output(&report, output.as_deref())?;
            if verbosity.show_summary() {
                print_analysis_summary(&report);
            }
        }
        Commands::Propose { input, output } => {
            let analysis: AnalysisReport = read_json(input)?;
            let proposer =
                SolutionProposer::new(RepositoryContext::new(&root, config.repository.clone()))?;
            let report = proposer.propose_all(&analysis.failures);

            let out = ProposalOutput {
                failures: &analysis.failures,
                report: &report,
            };
            write_output(&out, output.as_deref())?;
            if verbosity.show_summary() {
                print_proposal_summary(&report);
            }
        }
        Commands::Apply {
            input,
            output,
            threshold,
        } => {
            let input: SolutionsInput = read_json(input)?;
            let applier =
                GuardedApplier::from_config(&root, &config.apply, config.repository.clone())?;
            let threshold = threshold.unwrap_or(config.apply.confidence_threshold);
            let report = applier.apply(&input.solutions, threshold);

            write_output(&report, output.as_deref())?;
            if verbosity.show_summary() {
                print_apply_summary(&report);
            }
        }
        Commands::Iterate {
            input,
            output,
            threshold,
        } => {
            let document: serde_json::Value = read_json(input)?;
            let ingest = ingest_failures(&document);

            let mut pipeline = FixPipeline::from_config(&root, &config)?;
            if let Some(threshold) = threshold {
                pipeline = pipeline.with_threshold(*threshold);
            }
            let report = pipeline.run_iteration(&ingest.records, ingest.rejected);

            write_output(&report, output.as_deref())?;
            if verbosity.show_summary() {
                print_analysis_summary(&report.analysis);
                print_proposal_summary(&report.proposals);
                print_apply_summary(&report.apply);
            }
        }
        Commands::Track { command } => return track(command, &config, verbosity),
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("{}", rendered);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn analyze(input: &Path) -> Result<AnalysisReport> {
    let document: serde_json::Value = read_json(input)?;
    let ingest = ingest_failures(&document);

    let mut report = ProblemClassifier::new().analyze_all(&ingest.records);
    report.rejected = ingest.rejected;
    Ok(report)
}

fn track(command: &TrackCommand, config: &Config, verbosity: Verbosity) -> Result<ExitCode> {
    match command {
        TrackCommand::Add { input, state } => {
            let raw = if input == "-" {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read iteration from stdin")?;
                buffer
            } else {
                std::fs::read_to_string(input)
                    .with_context(|| format!("Failed to read {}", input))?
            };
            let iteration: IterationInput =
                serde_json::from_str(&raw).context("Invalid iteration document")?;

            let mut controller = ConvergenceController::load(state, config.convergence.clone())?;
            let decision = controller.record_iteration(iteration);
            controller.save(state)?;

            write_output(&decision, None)?;

            if !decision.should_continue {
                if verbosity.show_summary() {
                    let reason = decision
                        .stop_reason
                        .map(|r| r.to_string())
                        .unwrap_or_default();
                    eprintln!("{} {}", "Should stop iteration:".yellow().bold(), reason);
                }
                return Ok(ExitCode::from(STOP_REQUESTED));
            }
        }
        TrackCommand::Summary { state } => {
            let controller = ConvergenceController::load(state, config.convergence.clone())?;
            let summary = controller.summary();
            write_output(&summary, None)?;

            if verbosity.show_summary() {
                let status = match summary.status {
                    RunStatus::Success => "success".green(),
                    RunStatus::InProgress => "in_progress".yellow(),
                    RunStatus::Stalled => "stalled".red(),
                    RunStatus::NoIterations => "no_iterations".normal(),
                };
                eprintln!(
                    "\n{} {} iterations, {} -> {} failures ({}%), status {}",
                    "Progress:".bold(),
                    summary.iterations,
                    summary.initial_failures,
                    summary.current_failures,
                    summary.improvement_rate,
                    status
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn write_output<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "Written to:".green(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_analysis_summary(report: &AnalysisReport) {
    let stats = &report.statistics;
    eprintln!("\n{}", "Analysis:".bold());
    eprintln!("  Total failures:     {}", stats.total);
    eprintln!("  Average confidence: {:.2}", stats.average_confidence);
    eprintln!(
        "  Confidence:         {} high, {} medium, {} low",
        stats.high_confidence.to_string().green(),
        stats.medium_confidence.to_string().yellow(),
        stats.low_confidence.to_string().red()
    );
    for (category, count) in &stats.by_category {
        eprintln!("    {:<15} {}", category.name(), count);
    }
    if !report.rejected.is_empty() {
        eprintln!("  {} {}", "Rejected records:".yellow(), report.rejected.len());
    }
    for recommendation in &report.recommendations {
        eprintln!("  - {}", recommendation);
    }
}

fn print_proposal_summary(report: &ProposalReport) {
    let summary = &report.summary;
    eprintln!("\n{}", "Solutions:".bold());
    eprintln!("  Total failures:          {}", summary.total_failures);
    eprintln!("  Failures with solutions: {}", summary.failures_with_solutions);
    eprintln!("  Total fixes suggested:   {}", summary.total_fixes);
}

fn print_apply_summary(report: &ApplyReport) {
    let summary = &report.summary;
    eprintln!("\n{}", "Fixes:".bold());
    eprintln!("  Total:   {}", summary.total_fixes);
    eprintln!("  Applied: {}", summary.applied.to_string().green());
    eprintln!("  Skipped: {}", summary.skipped.to_string().yellow());
    for outcome in &report.skipped {
        eprintln!(
            "    {} {}: {}",
            "-".dimmed(),
            outcome.failure_id,
            outcome.reason.as_deref().unwrap_or("skipped")
        );
    }
}
