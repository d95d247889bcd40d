//! `basis` CLI binary.
//!
//! Command-line entry point for the CDS-bond basis replication pipeline.

use basis::{Pipeline, PipelineConfig, RunStatus, TaskReport};
use basis_data::DataStore;
use basis_output::{ExportFormat, export_summary, summarize};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "basis")]
#[command(about = "CDS-bond basis and implied risk-free rate replication", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull source data (Open Source Bond downloads, WRDS Markit pulls)
    Pull {
        /// Pull the Open Source Bond panels
        #[arg(long)]
        bonds: bool,

        /// Pull the Markit RED/ISIN mapping (needs WRDS credentials)
        #[arg(long)]
        mapping: bool,

        /// Pull Markit CDS quotes and the CRSP link (needs WRDS credentials)
        #[arg(long)]
        markit: bool,

        /// Pull everything
        #[arg(long)]
        all: bool,
    },

    /// Merge bonds with CDS curves and compute the basis datasets
    Calc,

    /// Render the interactive HTML chart of the aggregated series
    Chart,

    /// Print summary statistics for the aggregated dataset
    Summary {
        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,

        /// Export the per-series table (.csv or .json by extension)
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Run the full task graph, skipping up-to-date tasks
    Run {
        /// Re-run every task regardless of recorded state
        #[arg(long)]
        force: bool,
    },

    /// Show per-task up-to-date state without running anything
    Status,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = PipelineConfig::load()?;

    match cli.command {
        Commands::Pull {
            bonds,
            mapping,
            markit,
            all,
        } => {
            let none_selected = !(bonds || mapping || markit);
            let mut tasks: Vec<&str> = Vec::new();
            if bonds || all || none_selected {
                tasks.push("pull_open_source_bond");
            }
            if mapping || all || none_selected {
                tasks.push("pull_markit_mapping");
            }
            if markit || all || none_selected {
                tasks.push("pull_wrds_markit");
            }

            let mut pipeline = Pipeline::new(config)?;
            for task in tasks {
                let pb = spinner(&format!("Pulling: {task}"));
                let reports = pipeline.run_task(task, false).await?;
                pb.finish_and_clear();
                print_reports(&reports);
            }
        }

        Commands::Calc => {
            let mut pipeline = Pipeline::new(config)?;
            let reports = pipeline.run_task("calc", true).await?;
            print_reports(&reports);
        }

        Commands::Chart => {
            let mut pipeline = Pipeline::new(config)?;
            let reports = pipeline.run_task("generate_chart", true).await?;
            print_reports(&reports);
        }

        Commands::Summary { format, export } => {
            summary_command(&config, &format, export.as_deref())?;
        }

        Commands::Run { force } => {
            let mut pipeline = Pipeline::new(config)?;
            let reports = pipeline.run(force).await?;
            let ran = reports
                .iter()
                .filter(|r| r.status == RunStatus::Ran)
                .count();
            println!(
                "\n{} task(s) ran, {} up to date",
                ran,
                reports.len() - ran
            );
        }

        Commands::Status => {
            let pipeline = Pipeline::new(config)?;
            for (name, status) in pipeline.status()? {
                println!("{name:<24} {status}");
            }
        }
    }

    Ok(())
}

fn summary_command(
    config: &PipelineConfig,
    format: &str,
    export: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = DataStore::new(config.data_dir.clone());
    let long = store.load_ftsfr_aggregated()?;
    let summary = summarize(&long)?;

    match format {
        "json" => println!("{}", summary.to_json()?),
        "text" => println!("{summary}"),
        other => return Err(format!("unknown format: {other} (expected json or text)").into()),
    }

    if let Some(path) = export {
        let export_format = match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => ExportFormat::Csv,
            _ => ExportFormat::PrettyJson,
        };
        export_summary(&summary, export_format, path)?;
        println!("Exported series table to {}", path.display());
    }

    Ok(())
}

fn print_reports(reports: &[TaskReport]) {
    for report in reports {
        match report.status {
            RunStatus::Ran => println!("ran        {}", report.name),
            RunStatus::UpToDate => println!("up to date {}", report.name),
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}
