//! Doit-style task graph for the replication pipeline.
//!
//! Six tasks: three pulls (Open Source Bond downloads, the Markit RED
//! mapping, and the Markit CDS/CRSP pull), the basis calculation, the
//! chart, and the summary. A task runs when a target is missing, an
//! input fingerprint changed, or it is forced; otherwise it is skipped.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::state::{STATE_DB_FILE, StateDb, fingerprint_file};
use basis_core::basis::{aggregate_by_rating, bond_level, compute_basis};
use basis_core::bonds::merge_red_codes;
use basis_core::curve::{attach_par_spreads, collapse_quotes, fit_curves};
use basis_data::openbond::{OpenBondClient, datasets};
use basis_data::store::{self, DataStore};
use basis_data::wrds::client::WrdsClient;
use basis_data::wrds::{pull_cds_data, pull_red_crsp_link, pull_red_isin_mapping, subset_cds_to_crsp};
use basis_output::chart::DEFAULT_CHART_FILE;
use basis_output::datasets::{to_ftsfr_aggregated, to_ftsfr_bond_level};
use basis_output::summary::summarize;
use basis_output::LineChart;
use std::path::PathBuf;

/// Summary export file name, inside the output directory.
pub const SUMMARY_FILE: &str = "cds_bond_basis_summary.json";

/// What a task does when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    PullBonds,
    PullMapping,
    PullMarkit,
    Calc,
    Chart,
    Summary,
}

/// One node of the task graph.
#[derive(Debug, Clone)]
pub struct Task {
    /// Task name, as addressed from the command line.
    pub name: &'static str,
    /// One-line description.
    pub doc: &'static str,
    stage: Stage,
    /// Input files whose fingerprints gate re-runs.
    pub file_deps: Vec<PathBuf>,
    /// Files the task produces.
    pub targets: Vec<PathBuf>,
    /// Names of tasks that must run first.
    pub task_deps: Vec<&'static str>,
}

/// Freshness of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Targets exist and inputs are unchanged.
    UpToDate,
    /// The task needs to run, with the first reason found.
    Stale(String),
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpToDate => write!(f, "up to date"),
            Self::Stale(reason) => write!(f, "stale ({reason})"),
        }
    }
}

/// What happened to a task during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The task executed.
    Ran,
    /// The task was skipped as up to date.
    UpToDate,
}

/// Per-task outcome of a pipeline run.
#[derive(Debug, Clone)]
pub struct TaskReport {
    /// Task name.
    pub name: &'static str,
    /// What happened.
    pub status: RunStatus,
}

/// The replication pipeline: configuration, data store, task graph, and
/// persisted task state.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    store: DataStore,
    state: StateDb,
    tasks: Vec<Task>,
}

impl Pipeline {
    /// Build the pipeline, creating the data and output directories and
    /// opening the task-state database.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        std::fs::create_dir_all(&config.output_dir)?;

        let store = DataStore::new(config.data_dir.clone());
        let state = StateDb::open(config.data_dir.join(STATE_DB_FILE))?;
        let tasks = build_tasks(&config, &store);

        Ok(Self {
            config,
            store,
            state,
            tasks,
        })
    }

    /// The task graph, in execution order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Freshness of every task, without running anything.
    pub fn status(&self) -> Result<Vec<(&'static str, TaskStatus)>> {
        self.tasks
            .iter()
            .map(|task| Ok((task.name, self.task_status(task)?)))
            .collect()
    }

    /// Run the whole graph in dependency order, skipping up-to-date
    /// tasks.
    pub async fn run(&mut self, force: bool) -> Result<Vec<TaskReport>> {
        let order = execution_order(&self.tasks)?;
        self.run_indices(&order, force).await
    }

    /// Run one task and its (transitive) dependencies. Only the named
    /// task is forced; dependencies run when stale.
    pub async fn run_task(&mut self, name: &str, force: bool) -> Result<Vec<TaskReport>> {
        let order = resolve_order(&self.tasks, name)?;
        let target = order.last().copied();

        let mut reports = Vec::new();
        for index in order {
            let force_this = force && Some(index) == target;
            reports.push(self.run_one(index, force_this).await?);
        }
        Ok(reports)
    }

    async fn run_indices(&mut self, order: &[usize], force: bool) -> Result<Vec<TaskReport>> {
        let mut reports = Vec::new();
        for &index in order {
            reports.push(self.run_one(index, force).await?);
        }
        Ok(reports)
    }

    async fn run_one(&mut self, index: usize, force: bool) -> Result<TaskReport> {
        let task = self.tasks[index].clone();

        if !force && self.task_status(&task)? == TaskStatus::UpToDate {
            println!("-- {} (up to date)", task.name);
            return Ok(TaskReport {
                name: task.name,
                status: RunStatus::UpToDate,
            });
        }

        println!(".  {}: {}", task.name, task.doc);
        if let Err(err) = self.execute(task.stage).await {
            eprintln!("!! {} failed", task.name);
            return Err(err);
        }

        let mut inputs = Vec::new();
        for dep in &task.file_deps {
            if let Some(fingerprint) = fingerprint_file(dep)? {
                inputs.push((dep.to_string_lossy().into_owned(), fingerprint));
            }
        }
        self.state.record(task.name, &inputs)?;

        Ok(TaskReport {
            name: task.name,
            status: RunStatus::Ran,
        })
    }

    fn task_status(&self, task: &Task) -> Result<TaskStatus> {
        for target in &task.targets {
            if !target.is_file() {
                return Ok(TaskStatus::Stale(format!(
                    "target missing: {}",
                    target.display()
                )));
            }
        }

        let recorded = self.state.fingerprints(task.name)?;
        for dep in &task.file_deps {
            let key = dep.to_string_lossy();
            match fingerprint_file(dep)? {
                None => {
                    return Ok(TaskStatus::Stale(format!("input missing: {}", dep.display())));
                }
                Some(current) => {
                    if recorded.get(key.as_ref()) != Some(&current) {
                        return Ok(TaskStatus::Stale(format!(
                            "input changed: {}",
                            dep.display()
                        )));
                    }
                }
            }
        }

        Ok(TaskStatus::UpToDate)
    }

    async fn wrds_client(&self) -> Result<WrdsClient> {
        let (username, password) = self.config.wrds.credentials()?;
        let client = WrdsClient::connect_with(
            &self.config.wrds.host,
            self.config.wrds.port,
            &self.config.wrds.database,
            username,
            password,
        )
        .await?;
        Ok(client)
    }

    async fn execute(&self, stage: Stage) -> Result<()> {
        match stage {
            Stage::PullBonds => self.pull_open_source_bond().await,
            Stage::PullMapping => self.pull_markit_mapping().await,
            Stage::PullMarkit => self.pull_wrds_markit().await,
            Stage::Calc => self.calc(),
            Stage::Chart => self.generate_chart(),
            Stage::Summary => self.summary(),
        }
    }

    async fn pull_open_source_bond(&self) -> Result<()> {
        let client = OpenBondClient::new()?;
        for spec in datasets() {
            let df = client.download_dataset(&spec, &self.store).await?;
            println!("   {}: {} rows", spec.name, df.height());
        }
        Ok(())
    }

    async fn pull_markit_mapping(&self) -> Result<()> {
        let client = self.wrds_client().await?;
        let mut mapping = pull_red_isin_mapping(&client).await?;
        println!("   RED/ISIN mapping: {} rows", mapping.height());
        self.store.write_parquet(&mut mapping, store::RED_ISIN_MAPPING)?;
        Ok(())
    }

    async fn pull_wrds_markit(&self) -> Result<()> {
        let client = self.wrds_client().await?;

        let mut cds = pull_cds_data(&client, self.config.start_year, self.config.end_year).await?;
        println!(
            "   Markit CDS {}-{}: {} rows",
            self.config.start_year,
            self.config.end_year,
            cds.height()
        );
        self.store.write_parquet(&mut cds, store::MARKIT_CDS)?;

        let mut link = pull_red_crsp_link(&client).await?;
        self.store
            .write_parquet(&mut link, store::MARKIT_RED_CRSP_LINK)?;

        let mut subset = subset_cds_to_crsp(&cds, &link, self.config.name_ratio_threshold)?;
        self.store
            .write_parquet(&mut subset, store::MARKIT_CDS_SUBSET_CRSP)?;
        Ok(())
    }

    /// Merge bonds onto RED codes, fit par-spread curves, and compute
    /// the basis and both FTSFR datasets.
    fn calc(&self) -> Result<()> {
        let bonds = self.store.load_corporate_bond_returns()?;
        let red_map = self.store.load_red_isin_mapping()?;

        let mut merged = merge_red_codes(&bonds, &red_map)?;
        println!("   bonds with RED codes: {} rows", merged.height());
        self.store.write_parquet(&mut merged, store::RED_DATA)?;

        let cds = self.store.load_markit_cds()?;
        let quotes = collapse_quotes(&cds, &merged)?;
        let curves = fit_curves(&quotes)?;
        println!("   fitted par-spread curves: {}", curves.len());

        let with_spreads = attach_par_spreads(&merged, &curves)?;
        let mut basis = compute_basis(&with_spreads)?;
        println!("   basis panel: {} rows", basis.height());
        self.store.write_parquet(&mut basis, store::FINAL_DATA)?;

        let agg = aggregate_by_rating(&basis)?;
        let mut long_agg = to_ftsfr_aggregated(&agg)?;
        self.store
            .write_parquet(&mut long_agg, store::FTSFR_AGGREGATED)?;

        let (mut long_bond, removed) = to_ftsfr_bond_level(&bond_level(&basis)?)?;
        if removed > 0 {
            println!("   dropped {removed} duplicate (cusip, date) rows");
        }
        self.store
            .write_parquet(&mut long_bond, store::FTSFR_NON_AGGREGATED)?;
        Ok(())
    }

    fn generate_chart(&self) -> Result<()> {
        let long = self.store.load_ftsfr_aggregated()?;
        let chart = LineChart::from_long(&long)?;
        let path = self.config.output_dir.join(DEFAULT_CHART_FILE);
        chart.write_html(&path)?;
        println!("   wrote {}", path.display());
        Ok(())
    }

    fn summary(&self) -> Result<()> {
        let long = self.store.load_ftsfr_aggregated()?;
        let summary = summarize(&long)?;
        println!("{summary}");

        let path = self.config.output_dir.join(SUMMARY_FILE);
        std::fs::write(&path, summary.to_json()?)?;
        println!("   wrote {}", path.display());
        Ok(())
    }
}

/// Build the task graph for a configuration.
fn build_tasks(config: &PipelineConfig, store: &DataStore) -> Vec<Task> {
    vec![
        Task {
            name: "pull_open_source_bond",
            doc: "Download treasury and corporate bond panels",
            stage: Stage::PullBonds,
            file_deps: vec![],
            targets: vec![
                store.path(store::TREASURY_BOND_RETURNS),
                store.path(store::CORPORATE_BOND_RETURNS),
            ],
            task_deps: vec![],
        },
        Task {
            name: "pull_markit_mapping",
            doc: "Pull the Markit RED/ISIN obligation mapping from WRDS",
            stage: Stage::PullMapping,
            file_deps: vec![],
            targets: vec![store.path(store::RED_ISIN_MAPPING)],
            task_deps: vec![],
        },
        Task {
            name: "pull_wrds_markit",
            doc: "Pull Markit CDS quotes and the CRSP link from WRDS",
            stage: Stage::PullMarkit,
            file_deps: vec![],
            targets: vec![
                store.path(store::MARKIT_CDS),
                store.path(store::MARKIT_RED_CRSP_LINK),
                store.path(store::MARKIT_CDS_SUBSET_CRSP),
            ],
            task_deps: vec![],
        },
        Task {
            name: "calc",
            doc: "Compute the CDS-bond basis and FTSFR datasets",
            stage: Stage::Calc,
            file_deps: vec![
                store.path(store::CORPORATE_BOND_RETURNS),
                store.path(store::RED_ISIN_MAPPING),
                store.path(store::MARKIT_CDS),
            ],
            targets: vec![
                store.path(store::RED_DATA),
                store.path(store::FINAL_DATA),
                store.path(store::FTSFR_AGGREGATED),
                store.path(store::FTSFR_NON_AGGREGATED),
            ],
            task_deps: vec![
                "pull_open_source_bond",
                "pull_markit_mapping",
                "pull_wrds_markit",
            ],
        },
        Task {
            name: "generate_chart",
            doc: "Render the basis replication chart",
            stage: Stage::Chart,
            file_deps: vec![store.path(store::FTSFR_AGGREGATED)],
            targets: vec![config.output_dir.join(DEFAULT_CHART_FILE)],
            task_deps: vec!["calc"],
        },
        Task {
            name: "summary",
            doc: "Print and export summary statistics",
            stage: Stage::Summary,
            file_deps: vec![store.path(store::FTSFR_AGGREGATED)],
            targets: vec![config.output_dir.join(SUMMARY_FILE)],
            task_deps: vec!["calc"],
        },
    ]
}

/// Dependency-first execution order for one task, detecting cycles and
/// unknown names.
fn resolve_order(tasks: &[Task], name: &str) -> Result<Vec<usize>> {
    let mut done = Vec::new();
    visit(tasks, find_task(tasks, name)?, &mut Vec::new(), &mut done)?;
    Ok(done)
}

/// Dependency-first order over the whole graph, independent of the
/// order tasks were declared in.
fn execution_order(tasks: &[Task]) -> Result<Vec<usize>> {
    let mut done = Vec::new();
    for index in 0..tasks.len() {
        visit(tasks, index, &mut Vec::new(), &mut done)?;
    }
    Ok(done)
}

fn visit(
    tasks: &[Task],
    index: usize,
    visiting: &mut Vec<usize>,
    done: &mut Vec<usize>,
) -> Result<()> {
    if done.contains(&index) {
        return Ok(());
    }
    if visiting.contains(&index) {
        return Err(PipelineError::DependencyCycle(tasks[index].name.to_string()));
    }
    visiting.push(index);
    for dep in &tasks[index].task_deps {
        let dep_index = find_task(tasks, dep)?;
        visit(tasks, dep_index, visiting, done)?;
    }
    visiting.retain(|&i| i != index);
    done.push(index);
    Ok(())
}

fn find_task(tasks: &[Task], name: &str) -> Result<usize> {
    tasks
        .iter()
        .position(|task| task.name == name)
        .ok_or_else(|| PipelineError::UnknownTask(name.to_string()))
}
