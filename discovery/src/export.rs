//! Parse, render, and write pipeline over located schemas.
//!
//! Each [`ExportTask`] is independent: it reads one schema file, renders it
//! with its [`OutputFormat`], and writes the text to its
//! [`OutputDestination`]. [`ExportPipeline::export_all`] runs tasks either on
//! the calling thread or on a rayon pool; the produced artifacts do not depend
//! on which. Tasks sharing a destination, including every console task, run
//! on one worker in task order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use floorplan_core::{RoomSchemaParser, SchemaParser};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{FloorPlanError, Result};
use crate::output::{ConsoleSink, OutputDestination, OutputFormat, StdoutConsole, resolve_destination};
use crate::version::VersionFile;

/// One schema file to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTask {
    pub schema: PathBuf,
    pub destination: OutputDestination,
    pub format: OutputFormat,
}

/// Builds one task per located schema.
///
/// Two roots may hold a database of the same name and version; their tasks
/// then share an output file. That is logged as a warning and the later task
/// in schema order wins.
///
/// # Errors
///
/// Fails on the first schema whose output path cannot be derived.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use floorplan_discovery::export::plan_tasks;
/// use floorplan_discovery::output::{OutputDestination, OutputFormat};
/// use floorplan_discovery::version::VersionFile;
///
/// let schemas = vec![VersionFile {
///     path: PathBuf::from("schemas/appdb/3.json"),
///     version: 3,
///     database: "appdb".to_string(),
/// }];
///
/// let tasks = plan_tasks(&schemas, None, OutputFormat::default()).unwrap();
/// assert_eq!(tasks[0].destination, OutputDestination::StandardOut);
/// ```
pub fn plan_tasks(
    schemas: &[VersionFile],
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<Vec<ExportTask>> {
    let tasks = schemas
        .iter()
        .map(|schema| {
            Ok(ExportTask {
                schema: schema.path.clone(),
                destination: resolve_destination(&schema.path, output_dir, format)?,
                format,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut claimed: HashMap<&Path, &Path> = HashMap::new();
    for task in &tasks {
        let Some(path) = task.destination.path() else {
            continue;
        };
        if let Some(previous) = claimed.insert(path, &task.schema) {
            warn!(
                destination = %path.display(),
                first = %previous.display(),
                second = %task.schema.display(),
                "schemas share an output file; the later one wins"
            );
        }
    }
    Ok(tasks)
}

/// Indices of `tasks` grouped by destination, groups ordered by first
/// appearance and indices ascending within a group.
fn destination_groups(tasks: &[ExportTask]) -> Vec<Vec<usize>> {
    let mut slots: HashMap<&OutputDestination, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, task) in tasks.iter().enumerate() {
        let slot = *slots.entry(&task.destination).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(index);
    }
    groups
}

/// What a task did with its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    /// The output file did not exist.
    Created,
    /// The output file existed with different content.
    Updated,
    /// The output file already held identical content; nothing was written.
    Unchanged,
    /// The text went to the console.
    Printed,
}

impl std::fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Printed => write!(f, "printed"),
        }
    }
}

/// Result of one successful task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub schema: PathBuf,
    pub database: String,
    pub version: u64,
    pub destination: OutputDestination,
    pub status: WriteStatus,
    pub bytes: usize,
    /// Hex SHA-256 of the rendered text.
    pub sha256: String,
}

/// How [`ExportPipeline::export_all`] reacts to a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop scheduling after the first failure and return it.
    #[default]
    FailFast,
    /// Run every task and report all failures.
    CollectAll,
}

/// Shared flag that stops tasks which have not started yet.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run-level settings for [`ExportPipeline::export_all`].
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Worker count; `None` or `0` picks one from available parallelism.
    pub jobs: Option<usize>,
    pub failure_policy: FailurePolicy,
    /// Tasks not started within this duration of the run's start are cancelled.
    pub deadline: Option<Duration>,
    pub cancellation: CancellationToken,
}

impl ExportOptions {
    pub fn sequential() -> Self {
        Self {
            jobs: Some(1),
            ..Self::default()
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// A failed task of a collect-all run.
#[derive(Debug)]
pub struct ExportFailure {
    pub schema: PathBuf,
    pub error: FloorPlanError,
}

/// Outcomes and failures of one run, each in task order.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub total: usize,
    pub outcomes: Vec<ExportOutcome>,
    pub failures: Vec<ExportFailure>,
}

impl ExportSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the outcomes, or [`FloorPlanError::ExportFailed`] naming the
    /// first failure when any task failed.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn into_result(self) -> Result<Vec<ExportOutcome>> {
        let failed = self.failures.len();
        match self.failures.into_iter().next() {
            None => Ok(self.outcomes),
            Some(first) => Err(FloorPlanError::ExportFailed {
                failed,
                total: self.total,
                first: Box::new(first.error),
            }),
        }
    }
}

/// Executes export tasks.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use std::sync::Arc;
/// use floorplan_discovery::export::{ExportPipeline, ExportTask, WriteStatus};
/// use floorplan_discovery::output::{MemoryConsole, OutputDestination, OutputFormat};
///
/// let root = tempfile::tempdir().unwrap();
/// let db = root.path().join("orders");
/// std::fs::create_dir(&db).unwrap();
/// std::fs::write(db.join("1.json"), r#"{"database": {"version": 1, "entities": []}}"#).unwrap();
///
/// let console = Arc::new(MemoryConsole::new());
/// let pipeline = ExportPipeline::new().with_console(console.clone());
/// let outcome = pipeline
///     .export(&ExportTask {
///         schema: db.join("1.json"),
///         destination: OutputDestination::StandardOut,
///         format: OutputFormat::default(),
///     })
///     .unwrap();
///
/// assert_eq!(outcome.status, WriteStatus::Printed);
/// assert!(console.writes()[0].starts_with("Project orders {"));
/// ```
pub struct ExportPipeline {
    parser: Arc<dyn SchemaParser>,
    console: Arc<dyn ConsoleSink>,
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportPipeline {
    /// Pipeline reading Room schema JSON and printing to standard output.
    pub fn new() -> Self {
        Self {
            parser: Arc::new(RoomSchemaParser),
            console: Arc::new(StdoutConsole),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn SchemaParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = console;
        self
    }

    /// Runs one task: parse, render, write.
    ///
    /// # Errors
    ///
    /// - [`FloorPlanError::Parse`] naming the schema file.
    /// - [`FloorPlanError::Write`] naming the destination.
    pub fn export(&self, task: &ExportTask) -> Result<ExportOutcome> {
        let project = self
            .parser
            .parse(&task.schema)
            .map_err(|source| FloorPlanError::Parse {
                schema: task.schema.clone(),
                source,
            })?;

        let text = task.format.render(&project);
        let status = self.write(&task.destination, &text)?;

        let outcome = ExportOutcome {
            schema: task.schema.clone(),
            database: project.name,
            version: project.database.version,
            destination: task.destination.clone(),
            status,
            bytes: text.len(),
            sha256: format!("{:x}", Sha256::digest(text.as_bytes())),
        };
        info!(
            database = %outcome.database,
            version = outcome.version,
            destination = %outcome.destination,
            status = %outcome.status,
            "exported schema"
        );
        Ok(outcome)
    }

    fn write(&self, destination: &OutputDestination, text: &str) -> Result<WriteStatus> {
        let write_error = |source| FloorPlanError::Write {
            destination: destination.clone(),
            source,
        };

        match destination {
            OutputDestination::StandardOut => {
                self.console.write_text(text).map_err(write_error)?;
                Ok(WriteStatus::Printed)
            }
            OutputDestination::Disk(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(write_error)?;
                }

                let status = prior_status(path, text).map_err(write_error)?;
                if status == WriteStatus::Unchanged {
                    debug!(path = %path.display(), "output unchanged, skipping write");
                    return Ok(status);
                }
                std::fs::write(path, text).map_err(write_error)?;
                Ok(status)
            }
        }
    }

    /// Runs every task and gathers the results in task order.
    ///
    /// Tasks with distinct destinations may run concurrently. Tasks sharing a
    /// destination run one after another in task order, so console output
    /// follows task order and a shared file ends up with the last task's text.
    ///
    /// With [`FailurePolicy::FailFast`] no new task starts after a failure and
    /// the failure of the earliest failed task is returned. With
    /// [`FailurePolicy::CollectAll`] every task runs and failures are listed
    /// in the returned summary.
    ///
    /// # Errors
    ///
    /// - The earliest task failure under [`FailurePolicy::FailFast`].
    /// - [`FloorPlanError::ThreadPool`] if the worker pool cannot be built.
    pub fn export_all(&self, tasks: &[ExportTask], options: &ExportOptions) -> Result<ExportSummary> {
        let started = Instant::now();
        let failed = AtomicBool::new(false);
        let fail_fast = options.failure_policy == FailurePolicy::FailFast;

        let run = |task: &ExportTask| -> Option<Result<ExportOutcome>> {
            if fail_fast && failed.load(Ordering::SeqCst) {
                return None;
            }
            let result = if is_stopped(options, started) {
                Err(FloorPlanError::Cancelled {
                    schema: task.schema.clone(),
                })
            } else {
                self.export(task)
            };
            if let Err(err) = &result {
                warn!(schema = %task.schema.display(), error = %err, "export failed");
                failed.store(true, Ordering::SeqCst);
            }
            Some(result)
        };

        let jobs = options
            .jobs
            .filter(|jobs| *jobs > 0)
            .unwrap_or_else(|| default_parallel_jobs(tasks.len()));

        let results: Vec<Option<Result<ExportOutcome>>> = if jobs == 1 || tasks.len() <= 1 {
            tasks.iter().map(run).collect()
        } else {
            use rayon::prelude::*;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| FloorPlanError::ThreadPool(e.to_string()))?;

            let groups = destination_groups(tasks);
            let grouped: Vec<Vec<(usize, Option<Result<ExportOutcome>>)>> = pool.install(|| {
                groups
                    .par_iter()
                    .map(|group| {
                        group
                            .iter()
                            .map(|&index| (index, run(&tasks[index])))
                            .collect::<Vec<_>>()
                    })
                    .collect()
            });

            let mut ordered: Vec<(usize, Option<Result<ExportOutcome>>)> =
                grouped.into_iter().flatten().collect();
            ordered.sort_by_key(|(index, _)| *index);
            ordered.into_iter().map(|(_, result)| result).collect()
        };

        let mut summary = ExportSummary {
            total: tasks.len(),
            ..ExportSummary::default()
        };
        for (task, result) in tasks.iter().zip(results) {
            match result {
                Some(Ok(outcome)) => summary.outcomes.push(outcome),
                Some(Err(error)) if fail_fast => return Err(error),
                Some(Err(error)) => summary.failures.push(ExportFailure {
                    schema: task.schema.clone(),
                    error,
                }),
                None => {}
            }
        }
        Ok(summary)
    }
}

/// Status a disk write of `text` to `path` would have. Only a missing file
/// counts as `Created`; any other read error is returned.
fn prior_status(path: &Path, text: &str) -> std::io::Result<WriteStatus> {
    match std::fs::read(path) {
        Ok(existing) if existing == text.as_bytes() => Ok(WriteStatus::Unchanged),
        Ok(_) => Ok(WriteStatus::Updated),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(WriteStatus::Created),
        Err(err) => Err(err),
    }
}

fn is_stopped(options: &ExportOptions, started: Instant) -> bool {
    options.cancellation.is_cancelled()
        || options
            .deadline
            .is_some_and(|deadline| started.elapsed() >= deadline)
}

fn default_parallel_jobs(task_count: usize) -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    cpu_count.min(8).max(1).min(task_count.max(1))
}
