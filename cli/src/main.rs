use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use floorplan_core::DbmlConfiguration;
use floorplan_discovery::config::{
    ConfigOverrides, ConfigurationProvider, FloorPlanConfig, YamlConfigFile,
};
use floorplan_discovery::export::{ExportPipeline, ExportSummary, ExportTask, WriteStatus};
use floorplan_discovery::locate::{
    CompositeRoots, EnvRoots, SchemaLocator, StaticRoots, resolve_schema_roots,
};
use floorplan_discovery::output::{FormatKind, OutputDestination};
use floorplan_discovery::report::ExportReportBundle;
use floorplan_discovery::{FloorPlanError, generate};
use tracing_subscriber::EnvFilter;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "floorplan")]
#[command(about = "Export the latest Room database schemas as DBML diagrams")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export the latest schema of every database.
    Generate(GenerateArgs),
    /// List the latest schema file of every database.
    Locate(LocateArgs),
    /// Render a single schema file.
    Render(RenderArgs),
}

#[derive(Debug, Args)]
struct RootArgs {
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Schema root directory (repeatable).
    #[arg(long = "schema-dir")]
    schema_dirs: Vec<PathBuf>,
    /// Fail on `.json` files whose name is not a version number.
    #[arg(long)]
    strict_versions: bool,
}

#[derive(Debug, Args)]
struct RenderFlags {
    /// Emit each table's creation SQL as its table note.
    #[arg(long)]
    creation_sql_as_table_note: bool,
    /// Mark nullable columns explicitly.
    #[arg(long)]
    render_nullable_fields: bool,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[command(flatten)]
    roots: RootArgs,
    #[command(flatten)]
    render: RenderFlags,
    /// Output directory (default: print to standard output).
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Output format.
    #[arg(long)]
    format: Option<FormatKind>,
    /// Number of parallel export jobs (default: number of CPUs, at most 8).
    #[arg(long)]
    jobs: Option<usize>,
    /// Export every schema even if some fail.
    #[arg(long)]
    keep_going: bool,
    /// Write a JSON (or `.yaml`/`.yml`) export report.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct LocateArgs {
    #[command(flatten)]
    roots: RootArgs,
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Schema JSON file.
    #[arg(long)]
    input: PathBuf,
    /// Output file (default: standard output).
    #[arg(long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    render: RenderFlags,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!(version = PACKAGE_VERSION, "floorplan starting");

    let result = match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Locate(args) => run_locate(args),
        Command::Render(args) => run_render(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_generate(args: GenerateArgs) -> Result<(), String> {
    let mut config = load_config(args.roots.config.as_deref())?;
    config.merge_overrides(ConfigOverrides {
        output_dir: args.output_dir,
        format: args.format,
        creation_sql_as_table_note: args.render.creation_sql_as_table_note,
        render_nullable_fields: args.render.render_nullable_fields,
        schema_dirs: args.roots.schema_dirs,
        jobs: args.jobs,
        keep_going: args.keep_going,
        strict_versions: args.roots.strict_versions,
    });

    let result =
        schema_roots(&config).and_then(|roots| generate(&roots, &config, &ExportPipeline::new()));

    if let Some(path) = &args.report {
        let bundle = match &result {
            Ok(summary) => ExportReportBundle::from_summary(summary),
            Err(err) => ExportReportBundle::from_error(err),
        };
        bundle.write(path).map_err(|err| err.to_string())?;
    }

    let summary = result.map_err(|err| err.to_string())?;
    print_summary(&summary);
    summary
        .into_result()
        .map(|_| ())
        .map_err(|err| err.to_string())
}

fn run_locate(args: LocateArgs) -> Result<(), String> {
    let mut config = load_config(args.roots.config.as_deref())?;
    config.merge_overrides(ConfigOverrides {
        schema_dirs: args.roots.schema_dirs,
        strict_versions: args.roots.strict_versions,
        ..ConfigOverrides::default()
    });

    let roots = schema_roots(&config).map_err(|err| err.to_string())?;
    let schemas = SchemaLocator::new(config.version_selector())
        .locate_all(&roots)
        .map_err(|err| err.to_string())?;

    for schema in schemas {
        println!(
            "{}\t{}\t{}",
            schema.database,
            schema.version,
            schema.path.display()
        );
    }
    Ok(())
}

fn run_render(args: RenderArgs) -> Result<(), String> {
    let format = FormatKind::Dbml.with_configuration(DbmlConfiguration::new(
        args.render.creation_sql_as_table_note,
        args.render.render_nullable_fields,
    ));
    let task = ExportTask {
        schema: args.input,
        destination: args
            .output
            .map_or(OutputDestination::StandardOut, OutputDestination::Disk),
        format,
    };

    let outcome = ExportPipeline::new()
        .export(&task)
        .map_err(|err| err.to_string())?;
    if let Some(path) = outcome.destination.path() {
        eprintln!(
            "Rendered {} version {} to {} ({}).",
            outcome.database,
            outcome.version,
            path.display(),
            outcome.status
        );
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FloorPlanConfig, String> {
    match path {
        Some(path) => YamlConfigFile(path.to_path_buf())
            .configuration()
            .map_err(|err| err.to_string()),
        None => Ok(FloorPlanConfig::default()),
    }
}

/// Roots from the merged configuration plus `FLOORPLAN_SCHEMA_DIRS`.
fn schema_roots(config: &FloorPlanConfig) -> Result<BTreeSet<PathBuf>, FloorPlanError> {
    let provider = CompositeRoots::new()
        .with(StaticRoots::configured(config.schema_dirs.clone()))
        .with(EnvRoots::new());
    resolve_schema_roots(&provider)
}

fn print_summary(summary: &ExportSummary) {
    let count = |status: WriteStatus| {
        summary
            .outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    };

    eprintln!(
        "Exported {} of {} schema(s): {} created, {} updated, {} unchanged, {} printed.",
        summary.outcomes.len(),
        summary.total,
        count(WriteStatus::Created),
        count(WriteStatus::Updated),
        count(WriteStatus::Unchanged),
        count(WriteStatus::Printed)
    );

    if !summary.failures.is_empty() {
        eprintln!("\nFailures:");
        for failure in &summary.failures {
            eprintln!("  {}: {} ({})", failure.schema.display(), failure.error, failure.error.code());
        }
    }
}
