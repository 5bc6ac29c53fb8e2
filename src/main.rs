//! Kaskada CLI entrypoint.
//!
//! This is the main entrypoint for the kaskada command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use kaskada_sync::cli::{
    Cli, Commands, LogFormat, OutputFormatter, ResourceCommands, SpecArgs, SyncCommands,
};
use kaskada_sync::config::{ClientSettings, SpecParser, find_spec_file};
use kaskada_sync::error::{ApiError, KaskadaError, Result};
use kaskada_sync::planner::Plan;
use kaskada_sync::reconciler::Reconciler;
use kaskada_sync::resource::{Resource, ResourceKind};

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit status when interrupted by Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

/// Main entrypoint.
fn main() -> ExitCode {
    // Flags read their env fallbacks at parse time, so .env goes first.
    if let Err(e) = SpecParser::new().load_dotenv() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse_args();

    init_logging(cli.verbose, cli.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async {
        tokio::select! {
            result = run(cli) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        }
    });

    match outcome {
        Some(Ok(())) => ExitCode::SUCCESS,
        Some(Err(e)) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        None => ExitCode::from(EXIT_INTERRUPTED),
    }
}

/// Initializes the logging system on stderr.
fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let settings = cli.settings();
    settings.validate()?;

    match cli.command {
        Commands::Sync { command } => match command {
            SyncCommands::Plan {
                spec,
                detailed,
                summary,
            } => cmd_plan(&settings, &spec, detailed, summary.as_deref(), &formatter).await,
            SyncCommands::Apply {
                spec,
                yes,
                fingerprint,
            } => cmd_apply(&settings, &spec, yes, fingerprint.as_deref(), &formatter).await,
        },
        Commands::Table { command } => {
            cmd_resource(&settings, ResourceKind::Table, command, &formatter).await
        }
        Commands::View { command } => {
            cmd_resource(&settings, ResourceKind::View, command, &formatter).await
        }
        Commands::Materialization { command } => {
            cmd_resource(&settings, ResourceKind::Materialization, command, &formatter).await
        }
        Commands::Schema { kind } => write_stdout(&formatter.format_schema(kind)),
    }
}

/// Show the sync plan. Writes nothing to stdout.
async fn cmd_plan(
    settings: &ClientSettings,
    spec: &SpecArgs,
    detailed: bool,
    summary_path: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let plan = compute_plan(settings, spec).await?;
    plan.log();

    if detailed {
        eprintln!("{}", formatter.format_plan_detail(&plan));
        eprintln!("{}", formatter.format_plan_summary(&plan));
    }

    if let Some(path) = summary_path {
        let report = serde_json::to_string_pretty(&plan.report())
            .map_err(|e| KaskadaError::internal(format!("Failed to encode plan summary: {e}")))?;
        std::fs::write(path, report)?;
        debug!("Wrote plan summary to {}", path.display());
    }

    Ok(())
}

/// Plan, confirm and apply.
async fn cmd_apply(
    settings: &ClientSettings,
    spec: &SpecArgs,
    auto_approve: bool,
    fingerprint: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let reconciler = reconciler(settings, spec)?;
    let resources = load_resources(spec)?;
    let plan = reconciler.plan(&resources).await?;
    plan.log();
    eprintln!("{}", formatter.format_plan_summary(&plan));

    if let Some(expected) = fingerprint {
        plan.check_fingerprint(expected)?;
    }

    if !plan.has_changes() {
        return Ok(());
    }

    if !auto_approve && !confirm("Apply these changes? Type 'yes' to confirm: ").await? {
        eprintln!("Apply cancelled.");
        return Ok(());
    }

    let report = reconciler.apply(&plan).await?;
    eprintln!("{}", formatter.format_apply(&report));
    Ok(())
}

/// `list` and `get` for one kind. Results go to stdout.
async fn cmd_resource(
    settings: &ClientSettings,
    kind: ResourceKind,
    command: ResourceCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let client = settings.registry()?.client(kind)?;

    match &command {
        ResourceCommands::List { all_details, .. } => {
            let options = command.list_options().unwrap_or_default();
            let page = client.list(&options).await?;
            debug!(kind = %kind, count = page.items.len(), "Listed resources");
            write_stdout(formatter.format_list(&page.items, *all_details).trim_end())?;
            if let Some(token) = page.next_page_token {
                eprintln!("More results: --page-token {token}");
            }
            Ok(())
        }
        ResourceCommands::Get { name } => {
            let resource: Resource = client.get(name).await?.ok_or_else(|| {
                ApiError::request(404, format!("{} '{name}' not found", kind.label()))
            })?;
            write_stdout(formatter.format_resource(&resource).trim_end())
        }
    }
}

async fn compute_plan(settings: &ClientSettings, spec: &SpecArgs) -> Result<Plan> {
    let reconciler = reconciler(settings, spec)?;
    let resources = load_resources(spec)?;
    reconciler.plan(&resources).await
}

fn reconciler(settings: &ClientSettings, spec: &SpecArgs) -> Result<Reconciler> {
    Ok(Reconciler::new(settings.registry()?)
        .with_concurrency(settings.concurrency)
        .with_prune(spec.prune))
}

/// Loads and validates the spec named by `--file`, or the nearest one found.
fn load_resources(spec: &SpecArgs) -> Result<Vec<Resource>> {
    let path = resolve_spec_path(spec.file.as_ref())?;
    let parser = SpecParser::new().with_base_path(
        path.parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    );
    parser.load_resources(&path)
}

fn resolve_spec_path(path: Option<&PathBuf>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.clone()),
        None => find_spec_file(std::env::current_dir()?),
    }
}

/// Asks for confirmation on stderr; only `yes` confirms.
async fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let input = tokio::task::spawn_blocking(|| {
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).map(|_| input)
    })
    .await
    .map_err(|e| KaskadaError::internal(format!("Failed to read confirmation: {e}")))??;

    Ok(input.trim() == "yes")
}

fn write_stdout(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if !output.is_empty() {
        writeln!(stdout, "{output}")?;
    }
    Ok(())
}
