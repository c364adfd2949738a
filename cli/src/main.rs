use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use d1_client::LocalTransport;
use d1_migrate::{DirSource, Direction, MigrateConfig, MigrateError, Migrator};

const MIGRATION_TEMPLATE: &str = "-- +migrate Up\n\n\n-- +migrate Down\n\n";

/// CLI-specific direction enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliDirection {
    Up,
    Down,
}

impl From<CliDirection> for Direction {
    fn from(direction: CliDirection) -> Self {
        match direction {
            CliDirection::Up => Self::Up,
            CliDirection::Down => Self::Down,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "d1-migrate")]
#[command(about = "Apply annotated SQL migrations to D1-compatible SQLite databases")]
struct Cli {
    /// Diagnostic log level written to stderr (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new, empty migration file.
    New(NewArgs),
    /// Apply pending migrations.
    Up(RunArgs),
    /// Revert applied migrations, most recent first.
    Down(RunArgs),
    /// Show every migration and when it was applied.
    Status(TargetArgs),
    /// Show the migrations that would run, without running them.
    Plan(PlanArgs),
}

#[derive(Debug, Args)]
struct NewArgs {
    /// Migration name, appended to the timestamp.
    name: String,
    /// Directory to create the migration in.
    #[arg(long, default_value = "migrations")]
    dir: PathBuf,
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Migration directory (overrides the config file).
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Ledger table name (overrides the config file).
    #[arg(long)]
    table: Option<String>,
    /// Path to a migrate.yaml config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Maximum number of migrations to run (overrides the config file).
    #[arg(long)]
    max: Option<usize>,
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Direction to plan.
    #[arg(long, value_enum, default_value = "up")]
    direction: CliDirection,
    /// Maximum number of migrations to plan (overrides the config file).
    #[arg(long)]
    max: Option<usize>,
}

/// Everything needed to run migrations against one database.
struct Session {
    config: MigrateConfig,
    migrator: Migrator,
    db: LocalTransport,
    source: DirSource,
}

fn main() {
    let cli = Cli::parse();

    let result = init_logging(&cli.log_level).and_then(|()| match cli.command {
        Command::New(args) => run_new(args),
        Command::Up(args) => run_exec(args, Direction::Up),
        Command::Down(args) => run_exec(args, Direction::Down),
        Command::Status(args) => run_status(args),
        Command::Plan(args) => run_plan(args),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) -> Result<(), String> {
    let level = tracing::Level::from_str(level)
        .map_err(|_| format!("Invalid --log-level '{level}'"))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn open_session(target: &TargetArgs) -> Result<Session, String> {
    let mut config = match &target.config {
        Some(path) => MigrateConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => MigrateConfig::default(),
    };
    if let Some(dir) = &target.dir {
        config.dir = dir.clone();
    }
    if let Some(table) = &target.table {
        config.table = table.clone();
    }

    let migrator = Migrator::from_config(&config).map_err(|err| err.to_string())?;
    let db = LocalTransport::open(&target.db)
        .map_err(|err| format!("Failed to open '{}': {err}", target.db.display()))?;
    let source = DirSource::new(&config.dir);

    Ok(Session {
        config,
        migrator,
        db,
        source,
    })
}

fn run_new(args: NewArgs) -> Result<(), String> {
    validate_migration_name(&args.name)?;
    fs::create_dir_all(&args.dir).map_err(|err| {
        format!(
            "Failed to create migration directory '{}': {err}",
            args.dir.display()
        )
    })?;

    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let path = args.dir.join(format!("{stamp}-{}.sql", args.name));
    write_new_file(&path, MIGRATION_TEMPLATE)?;

    println!("Created '{}'.", path.display());
    Ok(())
}

fn validate_migration_name(name: &str) -> Result<(), String> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(format!(
            "Invalid migration name '{name}': use letters, digits, '_' and '-'"
        ));
    }
    Ok(())
}

fn write_new_file(path: &Path, contents: &str) -> Result<(), String> {
    if path.exists() {
        return Err(format!("'{}' already exists", path.display()));
    }
    fs::write(path, contents).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
}

fn run_exec(args: RunArgs, direction: Direction) -> Result<(), String> {
    let session = open_session(&args.target)?;
    let max = args.max.or(session.config.max);

    let verb = match direction {
        Direction::Up => "Applied",
        Direction::Down => "Reverted",
    };
    match session
        .migrator
        .exec_max(&session.db, &session.source, direction, max)
    {
        Ok(count) => {
            println!("{verb} {count} migration(s).");
            Ok(())
        }
        Err(err @ MigrateError::Execution { .. }) => {
            println!("{verb} {} migration(s) before failing.", err.applied());
            Err(err.to_string())
        }
        Err(err) => Err(err.to_string()),
    }
}

fn run_status(args: TargetArgs) -> Result<(), String> {
    let session = open_session(&args)?;
    let status = session
        .migrator
        .status(&session.db, &session.source)
        .map_err(|err| err.to_string())?;

    println!("{:<25} Migration", "Applied At");
    for state in &status.migrations {
        println!(
            "{:<25} {}",
            state.applied_at.as_deref().unwrap_or("pending"),
            state.id
        );
    }
    for record in &status.unknown {
        println!("{:<25} {} (missing from source)", record.applied_at, record.id);
    }

    println!(
        "{} applied, {} pending.",
        status.applied_count(),
        status.pending().count()
    );
    Ok(())
}

fn run_plan(args: PlanArgs) -> Result<(), String> {
    let session = open_session(&args.target)?;
    let direction = Direction::from(args.direction);
    let max = args.max.or(session.config.max);
    let plan = session
        .migrator
        .plan(&session.db, &session.source, direction, max)
        .map_err(|err| err.to_string())?;

    if plan.is_empty() {
        println!("Nothing to {direction}.");
        return Ok(());
    }
    for planned in &plan {
        let note = if planned.disable_transaction {
            ", notransaction"
        } else {
            ""
        };
        println!(
            "{direction} {} ({} statement(s){note})",
            planned.id(),
            planned.queries.len()
        );
    }
    Ok(())
}
