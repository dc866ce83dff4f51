//! qail-views: view migrations from the command line
//!
//! # Usage
//!
//! ```bash
//! # Show what differs between qail-views.toml and the database
//! qail-views diff --database-url sqlite://app.db
//!
//! # Write a migration pair for the differences
//! qail-views revision add_reports
//!
//! # Run a migration script
//! qail-views apply migrations/20260101120000_add_reports.up.qail
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use qail_views::config::ViewsConfig;
use qail_views::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qail-views")]
#[command(author = "QAIL Contributors")]
#[command(version)]
#[command(about = "🪝 Migrations for SQL views", long_about = None)]
#[command(after_help = "EXAMPLES:
    qail-views diff --database-url postgres://localhost/app
    qail-views check
    qail-views revision add_reports
    qail-views sql migrations/20260101120000_add_reports.up.qail --dialect sqlite")]
struct Cli {
    /// Configuration file (default: ./qail-views.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, global = true, env = "QAIL_VIEWS_DATABASE_URL")]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare declared views with the database
    Diff {
        /// Print the SQL the operations would run
        #[arg(long)]
        sql: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Exit with status 1 if the database is out of sync
    Check,
    /// Write an up/down migration pair for the current differences
    Revision {
        /// Migration name
        name: String,
    },
    /// Run a migration script against the database
    Apply {
        /// Script file
        file: PathBuf,

        /// Print the SQL instead of running it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the SQL a migration script would run
    Sql {
        /// Script file
        file: PathBuf,

        /// Target dialect
        #[arg(short, long, default_value = "postgresql")]
        dialect: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Diff { sql, format } => run_diff(&cli, *sql, *format).await,
        Commands::Check => run_check(&cli).await,
        Commands::Revision { name } => run_revision(&cli, name).await,
        Commands::Apply { file, dry_run } => run_apply(&cli, file, *dry_run).await,
        Commands::Sql { file, dialect } => run_sql(file, dialect).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "qail_views=debug"
    } else {
        "qail_views=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn database_url(cli: &Cli, config: &ViewsConfig) -> Result<String> {
    cli.database_url
        .clone()
        .or_else(|| config.database_url.clone())
        .ok_or_else(|| {
            anyhow!("No database URL. Use --database-url, set QAIL_VIEWS_DATABASE_URL or add database_url to qail-views.toml")
        })
}

/// Load the config, connect and run one comparison pass.
async fn autogenerate(cli: &Cli) -> Result<(ViewsConfig, Dialect, UpgradeOps)> {
    let config = ViewsConfig::discover(cli.config.as_deref())?;
    let metadata = config.metadata()?;
    let schemas = config.schemas(&metadata);
    let url = database_url(cli, &config)?;

    let mut db = ViewDb::connect(&url)
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;
    let dialect = db.dialect();

    let mut upgrade_ops = UpgradeOps::new();
    {
        let mut ctx =
            AutogenContext::for_db(&mut db, &metadata).with_name_filter(config.name_filter());
        compare_views(&mut ctx, &mut upgrade_ops, &schemas).await?;
    }
    db.close().await?;

    Ok((config, dialect, upgrade_ops))
}

async fn run_diff(cli: &Cli, sql: bool, format: OutputFormat) -> Result<()> {
    let (_, dialect, upgrade_ops) = autogenerate(cli).await?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&upgrade_ops.ops)?);
        return Ok(());
    }

    println!("{}", "🔍 View Diff".cyan().bold());
    println!();

    if upgrade_ops.is_empty() {
        println!("  {}", "✓ Views are in sync".green());
        return Ok(());
    }

    for op in upgrade_ops.iter() {
        let marker = match op {
            ViewOp::Create(_) => "+".green().bold(),
            ViewOp::Replace(_) => "~".yellow().bold(),
            ViewOp::Drop(_) => "-".red().bold(),
        };
        println!("  {} {}", marker, op.describe());

        if sql {
            for statement in op.statements(dialect) {
                println!("      {}", statement.dimmed());
            }
        }
    }

    println!();
    println!("{} operation(s)", upgrade_ops.len().to_string().cyan());
    Ok(())
}

async fn run_check(cli: &Cli) -> Result<()> {
    let (_, _, upgrade_ops) = autogenerate(cli).await?;

    if upgrade_ops.is_empty() {
        println!("{} Views are in sync", "✓".green());
        return Ok(());
    }

    println!(
        "{} {} view operation(s) pending",
        "✗".red(),
        upgrade_ops.len()
    );
    for op in upgrade_ops.iter() {
        println!("  • {}", op.describe());
    }
    std::process::exit(1);
}

async fn run_revision(cli: &Cli, name: &str) -> Result<()> {
    println!("{}", "📝 Creating Migration".cyan().bold());
    println!();

    let (config, _, upgrade_ops) = autogenerate(cli).await?;
    if upgrade_ops.is_empty() {
        println!("  {}", "No view changes detected, nothing written".yellow());
        return Ok(());
    }

    let script = render_migration(&upgrade_ops.ops)?;
    let (up_path, down_path) =
        write_revision(Path::new(&config.migrations_dir), name, &script)?;

    println!("  {} {}", "✓ Created:".green(), up_path.display());
    println!("  {} {}", "✓ Created:".green(), down_path.display());
    println!();
    println!("  {} operation(s)", upgrade_ops.len().to_string().cyan());
    Ok(())
}

/// Write `<timestamp>_<name>.up.qail` and `.down.qail` under `dir`.
fn write_revision(dir: &Path, name: &str, script: &MigrationScript) -> Result<(PathBuf, PathBuf)> {
    let now = chrono::Local::now();
    let timestamp = now.format("%Y%m%d%H%M%S").to_string();
    let header = format!(
        "-- @name: {}_{}\n-- @created: {}",
        timestamp,
        name,
        now.to_rfc3339()
    );

    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let up_path = dir.join(format!("{}_{}.up.qail", timestamp, name));
    let down_path = dir.join(format!("{}_{}.down.qail", timestamp, name));
    std::fs::write(&up_path, format!("{}\n\n{}\n", header, script.upgrade))?;
    std::fs::write(&down_path, format!("{}\n\n{}\n", header, script.downgrade))?;

    Ok((up_path, down_path))
}

async fn run_apply(cli: &Cli, file: &Path, dry_run: bool) -> Result<()> {
    let script = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let config = ViewsConfig::discover(cli.config.as_deref())?;
    let url = database_url(cli, &config)?;
    let registry = OperationRegistry::with_view_operations();

    if dry_run {
        let dialect = Dialect::from_url(&url)?;
        return print_script_sql(&script, dialect, &registry).await;
    }

    println!("{} {}", "▶ Applying".cyan().bold(), file.display());

    let mut db = ViewDb::connect(&url)
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;
    let dialect = db.dialect();
    let count = Operations::new(&mut db, dialect, &registry)
        .run_script(&script)
        .await?;
    db.close().await?;

    println!("{} {} operation(s) applied", "✓".green(), count);
    Ok(())
}

async fn run_sql(file: &Path, dialect: &str) -> Result<()> {
    let script = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let dialect: Dialect = dialect.parse()?;
    let registry = OperationRegistry::with_view_operations();
    print_script_sql(&script, dialect, &registry).await
}

async fn print_script_sql(script: &str, dialect: Dialect, registry: &OperationRegistry) -> Result<()> {
    let mut recorder = SqlRecorder::new();
    Operations::new(&mut recorder, dialect, registry)
        .run_script(script)
        .await?;

    for statement in &recorder.statements {
        println!("{};", statement);
    }
    Ok(())
}
