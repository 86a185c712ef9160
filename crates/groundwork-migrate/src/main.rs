//! groundwork-migrate CLI
//!
//! Command-line tool applying SQL changesets from a directory.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use groundwork_migrate::{load_dir, ChangesetStatus, Migrator, Options};
use groundwork_sql::{detect, Dialect, SqliteDialect};
use groundwork_sqlite::Database;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Applies SQL changesets and tracks them in a changelog table.
#[derive(Parser)]
#[command(name = "groundwork-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Directory containing the `*.sql` changesets.
    #[arg(
        short,
        long,
        env = "GROUNDWORK_CHANGESETS",
        default_value = "changesets"
    )]
    changesets_dir: PathBuf,

    /// Name of the changelog table.
    #[arg(
        long,
        env = "GROUNDWORK_CHANGELOG_TABLE",
        default_value = groundwork_migrate::DEFAULT_CHANGELOG_TABLE
    )]
    changelog_table: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the changelog table.
    Init,

    /// Apply pending changesets.
    Up,

    /// Show the status of each changeset.
    Status {
        /// Print the status as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dialect = detect(&cli.database);
    if dialect.name() != SqliteDialect::new().name() {
        bail!(
            "unsupported database {:?}: only sqlite is available",
            cli.database
        );
    }

    let db = Database::connect(&cli.database)
        .await
        .with_context(|| format!("failed to open {}", cli.database))?;
    let migrator = Migrator::new(&Options::new().changelog_table(cli.changelog_table));

    match cli.command {
        Commands::Init => {
            migrator.init(&db).await?;
            info!(table = migrator.store().table(), "Changelog table created");
        }

        Commands::Up => {
            let changesets = load_dir(&cli.changesets_dir).with_context(|| {
                format!("failed to read {}", cli.changesets_dir.display())
            })?;

            let report = migrator.up(&db, &changesets).await;
            for name in report.applied_names() {
                println!("{name}");
            }

            let applied = report.applied.len();
            if let Some(err) = report.error {
                db.close().await;
                return Err(err).context(format!(
                    "migration stopped after applying {applied} changeset(s)"
                ));
            }

            info!(applied, "Database is up to date");
        }

        Commands::Status { json } => {
            let changesets = load_dir(&cli.changesets_dir).with_context(|| {
                format!("failed to read {}", cli.changesets_dir.display())
            })?;
            let states = migrator.status(&db, &changesets).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&states)?);
            } else {
                for state in &states {
                    match &state.status {
                        ChangesetStatus::Pending => println!("[ ] {}", state.name),
                        ChangesetStatus::Applied { time } => {
                            println!("[X] {} ({time})", state.name);
                        }
                        ChangesetStatus::Drifted { recorded, current } => {
                            println!(
                                "[!] {} (changed: recorded {recorded}, now {current})",
                                state.name
                            );
                        }
                    }
                }
            }
        }
    }

    db.close().await;
    Ok(())
}
