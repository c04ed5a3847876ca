//! Study Import CLI
//!
//! Imports study JSON files into the review database or checks them for
//! basic problems. Run without a subcommand for the interactive menu.
//!
//! Exit codes: 0 on completion, 1 on a fatal error, 2 on an invalid menu
//! choice, 3 when `verify` finds stored records that were edited.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use study_import::config::ImportConfig;
use study_import::health::{self, HealthDetails, HealthSummary};
use study_import::pipeline::{FileOutcome, Importer, RunSummary};
use study_import::prompt::{Console, MenuAction};
use study_import::report::ReportWriter;
use study_import::store::{MemoryStore, SqliteStore, StudyStore};
use study_import::DuplicateMode;
use tracing_subscriber::EnvFilter;

const EXIT_OK: i32 = 0;
const EXIT_FATAL: i32 = 1;
const EXIT_INVALID_CHOICE: i32 = 2;
const EXIT_CHECKSUM_MISMATCH: i32 = 3;

#[derive(Parser)]
#[command(name = "study-import")]
#[command(about = "Import research-study JSON files into the review database")]
#[command(version)]
struct Cli {
    /// Config file (defaults to study-import.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, de-duplicate and store every study file under a folder
    Import {
        /// Folder containing study JSON files
        #[arg(short, long)]
        dir: PathBuf,

        /// Duplicate detection: disabled, basic or enhanced
        #[arg(short, long)]
        mode: Option<DuplicateMode>,

        /// Database file (overrides config)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Table name (overrides config)
        #[arg(long)]
        collection: Option<String>,

        /// Directory for report files (overrides config)
        #[arg(long)]
        reports: Option<PathBuf>,

        /// Run against an empty in-memory store; nothing is persisted
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that files decode and carry the basic required fields
    Health {
        /// Folder containing study JSON files
        #[arg(short, long)]
        dir: PathBuf,

        /// Directory for the health report (overrides config)
        #[arg(long)]
        reports: Option<PathBuf>,
    },

    /// Re-hash stored studies and list any whose body was edited after import
    Verify {
        /// Database file (overrides config)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Table name (overrides config)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Inspect or write configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to a file
    Init {
        #[arg(default_value = "study-import.toml")]
        path: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = ImportConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        None => interactive(&config),

        Some(Commands::Import { dir, mode, store, collection, reports, dry_run }) => {
            if let Some(path) = store {
                config.store.path = path;
            }
            if let Some(name) = collection {
                config.store.collection = name;
            }
            if let Some(dir) = reports {
                config.reports.output_dir = dir;
            }
            let mode = mode.unwrap_or(config.duplicates.default_mode);
            ensure_folder(&dir)?;
            import(&config, &dir, mode, dry_run)?;
            Ok(EXIT_OK)
        }

        Some(Commands::Health { dir, reports }) => {
            if let Some(dir) = reports {
                config.reports.output_dir = dir;
            }
            ensure_folder(&dir)?;
            check_health(&config, &dir)?;
            Ok(EXIT_OK)
        }

        Some(Commands::Verify { store, collection }) => {
            if let Some(path) = store {
                config.store.path = path;
            }
            if let Some(name) = collection {
                config.store.collection = name;
            }
            verify(&config)
        }

        Some(Commands::Config { action }) => {
            match action {
                ConfigAction::Show => print!("{}", config.to_toml()?),
                ConfigAction::Init { path } => {
                    config.save(&path)?;
                    println!("✅ Configuration written to {}", path);
                }
            }
            Ok(EXIT_OK)
        }
    }
}

fn interactive(config: &ImportConfig) -> anyhow::Result<i32> {
    let mut console = Console::stdio();

    match console.choose_action()? {
        Some(MenuAction::Import) => {
            let dir = PathBuf::from(console.ask("Enter the path to the folder containing study JSON files: ")?);
            ensure_folder(&dir)?;
            let mode = console.choose_mode()?;
            import(config, &dir, mode, false)?;
            Ok(EXIT_OK)
        }
        Some(MenuAction::CheckHealth) => {
            let dir = PathBuf::from(console.ask("Enter the path to check JSON files: ")?);
            ensure_folder(&dir)?;
            check_health(config, &dir)?;
            Ok(EXIT_OK)
        }
        None => {
            console.say("❌ Invalid choice. Please run again and choose 1 or 2.")?;
            Ok(EXIT_INVALID_CHOICE)
        }
    }
}

fn ensure_folder(dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("The folder '{}' does not exist.", dir.display());
    }
    Ok(())
}

fn import(config: &ImportConfig, dir: &Path, mode: DuplicateMode, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        println!("🧪 Dry run - nothing will be stored");
        return import_into(config, MemoryStore::new(), dir, mode);
    }

    let store = SqliteStore::open(&config.store.path, &config.store.collection)
        .with_context(|| format!("failed to open store {}", config.store.path.display()))?;
    import_into(config, store, dir, mode)
}

fn import_into<S: StudyStore>(
    config: &ImportConfig,
    store: S,
    dir: &Path,
    mode: DuplicateMode,
) -> anyhow::Result<()> {
    let mut importer = Importer::from_config(config, store)?;
    let summary = importer.run_with(dir, mode, print_outcome)?;

    print_run_summary(&summary);

    let writer = ReportWriter::from_config(&config.reports);
    for path in writer.write_run_reports(&summary)? {
        println!("📄 Report saved to {}", path.display());
    }
    if summary.load_errors > 0 {
        println!("🔍 Check the load error report for files that couldn't be loaded");
    }
    Ok(())
}

fn print_outcome(outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Inserted { .. } => {}
        FileOutcome::SkippedDuplicate(entry) => {
            println!("⚠️ Duplicate found (same {}): {}", entry.reason, entry.file.display());
        }
        FileOutcome::RejectedInvalid(entry) => {
            println!("❌ Schema validation failed: {}", entry.file.display());
        }
        FileOutcome::LoadError(entry) => {
            println!(
                "❌ {} error in {}: {}",
                entry.error_type,
                entry.file.display(),
                entry.error_message
            );
        }
    }
}

fn print_run_summary(summary: &RunSummary) {
    println!();
    println!("✅ Imported {} studies", summary.inserted);
    println!("⚠️ Skipped {} duplicates", summary.skipped);
    println!("❌ Rejected {} invalid files", summary.invalid);
    println!("💥 Failed to load {} files", summary.load_errors);
}

fn verify(config: &ImportConfig) -> anyhow::Result<i32> {
    let store = SqliteStore::open(&config.store.path, &config.store.collection)
        .with_context(|| format!("failed to open store {}", config.store.path.display()))?;
    let mismatched = store.verify_checksums()?;

    println!("🔍 Checked {} stored studies", store.count()?);
    if mismatched.is_empty() {
        println!("✅ All checksums match");
        return Ok(EXIT_OK);
    }

    println!("❌ {} studies changed since import:", mismatched.len());
    for id in &mismatched {
        println!("  📄 record {}", id);
    }
    Ok(EXIT_CHECKSUM_MISMATCH)
}

fn check_health(config: &ImportConfig, dir: &Path) -> anyhow::Result<()> {
    println!("🔍 Checking JSON files in: {}", dir.display());
    let summary = health::scan(dir, &config.discovery)?;
    print_health_summary(&summary);

    let writer = ReportWriter::from_config(&config.reports);
    if let Some(path) = writer.write_health_report(&summary)? {
        println!("📄 Detailed report saved to {}", path.display());
    }
    Ok(())
}

fn print_health_summary(summary: &HealthSummary) {
    println!("\n📊 File Health Check Summary:");
    println!("  📄 Total JSON files: {}", summary.total);
    println!("  ✅ Valid files: {}", summary.healthy);
    println!("  ❌ Problematic files: {}", summary.issues.len());

    if summary.is_healthy() {
        println!("🎉 All files are healthy and ready for import!");
        return;
    }

    println!("\n⚠️ Issues found in {} files:", summary.issues.len());
    for issue in &summary.issues {
        let details = match &issue.details {
            HealthDetails::Fields(fields) => fields.join(", "),
            HealthDetails::Message(message) => message.clone(),
        };
        println!("  📄 {}", issue.file.display());
        println!("     🔸 Issue: {}", issue.issue.label());
        println!("     🔸 Details: {}", details);
        println!();
    }
}
