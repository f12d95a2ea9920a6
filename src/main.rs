use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use db_backup_manager::config::{self, Config, TargetDescriptor};
use db_backup_manager::managers::logging::{self, LoggingConfig, Verbosity};
use db_backup_manager::utils::locker::PassLock;
use db_backup_manager::utils::{ArchiveLayout, CommandDumper, DumpOperations};
use db_backup_manager::{BackupManager, PassSummary};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

/// At least one target failed
const EXIT_TARGET_FAILED: u8 = 1;
/// Configuration or startup problem; no target was attempted
const EXIT_STARTUP: u8 = 2;

#[derive(Parser)]
#[command(name = "db-backup-manager")]
#[command(about = "Sequential MySQL dumps into rotated, compressed archives", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "/etc/db-backup-manager/config.toml")]
    config: PathBuf,

    /// Also read DB1_NAME, DB1_USER, ... targets from the environment
    #[arg(long, global = true)]
    from_env: bool,

    /// Show progress on the console
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Print nothing on the console except command output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backup pass over all targets (default)
    Run {
        /// Only back up these targets (repeatable)
        #[arg(short, long)]
        target: Vec<String>,

        /// Print the pass summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate,

    /// List existing archives per target
    List,

    /// Apply retention without taking new backups
    Prune {
        /// Only prune these targets (repeatable)
        #[arg(short, long)]
        target: Vec<String>,
    },

    /// Check that the dump tool is installed
    CheckTool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_STARTUP)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    let command = cli.command.unwrap_or(Commands::Run {
        target: Vec::new(),
        json: false,
    });

    // Commands that don't write backups - use simple console logging
    match command {
        Commands::CheckTool => {
            logging::init_console_logging(verbosity);
            let config = load_settings(&cli.config, cli.from_env)?;
            return Ok(handle_check_tool(&config));
        }
        Commands::Validate => {
            logging::init_console_logging(verbosity);
            let config = load_settings(&cli.config, cli.from_env)?;
            let targets = config::resolve_all_targets(&config, cli.from_env)?;
            print_target_table(&config, &targets);
            return Ok(ExitCode::SUCCESS);
        }
        Commands::List => {
            logging::init_console_logging(verbosity);
            let config = load_settings(&cli.config, cli.from_env)?;
            let targets = config::resolve_all_targets(&config, cli.from_env)?;
            handle_list(&config, &targets)?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let config = load_settings(&cli.config, cli.from_env)?;
    let all_targets = config::resolve_all_targets(&config, cli.from_env)?;

    // Setup logging with file rotation (must keep guard alive)
    let logging_config = LoggingConfig::from_config(&config.global, verbosity);
    let _log_guard = logging::init_logging(&logging_config)?;

    let manager = BackupManager::new(&config);

    let mut lock = PassLock::open(manager.layout().root())?;
    let _lock_guard = lock.try_acquire()?;

    match command {
        Commands::Run { target, json } => {
            let targets = select_targets(all_targets, &target)?;

            if let Err(e) = manager.check_tool() {
                warn!("Dump tool check failed, backups will likely fail: {:#}", e);
            }

            let summary = manager.run_pass(&targets)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if !cli.quiet {
                print_summary(&summary);
            }

            Ok(exit_code(summary.all_succeeded()))
        }

        Commands::Prune { target } => {
            let targets = select_targets(all_targets, &target)?;
            let mut clean = true;

            for (name, result) in manager.prune(&targets)? {
                match result {
                    Ok(report) => {
                        println!(
                            "{}: deleted {}, kept {}",
                            name,
                            report.deleted_count(),
                            report.remaining
                        );
                        for failure in &report.failures {
                            clean = false;
                            eprintln!("  ✗ Could not delete {:?}: {}", failure.path, failure.reason);
                        }
                    }
                    Err(e) => {
                        clean = false;
                        eprintln!("{}: ✗ {}", name, e);
                    }
                }
            }

            Ok(exit_code(clean))
        }

        Commands::Validate | Commands::List | Commands::CheckTool => {
            unreachable!("These commands are handled before logging setup")
        }
    }
}

/// Load the config file; with `--from-env` a missing file means defaults
fn load_settings(path: &std::path::Path, from_env: bool) -> Result<Config> {
    if from_env && !path.exists() {
        return Ok(Config::default());
    }

    config::load_config(path).with_context(|| format!("Failed to load config {:?}", path))
}

/// Keep configured order; every requested name must exist
fn select_targets(all: Vec<TargetDescriptor>, names: &[String]) -> Result<Vec<TargetDescriptor>> {
    if names.is_empty() {
        return Ok(all);
    }

    for name in names {
        if !all.iter().any(|t| &t.name == name) {
            bail!("Target '{}' not found in configuration", name);
        }
    }

    Ok(all.into_iter().filter(|t| names.contains(&t.name)).collect())
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_TARGET_FAILED)
    }
}

fn handle_check_tool(config: &Config) -> ExitCode {
    match CommandDumper::new(config.dump.clone()).check_tool() {
        Ok(version) => {
            println!("✓ {}", version);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ {:#}", e);
            ExitCode::from(EXIT_TARGET_FAILED)
        }
    }
}

fn print_target_table(config: &Config, targets: &[TargetDescriptor]) {
    println!("Configuration is valid!");
    println!("Backup directory: {}", config.global.backup_directory.display());
    println!("Compression: {:?}", config.global.compression);
    println!("Targets: {}", targets.len());
    println!();
    println!("  {:<20} {:<25} {:<20} {:>5}", "NAME", "HOST", "DATABASE", "KEEP");
    println!("  {}", "-".repeat(73));
    for target in targets {
        let host = match target.port {
            Some(port) => format!("{}:{}", target.host, port),
            None => target.host.clone(),
        };
        println!(
            "  {:<20} {:<25} {:<20} {:>5}",
            target.name, host, target.database, target.max_backups
        );
    }
}

fn handle_list(config: &Config, targets: &[TargetDescriptor]) -> Result<()> {
    let layout = ArchiveLayout::new(
        config::expand_tilde(&config.global.backup_directory),
        config.global.compression,
    );

    for target in targets {
        let archives = layout
            .list_archives(&target.name)
            .with_context(|| format!("Failed to list archives for '{}'", target.name))?;

        println!(
            "{} ({} of {} kept)",
            target.name,
            archives.len(),
            target.max_backups
        );

        if archives.is_empty() {
            println!("  No archives found.");
        }

        // Newest first
        for entry in archives.iter().rev() {
            let modified: DateTime<Local> = entry.modified.into();
            println!(
                "  {:<40} {:>10}  {}",
                entry.file_name,
                format_size(entry.size_bytes),
                modified.format("%Y-%m-%d %H:%M:%S")
            );
        }
        println!();
    }

    Ok(())
}

fn print_summary(summary: &PassSummary) {
    for record in &summary.records {
        let mark = if record.is_success() { "✓" } else { "✗" };
        println!("{} {}: {}", mark, record.target, record.detail());
    }
    println!("{}", summary);
}

/// Format a byte count in human-readable form
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
