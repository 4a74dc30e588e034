//! envboot - Development environment bootstrapper
//!
//! This is the main entry point for the envboot binary.
//! It probes the host for its OS and GPU, builds an install plan and runs
//! each install-if-absent step in order.

mod cli;
mod config;
mod error;
mod exec;
mod install;
mod logging;
mod probe;
mod version;

use std::path::Path;

use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, ConfigSubcommand};
use crate::config::BootstrapConfig;
use crate::error::Result;
use crate::exec::{CommandRunner, DryRunRunner, SystemRunner};
use crate::install::{build_plan, InstallReport, Installer, NoticeLevel, Plan};

fn main() {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let command = cli.effective_command();

    // For commands that don't need full logging, use simple setup
    match &command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand, cli.config.as_deref());
        }
        _ => {}
    }

    let mut config = BootstrapConfig::load(cli.config.as_deref())?;

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::BuildInfo::current();
    info!(
        version = %build.full_version(),
        target = %build.target,
        "Starting envboot"
    );

    match command {
        Commands::Probe { json } => {
            let caps = probe::probe(&system_runner(&config), &config);
            if json {
                println!("{}", serde_json::to_string_pretty(&caps)?);
            } else {
                print!("{}", caps);
            }
        }
        Commands::Plan => {
            let caps = probe::probe(&system_runner(&config), &config);
            print!("{}", build_plan(&caps, &config));
        }
        Commands::Install {
            dry_run,
            skip_smoke_test,
            report,
        } => {
            if skip_smoke_test {
                config.smoke_test.enabled = false;
            }
            run_install(&config, dry_run, report.as_deref(), cli.quiet)?;
        }
        Commands::Version | Commands::Config { .. } => {
            // Already handled above
            unreachable!();
        }
    }

    Ok(())
}

fn system_runner(config: &BootstrapConfig) -> SystemRunner {
    match config.system.search_path {
        Some(ref paths) => SystemRunner::with_search_path(paths),
        None => SystemRunner::new(),
    }
}

/// Probe, plan and execute every step
fn run_install(config: &BootstrapConfig, dry_run: bool, report_path: Option<&str>, quiet: bool) -> Result<()> {
    let runner: Box<dyn CommandRunner> = if dry_run {
        Box::new(DryRunRunner::new(system_runner(config)))
    } else {
        Box::new(system_runner(config))
    };

    let caps = probe::probe(runner.as_ref(), config);
    let plan = build_plan(&caps, config);
    log_notices(&plan);

    info!(
        steps = plan.steps.len(),
        dry_run,
        gpu = caps.gpu_available(),
        "Install plan ready"
    );

    let mut report = InstallReport::new(caps, plan.notices.clone(), dry_run);
    let result = Installer::new(runner.as_ref()).run(&plan, &mut report);
    report.finish();

    // The report is written even when a core step failed
    if let Some(path) = report_path {
        report.write_json(Path::new(path))?;
        info!(path, "Report written");
    }

    if !quiet && !report.records.is_empty() {
        println!("{}", report);
    }

    match result {
        Ok(()) if report.optional_failures() > 0 => {
            warn!(
                failed = report.optional_failures(),
                "Completed with optional component failures"
            );
            Ok(())
        }
        Ok(()) => {
            info!("Environment ready");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn log_notices(plan: &Plan) {
    for notice in &plan.notices {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.message),
            NoticeLevel::Warning => warn!("{}", notice.message),
        }
    }
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: &ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = BootstrapConfig::load(config_path)?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), *force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate => {
            BootstrapConfig::load(config_path)?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
