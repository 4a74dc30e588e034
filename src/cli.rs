//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for envboot.

use clap::{Parser, Subcommand};

/// envboot - Development environment bootstrapper
///
/// Detects the operating system and GPU, then installs graphviz, LaTeX,
/// the matching tensor library build and the Python toolchain. Every step
/// is skipped when its target is already present. Running without a
/// subcommand performs a full install.
#[derive(Parser, Debug)]
#[command(name = "envboot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "ENVBOOT_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The command to run; a bare invocation installs
    pub fn effective_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Install {
            dry_run: false,
            skip_smoke_test: false,
            report: None,
        })
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Install everything that is missing (default)
    Install {
        /// Print what would be installed without changing the system
        #[arg(long)]
        dry_run: bool,

        /// Do not run the post-install smoke test
        #[arg(long)]
        skip_smoke_test: bool,

        /// Write a JSON report of every step to this file
        #[arg(long)]
        report: Option<String>,
    },

    /// Show detected OS, GPU and privilege information
    Probe {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the install plan for this host without running it
    Plan,

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}
