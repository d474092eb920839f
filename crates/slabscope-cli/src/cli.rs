use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "slabscope - orientation and surface analyses for molecular dynamics trajectories of water slabs and their solutes.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one or more analyses over a trajectory in a single pass.
    Run(RunArgs),
    /// List the available analyses.
    List,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    // --- Inputs ---
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the multi-frame XYZ trajectory.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub trajectory: PathBuf,

    /// Analyses to run, by name (see `slabscope list`).
    #[arg(
        short,
        long = "analysis",
        required = true,
        value_name = "NAME",
        num_args = 1..
    )]
    pub analyses: Vec<String>,

    /// Molecule template registry replacing the built-in water and SO2 templates.
    #[arg(long, value_name = "PATH")]
    pub templates: Option<PathBuf>,

    // --- Overrides ---
    /// Override `system.timesteps` from the config file.
    #[arg(short = 'n', long, value_name = "INT")]
    pub timesteps: Option<usize>,

    /// Override `output.directory` from the config file.
    #[arg(short, long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S analysis.surface-waters=50
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
