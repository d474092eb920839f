use crate::cli::RunArgs;
use crate::config::PartialRunConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use slabscope::{
    core::io::xyz::XyzTrajectory, engine::driver::RunSummary, engine::progress::ProgressReporter,
    workflows,
};
use tracing::{info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialRunConfig::from_file(path)?,
        None => PartialRunConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    if let Some(dir) = &config.output.directory {
        std::fs::create_dir_all(dir)?;
        info!("Writing analysis output to {:?}", dir);
    } else {
        warn!("No output directory configured; results will not be written to disk.");
    }

    info!("Opening trajectory {:?}", &args.trajectory);
    let (mut source, mut system) = XyzTrajectory::from_path(&args.trajectory, config.system.cell)
        .map_err(|e| CliError::FileParsing {
            path: args.trajectory.clone(),
            source: e.into(),
        })?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Analysing {} atoms with: {}",
        system.atom_count(),
        args.analyses.join(", ")
    );
    let summary = workflows::run::run(
        &config,
        &mut source,
        &mut system,
        &args.analyses,
        &reporter,
    )?;

    print_summary(&summary);

    if summary.truncated {
        return Err(CliError::TruncatedTrajectory {
            read: summary.timesteps,
            requested: config.system.timesteps.unwrap_or(summary.timesteps),
        });
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Workflow complete.");
    println!("  Timesteps analysed: {}", summary.timesteps);
    if summary.passes > 1 {
        println!(
            "  Passes:             {} ({} frames in total)",
            summary.passes, summary.frames_analyzed
        );
    }
    println!("  Reparses:           {}", summary.reparses);
    println!("  Checkpoints:        {}", summary.checkpoints);
}
