use super::registry;
use crate::core::io::traits::FrameSource;
use crate::core::models::system::MolecularSystem;
use crate::engine::analysis::Analysis;
use crate::engine::config::{AnalysisConfig, ConfigError};
use crate::engine::driver::{RunSummary, TimestepDriver};
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use itertools::Itertools;
use tracing::{info, instrument, warn};

/// Runs the named analyses together over one trajectory.
///
/// `system` must already hold the atoms of the trajectory; its molecules are
/// rebuilt by the driver. Names are resolved through [`registry`] and a name
/// given twice runs once.
///
/// # Errors
///
/// Fails with [`EngineError::UnknownAnalysis`] before reading any frame if a name
/// is not registered, and otherwise with whatever the driver reports.
#[instrument(skip_all, name = "analysis_workflow")]
pub fn run<S: AsRef<str>>(
    config: &AnalysisConfig,
    source: &mut dyn FrameSource,
    system: &mut MolecularSystem,
    names: &[S],
    reporter: &ProgressReporter,
) -> Result<RunSummary, EngineError> {
    if names.is_empty() {
        return Err(ConfigError::MissingParameter("analyses").into());
    }
    let unique: Vec<&str> = names.iter().map(AsRef::as_ref).unique().collect();
    if unique.len() != names.len() {
        warn!("Duplicate analysis names were given; each analysis runs once.");
    }

    let mut analyses = unique
        .iter()
        .map(|name| registry::create(name))
        .collect::<Result<Vec<Box<dyn Analysis>>, _>>()?;
    info!(analyses = %unique.join(", "), atoms = system.atom_count(), "Analyses resolved.");

    let mut driver = TimestepDriver::new(config, reporter);
    driver.run(source, system, &mut analyses)
}
