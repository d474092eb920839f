//! # Workflows Module
//!
//! The built-in measurements and the entry point that runs them over a trajectory.
//!
//! ## Overview
//!
//! Every measurement implements [`crate::engine::analysis::Analysis`] and is
//! registered by name in [`registry`]. [`run::run`] resolves a list of names,
//! hands the analyses to the timestep driver and returns its summary.
//!
//! ## Analyses
//!
//! - **Orientation** ([`orientation`]) - Bisector and plane-normal angles of waters and SO2
//! - **O-H angles** ([`oh_angles`]) - Both O-H bond angles of every water
//! - **Surface statistics** ([`surface_stats`]) - Per-frame surface location and width
//! - **Succinic acid** ([`succinic`]) - Backbone dihedral, carboxyl tilt and twist
//! - **Malonic acid** ([`malonic`]) - Backbone orientation and carboxyl dihedrals
//! - **SO2 adsorption** ([`adsorption`]) - The first water that binds an SO2, followed over the run

pub mod adsorption;
pub mod malonic;
pub mod oh_angles;
pub mod orientation;
pub mod registry;
pub mod run;
pub mod succinic;
pub mod surface_stats;

use crate::core::io::sink::OutputSink;
use crate::engine::config::AnalysisConfig;
use crate::engine::error::AnalysisError;
use crate::engine::histogram::BinRange;

/// Opens the output file `file_name` in the configured directory, or a disabled
/// sink when output is not persisted.
pub(crate) fn open_sink(config: &AnalysisConfig, file_name: &str) -> Result<OutputSink, AnalysisError> {
    Ok(OutputSink::open(config.output_path(file_name).as_deref())?)
}

pub(crate) fn not_set_up(name: &'static str) -> AnalysisError {
    AnalysisError::Invalid(format!("analysis '{name}' was used before setup"))
}

/// A fixed angular range in degrees.
pub(crate) fn degrees(max: f64, resolution: f64) -> Result<BinRange, AnalysisError> {
    BinRange::new(0.0, max, resolution).map_err(|e| AnalysisError::Invalid(e.to_string()))
}
