use thiserror::Error;

use super::assembler::AssemblyError;
use super::config::ConfigError;
use super::frames::FrameError;
use super::histogram::GridTooLarge;
use super::surface::SurfaceError;
use crate::core::io::sink::SinkError;
use crate::core::io::traits::TrajectoryError;

/// Failures raised by an individual analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Surface location failed: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Molecular frame failed: {0}")]
    Frame(#[from] FrameError),

    #[error("Output failed: {0}")]
    Output(#[from] SinkError),

    #[error(transparent)]
    Grid(#[from] GridTooLarge),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Setup of analysis '{analysis}' failed: {source}")]
    Setup {
        analysis: &'static str,
        source: AnalysisError,
    },

    #[error("Topology error at timestep {timestep}: {source}")]
    Topology {
        timestep: usize,
        source: AssemblyError,
    },

    #[error("Trajectory error at timestep {timestep}: {source}")]
    Trajectory {
        timestep: usize,
        source: TrajectoryError,
    },

    #[error("Analysis '{analysis}' failed at timestep {timestep}: {source}")]
    Analysis {
        timestep: usize,
        analysis: &'static str,
        source: AnalysisError,
    },

    #[error("Writing results of analysis '{analysis}' failed: {source}")]
    Output {
        analysis: &'static str,
        source: AnalysisError,
    },

    #[error("Unknown analysis '{name}' (available: {available})")]
    UnknownAnalysis { name: String, available: String },

    #[error("Trajectory rewound more than {limit} times")]
    RewindLimit { limit: usize },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
