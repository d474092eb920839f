//! # Engine Module
//!
//! The stateful half of the analysis pipeline. Given a trajectory and an immutable
//! [`config::AnalysisConfig`], the engine turns each frame's flat atom list into
//! typed molecules, locates the liquid surface, derives molecular reference frames,
//! and feeds the registered analyses that fill the histograms.
//!
//! ## Architecture
//!
//! - **Assembly** ([`assembler`]) - Bond-graph driven grouping of atoms into molecules
//! - **Surface** ([`surface`]) - Statistical location of the water surface along the reference axis
//! - **Frames** ([`frames`]) - Bisectors, bond vectors and dihedrals per molecule kind
//! - **Histograms** ([`histogram`]) - Clamped fixed-resolution accumulators and their text output
//! - **Analyses** ([`analysis`]) - The capability every measurement implements, plus the per-frame context
//! - **Driver** ([`driver`]) - The timestep loop: load, reparse, analyze, checkpoint, rewind
//! - **Configuration** ([`config`]), **Progress** ([`progress`]) and **Errors** ([`error`])

pub mod analysis;
pub mod assembler;
pub mod config;
pub mod driver;
pub mod error;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod frames;
pub mod histogram;
pub mod progress;
pub mod surface;
