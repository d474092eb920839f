//! # Core Module
//!
//! Stateless building blocks of the analysis pipeline.
//!
//! ## Architecture
//!
//! - **System representation** ([`models`]) - Atoms, molecules, the periodic cell and the arena that owns them
//! - **Connectivity** ([`graph`]) - The per-frame bond graph and its geometric criteria
//! - **Molecule templates** ([`topology`]) - Simple-molecule definitions used by the assembler
//! - **Input/output** ([`io`]) - Trajectory readers and per-analysis output sinks
//! - **Geometry** ([`utils`]) - Bisectors, dihedrals, tilt and twist angles

pub mod graph;
pub mod io;
pub mod models;
pub mod topology;
pub mod utils;
