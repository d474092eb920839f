//! # slabscope Core Library
//!
//! Trajectory analysis for molecular dynamics simulations of a liquid water slab
//! in contact with its vapour, with small solutes such as SO2 or organic acids
//! at or near the interface.
//!
//! ## Architectural Philosophy
//!
//! The library is split into three layers with a strict dependency direction.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MolecularSystem`, periodic
//!   cells, molecules addressed by chemical role), the kind-tagged bond graph,
//!   molecule templates, vector geometry, and trajectory and output I/O.
//!
//! - **[`engine`]: The Logic Core.** The stateful per-frame pipeline. It assembles
//!   atoms into molecules, locates the water surface, builds molecular reference
//!   frames, accumulates histograms and drives the timestep loop with its
//!   checkpoints and rewinds.
//!
//! - **[`workflows`]: The Public API.** The built-in analyses, their registry, and
//!   a single [`workflows::run::run`] entry point that executes a selection of
//!   them over a trajectory.

pub mod core;
pub mod engine;
pub mod workflows;
